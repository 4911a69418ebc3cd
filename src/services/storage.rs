use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::config::Settings;

/// Flat-directory file store for course materials and assignment uploads.
///
/// Stored names are always versioned: a fresh UUID prefix is added on every
/// store, so a re-submission never overwrites the bytes an earlier record
/// still references.
#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    root: PathBuf,
}

impl StorageService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let root = PathBuf::from(&settings.storage().upload_dir);
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create upload directory {}", root.display()))?;
        Ok(Self { root })
    }

    #[cfg(test)]
    pub(crate) fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Derive a collision-free stored name from an original filename.
    pub(crate) fn versioned_name(original: &str) -> String {
        format!("{}_{}", Uuid::new_v4(), sanitized_filename(original))
    }

    pub(crate) async fn store(&self, stored_name: &str, bytes: Vec<u8>) -> Result<(i64, String)> {
        let path = self.resolve(stored_name)?;
        let size = bytes.len() as i64;
        let hash_hex = hex::encode(Sha256::digest(&bytes));

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok((size, hash_hex))
    }

    pub(crate) async fn retrieve(&self, stored_name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(stored_name)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        }
    }

    fn resolve(&self, stored_name: &str) -> Result<PathBuf> {
        if stored_name.is_empty()
            || stored_name.contains(['/', '\\'])
            || stored_name.contains("..")
        {
            bail!("invalid stored filename: {stored_name}");
        }

        Ok(self.root.join(stored_name))
    }
}

pub(crate) fn sanitized_filename(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect();

    // ".." would be rejected by the stored-name check later
    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", ".");
    }

    if sanitized.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}
