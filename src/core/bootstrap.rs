use serde::Deserialize;
use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let email = &admin.first_superuser_email;
    let user = repositories::users::find_by_email(state.db(), email).await?;
    let now = primitive_now_utc();

    if let Some(user) = user {
        let mut needs_update = false;
        let verified =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);

        let hashed_password = if verified {
            user.hashed_password.clone()
        } else {
            needs_update = true;
            security::hash_password(&admin.first_superuser_password)?
        };

        let role = if user.role != UserRole::Admin {
            needs_update = true;
            UserRole::Admin
        } else {
            user.role
        };

        let is_verified = if !user.is_verified {
            needs_update = true;
            true
        } else {
            user.is_verified
        };

        if needs_update {
            sqlx::query(
                "UPDATE users
                 SET hashed_password = $1,
                     role = $2,
                     is_verified = $3,
                     updated_at = $4
                 WHERE id = $5",
            )
            .bind(hashed_password)
            .bind(role)
            .bind(is_verified)
            .bind(now)
            .bind(user.id)
            .execute(state.db())
            .await?;

            tracing::info!("Updated default superuser {email}");
        } else {
            tracing::info!("Default superuser already up to date");
        }

        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;

    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email,
            full_name: "Super Admin",
            hashed_password,
            role: UserRole::Admin,
            is_verified: true,
            verification_code: "000000",
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    tracing::info!("Created default superuser {email}");
    Ok(())
}

#[derive(Debug, Deserialize)]
struct QuizSeed {
    question: String,
    options: Vec<String>,
    answer: String,
}

/// Load quizzes from `QUIZ_SEED_PATH` the first time the table is empty.
pub(crate) async fn seed_quizzes(state: &AppState) -> anyhow::Result<()> {
    let Some(seed_path) = &state.settings().quiz().seed_path else {
        return Ok(());
    };

    let existing = repositories::quizzes::count(state.db()).await?;
    if existing > 0 {
        tracing::debug!(count = existing, "Quizzes already present; skipping seed");
        return Ok(());
    }

    let raw = tokio::fs::read_to_string(seed_path).await?;
    let seeds: Vec<QuizSeed> = serde_json::from_str(&raw)?;

    let mut inserted = 0usize;
    for seed in seeds {
        if seed.question.trim().is_empty() || seed.answer.trim().is_empty() {
            tracing::warn!("Skipping quiz seed entry with empty question or answer");
            continue;
        }

        repositories::quizzes::create(
            state.db(),
            repositories::quizzes::CreateQuiz {
                id: &Uuid::new_v4().to_string(),
                question: seed.question.trim(),
                options: seed.options,
                answer: seed.answer.trim(),
            },
        )
        .await?;
        inserted += 1;
    }

    tracing::info!(count = inserted, path = %seed_path, "Seeded quizzes");
    Ok(())
}
