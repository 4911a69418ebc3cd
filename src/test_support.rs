use std::sync::{Mutex, MutexGuard, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api;
use crate::core::config::Settings;
use crate::core::state::AppState;
use crate::core::{security, time::primitive_now_utc};
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::services::storage::StorageService;

/// Serializes tests that mutate process environment variables.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Mutex::new(()));
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Application state with a lazy database pool, suitable for router tests
/// that never reach a query.
pub(crate) fn build_state(settings: Settings) -> AppState {
    let db = sqlx::PgPool::connect_lazy(&settings.database().database_url()).expect("lazy pool");
    let storage = temp_storage();
    AppState::new(settings, db, storage, None)
}

pub(crate) fn temp_storage() -> StorageService {
    let root = std::env::temp_dir().join(format!("belay-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).expect("create temp storage dir");
    StorageService::with_root(root)
}

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: MutexGuard<'static, ()>,
}

/// Full context against a real database; `None` when `DATABASE_URL` is not
/// configured so callers can skip.
pub(crate) async fn setup_db_context() -> Option<TestContext> {
    let guard = env_lock();
    dotenvy::dotenv().ok();

    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => {}
        _ => return None,
    }

    std::env::set_var("SECRET_KEY", "test-secret");
    std::env::remove_var("PROMETHEUS_ENABLED");

    let settings = Settings::load().expect("settings");
    let db = crate::db::init_pool(&settings).await.expect("db pool");
    crate::db::run_migrations(&db).await.expect("migrations");
    reset_db(&db).await.expect("reset db");

    let state = AppState::new(settings, db, temp_storage(), None);
    let app = api::router::router(state.clone());

    Some(TestContext { state, app, _guard: guard })
}

async fn reset_db(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("TRUNCATE quiz_results, quizzes, assignments, courses, users CASCADE")
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn insert_user(pool: &PgPool, email: &str, role: UserRole, password: &str) -> User {
    let hashed_password = security::hash_password(password).expect("hash password");
    let now = primitive_now_utc();

    repositories::users::create(
        pool,
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email,
            full_name: "Test User",
            hashed_password,
            role,
            is_verified: true,
            verification_code: "123456",
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .expect("insert user")
}

pub(crate) fn bearer_token(user_id: &str, settings: &Settings) -> String {
    security::create_access_token(user_id, settings, None).expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) enum MultipartField<'a> {
    Text { name: &'a str, value: &'a str },
    File { name: &'a str, filename: &'a str, bytes: &'a [u8] },
}

pub(crate) fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[MultipartField<'_>],
) -> Request<Body> {
    const BOUNDARY: &str = "belay-test-boundary";

    let mut body: Vec<u8> = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match field {
            MultipartField::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            MultipartField::File { name, filename, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .expect("multipart request")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
