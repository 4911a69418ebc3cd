use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::auth::{RegisterResponse, TokenResponse, VerifyRequest};
use crate::schemas::user::{UserLogin, UserRegister, UserResponse};
use crate::schemas::MessageResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify", post(verify))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<UserRegister>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let email = normalize_email(&payload.email);

    let existing = repositories::users::exists_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if existing.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let verification_code = security::generate_verification_code();
    let now = primitive_now_utc();

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            full_name: payload.full_name.trim(),
            hashed_password,
            role: payload.role,
            is_verified: false,
            verification_code: &verification_code,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| {
        // Concurrent registration with the same email loses the race here.
        if is_unique_violation(&e) {
            ApiError::Conflict("User with this email already exists".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    dispatch_verification_email(&state, &user.email, &verification_code).await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registered. Check your email for the verification code.".to_string(),
            user: UserResponse::from_db(user),
        }),
    ))
}

async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

    // A missing user and a wrong code report the same failure.
    let Some(user) = user else {
        return Err(ApiError::BadRequest("Invalid verification code".to_string()));
    };

    if user.verification_code != payload.code.trim() {
        return Err(ApiError::BadRequest("Invalid verification code".to_string()));
    }

    repositories::users::mark_verified(state.db(), &user.id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to mark user verified"))?;

    Ok(Json(MessageResponse { message: "Email verified. You can log in now.".to_string() }))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !user.is_verified {
        return Err(ApiError::Forbidden("Email is not verified"));
    }

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|e| ApiError::internal(e, "Failed to verify password"))?;

    if !verified {
        return Err(ApiError::Unauthorized("Wrong password"));
    }

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    }))
}

async fn logout(CurrentUser(user): CurrentUser) -> Json<MessageResponse> {
    // Sessions are stateless bearer tokens; logout acknowledges disposal.
    tracing::info!(user_id = %user.id, "User logged out");
    Json(MessageResponse { message: "Logged out".to_string() })
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

/// Fire-and-forget: delivery failures are logged, never surfaced to the caller.
async fn dispatch_verification_email(state: &AppState, email: &str, code: &str) {
    match state.mailer() {
        Some(mailer) => {
            let body = format!("Your verification code: {code}");
            if let Err(err) = mailer.send(email, "Verify your email", &body).await {
                tracing::error!(error = %err, "Failed to dispatch verification email");
            }
        }
        None => {
            tracing::info!(email = %email, code = %code, "Mail relay not configured; logging verification code");
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().as_deref() == Some("23505"),
        _ => false,
    }
}
