use axum::{
    extract::DefaultBodyLimit,
    http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    http::{HeaderName, Method, Request, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::assignments;
use crate::api::auth;
use crate::api::chatbot;
use crate::api::courses;
use crate::api::files;
use crate::api::handlers;
use crate::api::quizzes;
use crate::core::{config::Settings, state::AppState};

pub(crate) fn router(state: AppState) -> Router {
    let cors = build_cors_layer(state.settings());
    let api_v1_prefix = state.settings().api().api_v1_str.clone();
    let api_v1 = Router::new()
        .nest("/auth", auth::router())
        .nest("/courses", courses::router())
        .nest("/assignments", assignments::router())
        .nest("/quizzes", quizzes::router())
        .nest("/chatbot", chatbot::router());

    let request_id_header = HeaderName::from_static("x-request-id");
    let request_id_header_for_span = request_id_header.clone();
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(move |request: &Request<_>| {
            let request_id = request
                .headers()
                .get(&request_id_header_for_span)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_response(|response: &Response<axum::body::Body>, latency: Duration, _span: &Span| {
            let status_label = response.status().as_u16().to_string();
            metrics::counter!(
                "http_requests_total",
                "status" => status_label.clone()
            )
            .increment(1);
            metrics::histogram!(
                "http_request_duration_seconds",
                "status" => status_label
            )
            .record(latency.as_secs_f64());
        });

    let mut router: Router<AppState> = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz).head(handlers::healthz))
        .nest("/files", files::router())
        .nest(&api_v1_prefix, api_v1)
        // One extra megabyte of headroom for multipart framing
        .layer(DefaultBodyLimit::max(
            ((state.settings().storage().max_upload_size_mb + 1) * 1024 * 1024) as usize,
        ))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(trace_layer)
        .layer(cors);

    if state.settings().telemetry().prometheus_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router.with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins = settings
        .cors()
        .origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            ORIGIN,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        // Wildcard origin cannot be combined with allow_credentials
        base.allow_origin(Any)
    } else {
        base.allow_credentials(true)
            .allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use super::router;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::core::{config::Settings, metrics};
    use crate::db::types::UserRole;
    use crate::repositories;
    use crate::test_support::{self, MultipartField};

    #[tokio::test]
    async fn root_returns_project_name() {
        let _guard = test_support::env_lock();
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::remove_var("PROMETHEUS_ENABLED");

        let settings = Settings::load().expect("settings");
        let app = router(test_support::build_state(settings));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Belay Learning API");
    }

    #[tokio::test]
    async fn unauthenticated_course_list_returns_401() {
        let _guard = test_support::env_lock();
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::remove_var("PROMETHEUS_ENABLED");

        let settings = Settings::load().expect("settings");
        let prefix = settings.api().api_v1_str.clone();
        let app = router(test_support::build_state(settings));

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("{prefix}/courses"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));
    }

    #[tokio::test]
    async fn metrics_disabled_returns_404() {
        let _guard = test_support::env_lock();
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::remove_var("PROMETHEUS_ENABLED");

        let settings = Settings::load().expect("settings");
        let app = router(test_support::build_state(settings));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_enabled_returns_200() {
        let _guard = test_support::env_lock();
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::set_var("PROMETHEUS_ENABLED", "1");

        let settings = Settings::load().expect("settings");
        metrics::init(&settings).expect("metrics init");
        let app = router(test_support::build_state(settings));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    // The tests below need a real database and skip when DATABASE_URL is unset.

    fn register_body(full_name: &str, email: &str, password: &str) -> serde_json::Value {
        serde_json::json!({ "full_name": full_name, "email": email, "password": password })
    }

    fn login_body(email: &str, password: &str) -> serde_json::Value {
        serde_json::json!({ "email": email, "password": password })
    }

    #[tokio::test]
    async fn duplicate_email_second_registration_conflicts() {
        let Some(ctx) = test_support::setup_db_context().await else {
            eprintln!("skipping: DATABASE_URL is not set");
            return;
        };
        let prefix = ctx.state.settings().api().api_v1_str.clone();
        let body = register_body("Dana Scully", "dana@example.com", "password123");

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("{prefix}/auth/register"),
                None,
                Some(body.clone()),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("{prefix}/auth/register"),
                None,
                Some(body),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_ladder_reports_each_failure() {
        let Some(ctx) = test_support::setup_db_context().await else {
            eprintln!("skipping: DATABASE_URL is not set");
            return;
        };
        let prefix = ctx.state.settings().api().api_v1_str.clone();
        let login_uri = format!("{prefix}/auth/login");

        // Unknown email
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &login_uri,
                None,
                Some(login_body("nobody@example.com", "password123")),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Registered but not yet verified, even with the right password
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("{prefix}/auth/register"),
                None,
                Some(register_body("Fox Mulder", "fox@example.com", "password123")),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &login_uri,
                None,
                Some(login_body("fox@example.com", "password123")),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Verified but wrong password
        let user = repositories::users::find_by_email(ctx.state.db(), "fox@example.com")
            .await
            .expect("query")
            .expect("user");
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("{prefix}/auth/verify"),
                None,
                Some(serde_json::json!({ "email": "fox@example.com", "code": user.verification_code })),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &login_uri,
                None,
                Some(login_body("fox@example.com", "wrong-password")),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // All checks pass
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &login_uri,
                None,
                Some(login_body("fox@example.com", "password123")),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        assert!(json["access_token"].is_string());
    }

    #[tokio::test]
    async fn wrong_verification_code_leaves_user_unverified() {
        let Some(ctx) = test_support::setup_db_context().await else {
            eprintln!("skipping: DATABASE_URL is not set");
            return;
        };
        let prefix = ctx.state.settings().api().api_v1_str.clone();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("{prefix}/auth/register"),
                None,
                Some(register_body("Walter Skinner", "walter@example.com", "password123")),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let user = repositories::users::find_by_email(ctx.state.db(), "walter@example.com")
            .await
            .expect("query")
            .expect("user");
        let wrong_code = if user.verification_code == "000000" { "999999" } else { "000000" };

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("{prefix}/auth/verify"),
                None,
                Some(serde_json::json!({ "email": "walter@example.com", "code": wrong_code })),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let user = repositories::users::find_by_email(ctx.state.db(), "walter@example.com")
            .await
            .expect("query")
            .expect("user");
        assert!(!user.is_verified);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("{prefix}/auth/login"),
                None,
                Some(login_body("walter@example.com", "password123")),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn resubmission_keeps_both_assignment_rows() {
        let Some(ctx) = test_support::setup_db_context().await else {
            eprintln!("skipping: DATABASE_URL is not set");
            return;
        };
        let prefix = ctx.state.settings().api().api_v1_str.clone();

        let admin =
            test_support::insert_user(ctx.state.db(), "admin@example.com", UserRole::Admin, "admin-pass-123")
                .await;
        let student = test_support::insert_user(
            ctx.state.db(),
            "student@example.com",
            UserRole::Student,
            "student-pass-123",
        )
        .await;
        let course = repositories::courses::create(
            ctx.state.db(),
            repositories::courses::CreateCourse {
                id: &uuid::Uuid::new_v4().to_string(),
                title: "Knots",
                description: "",
                files: Vec::new(),
                created_by: &admin.id,
                created_at: crate::core::time::primitive_now_utc(),
            },
        )
        .await
        .expect("course");

        let token = test_support::bearer_token(&student.id, ctx.state.settings());
        let submit_uri = format!("{prefix}/assignments/{}", course.id);
        let file = [MultipartField::File {
            name: "assignment",
            filename: "hw.pdf",
            bytes: b"first attempt",
        }];

        for _ in 0..2 {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::multipart_request(&submit_uri, &token, &file))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("{prefix}/assignments/mine"),
                Some(&token),
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        let rows = json.as_array().expect("array");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["original_filename"], "hw.pdf");
        assert_eq!(rows[1]["original_filename"], "hw.pdf");
        assert_ne!(rows[0]["filename"], rows[1]["filename"]);
    }

    #[tokio::test]
    async fn course_file_list_round_trips_in_order() {
        let Some(ctx) = test_support::setup_db_context().await else {
            eprintln!("skipping: DATABASE_URL is not set");
            return;
        };
        let prefix = ctx.state.settings().api().api_v1_str.clone();

        let admin =
            test_support::insert_user(ctx.state.db(), "admin@example.com", UserRole::Admin, "admin-pass-123")
                .await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::multipart_request(
                &format!("{prefix}/courses"),
                &token,
                &[
                    MultipartField::Text { name: "title", value: "Belaying 101" },
                    MultipartField::Text { name: "description", value: "Rope work" },
                    MultipartField::File { name: "files", filename: "a.pdf", bytes: b"alpha" },
                    MultipartField::File { name: "files", filename: "b.pdf", bytes: b"beta" },
                ],
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = test_support::read_json(response).await;
        let course_id = created["id"].as_str().expect("id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("{prefix}/courses/{course_id}"),
                Some(&token),
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        let files = json["files"].as_array().expect("files");
        assert_eq!(files.len(), 2);
        let first = files[0].as_str().expect("name");
        let second = files[1].as_str().expect("name");
        assert!(first.ends_with("_a.pdf"), "files out of order: {first}");
        assert!(second.ends_with("_b.pdf"), "files out of order: {second}");

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/files/{first}"),
                Some(&token),
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&body[..], b"alpha");
    }

    #[tokio::test]
    async fn blank_course_title_stores_no_files() {
        let Some(ctx) = test_support::setup_db_context().await else {
            eprintln!("skipping: DATABASE_URL is not set");
            return;
        };
        let prefix = ctx.state.settings().api().api_v1_str.clone();

        let admin =
            test_support::insert_user(ctx.state.db(), "admin@example.com", UserRole::Admin, "admin-pass-123")
                .await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::multipart_request(
                &format!("{prefix}/courses"),
                &token,
                &[
                    MultipartField::Text { name: "title", value: "   " },
                    MultipartField::File { name: "files", filename: "a.pdf", bytes: b"alpha" },
                ],
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let leftovers = std::fs::read_dir(ctx.state.storage().root()).expect("read dir").count();
        assert_eq!(leftovers, 0, "rejected upload left files in storage");
    }
}
