use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{envelope, rest, ws, AppState};

pub fn build(state: Arc<AppState>) -> Router {
    let cors = if state.config.cors_allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health check
        .route("/api/v1/health", get(health))
        // Auth
        .route("/api/v1/auth/signup", post(rest::auth::signup))
        .route("/api/v1/auth/verify-email", post(rest::auth::verify_email))
        .route("/api/v1/auth/login", post(rest::auth::login))
        .route("/api/v1/auth/forgot-password", post(rest::auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(rest::auth::reset_password))
        .route("/api/v1/auth/change-password", post(rest::auth::change_password))
        // Users
        .route(
            "/api/v1/users/me",
            get(rest::users::get_profile).patch(rest::users::update_profile),
        )
        // Market events
        .route("/api/v1/market-events", get(rest::market_events::list))
        .route("/api/v1/market-events/live", get(ws::live))
        // Posts
        .route(
            "/api/v1/posts",
            get(rest::posts::list).post(rest::posts::create),
        )
        .route("/api/v1/posts/details/{post_id}", get(rest::posts::details))
        .route("/api/v1/posts/{post_id}", patch(rest::posts::update))
        .route("/api/v1/posts/approve", post(rest::posts::approve))
        .route("/api/v1/posts/publish", post(rest::posts::publish))
        .route(
            "/api/v1/posts/{post_id}/customize",
            post(rest::posts::customize),
        )
        .route("/api/v1/posts/custom-event", post(rest::posts::custom_event))
        .route("/api/v1/posts/statistics", get(rest::posts::statistics))
        .route("/api/v1/posts/published", get(rest::posts::published_list))
        .route(
            "/api/v1/posts/published/{post_id}",
            get(rest::posts::published_detail),
        )
        .fallback(envelope::fallback)
        .with_state(state)
        .layer(cors)
        // Logging layer: method + path + status + latency
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

async fn health() -> axum::response::Response {
    envelope::success("Service is healthy", serde_json::json!({ "status": "ok" }))
}
