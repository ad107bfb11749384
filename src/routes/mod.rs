//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - generation gateways `/api/generate-quiz` and `/api/chatbot`
/// - quiz sessions under `/api/sessions/...`
/// - achievements, topic suggestion and performance reset
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/", get(http::http_root))
        .route("/api/health", get(http::http_health))
        // Generation gateways
        .route("/api/generate-quiz", post(http::http_post_generate_quiz))
        .route("/api/chatbot", post(http::http_post_chatbot))
        // Sessions
        .route("/api/sessions", post(http::http_post_session))
        .route(
            "/api/sessions/:id",
            get(http::http_get_session).delete(http::http_delete_session),
        )
        .route("/api/sessions/:id/select", post(http::http_post_select))
        .route("/api/sessions/:id/hint", post(http::http_post_hint))
        .route("/api/sessions/:id/eliminate", post(http::http_post_eliminate))
        .route("/api/sessions/:id/skip", post(http::http_post_skip))
        .route("/api/sessions/:id/submit", post(http::http_post_submit))
        // Learner progress
        .route("/api/achievements", get(http::http_get_achievements))
        .route("/api/suggestion", get(http::http_get_suggestion))
        .route("/api/performance", delete(http::http_delete_performance))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
