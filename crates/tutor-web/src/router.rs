//! Axum router: maps every URL path to its handler and guard.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tutor_common::ApiError;

use crate::auth::{require_admin, require_auth};
use crate::handlers::{admin_chats, admin_documents, admin_stats, admin_users, auth, chat, health};
use crate::state::{AppState, SharedState};

/// Multipart framing allowance on top of the configured file size.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    let public = Router::new()
        .route("/health",             get(health::health))
        .route("/api/auth/register",  post(auth::register))
        .route("/api/auth/login",     post(auth::login));

    let user = Router::new()
        .route("/api/auth/me",                      get(auth::me))
        .route("/api/chat",                         post(chat::send_message))
        .route("/api/chat/sessions",                get(chat::list_sessions))
        .route(
            "/api/chat/sessions/{id}",
            get(chat::get_session).delete(chat::delete_session),
        )
        .route(
            "/api/chat/history",
            get(chat::list_history).delete(chat::delete_all_history),
        )
        .route("/api/chat/history/{id}",            get(chat::get_chat).delete(chat::delete_chat))
        .route("/api/chat/history/{id}/feedback",   post(chat::submit_feedback))
        .route_layer(middleware::from_fn_with_state(shared.clone(), require_auth));

    let upload_limit = shared.config.uploads.max_bytes + MULTIPART_OVERHEAD;
    let upload = Router::new()
        .route("/api/admin/documents/upload", post(admin_documents::upload_document))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit));

    let admin = Router::new()
        // Users
        .route("/api/admin/users",       get(admin_users::list_users))
        .route(
            "/api/admin/users/{id}",
            get(admin_users::get_user)
                .patch(admin_users::update_user)
                .delete(admin_users::delete_user),
        )
        // Documents
        .route("/api/admin/documents",              get(admin_documents::list_documents))
        .route("/api/admin/documents/retry-failed", post(admin_documents::retry_failed))
        .route(
            "/api/admin/documents/{id}",
            get(admin_documents::get_document).delete(admin_documents::delete_document),
        )
        .route("/api/admin/documents/{id}/reindex", post(admin_documents::reindex_document))
        .route("/api/admin/documents/{id}/embed",   post(admin_documents::embed_document))
        .merge(upload)
        // Chats
        .route("/api/admin/chats",         get(admin_chats::list_chats))
        .route("/api/admin/chats/export",  post(admin_chats::export_chats))
        .route(
            "/api/admin/chats/{id}",
            get(admin_chats::get_chat).delete(admin_chats::delete_chat),
        )
        // Stats
        .route("/api/admin/stats",          get(admin_stats::dashboard))
        .route("/api/admin/stats/overview", get(admin_stats::overview))
        // route_layer order: the last one added runs first
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(shared.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(user)
        .merge(admin)
        .fallback(|| async { ApiError::NotFound("Route not found".to_string()) })
        .layer(cors_layer(&shared.config.server.cors_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Permissive when no origins are configured, otherwise an explicit allow-list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}
