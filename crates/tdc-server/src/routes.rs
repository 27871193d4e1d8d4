//! Router

use std::path::Path;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{
    admin_generate, admin_licenses, admin_stats, api_status, gumroad_webhook, health_check,
    require_admin, verify_license,
};
use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = Router::new()
        .route("/stats", get(admin_stats))
        .route("/licenses", get(admin_licenses))
        .route("/generate", post(admin_generate))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/status", get(api_status))

        // Licensing
        .route("/api/license/verify", post(verify_license))
        .route("/webhook/gumroad", post(gumroad_webhook))
        .nest("/admin", admin)

        // Static files (browser app)
        .fallback_service(ServeDir::new(static_dir))

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
