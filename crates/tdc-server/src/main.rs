//! Tu Dinero Claro webhook server
//!
//! Axum server that turns Gumroad sales into license keys, emails them to the
//! buyer and serves the browser app.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tdc_licensing::{JsonFileLicenseStore, LicenseCodec, LicenseIssuer, LicenseStore, ResendMailer};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Outbound email
    let mailer = ResendMailer::new(config.licensing.email.clone())?;
    let email_configured = mailer.is_configured();
    if email_configured {
        tracing::info!("✓ Resend configured");
    } else {
        tracing::warn!("⚠ RESEND_API_KEY not set - license emails will fail");
    }

    // License records
    let store: Arc<dyn LicenseStore> = Arc::new(JsonFileLicenseStore::new(&config.licenses_file));
    match store.stats(0).await {
        Ok(stats) => tracing::info!(
            file = %config.licenses_file.display(),
            licenses = stats.total_licenses,
            "✓ License store ready"
        ),
        Err(e) => tracing::error!(
            file = %config.licenses_file.display(),
            "⚠ License store unreadable: {}",
            e
        ),
    }

    if config.admin_token.is_none() {
        tracing::warn!("⚠ ADMIN_TOKEN not set - /admin endpoints are open");
    }

    let codec = LicenseCodec::new(config.licensing.format.clone());
    tracing::info!(
        prefix = codec.format().prefix(),
        year = codec.format().year(),
        "License format"
    );

    let issuer = LicenseIssuer::new(
        codec,
        store.clone(),
        Arc::new(mailer),
        config.licensing.product_name.clone(),
    );

    // Build application state
    let state = AppState {
        issuer: Arc::new(issuer),
        store,
        admin_token: config.admin_token.as_deref().map(Arc::from),
        email_configured,
    };

    let app = routes::router(state, &config.static_dir);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 Tu Dinero Claro server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health              - Health check");
    tracing::info!("  GET  /api/status          - Service info");
    tracing::info!("  POST /webhook/gumroad     - Gumroad sale ping");
    tracing::info!("  POST /api/license/verify  - Verify license key");
    tracing::info!("  GET  /admin/stats         - Issuance stats");
    tracing::info!("  GET  /admin/licenses      - All issued licenses");
    tracing::info!("  POST /admin/generate      - Issue a license by hand");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
