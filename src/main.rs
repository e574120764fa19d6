//! Courier earnings service: binary entrypoint
//! Boots the Axum HTTP server, wiring config, aggregate source, metrics and routes.

use courier_earnings::{build_state, config::AppConfig, create_router, devlog, metrics::Metrics};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - APP_DEV_LOG=1
fn enable_dev_tracing() {
    if !devlog::dev_logging_enabled() {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("courier=info,courier_earnings=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = AppConfig::load_default()?;
    let state = build_state(&cfg)?;

    let router = create_router(state);
    let router = match Metrics::init() {
        Ok(m) => router.merge(m.router()),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            router
        }
    };

    Ok(router.into())
}
