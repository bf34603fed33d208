// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod catalog;
pub mod config;
pub mod decision;
pub mod engine;
pub mod location;
pub mod metrics;
pub mod request_log;
pub mod rules;
pub mod search;
pub mod selector;
pub mod temporal;
pub mod weather;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, router, AppState};
pub use crate::config::{AppConfig, Secrets};
pub use crate::engine::{Providers, Recommendation, Recommender};

use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the full application router from configuration (real providers).
pub fn app(cfg: &AppConfig, metrics: Option<&crate::metrics::Metrics>) -> anyhow::Result<Router> {
    let recommender = Recommender::from_config(cfg)?;
    Ok(create_router(AppState::new(recommender), metrics))
}

/// Install a tracing subscriber unless the host runtime already did.
///
/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches from
/// compact lines to JSON records.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("otenki_meshi=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
