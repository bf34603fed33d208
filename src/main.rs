//! Otenki Meshi — Binary Entrypoint
//! Boots the Axum HTTP server on the Shuttle runtime: config, secrets,
//! metrics recorder, then the recommendation router.

use otenki_meshi::{metrics::Metrics, AppConfig, Secrets};
use shuttle_axum::ShuttleAxum;
use shuttle_runtime::SecretStore;

#[shuttle_runtime::main]
async fn axum(#[shuttle_runtime::Secrets] store: SecretStore) -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    otenki_meshi::init_tracing();

    // Secret store first, plain environment as a fallback.
    let secrets = Secrets::from_lookup(|k| store.get(k).or_else(|| std::env::var(k).ok()));
    let cfg = AppConfig::load_default()?.with_secrets(secrets);
    tracing::info!(config = ?cfg, "configuration loaded");

    let metrics = Metrics::init()?;
    let router = otenki_meshi::app(&cfg, Some(&metrics))?;

    Ok(router.into())
}
