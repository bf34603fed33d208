//! One-shot recommendation from the command line, against the real providers.
//!
//! Usage: `recommend_once [LAT LON]`

use otenki_meshi::api::RecommendResponse;
use otenki_meshi::{AppConfig, Recommender, Secrets};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    otenki_meshi::init_tracing();

    let mut args = std::env::args().skip(1);
    let lat = args.next();
    let lon = args.next();

    let cfg = AppConfig::load_default()?.with_secrets(Secrets::from_env());
    let recommender = Recommender::from_config(&cfg)?;

    let rec = recommender
        .recommend_and_flush(lat.as_deref(), lon.as_deref())
        .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&RecommendResponse::from(&rec))?
    );
    Ok(())
}
