//! # Weather context
//! Normalizes the weather provider's answer into `(condition, °C, humidity)`.
//! Any provider failure is recovered here: callers always get a usable
//! [`WeatherContext`], the fallback one when the provider is unavailable.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::location::Coordinates;

pub const OPENWEATHERMAP_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Condition {
    Clear,
    Rain,
    Snow,
    Thunderstorm,
    Drizzle,
    Clouds,
    /// Anything else the provider reports (Mist, Haze, ...), kept by name.
    Other(String),
}

impl Condition {
    /// Map an OpenWeatherMap `(id, main)` pair. 800 (clear sky) and 801
    /// (few clouds) both count as Clear.
    pub fn from_provider(id: u32, main: &str) -> Self {
        if id == 800 || id == 801 {
            return Condition::Clear;
        }
        Self::from_name(main)
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "Clear" => Condition::Clear,
            "Rain" => Condition::Rain,
            "Snow" => Condition::Snow,
            "Thunderstorm" => Condition::Thunderstorm,
            "Drizzle" => Condition::Drizzle,
            "Clouds" => Condition::Clouds,
            other => Condition::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Condition::Clear => "Clear",
            Condition::Rain => "Rain",
            Condition::Snow => "Snow",
            Condition::Thunderstorm => "Thunderstorm",
            Condition::Drizzle => "Drizzle",
            Condition::Clouds => "Clouds",
            Condition::Other(name) => name,
        }
    }

    /// Rain, Snow, Thunderstorm or Drizzle.
    pub fn is_adverse(&self) -> bool {
        matches!(
            self,
            Condition::Rain | Condition::Snow | Condition::Thunderstorm | Condition::Drizzle
        )
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherContext {
    pub condition: Condition,
    pub temperature_c: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity_pct: Option<u8>,
}

impl WeatherContext {
    pub fn new(condition: Condition, temperature_c: f64, humidity_pct: Option<u8>) -> Self {
        Self {
            condition,
            temperature_c,
            humidity_pct: humidity_pct.map(|h| h.min(100)),
        }
    }

    /// Used whenever the provider cannot be reached or returns garbage.
    pub fn fallback() -> Self {
        Self::new(Condition::Clear, 20.0, Some(50))
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, at: Coordinates) -> Result<WeatherContext>;
    fn name(&self) -> &'static str;
}

/// Ask the provider, substituting [`WeatherContext::fallback`] on any error.
pub async fn observe(provider: &dyn WeatherProvider, at: Coordinates) -> WeatherContext {
    match provider.current(at).await {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(
                target: "weather",
                provider = provider.name(),
                error = ?e,
                "weather provider failed; using fallback context"
            );
            counter!("provider_errors_total", "provider" => provider.name()).increment(1);
            WeatherContext::fallback()
        }
    }
}

// ------------------------------------------------------------
// OpenWeatherMap
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OwmResponse {
    weather: Vec<OwmWeather>,
    main: OwmMain,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    id: u32,
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    #[serde(default)]
    humidity: Option<f64>,
}

impl OwmResponse {
    fn into_context(self) -> Result<WeatherContext> {
        let primary = self
            .weather
            .first()
            .ok_or_else(|| anyhow!("weather payload has no condition entries"))?;
        let humidity = self
            .main
            .humidity
            .filter(|h| h.is_finite())
            .map(|h| h.round().clamp(0.0, 100.0) as u8);
        Ok(WeatherContext::new(
            Condition::from_provider(primary.id, &primary.main),
            self.main.temp,
            humidity,
        ))
    }
}

/// Parse a raw OpenWeatherMap `/weather` body (exposed for fixtures/tests).
pub fn parse_openweathermap(body: &str) -> Result<WeatherContext> {
    let raw: OwmResponse = serde_json::from_str(body).context("decoding weather payload")?;
    raw.into_context()
}

pub struct OpenWeatherMapProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherMapProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("otenki-meshi/0.1")
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .context("building weather http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    async fn current(&self, at: Coordinates) -> Result<WeatherContext> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("WEATHER_API_KEY is not configured"))?;

        let body = self
            .http
            .get(&self.base_url)
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("units", "metric".to_string()),
                ("appid", key.to_string()),
            ])
            .send()
            .await
            .context("weather request")?
            .error_for_status()
            .context("weather non-2xx")?
            .text()
            .await
            .context("reading weather body")?;

        parse_openweathermap(&body)
    }

    fn name(&self) -> &'static str {
        "openweathermap"
    }
}

// ------------------------------------------------------------
// Stubs for tests/local runs
// ------------------------------------------------------------

/// Always reports the same context.
#[derive(Debug, Clone)]
pub struct StaticWeather(pub WeatherContext);

#[async_trait]
impl WeatherProvider for StaticWeather {
    async fn current(&self, _at: Coordinates) -> Result<WeatherContext> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

/// Always fails, like an unreachable provider.
#[derive(Debug, Clone, Default)]
pub struct FailingWeather;

#[async_trait]
impl WeatherProvider for FailingWeather {
    async fn current(&self, _at: Coordinates) -> Result<WeatherContext> {
        Err(anyhow!("weather provider unavailable"))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}
