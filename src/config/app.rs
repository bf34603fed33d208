// src/config/app.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::location::Coordinates;
use crate::rules::RuleOptions;
use crate::search::hotpepper::HOTPEPPER_URL;
use crate::weather::OPENWEATHERMAP_URL;

pub const ENV_CONFIG_PATH: &str = "OTENKI_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

pub const ENV_WEATHER_API_KEY: &str = "WEATHER_API_KEY";
pub const ENV_HOTPEPPER_API_KEY: &str = "HOTPEPPER_API_KEY";

fn default_weather_url() -> String {
    OPENWEATHERMAP_URL.to_string()
}
fn default_venue_url() -> String {
    HOTPEPPER_URL.to_string()
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_timeout_secs() -> u64 {
    10
}

/// Non-secret settings. Every field has a default, so an absent or partial
/// `app.toml` is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub default_location: Coordinates,
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    #[serde(default = "default_venue_url")]
    pub venue_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// JSON Lines request log; tracing-only when unset.
    #[serde(default)]
    pub request_log_path: Option<PathBuf>,
    /// Replaces the embedded `candidates.toml` when set.
    #[serde(default)]
    pub candidates_path: Option<PathBuf>,
    #[serde(default)]
    pub rules: RuleOptions,
    /// Never read from the file; filled from the secret store / env.
    #[serde(skip)]
    pub secrets: Secrets,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_location: Coordinates::default(),
            weather_url: default_weather_url(),
            venue_url: default_venue_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            request_log_path: None,
            candidates_path: None,
            rules: RuleOptions::default(),
            secrets: Secrets::default(),
        }
    }
}

/// Provider credentials. Either may be missing; the affected provider then
/// fails per call and the pipeline degrades instead of refusing to start.
#[derive(Clone, Default)]
pub struct Secrets {
    pub weather_api_key: Option<String>,
    pub venue_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only presence + length, never the value.
        f.debug_struct("Secrets")
            .field("weather_api_key_len", &self.weather_api_key.as_ref().map(String::len))
            .field("venue_api_key_len", &self.venue_api_key.as_ref().map(String::len))
            .finish()
    }
}

impl Secrets {
    /// Resolve both keys through `lookup` (secret store, env, ...). Blank
    /// values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            weather_api_key: get(ENV_WEATHER_API_KEY),
            venue_api_key: get(ENV_HOTPEPPER_API_KEY),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load using env var + fallbacks:
    /// 1) $OTENKI_CONFIG_PATH (must exist)
    /// 2) config/app.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            return Self::load_from_file(PathBuf::from(p));
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(&p);
        }
        Ok(Self::default())
    }

    pub fn with_secrets(mut self, secrets: Secrets) -> Self {
        self.secrets = secrets;
        self
    }

    fn sanitized(mut self) -> Self {
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        let Coordinates { lat, lon } = self.default_location;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            self.default_location = Coordinates::default();
        }
        self
    }
}
