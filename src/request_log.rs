//! request_log.rs — append-only record of every recommendation.
//!
//! Writes are fire-and-forget: [`RequestLogger::record`] spawns the store
//! write and returns at once. Store failures are reported on the tracing
//! channel and counted, never returned to the request path.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::decision::Decision;
use crate::location::Coordinates;
use crate::temporal::iso_jst;
use crate::weather::WeatherContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub request_id: Uuid,
    /// ISO-8601 with the +09:00 offset.
    pub timestamp: String,
    /// `lat,lon`
    pub location: String,
    pub weather: String,
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<u8>,
    #[serde(rename = "recommended_keyword")]
    pub keyword: String,
    #[serde(rename = "logic_used")]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub venue_count: usize,
}

impl LogEntry {
    pub fn new(
        request_id: Uuid,
        at: DateTime<Utc>,
        location: Coordinates,
        weather: &WeatherContext,
        decision: &Decision,
        venue_count: usize,
    ) -> Self {
        Self {
            request_id,
            timestamp: iso_jst(at),
            location: location.to_string(),
            weather: weather.condition.to_string(),
            temperature: weather.temperature_c,
            humidity: weather.humidity_pct,
            keyword: decision.candidate.keyword.clone(),
            reasons: decision.reasons.clone(),
            venue_count,
        }
    }
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, entry: &LogEntry) -> Result<()>;
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct RequestLogger {
    store: Arc<dyn LogStore>,
}

impl RequestLogger {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Spawn the write and return immediately. The handle is only useful to
    /// tests; production callers drop it.
    pub fn record(&self, entry: LogEntry) -> JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.append(&entry).await {
                error!(
                    target: "request_log",
                    store = store.name(),
                    request_id = %entry.request_id,
                    error = ?e,
                    "request log write failed"
                );
                counter!("request_log_errors_total").increment(1);
            }
        })
    }
}

// ------------------------------------------------------------
// Stores
// ------------------------------------------------------------

/// One JSON object per line, appended to `path`.
pub struct JsonlLogStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogStore for JsonlLogStore {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry).context("encoding log entry")?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        f.write_all(line.as_bytes()).await.context("appending log entry")?;
        f.flush().await.context("flushing log entry")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

/// Emits each entry as a structured tracing event (no file configured).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogStore;

#[async_trait]
impl LogStore for TracingLogStore {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        info!(
            target: "request_log",
            request_id = %entry.request_id,
            timestamp = %entry.timestamp,
            location = %entry.location,
            weather = %entry.weather,
            temp = entry.temperature,
            keyword = %entry.keyword,
            logic = ?entry.reasons,
            venues = entry.venue_count,
            "recommendation"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogStore {
    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("log mutex poisoned"))?
            .push(entry.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Always fails; exercises the swallow path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingLogStore;

#[async_trait]
impl LogStore for FailingLogStore {
    async fn append(&self, _entry: &LogEntry) -> Result<()> {
        Err(anyhow::anyhow!("log store unavailable"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
