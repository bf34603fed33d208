//! # Venue search
//! Provider abstraction for the venue-search API plus [`VenueSearchClient`],
//! which turns provider failures into empty results and caps every result
//! set at [`MAX_VENUES`] by unbiased sampling.

pub mod fallback;
pub mod hotpepper;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use metrics::counter;
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::decision::RadiusTier;
use crate::location::Coordinates;

pub use fallback::{FallbackSearchOrchestrator, Resolution, SearchStage};
pub use hotpepper::HotPepperProvider;

/// Opaque provider record, passed through to clients untouched.
pub type Venue = serde_json::Value;

/// Venues returned per search.
pub const MAX_VENUES: usize = 5;
/// Venues requested from the provider per call.
pub const PROVIDER_COUNT_CAP: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordering {
    Recommended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub at: Coordinates,
    pub keyword: String,
    pub tier: RadiusTier,
    pub ordering: Ordering,
    pub count: u32,
}

impl SearchRequest {
    pub fn new(at: Coordinates, keyword: impl Into<String>, tier: RadiusTier) -> Self {
        Self {
            at,
            keyword: keyword.into(),
            tier,
            ordering: Ordering::Recommended,
            count: PROVIDER_COUNT_CAP,
        }
    }
}

#[async_trait]
pub trait VenueProvider: Send + Sync {
    async fn search(&self, req: &SearchRequest) -> Result<Vec<Venue>>;
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct VenueSearchClient {
    provider: Arc<dyn VenueProvider>,
}

impl VenueSearchClient {
    pub fn new(provider: Arc<dyn VenueProvider>) -> Self {
        Self { provider }
    }

    /// One provider round trip. Errors are logged and reported as "no venues"
    /// so the fallback cascade can keep going.
    pub async fn search(&self, at: Coordinates, keyword: &str, tier: RadiusTier) -> Vec<Venue> {
        let req = SearchRequest::new(at, keyword, tier);
        match self.provider.search(&req).await {
            Ok(venues) => {
                debug!(
                    target: "search",
                    provider = self.provider.name(),
                    %keyword,
                    %tier,
                    found = venues.len(),
                    "venue search"
                );
                cap_sample(venues, MAX_VENUES, &mut rand::rng())
            }
            Err(e) => {
                warn!(
                    target: "search",
                    provider = self.provider.name(),
                    %keyword,
                    %tier,
                    error = ?e,
                    "venue search failed; treating as empty"
                );
                counter!("provider_errors_total", "provider" => self.provider.name()).increment(1);
                Vec::new()
            }
        }
    }
}

/// At most `cap` venues: all of them when there are fewer, otherwise a
/// uniform sample of exactly `cap` distinct entries.
pub fn cap_sample<R: Rng + ?Sized>(venues: Vec<Venue>, cap: usize, rng: &mut R) -> Vec<Venue> {
    if venues.len() <= cap {
        return venues;
    }
    let picked = rand::seq::index::sample(rng, venues.len(), cap);
    let mut slots: Vec<Option<Venue>> = venues.into_iter().map(Some).collect();
    picked
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect()
}

// ------------------------------------------------------------
// Scripted provider for tests/local runs
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Scripted {
    Venues(Vec<Venue>),
    Fail(String),
}

/// Replays queued answers in order (empty once the script runs out) and
/// records every request it receives.
#[derive(Default)]
pub struct ScriptedVenues {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<SearchRequest>>,
}

impl ScriptedVenues {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `n` dummy venues with distinct ids.
    pub fn venues(n: usize) -> Vec<Venue> {
        (0..n)
            .map(|i| serde_json::json!({ "id": format!("J{i:06}"), "name": format!("shop {i}") }))
            .collect()
    }

    pub fn calls(&self) -> Vec<SearchRequest> {
        match self.calls.lock() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }
}

#[async_trait]
impl VenueProvider for ScriptedVenues {
    async fn search(&self, req: &SearchRequest) -> Result<Vec<Venue>> {
        let next = {
            let mut calls = self.calls.lock().map_err(|_| anyhow!("calls mutex poisoned"))?;
            calls.push(req.clone());
            let mut script = self.script.lock().map_err(|_| anyhow!("script mutex poisoned"))?;
            script.pop_front()
        };
        match next {
            Some(Scripted::Venues(v)) => Ok(v),
            Some(Scripted::Fail(msg)) => Err(anyhow!(msg)),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
