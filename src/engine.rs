//! # Recommendation engine
//! One request, end to end, in strict sequence:
//! coordinates → weather + time → rule cascade → random pick →
//! search with fallback → request log (spawned) → [`Recommendation`].
//!
//! Every outside collaborator (weather, venue search, log store, clock) is
//! injected through [`Providers`], so the whole pipeline runs against stubs
//! in tests.

use anyhow::Result;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, RuleTag};
use crate::config::AppConfig;
use crate::decision::Decision;
use crate::location::Coordinates;
use crate::request_log::{JsonlLogStore, LogEntry, LogStore, RequestLogger, TracingLogStore};
use crate::rules::{RuleOptions, RulePriorityEngine};
use crate::search::{
    FallbackSearchOrchestrator, HotPepperProvider, SearchStage, Venue, VenueProvider,
    VenueSearchClient,
};
use crate::selector::CandidateSelector;
use crate::temporal::{Clock, SystemClock, TemporalContext};
use crate::weather::{self, OpenWeatherMapProvider, WeatherContext, WeatherProvider};

/// External collaborators of the pipeline.
#[derive(Clone)]
pub struct Providers {
    pub weather: Arc<dyn WeatherProvider>,
    pub venues: Arc<dyn VenueProvider>,
    pub log_store: Arc<dyn LogStore>,
    pub clock: Arc<dyn Clock>,
}

/// Everything the HTTP layer needs to answer one request.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub request_id: Uuid,
    pub location: Coordinates,
    pub weather: WeatherContext,
    pub temporal: TemporalContext,
    /// Rule that chose the candidate list.
    pub rule: RuleTag,
    /// Final keyword, message, radius and reason trail.
    pub decision: Decision,
    pub venues: Vec<Venue>,
    pub stages: Vec<SearchStage>,
}

pub struct Recommender {
    weather: Arc<dyn WeatherProvider>,
    rules: RulePriorityEngine,
    selector: CandidateSelector,
    search: FallbackSearchOrchestrator,
    logger: RequestLogger,
    clock: Arc<dyn Clock>,
    default_location: Coordinates,
}

impl Recommender {
    pub fn new(
        providers: Providers,
        catalog: Catalog,
        options: RuleOptions,
        default_location: Coordinates,
    ) -> Self {
        let selector = CandidateSelector::new(catalog.default_candidate().clone());
        Self {
            weather: providers.weather,
            rules: RulePriorityEngine::new(catalog, options),
            selector,
            search: FallbackSearchOrchestrator::new(VenueSearchClient::new(providers.venues)),
            logger: RequestLogger::new(providers.log_store),
            clock: providers.clock,
            default_location,
        }
    }

    /// Production wiring: OpenWeatherMap, HotPepper, JSONL (or tracing) log.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let connect = Duration::from_secs(cfg.connect_timeout_secs);
        let timeout = Duration::from_secs(cfg.timeout_secs);

        if cfg.secrets.weather_api_key.is_none() {
            warn!("WEATHER_API_KEY missing; every request will use the fallback weather");
        }
        if cfg.secrets.venue_api_key.is_none() {
            warn!("HOTPEPPER_API_KEY missing; venue searches will come back empty");
        }

        let weather = OpenWeatherMapProvider::new(
            cfg.weather_url.clone(),
            cfg.secrets.weather_api_key.clone(),
            connect,
            timeout,
        )?;
        let venues = HotPepperProvider::new(
            cfg.venue_url.clone(),
            cfg.secrets.venue_api_key.clone(),
            connect,
            timeout,
        )?;
        let log_store: Arc<dyn LogStore> = match &cfg.request_log_path {
            Some(p) => Arc::new(JsonlLogStore::new(p.clone())),
            None => Arc::new(TracingLogStore),
        };
        let catalog = Catalog::load(cfg.candidates_path.as_deref())?;
        info!(
            lists = ?catalog.summary(),
            rules = ?cfg.rules,
            log_store = log_store.name(),
            "recommender configured"
        );

        Ok(Self::new(
            Providers {
                weather: Arc::new(weather),
                venues: Arc::new(venues),
                log_store,
                clock: Arc::new(SystemClock),
            },
            catalog,
            cfg.rules,
            cfg.default_location,
        ))
    }

    pub fn default_location(&self) -> Coordinates {
        self.default_location
    }

    /// Only malformed coordinates (or other unexpected failures) return `Err`;
    /// provider and log-store problems are absorbed along the way. The log
    /// write is left running in the background.
    pub async fn recommend(&self, lat: Option<&str>, lon: Option<&str>) -> Result<Recommendation> {
        let (rec, _log_write) = self.run(lat, lon).await?;
        Ok(rec)
    }

    /// Like [`Recommender::recommend`], but waits for the request-log write
    /// to finish. For short-lived callers whose runtime exits right after.
    pub async fn recommend_and_flush(
        &self,
        lat: Option<&str>,
        lon: Option<&str>,
    ) -> Result<Recommendation> {
        let (rec, log_write) = self.run(lat, lon).await?;
        if let Err(e) = log_write.await {
            warn!(target: "request_log", error = ?e, "request log task did not complete");
        }
        Ok(rec)
    }

    async fn run(
        &self,
        lat: Option<&str>,
        lon: Option<&str>,
    ) -> Result<(Recommendation, JoinHandle<()>)> {
        let started = Instant::now();
        counter!("recommend_requests_total").increment(1);

        let location = Coordinates::resolve(lat, lon, self.default_location)?;
        let weather = weather::observe(self.weather.as_ref(), location).await;
        let now = self.clock.now();
        let temporal = TemporalContext::at(now);

        let outcome = self.rules.evaluate(&weather, &temporal);
        let selection = self.selector.select(outcome.candidates, &mut rand::rng());
        // Unreachable while `evaluate` substitutes the default candidate for
        // empty lists; a selector default is still reported as such.
        let (rule, radius) = if selection.defaulted {
            (RuleTag::FallbackDefault, self.rules.fallback_default().radius)
        } else {
            (outcome.tag, outcome.radius)
        };
        counter!("recommend_rule_total", "tag" => rule.key()).increment(1);

        let decision = Decision::new(selection.candidate, radius, rule.reason());
        info!(
            target: "engine",
            weather = %weather.condition,
            temp = weather.temperature_c,
            hour = temporal.hour,
            weekday = temporal.weekday,
            rule = rule.key(),
            keyword = %decision.candidate.keyword,
            radius = %decision.radius,
            "rule selected"
        );

        let resolution = self.search.resolve(location, decision, &temporal).await;

        let request_id = Uuid::new_v4();
        let log_write = self.logger.record(LogEntry::new(
            request_id,
            now,
            location,
            &weather,
            &resolution.decision,
            resolution.venues.len(),
        ));

        histogram!("recommend_latency_ms").record(started.elapsed().as_secs_f64() * 1_000.0);

        let rec = Recommendation {
            request_id,
            location,
            weather,
            temporal,
            rule,
            decision: resolution.decision,
            venues: resolution.venues,
            stages: resolution.stages,
        };
        Ok((rec, log_write))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Candidate;
    use crate::decision::RadiusTier;
    use crate::request_log::MemoryLogStore;
    use crate::search::{Scripted, ScriptedVenues};
    use crate::temporal::FixedClock;
    use crate::weather::{Condition, FailingWeather, StaticWeather};
    use chrono::{TimeZone, Utc};

    fn recommender(
        weather: Arc<dyn WeatherProvider>,
        venues: Arc<ScriptedVenues>,
        log: Arc<MemoryLogStore>,
    ) -> Recommender {
        // Wednesday 2025-09-03 03:30 UTC = 12:30 JST.
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 9, 3, 3, 30, 0).unwrap());
        Recommender::new(
            Providers {
                weather,
                venues,
                log_store: log,
                clock: Arc::new(clock),
            },
            Catalog::embedded().unwrap(),
            RuleOptions::default(),
            Coordinates::default(),
        )
    }

    async fn wait_for_log(store: &MemoryLogStore) -> Vec<LogEntry> {
        for _ in 0..100 {
            let e = store.entries();
            if !e.is_empty() {
                return e;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.entries()
    }

    #[tokio::test]
    async fn weather_outage_still_recommends() {
        let venues = Arc::new(ScriptedVenues::new([Scripted::Venues(ScriptedVenues::venues(2))]));
        let log = Arc::new(MemoryLogStore::default());
        let r = recommender(Arc::new(FailingWeather), venues.clone(), log.clone());

        let out = r.recommend(None, None).await.unwrap();
        assert_eq!(out.weather, WeatherContext::fallback());
        assert_eq!(out.rule, RuleTag::Lunch);
        assert_eq!(out.venues.len(), 2);
        assert_eq!(venues.calls()[0].at, Coordinates::default());

        let logged = wait_for_log(&log).await;
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].request_id, out.request_id);
        assert_eq!(logged[0].timestamp, "2025-09-03T12:30:00+09:00");
    }

    #[tokio::test]
    async fn bad_coordinates_are_an_error() {
        let r = recommender(
            Arc::new(StaticWeather(WeatherContext::new(Condition::Clear, 22.0, None))),
            Arc::new(ScriptedVenues::default()),
            Arc::new(MemoryLogStore::default()),
        );
        assert!(r.recommend(Some("abc"), Some("139.7")).await.is_err());
    }

    #[tokio::test]
    async fn flush_waits_for_log_write() {
        let log = Arc::new(MemoryLogStore::default());
        let r = recommender(
            Arc::new(StaticWeather(WeatherContext::new(Condition::Snow, -2.0, None))),
            Arc::new(ScriptedVenues::new([Scripted::Venues(ScriptedVenues::venues(1))])),
            log.clone(),
        );

        let out = r.recommend_and_flush(None, None).await.unwrap();
        let logged = log.entries();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].request_id, out.request_id);
        assert_eq!(logged[0].keyword, out.decision.candidate.keyword);
    }

    #[tokio::test]
    async fn empty_catalog_recommends_default_candidate() {
        let catalog = Catalog::with_default(Candidate::new("カフェ", "ちょっと一息つきましょう。"));
        let venues = Arc::new(ScriptedVenues::new([Scripted::Venues(ScriptedVenues::venues(3))]));
        let r = Recommender::new(
            Providers {
                weather: Arc::new(StaticWeather(WeatherContext::new(Condition::Rain, 15.0, None))),
                venues: venues.clone(),
                log_store: Arc::new(MemoryLogStore::default()),
                clock: Arc::new(SystemClock),
            },
            catalog,
            RuleOptions::default(),
            Coordinates::default(),
        );

        let out = r.recommend(None, None).await.unwrap();
        assert_eq!(out.rule, RuleTag::FallbackDefault);
        assert_eq!(out.decision.candidate.keyword, "カフェ");
        assert_eq!(out.decision.radius, RadiusTier::Standard);
        assert_eq!(out.decision.trail(), "fallback default");
        assert_eq!(venues.calls()[0].tier, RadiusTier::Standard);
    }
}
