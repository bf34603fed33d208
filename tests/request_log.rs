// tests/request_log.rs
//
// The request log is a side effect: one entry per request, carrying the final
// keyword and reason trail, and a failing store never changes the answer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use otenki_meshi::catalog::Catalog;
use otenki_meshi::location::Coordinates;
use otenki_meshi::request_log::{FailingLogStore, JsonlLogStore, LogEntry, LogStore, MemoryLogStore};
use otenki_meshi::rules::RuleOptions;
use otenki_meshi::search::{Scripted, ScriptedVenues};
use otenki_meshi::temporal::{jst, FixedClock};
use otenki_meshi::weather::{Condition, StaticWeather, WeatherContext};
use otenki_meshi::{Providers, Recommender};

fn recommender(store: Arc<dyn LogStore>, script: Vec<Scripted>) -> Recommender {
    let now = jst()
        .with_ymd_and_hms(2025, 9, 3, 14, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    Recommender::new(
        Providers {
            weather: Arc::new(StaticWeather(WeatherContext::new(
                Condition::Drizzle,
                16.5,
                Some(92),
            ))),
            venues: Arc::new(ScriptedVenues::new(script)),
            log_store: store,
            clock: Arc::new(FixedClock(now)),
        },
        Catalog::embedded().expect("embedded catalog"),
        RuleOptions::default(),
        Coordinates::default(),
    )
}

async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn one_entry_per_request_with_final_keyword() {
    let store = Arc::new(MemoryLogStore::default());
    let r = recommender(
        store.clone(),
        vec![Scripted::Venues(vec![]), Scripted::Venues(vec![]), Scripted::Venues(vec![])],
    );

    let rec = r
        .recommend(Some("35.6581"), Some("139.7017"))
        .await
        .unwrap();
    wait_until(|| !store.entries().is_empty()).await;

    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.request_id, rec.request_id);
    assert_eq!(e.timestamp, "2025-09-03T14:00:00+09:00");
    assert_eq!(e.location, "35.6581,139.7017");
    assert_eq!(e.weather, "Drizzle");
    assert_eq!(e.humidity, Some(92));
    assert_eq!(e.keyword, "カフェ");
    assert_eq!(e.keyword, rec.decision.candidate.keyword);
    assert_eq!(e.reasons, rec.decision.reasons);
    assert_eq!(e.reasons[0], "bad weather");
    assert_eq!(e.venue_count, 0);
}

#[tokio::test]
async fn failing_store_does_not_affect_response() {
    let r = recommender(
        Arc::new(FailingLogStore),
        vec![Scripted::Venues(ScriptedVenues::venues(2))],
    );
    let rec = r.recommend(None, None).await.expect("still answers");
    assert_eq!(rec.venues.len(), 2);
    assert_eq!(rec.decision.trail(), "bad weather");
}

#[tokio::test]
async fn jsonl_store_collects_successive_requests() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.jsonl");
    let r = recommender(
        Arc::new(JsonlLogStore::new(&path)),
        vec![
            Scripted::Venues(ScriptedVenues::venues(1)),
            Scripted::Venues(ScriptedVenues::venues(1)),
        ],
    );

    let a = r.recommend(None, None).await.unwrap();
    let b = r.recommend(None, None).await.unwrap();

    let read = || -> Vec<LogEntry> {
        std::fs::read_to_string(&path)
            .unwrap_or_default()
            .lines()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    };
    wait_until(|| read().len() == 2).await;

    let mut ids: Vec<_> = read().into_iter().map(|e| e.request_id).collect();
    ids.sort();
    let mut expected = vec![a.request_id, b.request_id];
    expected.sort();
    assert_eq!(ids, expected);
}
