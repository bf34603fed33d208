// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// The router is exercised directly via tower::ServiceExt::oneshot, with stub
// providers injected so no network or credentials are touched.
//
// Covered:
// - GET /health
// - GET /recommend (shape, CORS headers, x-request-id, default coordinates)
// - GET /recommend with repeated keys (last value wins)
// - GET /recommend with malformed coordinates (500 + generic body)
// - OPTIONS /recommend

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use otenki_meshi::catalog::Catalog;
use otenki_meshi::location::Coordinates;
use otenki_meshi::request_log::MemoryLogStore;
use otenki_meshi::rules::RuleOptions;
use otenki_meshi::search::{Scripted, ScriptedVenues};
use otenki_meshi::temporal::{jst, FixedClock};
use otenki_meshi::weather::{Condition, StaticWeather, WeatherContext};
use otenki_meshi::{router, AppState, Providers, Recommender};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Wednesday 12:30 JST, clear and mild; the venue provider answers with
/// `script`.
fn test_router(script: Vec<Scripted>) -> (Router, Arc<ScriptedVenues>) {
    let venues = Arc::new(ScriptedVenues::new(script));
    let now = jst()
        .with_ymd_and_hms(2025, 9, 3, 12, 30, 0)
        .unwrap()
        .with_timezone(&Utc);
    let recommender = Recommender::new(
        Providers {
            weather: Arc::new(StaticWeather(WeatherContext::new(
                Condition::Clear,
                22.0,
                Some(40),
            ))),
            venues: venues.clone(),
            log_store: Arc::new(MemoryLogStore::default()),
            clock: Arc::new(FixedClock(now)),
        },
        Catalog::embedded().expect("embedded catalog"),
        RuleOptions::default(),
        Coordinates::default(),
    );
    (router(AppState::new(recommender)), venues)
}

fn assert_cors(headers: &axum::http::HeaderMap) {
    let get = |k: &str| {
        headers
            .get(k)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    assert_eq!(get("access-control-allow-origin"), "*");
    assert_eq!(get("access-control-allow-headers"), "Content-Type");
    assert_eq!(get("access-control-allow-methods"), "OPTIONS,GET");
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (app, _) = test_router(vec![]);

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    assert_eq!(String::from_utf8_lossy(&bytes).trim(), "ok");
}

#[tokio::test]
async fn api_recommend_returns_contract_fields() {
    let (app, venues) = test_router(vec![Scripted::Venues(ScriptedVenues::venues(8))]);

    let req = Request::builder()
        .method("GET")
        .uri("/recommend?lat=34.7025&lon=135.4959")
        .body(Body::empty())
        .expect("build GET /recommend");

    let resp = app.oneshot(req).await.expect("oneshot /recommend");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_cors(resp.headers());
    assert!(
        resp.headers().get("x-request-id").is_some(),
        "x-request-id header missing"
    );

    let v = read_json(resp).await;
    assert_eq!(v["weather"], "Clear");
    assert_eq!(v["temp"].as_f64(), Some(22.0));
    assert_eq!(v["humidity"], 40);
    assert!(v["keyword"].as_str().is_some_and(|k| !k.is_empty()));
    assert!(v["message"].is_string());
    assert_eq!(v["shops"].as_array().map(Vec::len), Some(5));
    assert_eq!(v["logic"], "temporal: lunch");

    let calls = venues.calls();
    assert_eq!(calls.len(), 1);
    assert!((calls[0].at.lat - 34.7025).abs() < 1e-9);
}

#[tokio::test]
async fn api_recommend_without_coordinates_uses_reference_point() {
    let (app, venues) = test_router(vec![Scripted::Venues(ScriptedVenues::venues(1))]);

    for uri in ["/", "/recommend?lat=35.1", "/recommend?lat=&lon="] {
        let resp = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "GET {uri}");
    }

    for call in venues.calls() {
        assert_eq!(call.at, Coordinates::default());
    }
}

#[tokio::test]
async fn api_repeated_query_keys_take_last_value() {
    let (app, venues) = test_router(vec![Scripted::Venues(ScriptedVenues::venues(2))]);

    let resp = app
        .oneshot(
            Request::get("/recommend?lat=35.6&lat=35.7&lon=139.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_cors(resp.headers());
    let v = read_json(resp).await;
    assert_eq!(v["shops"].as_array().map(Vec::len), Some(2));

    let calls = venues.calls();
    assert_eq!(calls.len(), 1);
    assert!((calls[0].at.lat - 35.7).abs() < 1e-9);
    assert!((calls[0].at.lon - 139.7).abs() < 1e-9);
}

#[tokio::test]
async fn api_malformed_coordinates_yield_generic_500() {
    let (app, venues) = test_router(vec![]);

    let resp = app
        .oneshot(
            Request::get("/recommend?lat=north&lon=139.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(resp.headers());
    let v = read_json(resp).await;
    assert_eq!(v["error"], "internal_error");
    assert_eq!(v["message"], "Server Error");
    assert!(venues.calls().is_empty(), "no provider call on bad input");
}

#[tokio::test]
async fn api_options_is_answered_with_cors_headers() {
    let (app, _) = test_router(vec![]);

    let plain = app
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/recommend")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(plain.status().is_success());
    assert_cors(plain.headers());

    let preflight = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/recommend")
                .header("origin", "https://example.com")
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    assert_cors(preflight.headers());
}
