use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::engine::{Recommendation, Recommender};
use crate::metrics::Metrics;
use crate::search::Venue;

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

impl AppState {
    pub fn new(recommender: Recommender) -> Self {
        Self {
            recommender: Arc::new(recommender),
        }
    }
}

/// Router without `/metrics` (tests, or when no recorder is installed).
pub fn router(state: AppState) -> Router {
    create_router(state, None)
}

pub fn create_router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let mut app = Router::new()
        .route("/", get(recommend).options(preflight))
        .route("/recommend", get(recommend).options(preflight))
        .route("/health", get(|| async { "ok" }))
        .with_state(state);

    if let Some(m) = metrics {
        app = app.merge(m.router());
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::OPTIONS, Method::GET])
            .allow_headers([header::CONTENT_TYPE]),
    )
    .layer(middleware::map_response(cors_headers))
}

/// Outermost layer: every response, including errors and preflights, carries
/// the same permissive CORS headers.
async fn cors_headers(mut resp: Response) -> Response {
    let h = resp.headers_mut();
    h.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    h.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    h.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("OPTIONS,GET"),
    );
    resp
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecommendQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl RecommendQuery {
    /// Repeated keys are allowed; the last occurrence wins. Unknown keys are
    /// ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut q = Self::default();
        for (k, v) in pairs {
            match k.as_str() {
                "lat" => q.lat = Some(v),
                "lon" => q.lon = Some(v),
                _ => {}
            }
        }
        q
    }
}

/// Body of a successful recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub weather: String,
    pub temp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<u8>,
    pub message: String,
    pub keyword: String,
    pub shops: Vec<Venue>,
    pub logic: String,
}

impl From<&Recommendation> for RecommendResponse {
    fn from(r: &Recommendation) -> Self {
        Self {
            weather: r.weather.condition.to_string(),
            temp: r.weather.temperature_c,
            humidity: r.weather.humidity_pct,
            message: r.decision.candidate.message.clone(),
            keyword: r.decision.candidate.keyword.clone(),
            shops: r.venues.clone(),
            logic: r.decision.trail(),
        }
    }
}

async fn recommend(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(pairs) = query?;
    let q = RecommendQuery::from_pairs(pairs);
    let rec = state
        .recommender
        .recommend(q.lat.as_deref(), q.lon.as_deref())
        .await?;

    let mut resp = Json(RecommendResponse::from(&rec)).into_response();
    if let Ok(v) = HeaderValue::from_str(&rec.request_id.to_string()) {
        resp.headers_mut().insert("x-request-id", v);
    }
    Ok(resp)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Anything that escapes the pipeline: logged in full, answered generically.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(target: "api", error = ?self.0, "unhandled error while building recommendation");
        let body = ErrorBody {
            error: "internal_error".to_string(),
            message: "Server Error".to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn last_occurrence_wins() {
        let q = RecommendQuery::from_pairs(pairs(&[("lat", "1"), ("lon", "3"), ("lat", "2")]));
        assert_eq!(q.lat.as_deref(), Some("2"));
        assert_eq!(q.lon.as_deref(), Some("3"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let q = RecommendQuery::from_pairs(pairs(&[("callback", "x"), ("lon", "139.7")]));
        assert_eq!(q, RecommendQuery { lat: None, lon: Some("139.7".into()) });
    }
}
