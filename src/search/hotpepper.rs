// src/search/hotpepper.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{Ordering, SearchRequest, Venue, VenueProvider};

pub const HOTPEPPER_URL: &str = "https://webservice.recruit.co.jp/hotpepper/gourmet/v1/";

/// HotPepper Gourmet search (`gourmet/v1`, JSON format).
pub struct HotPepperProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HotPepperProvider {
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
            .context("building venue http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

/// HotPepper's numeric `order` parameter.
fn order_code(o: Ordering) -> u8 {
    match o {
        Ordering::Recommended => 4,
    }
}

/// Venues live under `results.shop`. A missing wrapper or field means no
/// venues; an `results.error` block is a provider error.
pub fn parse_hotpepper(body: &str) -> Result<Vec<Venue>> {
    let v: Value = serde_json::from_str(body).context("decoding venue payload")?;
    let Some(results) = v.get("results") else {
        return Ok(Vec::new());
    };
    if let Some(err) = results.get("error") {
        let msg = err
            .get(0)
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        bail!("hotpepper error: {msg}");
    }
    match results.get("shop") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(shops)) => Ok(shops.clone()),
        Some(other) => Err(anyhow!("results.shop is not an array: {other}")),
    }
}

#[async_trait]
impl VenueProvider for HotPepperProvider {
    async fn search(&self, req: &SearchRequest) -> Result<Vec<Venue>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("HOTPEPPER_API_KEY is not configured"))?;

        let body = self
            .http
            .get(&self.base_url)
            .query(&[
                ("key", key.to_string()),
                ("lat", req.at.lat.to_string()),
                ("lng", req.at.lon.to_string()),
                ("keyword", req.keyword.clone()),
                ("range", req.tier.as_u8().to_string()),
                ("order", order_code(req.ordering).to_string()),
                ("count", req.count.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await
            .context("venue request")?
            .error_for_status()
            .context("venue non-2xx")?
            .text()
            .await
            .context("reading venue body")?;

        parse_hotpepper(&body)
    }

    fn name(&self) -> &'static str {
        "hotpepper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shops_are_passed_through() {
        let body = r#"{"results":{"results_available":2,"shop":[{"id":"J1","name":"A"},{"id":"J2","name":"B","genre":{"name":"居酒屋"}}]}}"#;
        let shops = parse_hotpepper(body).unwrap();
        assert_eq!(shops.len(), 2);
        assert_eq!(shops[1]["genre"]["name"], "居酒屋");
    }

    #[test]
    fn missing_wrapper_or_field_is_empty() {
        assert!(parse_hotpepper("{}").unwrap().is_empty());
        assert!(parse_hotpepper(r#"{"results":{}}"#).unwrap().is_empty());
        assert!(parse_hotpepper(r#"{"results":{"shop":null}}"#).unwrap().is_empty());
    }

    #[test]
    fn error_block_and_garbage_are_errors() {
        let err = r#"{"results":{"error":[{"code":2000,"message":"APIキーまたはIPアドレスの認証エラーです"}]}}"#;
        assert!(parse_hotpepper(err).is_err());
        assert!(parse_hotpepper(r#"{"results":{"shop":"nope"}}"#).is_err());
        assert!(parse_hotpepper("<html>").is_err());
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let p = HotPepperProvider::new(
            HOTPEPPER_URL,
            Some("   ".into()),
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        let req = SearchRequest::new(
            crate::location::Coordinates::default(),
            "ラーメン",
            crate::decision::RadiusTier::Standard,
        );
        assert!(p.search(&req).await.is_err());
    }
}
