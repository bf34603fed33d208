//! # Location
//! Inbound coordinate handling. Both `lat` and `lon` arrive as decimal-degree
//! strings; if either one is missing (or blank) the pair falls back to the
//! reference point near Shinjuku station.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_LAT: f64 = 35.690921;
pub const DEFAULT_LON: f64 = 139.700258;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Default for Coordinates {
    fn default() -> Self {
        Self {
            lat: DEFAULT_LAT,
            lon: DEFAULT_LON,
        }
    }
}

impl Coordinates {
    /// Resolve the optional query pair. Missing input never fails; malformed
    /// input does (it surfaces as a 500 at the HTTP boundary).
    pub fn resolve(lat: Option<&str>, lon: Option<&str>, fallback: Coordinates) -> Result<Self> {
        let lat = lat.map(str::trim).filter(|s| !s.is_empty());
        let lon = lon.map(str::trim).filter(|s| !s.is_empty());

        let (Some(lat), Some(lon)) = (lat, lon) else {
            return Ok(fallback);
        };

        let lat: f64 = lat
            .parse()
            .with_context(|| format!("lat is not a number: {lat:?}"))?;
        let lon: f64 = lon
            .parse()
            .with_context(|| format!("lon is not a number: {lon:?}"))?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(anyhow!("lat out of range: {lat}"));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(anyhow!("lon out of range: {lon}"));
        }
        Ok(Self { lat, lon })
    }
}

/// `lat,lon` as stored in the request log.
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}
