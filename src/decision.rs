//! decision.rs — the per-request recommendation decision.
//!
//! A [`Decision`] starts life in the rule engine (candidate, base radius, first
//! reason) and is then only extended by the search orchestrator: reasons are
//! appended, the radius only grows, and the candidate may be replaced once by
//! the generic keyword fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::Candidate;

/// Search radius band accepted by the venue provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RadiusTier {
    /// ~300 m
    Narrowest = 1,
    /// ~500 m
    Narrow = 2,
    /// ~1000 m
    Standard = 3,
    /// ~2000 m
    Wide = 4,
    /// ~3000 m
    Widest = 5,
}

impl RadiusTier {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn approx_meters(self) -> u32 {
        match self {
            RadiusTier::Narrowest => 300,
            RadiusTier::Narrow => 500,
            RadiusTier::Standard => 1000,
            RadiusTier::Wide => 2000,
            RadiusTier::Widest => 3000,
        }
    }
}

impl From<RadiusTier> for u8 {
    fn from(t: RadiusTier) -> Self {
        t.as_u8()
    }
}

impl TryFrom<u8> for RadiusTier {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(RadiusTier::Narrowest),
            2 => Ok(RadiusTier::Narrow),
            3 => Ok(RadiusTier::Standard),
            4 => Ok(RadiusTier::Wide),
            5 => Ok(RadiusTier::Widest),
            other => Err(format!("radius tier must be 1..=5, got {other}")),
        }
    }
}

impl fmt::Display for RadiusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub candidate: Candidate,
    pub radius: RadiusTier,
    /// Ordered rule/retry tags, oldest first.
    pub reasons: Vec<String>,
}

impl Decision {
    pub fn new(candidate: Candidate, radius: RadiusTier, reason: impl Into<String>) -> Self {
        Self {
            candidate,
            radius,
            reasons: vec![reason.into()],
        }
    }

    pub fn push_reason(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Widen the radius. Never narrows: a smaller tier is ignored.
    pub fn widen_to(&mut self, tier: RadiusTier) {
        self.radius = self.radius.max(tier);
    }

    /// The `logic` string returned to clients.
    pub fn trail(&self) -> String {
        self.reasons.join(" > ")
    }
}
