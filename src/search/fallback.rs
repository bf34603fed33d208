// src/search/fallback.rs
//! Search-with-fallback state machine.
//!
//! Attempts, in order, stopping at the first non-empty result:
//! 1. `Initial`: selected keyword at the rule's base radius.
//! 2. `RangeExpansion`: same keyword at the standard radius; only planned
//!    when the base radius is narrower than standard.
//! 3. `KeywordFallback`: a generic term for the current hour at the widest
//!    radius. Terminal: an empty answer here is returned as zero venues.

use metrics::counter;
use serde::Serialize;
use tracing::info;

use super::{Venue, VenueSearchClient};
use crate::catalog::Candidate;
use crate::decision::{Decision, RadiusTier};
use crate::location::Coordinates;
use crate::temporal::TemporalContext;

pub const EXPANDED_AREA_MESSAGE: &str =
    "近くにぴったりのお店が見つからなかったので、範囲を広げて探しました。";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStage {
    Initial,
    RangeExpansion,
    KeywordFallback,
}

impl SearchStage {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStage::Initial => "initial",
            SearchStage::RangeExpansion => "range_expansion",
            SearchStage::KeywordFallback => "keyword_fallback",
        }
    }
}

/// Ordered `(stage, radius)` attempts for a given base radius. Radii are
/// non-decreasing; range expansion never repeats an equal or narrower radius.
pub fn attempt_plan(base: RadiusTier) -> Vec<(SearchStage, RadiusTier)> {
    let mut plan = vec![(SearchStage::Initial, base)];
    if base < RadiusTier::Standard {
        plan.push((SearchStage::RangeExpansion, RadiusTier::Standard));
    }
    plan.push((SearchStage::KeywordFallback, RadiusTier::Widest.max(base)));
    plan
}

/// Generic keyword for the keyword-fallback stage, by hour of day.
pub fn generic_term(temporal: &TemporalContext) -> &'static str {
    match temporal.hour {
        5..=10 => "モーニング",
        11..=13 => "ランチ",
        14..=16 => "カフェ",
        _ => "ディナー",
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub venues: Vec<Venue>,
    /// Final keyword/message/radius and the full reason trail.
    pub decision: Decision,
    /// Stages actually executed, in order.
    pub stages: Vec<SearchStage>,
}

#[derive(Clone)]
pub struct FallbackSearchOrchestrator {
    client: VenueSearchClient,
}

impl FallbackSearchOrchestrator {
    pub fn new(client: VenueSearchClient) -> Self {
        Self { client }
    }

    pub async fn resolve(
        &self,
        at: Coordinates,
        mut decision: Decision,
        temporal: &TemporalContext,
    ) -> Resolution {
        let mut venues = Vec::new();
        let mut stages = Vec::with_capacity(3);

        for (stage, tier) in attempt_plan(decision.radius) {
            match stage {
                SearchStage::Initial => {}
                SearchStage::RangeExpansion => decision.push_reason("range extended"),
                SearchStage::KeywordFallback => {
                    let term = generic_term(temporal);
                    decision.candidate = Candidate::new(term, EXPANDED_AREA_MESSAGE);
                    decision.push_reason(format!("final fallback: {term}, wide radius"));
                }
            }
            decision.widen_to(tier);
            counter!("venue_search_stage_total", "stage" => stage.as_str()).increment(1);

            venues = self
                .client
                .search(at, &decision.candidate.keyword, decision.radius)
                .await;
            stages.push(stage);

            if !venues.is_empty() {
                break;
            }
        }

        info!(
            target: "search",
            keyword = %decision.candidate.keyword,
            radius = %decision.radius,
            venues = venues.len(),
            stages = ?stages,
            "search resolved"
        );

        Resolution {
            venues,
            decision,
            stages,
        }
    }
}
