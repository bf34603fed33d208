//! # Rule priority engine
//! Pure mapping from `(WeatherContext, TemporalContext)` to one candidate list.
//!
//! The cascade is a static table of `(tag, radius, predicate)` rows scanned
//! top-down; the first predicate that holds wins and nothing below it is
//! consulted. Weather rows come before time-of-day rows, so adverse or
//! extreme conditions always override the hour.
//!
//! Two rows are optional extensions and can be switched off in config:
//! the humidity rule and the weekday (Friday / Monday) rules.

use serde::{Deserialize, Serialize};

use crate::catalog::{Candidate, Catalog, RuleTag};
use crate::decision::RadiusTier;
use crate::temporal::TemporalContext;
use crate::weather::WeatherContext;

pub const HOT_THRESHOLD_C: f64 = 30.0;
pub const COLD_THRESHOLD_C: f64 = 5.0;
pub const HUMID_THRESHOLD_PCT: u8 = 80;
pub const HUMID_MIN_TEMP_C: f64 = 25.0;

fn default_true() -> bool {
    true
}

/// Switches for the optional cascade rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOptions {
    #[serde(default = "default_true")]
    pub humidity_rule: bool,
    #[serde(default = "default_true")]
    pub weekday_rules: bool,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            humidity_rule: true,
            weekday_rules: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extension {
    Humidity,
    Weekday,
}

struct Rule {
    tag: RuleTag,
    radius: RadiusTier,
    extension: Option<Extension>,
    applies: fn(&WeatherContext, &TemporalContext) -> bool,
}

const CASCADE: &[Rule] = &[
    Rule {
        tag: RuleTag::BadWeather,
        radius: RadiusTier::Narrow,
        extension: None,
        applies: |w, _| w.condition.is_adverse(),
    },
    Rule {
        tag: RuleTag::ExtremeHot,
        radius: RadiusTier::Narrowest,
        extension: None,
        applies: |w, _| w.temperature_c >= HOT_THRESHOLD_C,
    },
    Rule {
        tag: RuleTag::ExtremeCold,
        radius: RadiusTier::Narrow,
        extension: None,
        applies: |w, _| w.temperature_c <= COLD_THRESHOLD_C,
    },
    Rule {
        tag: RuleTag::HighHumidity,
        radius: RadiusTier::Standard,
        extension: Some(Extension::Humidity),
        applies: |w, _| {
            w.humidity_pct
                .is_some_and(|h| h >= HUMID_THRESHOLD_PCT && w.temperature_c >= HUMID_MIN_TEMP_C)
        },
    },
    Rule {
        tag: RuleTag::EveningUnwind,
        radius: RadiusTier::Standard,
        extension: Some(Extension::Weekday),
        applies: |_, t| t.weekday == TemporalContext::FRIDAY && t.hour >= 18,
    },
    Rule {
        tag: RuleTag::MondayMorale,
        radius: RadiusTier::Standard,
        extension: Some(Extension::Weekday),
        applies: |_, t| t.weekday == TemporalContext::MONDAY && (11..=14).contains(&t.hour),
    },
    Rule {
        tag: RuleTag::Lunch,
        radius: RadiusTier::Standard,
        extension: None,
        applies: |_, t| (11..=13).contains(&t.hour),
    },
    Rule {
        tag: RuleTag::AfternoonSnack,
        radius: RadiusTier::Standard,
        extension: None,
        applies: |_, t| (14..=16).contains(&t.hour),
    },
    Rule {
        tag: RuleTag::Dinner,
        radius: RadiusTier::Standard,
        extension: None,
        applies: |_, t| t.hour >= 17 || t.hour <= 4,
    },
    Rule {
        tag: RuleTag::Morning,
        radius: RadiusTier::Standard,
        extension: None,
        applies: |_, _| true,
    },
];

/// What the cascade picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome<'a> {
    pub tag: RuleTag,
    pub candidates: &'a [Candidate],
    pub radius: RadiusTier,
}

impl RuleOutcome<'_> {
    pub fn reason(&self) -> &'static str {
        self.tag.reason()
    }
}

#[derive(Debug, Clone)]
pub struct RulePriorityEngine {
    catalog: Catalog,
    options: RuleOptions,
}

impl RulePriorityEngine {
    pub fn new(catalog: Catalog, options: RuleOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> RuleOptions {
        self.options
    }

    fn enabled(&self, ext: Option<Extension>) -> bool {
        match ext {
            None => true,
            Some(Extension::Humidity) => self.options.humidity_rule,
            Some(Extension::Weekday) => self.options.weekday_rules,
        }
    }

    /// First matching rule wins. If that rule has no candidates configured,
    /// the single default candidate is returned under `fallback default`.
    pub fn evaluate(&self, weather: &WeatherContext, temporal: &TemporalContext) -> RuleOutcome<'_> {
        let hit = CASCADE
            .iter()
            .filter(|r| self.enabled(r.extension))
            .find(|r| (r.applies)(weather, temporal));

        if let Some(rule) = hit {
            let list = self.catalog.list(rule.tag);
            if !list.is_empty() {
                return RuleOutcome {
                    tag: rule.tag,
                    candidates: list,
                    radius: rule.radius,
                };
            }
        }

        self.fallback_default()
    }

    pub fn fallback_default(&self) -> RuleOutcome<'_> {
        RuleOutcome {
            tag: RuleTag::FallbackDefault,
            candidates: std::slice::from_ref(self.catalog.default_candidate()),
            radius: RadiusTier::Standard,
        }
    }
}
