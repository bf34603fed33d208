//! # Candidate catalog
//! Static recommendation data: an ordered mapping from rule tag to the list
//! of `(keyword, message)` candidates that rule recommends, plus the single
//! built-in default candidate.
//!
//! The shipped catalog lives in `config/candidates.toml` and is compiled into
//! the binary; a file path in the app config can replace it at startup.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const EMBEDDED_CATALOG: &str = include_str!("../config/candidates.toml");

/// Rule tags in priority order (derive(Ord) follows declaration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTag {
    BadWeather,
    ExtremeHot,
    ExtremeCold,
    HighHumidity,
    EveningUnwind,
    MondayMorale,
    Lunch,
    AfternoonSnack,
    Dinner,
    Morning,
    FallbackDefault,
}

impl RuleTag {
    pub const ALL: [RuleTag; 11] = [
        RuleTag::BadWeather,
        RuleTag::ExtremeHot,
        RuleTag::ExtremeCold,
        RuleTag::HighHumidity,
        RuleTag::EveningUnwind,
        RuleTag::MondayMorale,
        RuleTag::Lunch,
        RuleTag::AfternoonSnack,
        RuleTag::Dinner,
        RuleTag::Morning,
        RuleTag::FallbackDefault,
    ];

    /// Key used in `candidates.toml` and as a metrics label.
    pub fn key(self) -> &'static str {
        match self {
            RuleTag::BadWeather => "bad_weather",
            RuleTag::ExtremeHot => "extreme_hot",
            RuleTag::ExtremeCold => "extreme_cold",
            RuleTag::HighHumidity => "high_humidity",
            RuleTag::EveningUnwind => "evening_unwind",
            RuleTag::MondayMorale => "monday_morale",
            RuleTag::Lunch => "lunch",
            RuleTag::AfternoonSnack => "afternoon_snack",
            RuleTag::Dinner => "dinner",
            RuleTag::Morning => "morning",
            RuleTag::FallbackDefault => "fallback_default",
        }
    }

    /// Short human-readable tag that starts the reason trail.
    pub fn reason(self) -> &'static str {
        match self {
            RuleTag::BadWeather => "bad weather",
            RuleTag::ExtremeHot => "extreme hot",
            RuleTag::ExtremeCold => "extreme cold",
            RuleTag::HighHumidity => "high humidity",
            RuleTag::EveningUnwind => "temporal: evening unwind",
            RuleTag::MondayMorale => "temporal: monday morale",
            RuleTag::Lunch => "temporal: lunch",
            RuleTag::AfternoonSnack => "temporal: afternoon snack",
            RuleTag::Dinner => "temporal: dinner",
            RuleTag::Morning => "temporal: morning",
            RuleTag::FallbackDefault => "fallback default",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub keyword: String,
    pub message: String,
}

impl Candidate {
    pub fn new(keyword: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            message: message.into(),
        }
    }
}

pub type CandidateList = Vec<Candidate>;

#[derive(Debug, Clone)]
pub struct Catalog {
    lists: BTreeMap<RuleTag, CandidateList>,
    default: Candidate,
}

#[derive(Deserialize)]
struct RawCatalog {
    default: Candidate,
    #[serde(default)]
    lists: BTreeMap<String, CandidateList>,
}

impl Catalog {
    /// Catalog compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(EMBEDDED_CATALOG).context("parsing embedded candidates.toml")
    }

    /// Load from `path` when given, otherwise the embedded catalog.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let s = fs::read_to_string(p)
                    .with_context(|| format!("reading candidates from {}", p.display()))?;
                Self::from_toml_str(&s)
                    .with_context(|| format!("parsing candidates from {}", p.display()))
            }
            None => Self::embedded(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: RawCatalog = toml::from_str(s)?;
        validate(&raw.default).context("default candidate")?;

        let mut lists = BTreeMap::new();
        for (key, list) in raw.lists {
            let tag = RuleTag::from_key(&key).ok_or_else(|| anyhow!("unknown rule tag: {key}"))?;
            if tag == RuleTag::FallbackDefault {
                bail!("`fallback_default` is configured via [default], not [lists]");
            }
            for c in &list {
                validate(c).with_context(|| format!("list `{key}`"))?;
            }
            lists.insert(tag, list);
        }

        Ok(Self {
            lists,
            default: raw.default,
        })
    }

    /// Empty catalog with only a default candidate (tests).
    pub fn with_default(default: Candidate) -> Self {
        Self {
            lists: BTreeMap::new(),
            default,
        }
    }

    /// Replace one list (builder style).
    pub fn with_list(mut self, tag: RuleTag, list: CandidateList) -> Self {
        self.lists.insert(tag, list);
        self
    }

    /// Candidates for `tag`; empty when the catalog has none.
    pub fn list(&self, tag: RuleTag) -> &[Candidate] {
        self.lists.get(&tag).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn default_candidate(&self) -> &Candidate {
        &self.default
    }

    /// Tags in priority order with their list sizes.
    pub fn summary(&self) -> Vec<(RuleTag, usize)> {
        self.lists.iter().map(|(t, l)| (*t, l.len())).collect()
    }
}

fn validate(c: &Candidate) -> Result<()> {
    if c.keyword.trim().is_empty() {
        bail!("candidate keyword must not be empty");
    }
    Ok(())
}
