//! Uniform random pick from the chosen candidate list.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::catalog::Candidate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub candidate: Candidate,
    /// True when the list was empty and the default candidate was used.
    pub defaulted: bool,
}

#[derive(Debug, Clone)]
pub struct CandidateSelector {
    default: Candidate,
}

impl CandidateSelector {
    pub fn new(default: Candidate) -> Self {
        Self { default }
    }

    /// Each call is independent; no memory across requests.
    pub fn select<R: Rng + ?Sized>(&self, list: &[Candidate], rng: &mut R) -> Selection {
        match list.choose(rng) {
            Some(c) => Selection {
                candidate: c.clone(),
                defaulted: false,
            },
            None => Selection {
                candidate: self.default.clone(),
                defaulted: true,
            },
        }
    }
}
