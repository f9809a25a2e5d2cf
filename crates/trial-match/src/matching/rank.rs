//! Deterministic ordering. All sorts are stable so candidates with identical
//! keys keep the order the catalog produced them in, making repeated runs
//! reproducible.

use std::cmp::Ordering;

use super::competitor::CompetitorMatch;
use super::engine::{TreatmentMatch, TrialMatch};

/// Caller-visible scores are rounded to 3 decimal places.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Eligible before uncertain before ineligible, then score descending.
pub(crate) fn rank_trials(matches: &mut [TrialMatch]) {
    matches.sort_by(|a, b| {
        a.eligibility
            .tier
            .rank()
            .cmp(&b.eligibility.tier.rank())
            .then_with(|| descending(a.eligibility.score, b.eligibility.score))
    });
}

/// Score descending.
pub(crate) fn rank_treatments(matches: &mut [TreatmentMatch]) {
    matches.sort_by(|a, b| descending(a.match_score, b.match_score));
}

/// Overall similarity descending.
pub(crate) fn rank_competitors(matches: &mut [CompetitorMatch]) {
    matches.sort_by(|a, b| descending(a.similarity_score, b.similarity_score));
}
