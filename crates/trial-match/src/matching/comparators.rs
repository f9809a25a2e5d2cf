//! Pure criterion comparators. Each function scores one criterion family
//! between a query value and a candidate requirement and reports a signed
//! contribution plus human-readable reasons.
//!
//! Shared absence policy: an unset requirement contributes nothing
//! (unconstrained), and an unset query value also contributes nothing;
//! missing subject data is uncertainty, never an exclusion.

use std::collections::BTreeSet;

use super::eligibility::{BrainMetastasesRequirement, ExpressionThreshold, ListRequirement};

/// Vocabulary denoting a detected/positive biomarker.
pub(crate) const POSITIVITY_TOKENS: [&str; 6] =
    ["positive", "present", "detected", "rearrangement", "fusion", "+"];

/// Vocabulary denoting an undetected/wild-type biomarker.
pub(crate) const NEGATIVITY_TOKENS: [&str; 4] =
    ["negative", "wild-type", "wild type", "not detected"];

/// Outcome of one criterion comparison: a signed score contribution and the
/// reason it should surface under (at most one of matching/excluding).
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CriterionOutcome {
    pub delta: f64,
    pub matching: Option<String>,
    pub excluding: Option<String>,
    /// Soft-failure annotation (e.g. unparseable expression value).
    pub note: Option<String>,
}

impl CriterionOutcome {
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn matched(delta: f64, reason: impl Into<String>) -> Self {
        Self {
            delta,
            matching: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn excluded(delta: f64, reason: impl Into<String>) -> Self {
        Self {
            delta,
            excluding: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn noted(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::default()
        }
    }
}

/// Range comparator (age, ECOG). A requirement with one open bound is
/// evaluated against the present bound alone.
pub(crate) fn range_criterion(
    label: &str,
    value: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    met_delta: f64,
    violated_delta: f64,
) -> CriterionOutcome {
    if min.is_none() && max.is_none() {
        return CriterionOutcome::unconstrained();
    }
    let Some(value) = value else {
        return CriterionOutcome::unconstrained();
    };

    if let Some(min) = min {
        if value < min {
            return CriterionOutcome::excluded(
                violated_delta,
                format!("{label} {value} below required minimum {min}"),
            );
        }
    }
    if let Some(max) = max {
        if value > max {
            return CriterionOutcome::excluded(
                violated_delta,
                format!("{label} {value} above required maximum {max}"),
            );
        }
    }

    CriterionOutcome::matched(met_delta, format!("{label} {value} within required range"))
}

/// Categorical allow/deny comparator (stage, histology), case-insensitive.
/// Exclusion-list membership dominates; a non-empty allow list is exhaustive.
pub(crate) fn allow_deny_criterion(
    label: &str,
    value: Option<&str>,
    requirement: &ListRequirement,
    allowed_delta: f64,
    excluded_delta: f64,
    missing_delta: f64,
) -> CriterionOutcome {
    if requirement.is_empty() {
        return CriterionOutcome::unconstrained();
    }
    let Some(value) = value else {
        return CriterionOutcome::unconstrained();
    };
    let needle = value.trim().to_lowercase();
    if needle.is_empty() {
        return CriterionOutcome::unconstrained();
    }

    let in_list = |list: &[String]| list.iter().any(|entry| entry.to_lowercase() == needle);

    if in_list(&requirement.excluded) {
        return CriterionOutcome::excluded(excluded_delta, format!("{label} '{value}' is excluded"));
    }
    if in_list(&requirement.allowed) {
        return CriterionOutcome::matched(allowed_delta, format!("{label} '{value}' is allowed"));
    }
    if !requirement.allowed.is_empty() {
        return CriterionOutcome::excluded(
            missing_delta,
            format!("{label} '{value}' not among allowed values"),
        );
    }

    CriterionOutcome::unconstrained()
}

/// What the biomarker comparator detected; scorers map signals to their own
/// configured deltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BiomarkerSignal {
    /// Specific mutation tokens intersect; carries the matched mutations.
    MutationMatch(Vec<String>),
    /// Requirement demands positivity and the subject is positive.
    PositiveMatch,
    /// Subject is positive but the required specific mutation is unconfirmed.
    UnconfirmedMutation,
    /// Requirement accepts wild-type and the subject reports wild-type.
    WildTypeMatch,
    /// Subject reports negative/wild-type against a demanded-positive marker.
    Conflict,
    /// No subject data for this marker.
    NoData,
    /// Data on both sides but nothing lines up either way.
    NoSignal,
}

fn lowered(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn contains_any(set: &BTreeSet<String>, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|token| set.contains(*token))
}

/// Decision ladder for a demanded-positive biomarker; first match wins.
pub(crate) fn required_positive_signal(
    patient_values: Option<&[String]>,
    required_values: &[String],
) -> BiomarkerSignal {
    let Some(patient_values) = patient_values else {
        return BiomarkerSignal::NoData;
    };

    let required = lowered(required_values);
    let patient = lowered(patient_values);
    if patient.is_empty() {
        return BiomarkerSignal::NoData;
    }

    let requirement_positive = contains_any(&required, &POSITIVITY_TOKENS);
    let requirement_negative = contains_any(&required, &NEGATIVITY_TOKENS);
    let patient_positive = contains_any(&patient, &POSITIVITY_TOKENS);
    let patient_negative = contains_any(&patient, &NEGATIVITY_TOKENS);

    if requirement_positive && patient_positive {
        return BiomarkerSignal::PositiveMatch;
    }

    let shared: Vec<String> = required_values
        .iter()
        .filter(|mutation| patient.contains(&mutation.trim().to_lowercase()))
        .map(|mutation| mutation.trim().to_string())
        .collect();
    if !shared.is_empty() {
        return BiomarkerSignal::MutationMatch(shared);
    }

    if patient_positive && !requirement_positive {
        return BiomarkerSignal::UnconfirmedMutation;
    }
    if requirement_negative && patient_negative {
        return BiomarkerSignal::WildTypeMatch;
    }
    if patient_negative && !requirement_negative {
        return BiomarkerSignal::Conflict;
    }

    BiomarkerSignal::NoSignal
}

/// Mirrored rule for a demanded-negative (wild-type) biomarker.
pub(crate) fn required_negative_signal(patient_values: Option<&[String]>) -> BiomarkerSignal {
    let Some(patient_values) = patient_values else {
        return BiomarkerSignal::NoData;
    };
    let patient = lowered(patient_values);
    if patient.is_empty() {
        return BiomarkerSignal::NoData;
    }
    if contains_any(&patient, &NEGATIVITY_TOKENS) {
        return BiomarkerSignal::WildTypeMatch;
    }
    // Any reported mutation or positivity token counts as positive here.
    BiomarkerSignal::Conflict
}

/// Extracts a percentage out of a free-form expression token, tolerating
/// label text ("TPS 50%" -> 50.0). A run followed by '%' wins over digits
/// that are part of a label like "PD-L1"; otherwise the last run is used.
pub(crate) fn parse_percentage(token: &str) -> Option<f64> {
    let mut runs: Vec<(String, bool)> = Vec::new();
    let mut current = String::new();
    let mut seen_dot = false;
    for ch in token.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else if ch == '.' && !current.is_empty() && !seen_dot {
            seen_dot = true;
            current.push(ch);
        } else if !current.is_empty() {
            runs.push((std::mem::take(&mut current), ch == '%'));
            seen_dot = false;
        }
    }
    if !current.is_empty() {
        runs.push((current, false));
    }

    let (digits, _) = runs.iter().find(|(_, percent)| *percent).or(runs.last())?;
    digits.trim_end_matches('.').parse::<f64>().ok()
}

/// Expression-threshold comparator. A token that fails to parse is a soft
/// failure: zero contribution plus a neutral note.
pub(crate) fn expression_criterion(
    marker: &str,
    patient_values: Option<&[String]>,
    threshold: &ExpressionThreshold,
    met_delta: f64,
    violated_delta: f64,
) -> CriterionOutcome {
    if threshold.min.is_none() && threshold.max.is_none() {
        return CriterionOutcome::unconstrained();
    }
    let Some(patient_values) = patient_values else {
        return CriterionOutcome::unconstrained();
    };

    let Some(expression) = patient_values.iter().find_map(|value| parse_percentage(value)) else {
        return CriterionOutcome::noted(format!(
            "{marker} expression could not be read from the reported value"
        ));
    };

    if let Some(min) = threshold.min {
        if expression < min {
            return CriterionOutcome::excluded(
                violated_delta,
                format!("{marker} expression {expression}% below required {min}%"),
            );
        }
    }
    if let Some(max) = threshold.max {
        if expression > max {
            return CriterionOutcome::excluded(
                violated_delta,
                format!("{marker} expression {expression}% above allowed {max}%"),
            );
        }
    }

    CriterionOutcome::matched(
        met_delta,
        format!("{marker} expression {expression}% meets the threshold"),
    )
}

/// Brain-metastases flag comparator.
pub(crate) fn brain_metastases_criterion(
    query: Option<bool>,
    requirement: Option<&BrainMetastasesRequirement>,
    agreement_delta: f64,
    violated_delta: f64,
) -> CriterionOutcome {
    let Some(requirement) = requirement else {
        return CriterionOutcome::unconstrained();
    };
    let Some(present) = query else {
        return CriterionOutcome::unconstrained();
    };

    if present && !requirement.allowed {
        return CriterionOutcome::excluded(violated_delta, "brain metastases are excluded");
    }
    if present {
        let reason = if requirement.controlled_only {
            "brain metastases permitted if controlled"
        } else {
            "brain metastases permitted"
        };
        return CriterionOutcome::matched(agreement_delta, reason);
    }
    CriterionOutcome::matched(agreement_delta, "no brain metastases reported")
}

/// Jaccard similarity |A∩B| / |A∪B|. The empty/empty case is "no
/// information", scored 0 rather than a perfect match, and never divides by
/// zero. Symmetric by construction.
pub(crate) fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Intersection of two sets in sorted order, for overlap reporting.
pub(crate) fn overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Vec<String> {
    a.intersection(b).cloned().collect()
}

/// Ordinal-distance proximity: 1.0 at distance zero, decaying linearly by
/// `step_penalty` per step, floored at 0.
pub(crate) fn ordinal_proximity(a: f64, b: f64, step_penalty: f64) -> f64 {
    (1.0 - (a - b).abs() * step_penalty).max(0.0)
}

/// Interval overlap ratio |∩| / |∪| for two closed ranges. Returns `None`
/// when the union is degenerate (no measurable information).
pub(crate) fn interval_overlap_ratio(a: (f64, f64), b: (f64, f64)) -> Option<f64> {
    let union = a.1.max(b.1) - a.0.min(b.0);
    if union <= 0.0 {
        return None;
    }
    let overlap = a.1.min(b.1) - a.0.max(b.0);
    if overlap < 0.0 {
        return Some(0.0);
    }
    Some(overlap / union)
}
