use super::config::MatchConfig;
use super::EligibilityAssessment;
use crate::matching::comparators::{
    allow_deny_criterion, brain_metastases_criterion, expression_criterion, range_criterion,
    required_negative_signal, required_positive_signal, BiomarkerSignal, CriterionOutcome,
};
use crate::matching::domain::{MatchTier, PatientProfile};
use crate::matching::eligibility::StructuredEligibility;
use crate::matching::rank::round3;

/// Marker the expression threshold applies to when extraction did not name one.
const DEFAULT_EXPRESSION_MARKER: &str = "PD-L1";

/// Running state of the eligibility fold.
#[derive(Default)]
struct Fold {
    accumulator: f64,
    matching: Vec<String>,
    excluding: Vec<String>,
    notes: Vec<String>,
}

impl Fold {
    fn apply(&mut self, outcome: CriterionOutcome) {
        self.accumulator += outcome.delta;
        if let Some(reason) = outcome.matching {
            self.matching.push(reason);
        }
        if let Some(reason) = outcome.excluding {
            self.excluding.push(reason);
        }
        if let Some(note) = outcome.note {
            self.notes.push(note);
        }
    }
}

/// Scores one patient against one trial's structured criteria.
///
/// A single deterministic pass in fixed order: age, ECOG, disease stage,
/// histology, required-positive biomarkers (map iteration order),
/// required-negative biomarkers, expression threshold, brain metastases,
/// prior treatments. Comparators fail soft on malformed input, so the pass
/// always completes.
pub(crate) fn assess(
    profile: &PatientProfile,
    eligibility: &StructuredEligibility,
    config: &MatchConfig,
) -> EligibilityAssessment {
    let eligibility = eligibility.clone().normalized();
    let deltas = &config.trial_deltas;
    let mut fold = Fold::default();

    fold.apply(range_criterion(
        "age",
        profile.age.map(f64::from),
        eligibility.age.min.map(f64::from),
        eligibility.age.max.map(f64::from),
        deltas.range_met,
        deltas.range_violated,
    ));

    fold.apply(range_criterion(
        "ECOG",
        profile.ecog_status.map(f64::from),
        eligibility.ecog.min.map(f64::from),
        eligibility.ecog.max.map(f64::from),
        deltas.range_met,
        deltas.range_violated,
    ));

    fold.apply(allow_deny_criterion(
        "disease stage",
        profile.stage.as_deref(),
        &eligibility.disease_stage,
        deltas.list_allowed,
        deltas.list_excluded,
        deltas.list_not_allowed,
    ));

    fold.apply(allow_deny_criterion(
        "histology",
        profile.histology.as_deref(),
        &eligibility.histology,
        deltas.list_allowed,
        deltas.list_excluded,
        deltas.list_not_allowed,
    ));

    for (marker, mutations) in &eligibility.biomarkers.required_positive {
        let patient_values = profile.biomarkers.get(marker).map(Vec::as_slice);
        let outcome = match required_positive_signal(patient_values, mutations) {
            BiomarkerSignal::MutationMatch(shared) => CriterionOutcome::matched(
                deltas.biomarker_mutation,
                format!("{marker} mutation match ({})", shared.join(", ")),
            ),
            BiomarkerSignal::PositiveMatch => CriterionOutcome::matched(
                deltas.biomarker_positive,
                format!("{marker} positive match"),
            ),
            BiomarkerSignal::UnconfirmedMutation => CriterionOutcome::matched(
                deltas.biomarker_unconfirmed,
                format!("{marker} positive (specific mutation to be confirmed)"),
            ),
            BiomarkerSignal::WildTypeMatch => CriterionOutcome::matched(
                deltas.biomarker_wild_type,
                format!("{marker} wild-type match"),
            ),
            BiomarkerSignal::Conflict => CriterionOutcome::excluded(
                deltas.biomarker_conflict,
                format!("{marker} required positive but subject reports negative"),
            ),
            BiomarkerSignal::NoData | BiomarkerSignal::NoSignal => {
                CriterionOutcome::unconstrained()
            }
        };
        fold.apply(outcome);
    }

    for marker in &eligibility.biomarkers.required_negative {
        let patient_values = profile.biomarkers.get(marker).map(Vec::as_slice);
        let outcome = match required_negative_signal(patient_values) {
            BiomarkerSignal::WildTypeMatch => CriterionOutcome::matched(
                deltas.negative_marker_met,
                format!("{marker} negative as required"),
            ),
            BiomarkerSignal::Conflict => CriterionOutcome::excluded(
                deltas.negative_marker_violated,
                format!("{marker} must be negative/wild-type but subject reports it"),
            ),
            _ => CriterionOutcome::unconstrained(),
        };
        fold.apply(outcome);
    }

    if let Some(threshold) = &eligibility.biomarkers.expression_threshold {
        let marker = eligibility
            .biomarkers
            .expression_marker
            .as_deref()
            .unwrap_or(DEFAULT_EXPRESSION_MARKER);
        let patient_values = profile.biomarkers.get(marker).map(Vec::as_slice);
        fold.apply(expression_criterion(
            marker,
            patient_values,
            threshold,
            deltas.expression_met,
            deltas.expression_violated,
        ));
    }

    fold.apply(brain_metastases_criterion(
        profile.brain_metastases,
        eligibility.brain_metastases.as_ref(),
        deltas.flag_agreement,
        deltas.flag_violated,
    ));

    apply_prior_treatments(&mut fold, profile, &eligibility, config);

    let score = round3((fold.accumulator + config.score_shift).clamp(0.0, 1.0));
    let tier = derive_tier(score, &fold.excluding, config);
    let confidence = round3(((score - config.score_shift).abs() * 2.0).clamp(0.0, 1.0));
    let explanation = build_explanation(&fold.matching, &fold.excluding);

    EligibilityAssessment {
        score,
        tier,
        confidence,
        matching_criteria: fold.matching,
        excluding_criteria: fold.excluding,
        notes: fold.notes,
        explanation,
    }
}

fn apply_prior_treatments(
    fold: &mut Fold,
    profile: &PatientProfile,
    eligibility: &StructuredEligibility,
    config: &MatchConfig,
) {
    let requirement = &eligibility.prior_treatments;
    if requirement.is_empty() {
        return;
    }
    let deltas = &config.trial_deltas;
    let history = &profile.prior_treatments;

    if !requirement.required.is_empty() && !history.is_empty() {
        let missing: Vec<&String> = requirement
            .required
            .iter()
            .filter(|required| !history_mentions(history, required))
            .collect();
        if missing.is_empty() {
            fold.apply(CriterionOutcome::matched(
                deltas.history_required_met,
                "required prior therapy received",
            ));
        } else {
            fold.apply(CriterionOutcome::excluded(
                deltas.history_required_missing,
                format!("required prior therapy not received ({})", missing[0]),
            ));
        }
    }

    if !requirement.excluded.is_empty() && !history.is_empty() {
        let hit = requirement
            .excluded
            .iter()
            .find(|excluded| history_mentions(history, excluded));
        match hit {
            Some(excluded) => fold.apply(CriterionOutcome::excluded(
                deltas.history_excluded_hit,
                format!("prior {excluded} therapy is excluded"),
            )),
            None => fold.apply(CriterionOutcome::matched(
                deltas.history_excluded_clear,
                "no excluded prior therapies",
            )),
        }
    }

    // Line counts are only checkable against a reported history; an empty
    // list cannot distinguish "untreated" from "not recorded".
    if !history.is_empty() {
        let lines = history.len() as u32;
        if let Some(max_lines) = requirement.max_lines {
            if lines > max_lines {
                fold.apply(CriterionOutcome::excluded(
                    deltas.history_lines_violated,
                    format!("{lines} prior lines exceed the maximum of {max_lines}"),
                ));
            } else {
                fold.apply(CriterionOutcome::matched(
                    deltas.history_lines_met,
                    format!("prior therapy lines within the maximum of {max_lines}"),
                ));
            }
        }
        if let Some(min_lines) = requirement.min_lines {
            if lines < min_lines {
                fold.apply(CriterionOutcome::excluded(
                    deltas.history_lines_violated,
                    format!("{lines} prior lines below the minimum of {min_lines}"),
                ));
            } else {
                fold.apply(CriterionOutcome::matched(
                    deltas.history_lines_met,
                    format!("prior therapy lines meet the minimum of {min_lines}"),
                ));
            }
        }
    }

    if requirement.treatment_naive_required {
        if history.is_empty() {
            fold.apply(CriterionOutcome::matched(
                deltas.naive_met,
                "treatment-naive as required",
            ));
        } else {
            fold.apply(CriterionOutcome::excluded(
                deltas.naive_violated,
                "prior therapy received but the trial requires treatment-naive subjects",
            ));
        }
    }
}

fn history_mentions(history: &[String], treatment: &str) -> bool {
    let needle = treatment.to_lowercase();
    history.iter().any(|received| {
        let received = received.to_lowercase();
        received.contains(&needle) || needle.contains(&received)
    })
}

fn derive_tier(score: f64, excluding: &[String], config: &MatchConfig) -> MatchTier {
    if score >= config.eligible_threshold {
        MatchTier::Eligible
    } else if score >= config.uncertain_threshold {
        MatchTier::Uncertain
    } else if score == 0.0 && excluding.is_empty() {
        MatchTier::Uncertain
    } else {
        MatchTier::Ineligible
    }
}

/// Human-readable summary built from the strongest few reasons per bucket.
fn build_explanation(matching: &[String], excluding: &[String]) -> String {
    const PER_BUCKET: usize = 3;
    let mut parts = Vec::new();
    if !matching.is_empty() {
        parts.push(format!(
            "Meets: {}.",
            matching
                .iter()
                .take(PER_BUCKET)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ")
        ));
    }
    if !excluding.is_empty() {
        parts.push(format!(
            "Concerns: {}.",
            excluding
                .iter()
                .take(PER_BUCKET)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ")
        ));
    }
    if parts.is_empty() {
        "No overlapping structured criteria; eligibility is uncertain.".to_string()
    } else {
        parts.join(" ")
    }
}
