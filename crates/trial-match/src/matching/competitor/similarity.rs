use std::collections::BTreeSet;

use super::CompetitorMatch;
use crate::matching::comparators::{interval_overlap_ratio, jaccard, ordinal_proximity, overlap};
use crate::matching::domain::{ResearcherTrialProfile, TrialRecord};
use crate::matching::engine::MatchConfig;
use crate::matching::rank::round3;

/// Component scores produced before weighting.
struct ComponentScores {
    biomarker: f64,
    stage: f64,
    geographic: f64,
    phase: f64,
    eligibility: f64,
    overlapping_biomarkers: Vec<String>,
    overlapping_stages: Vec<String>,
    overlapping_locations: Vec<String>,
}

/// Scores how closely a candidate trial competes with the researcher's
/// design. Returns `None` when overall similarity does not clear the
/// configured floor.
pub(crate) fn score(
    profile: &ResearcherTrialProfile,
    trial: &TrialRecord,
    config: &MatchConfig,
) -> Option<CompetitorMatch> {
    let components = component_scores(profile, trial, config);
    let weights = &config.similarity;

    let overall = components.biomarker * weights.biomarker
        + components.stage * weights.stage
        + components.geographic * weights.geographic
        + components.phase * weights.phase
        + components.eligibility * weights.eligibility;

    if overall <= config.min_similarity {
        return None;
    }

    Some(CompetitorMatch {
        registry_id: trial.registry_id.clone(),
        title: trial.title.clone(),
        phase: trial.phase.clone(),
        status: trial.status,
        sponsor: trial.sponsor.clone(),
        similarity_score: round3(overall),
        biomarker_overlap: round3(components.biomarker),
        stage_overlap: round3(components.stage),
        geographic_overlap: round3(components.geographic),
        phase_proximity: round3(components.phase),
        eligibility_similarity: round3(components.eligibility),
        overlapping_biomarkers: components.overlapping_biomarkers,
        overlapping_stages: components.overlapping_stages,
        overlapping_locations: components.overlapping_locations,
        sites: trial.sites.iter().take(5).cloned().collect(),
        study_url: trial.study_url.clone(),
        brief_summary: trial.brief_summary.clone(),
    })
}

fn component_scores(
    profile: &ResearcherTrialProfile,
    trial: &TrialRecord,
    config: &MatchConfig,
) -> ComponentScores {
    // Biomarker overlap compares marker names only; mutation-level detail is
    // too sparsely specified on either side to be meaningful here.
    let profile_markers: BTreeSet<String> = profile
        .target_biomarkers
        .keys()
        .map(|k| k.to_uppercase())
        .collect();
    let trial_markers = trial.biomarker_keys();
    let biomarker = jaccard(&profile_markers, &trial_markers);
    let overlapping_biomarkers = overlap(&profile_markers, &trial_markers);

    let profile_stages: BTreeSet<String> = profile
        .target_stages
        .iter()
        .map(|s| s.to_uppercase())
        .collect();
    let trial_stages: BTreeSet<String> = trial
        .structured_eligibility
        .as_ref()
        .map(|eligibility| {
            eligibility
                .disease_stage
                .allowed
                .iter()
                .map(|s| s.to_uppercase())
                .collect()
        })
        .unwrap_or_default();
    let stage = jaccard(&profile_stages, &trial_stages);
    let overlapping_stages = overlap(&profile_stages, &trial_stages);

    let profile_locations: BTreeSet<String> = profile.target_locations.iter().cloned().collect();
    let trial_locations: BTreeSet<String> = trial.site_regions().into_iter().collect();
    let geographic = jaccard(&profile_locations, &trial_locations);
    let overlapping_locations = overlap(&profile_locations, &trial_locations);

    let phase = match (&profile.phase, &trial.phase) {
        (Some(ours), Some(theirs)) => {
            match (config.phase_position(ours), config.phase_position(theirs)) {
                (Some(a), Some(b)) => ordinal_proximity(a, b, config.phase_step_penalty),
                _ => 0.0,
            }
        }
        _ => 0.0,
    };

    let eligibility = eligibility_similarity(profile, trial, config);

    ComponentScores {
        biomarker,
        stage,
        geographic,
        phase,
        eligibility,
        overlapping_biomarkers,
        overlapping_stages,
        overlapping_locations,
    }
}

/// Average of up to three independent sub-signals; sub-signals without data
/// on either side are omitted from the average, not scored as zero.
fn eligibility_similarity(
    profile: &ResearcherTrialProfile,
    trial: &TrialRecord,
    config: &MatchConfig,
) -> f64 {
    let Some(eligibility) = &trial.structured_eligibility else {
        return 0.0;
    };
    let mut signals: Vec<f64> = Vec::new();

    if let Some((profile_min, profile_max)) = profile.age_range {
        let (default_min, default_max) = config.default_trial_age;
        let trial_min = eligibility.age.min.unwrap_or(default_min);
        let trial_max = eligibility.age.max.unwrap_or(default_max);
        if let Some(ratio) = interval_overlap_ratio(
            (f64::from(profile_min), f64::from(profile_max)),
            (f64::from(trial_min), f64::from(trial_max)),
        ) {
            signals.push(ratio);
        }
    }

    if let (Some(profile_ecog), Some(trial_ecog)) = (profile.ecog_max, eligibility.ecog.max) {
        signals.push(ordinal_proximity(
            f64::from(profile_ecog),
            f64::from(trial_ecog),
            config.ecog_step_penalty,
        ));
    }

    if let Some(naive_only) = profile.treatment_naive_only {
        let trial_naive = eligibility.prior_treatments.treatment_naive_required;
        if naive_only == trial_naive {
            signals.push(1.0);
        } else {
            signals.push(config.naive_disagreement_score);
        }
    }

    if signals.is_empty() {
        return 0.0;
    }
    signals.iter().sum::<f64>() / signals.len() as f64
}
