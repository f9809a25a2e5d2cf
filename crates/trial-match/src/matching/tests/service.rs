use std::sync::Arc;

use super::common::*;
use crate::matching::domain::MatchTier;
use crate::matching::engine::MatchConfig;
use crate::matching::service::{MatchServiceError, MatchingService};

#[test]
fn match_patient_returns_ranked_treatments_and_trials() {
    let service = build_service(vec![egfr_trial(), trial("NCT-RAW", None)]);

    let report = service.match_patient(patient()).expect("match succeeds");

    assert_eq!(report.total_trials, 1);
    assert_eq!(report.skipped_unstructured, 1);
    assert_eq!(report.trials[0].eligibility.tier, MatchTier::Eligible);
    assert_eq!(report.total_treatments, report.treatments.len());
    assert_eq!(report.treatments[0].generic_name, "osimertinib");
}

#[test]
fn match_patient_normalizes_biomarker_keys() {
    let service = build_service(vec![egfr_trial()]);
    let mut profile = patient();
    profile.biomarkers = biomarkers(&[("egfr", &["L858R"])]);

    let report = service.match_patient(profile).expect("match succeeds");

    assert!(report.profile.biomarkers.contains_key("EGFR"));
    assert_eq!(report.trials[0].eligibility.tier, MatchTier::Eligible);
}

#[test]
fn invalid_ecog_is_a_caller_contract_error() {
    let service = build_service(vec![egfr_trial()]);
    let mut profile = patient();
    profile.ecog_status = Some(7);

    let err = service.match_patient(profile).expect_err("contract violation");
    assert!(matches!(err, MatchServiceError::Profile(_)));
}

#[test]
fn oversized_candidate_set_is_rejected() {
    let trials: Vec<_> = (0..6)
        .map(|i| trial(&format!("NCT-{i:04}"), Some(egfr_eligibility())))
        .collect();
    let service = MatchingService::new(
        Arc::new(UnboundedTrialCatalog { trials }),
        Arc::new(MemoryTreatmentCatalog {
            treatments: treatment_fixtures(),
        }),
        MatchConfig::default(),
        crate::config::MatchingLimits { max_candidates: 5 },
    );

    let err = service.match_patient(patient()).expect_err("bound enforced");
    match err {
        MatchServiceError::TooManyCandidates { supplied, limit } => {
            assert_eq!(supplied, 6);
            assert_eq!(limit, 5);
        }
        other => panic!("expected TooManyCandidates, got {other:?}"),
    }
}

#[test]
fn catalog_outage_surfaces_as_catalog_error() {
    let service = MatchingService::new(
        Arc::new(OfflineTrialCatalog),
        Arc::new(MemoryTreatmentCatalog {
            treatments: treatment_fixtures(),
        }),
        MatchConfig::default(),
        limits(),
    );

    let err = service.match_patient(patient()).expect_err("catalog offline");
    assert!(matches!(err, MatchServiceError::Catalog(_)));
}

#[test]
fn trial_as_profile_reflects_structured_criteria() {
    let service = build_service(vec![egfr_trial()]);

    let profile = service
        .trial_as_profile("NCT00000001")
        .expect("profile built");

    assert_eq!(profile.registry_id.as_deref(), Some("NCT00000001"));
    assert!(profile.target_biomarkers.contains_key("EGFR"));
    assert_eq!(profile.age_range, Some((18, 99)));
    assert_eq!(profile.ecog_max, Some(2));
    assert_eq!(profile.treatment_naive_only, Some(false));
    assert_eq!(
        profile.target_locations,
        vec!["Iowa".to_string(), "Massachusetts".to_string()]
    );
}

#[test]
fn unknown_trial_lookup_is_a_not_found_error() {
    let service = build_service(vec![egfr_trial()]);
    let err = service
        .trial_as_profile("NCT99999999")
        .expect_err("unknown id");
    assert!(matches!(err, MatchServiceError::UnknownTrial(_)));
}

#[test]
fn analyze_competitors_excludes_own_trial_via_service() {
    let service = build_service(vec![egfr_trial()]);
    let mut profile = researcher_profile();
    profile.registry_id = Some("NCT00000001".to_string());

    let analysis = service.analyze_competitors(profile).expect("analysis runs");
    assert_eq!(analysis.total_competitors, 0);
    assert_eq!(analysis.insights.avg_similarity_score, 0.0);
}
