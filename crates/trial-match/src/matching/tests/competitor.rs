use super::common::*;
use crate::matching::eligibility::StructuredEligibility;

fn competitor_trial(registry_id: &str) -> crate::matching::domain::TrialRecord {
    let mut eligibility = egfr_eligibility();
    eligibility.disease_stage.allowed = vec!["IIIB".to_string(), "IV".to_string()];
    trial(registry_id, Some(eligibility))
}

#[test]
fn overlapping_trial_scores_across_components() {
    let analysis = engine().analyze_competitors(&researcher_profile(), &[competitor_trial("NCT11111111")]);

    assert_eq!(analysis.total_competitors, 1);
    let competitor = &analysis.competitors[0];
    assert!(competitor.similarity_score > 0.1);
    assert!(competitor.biomarker_overlap > 0.9);
    assert!(competitor.stage_overlap > 0.9);
    assert!(competitor.geographic_overlap > 0.9);
    assert_eq!(competitor.phase_proximity, 1.0);
    assert_eq!(competitor.overlapping_biomarkers, vec!["EGFR".to_string()]);
    assert_eq!(
        competitor.overlapping_stages,
        vec!["IIIB".to_string(), "IV".to_string()]
    );
    assert!(competitor
        .overlapping_locations
        .contains(&"Iowa".to_string()));
}

#[test]
fn empty_candidate_set_yields_zeroed_insights() {
    let analysis = engine().analyze_competitors(&researcher_profile(), &[]);

    assert_eq!(analysis.total_competitors, 0);
    assert!(analysis.competitors.is_empty());
    assert_eq!(analysis.insights.total_competing_trials, 0);
    assert_eq!(analysis.insights.avg_similarity_score, 0.0);
    assert!(analysis.insights.top_sponsors.is_empty());
    assert!(analysis.insights.phase_distribution.is_empty());
}

#[test]
fn weak_overlap_is_discarded() {
    let unrelated = trial("NCT22222222", Some(StructuredEligibility::default()));
    // No biomarker, stage, or location overlap; phase is the only signal and
    // it is weighted at 0.10, which stays at or below the floor.
    let mut profile = researcher_profile();
    profile.target_locations = vec!["Alaska".to_string()];
    profile.target_biomarkers = biomarkers(&[("KRAS", &["G12C"])]);
    profile.target_stages = vec!["I".to_string()];
    profile.age_range = None;
    profile.ecog_max = None;
    profile.treatment_naive_only = None;

    let analysis = engine().analyze_competitors(&profile, &[unrelated]);
    assert_eq!(analysis.total_competitors, 0);
}

#[test]
fn own_trial_is_excluded_from_competitor_set() {
    let mut profile = researcher_profile();
    profile.registry_id = Some("NCT11111111".to_string());

    let analysis = engine().analyze_competitors(
        &profile,
        &[competitor_trial("NCT11111111"), competitor_trial("NCT33333333")],
    );

    assert_eq!(analysis.total_competitors, 1);
    assert_eq!(analysis.competitors[0].registry_id, "NCT33333333");
}

#[test]
fn phase_proximity_decays_with_distance() {
    let mut near = competitor_trial("NCT44444444");
    near.phase = Some("Phase 3".to_string());
    let mut far = competitor_trial("NCT55555555");
    far.phase = Some("Phase 4".to_string());

    let analysis = engine().analyze_competitors(&researcher_profile(), &[near, far]);

    let by_id = |id: &str| {
        analysis
            .competitors
            .iter()
            .find(|c| c.registry_id == id)
            .expect("competitor present")
    };
    assert!((by_id("NCT44444444").phase_proximity - 0.7).abs() < 1e-9);
    assert!((by_id("NCT55555555").phase_proximity - 0.4).abs() < 1e-9);
}

#[test]
fn unmapped_phase_scores_zero_proximity() {
    let mut odd = competitor_trial("NCT66666666");
    odd.phase = Some("Early Phase 1".to_string());

    let analysis = engine().analyze_competitors(&researcher_profile(), &[odd]);
    assert_eq!(analysis.competitors[0].phase_proximity, 0.0);
}

#[test]
fn eligibility_similarity_omits_missing_subsignals() {
    // The researcher only specifies an ECOG bound; age and naive sub-signals
    // must drop out of the average instead of dragging it to zero.
    let mut profile = researcher_profile();
    profile.age_range = None;
    profile.treatment_naive_only = None;
    profile.ecog_max = Some(2);

    let analysis = engine().analyze_competitors(&profile, &[competitor_trial("NCT77777777")]);
    assert_eq!(analysis.competitors[0].eligibility_similarity, 1.0);
}

#[test]
fn insights_aggregate_sponsors_phases_and_biomarkers() {
    let trials = vec![
        competitor_trial("NCT10000001"),
        competitor_trial("NCT10000002"),
        competitor_trial("NCT10000003"),
    ];

    let analysis = engine().analyze_competitors(&researcher_profile(), &trials);

    assert_eq!(analysis.insights.total_competing_trials, 3);
    assert_eq!(analysis.insights.top_sponsors.len(), 1);
    assert_eq!(analysis.insights.top_sponsors[0].count, 3);
    assert_eq!(analysis.insights.phase_distribution.get("Phase 2"), Some(&3));
    assert_eq!(analysis.insights.common_biomarkers[0].name, "EGFR");
    assert!(analysis.insights.avg_similarity_score > 0.0);
    assert!(analysis
        .insights
        .geographic_hotspots
        .iter()
        .any(|entry| entry.name == "Iowa"));
}

#[test]
fn component_scores_are_rounded_to_three_decimals() {
    let analysis = engine().analyze_competitors(&researcher_profile(), &[competitor_trial("NCT88888888")]);
    let competitor = &analysis.competitors[0];
    for value in [
        competitor.similarity_score,
        competitor.biomarker_overlap,
        competitor.stage_overlap,
        competitor.geographic_overlap,
        competitor.phase_proximity,
        competitor.eligibility_similarity,
    ] {
        let scaled = value * 1000.0;
        assert!((scaled - scaled.round()).abs() < 1e-9);
    }
}
