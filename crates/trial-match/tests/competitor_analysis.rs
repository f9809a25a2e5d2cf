//! Integration specifications for competitive analysis: similarity scoring,
//! ranking, and market insight aggregation through the public facade.

mod common {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use trial_match::config::MatchingLimits;
    use trial_match::matching::eligibility::{
        AgeRequirement, BiomarkerRequirements, EcogRequirement, ListRequirement,
        StructuredEligibility,
    };
    use trial_match::matching::{
        CatalogError, MatchConfig, MatchingService, ResearcherTrialProfile, TreatmentCatalog,
        TreatmentRecord, TrialCatalog, TrialRecord, TrialSite, TrialStatus,
    };

    pub(super) fn biomarkers(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    pub(super) fn researcher_profile() -> ResearcherTrialProfile {
        ResearcherTrialProfile {
            registry_id: None,
            title: Some("Planned EGFR study".to_string()),
            phase: Some("Phase 2".to_string()),
            target_biomarkers: biomarkers(&[("EGFR", &["L858R"])]),
            target_stages: vec!["IIIB".to_string(), "IV".to_string()],
            target_histology: vec!["adenocarcinoma".to_string()],
            target_locations: vec!["Iowa".to_string()],
            age_range: Some((18, 75)),
            ecog_max: Some(1),
            treatment_naive_only: Some(false),
            prior_treatments_excluded: Vec::new(),
        }
    }

    pub(super) fn competitor(registry_id: &str, sponsor: &str, phase: &str) -> TrialRecord {
        TrialRecord {
            registry_id: registry_id.to_string(),
            title: Some(format!("Study {registry_id}")),
            brief_summary: None,
            phase: Some(phase.to_string()),
            status: TrialStatus::Recruiting,
            sponsor: Some(sponsor.to_string()),
            conditions: vec!["Non-small cell lung cancer".to_string()],
            biomarker_requirements: biomarkers(&[("EGFR", &["L858R"])]),
            sites: vec![TrialSite {
                facility: Some("Mercy Cancer Center".to_string()),
                city: Some("Des Moines".to_string()),
                region: Some("Iowa".to_string()),
                country: Some("USA".to_string()),
            }],
            study_url: None,
            structured_eligibility: Some(StructuredEligibility {
                age: AgeRequirement {
                    min: Some(18),
                    max: Some(80),
                },
                ecog: EcogRequirement {
                    min: None,
                    max: Some(1),
                },
                disease_stage: ListRequirement {
                    allowed: vec!["IIIB".to_string(), "IV".to_string()],
                    excluded: Vec::new(),
                },
                biomarkers: BiomarkerRequirements {
                    required_positive: biomarkers(&[("EGFR", &["L858R"])]),
                    ..BiomarkerRequirements::default()
                },
                ..StructuredEligibility::default()
            }),
            eligibility_extraction_version: None,
            eligibility_extracted_at: None,
            primary_completion_date: None,
            last_updated: None,
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryTrialCatalog {
        pub(super) trials: Vec<TrialRecord>,
    }

    impl TrialCatalog for MemoryTrialCatalog {
        fn open_trials(&self, limit: usize) -> Result<Vec<TrialRecord>, CatalogError> {
            Ok(self.trials.iter().take(limit).cloned().collect())
        }

        fn find_trial(&self, registry_id: &str) -> Result<Option<TrialRecord>, CatalogError> {
            Ok(self
                .trials
                .iter()
                .find(|trial| trial.registry_id == registry_id)
                .cloned())
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct EmptyTreatmentCatalog;

    impl TreatmentCatalog for EmptyTreatmentCatalog {
        fn approved_treatments(&self) -> Result<Vec<TreatmentRecord>, CatalogError> {
            Ok(Vec::new())
        }
    }

    pub(super) fn build_service(
        trials: Vec<TrialRecord>,
    ) -> MatchingService<MemoryTrialCatalog, EmptyTreatmentCatalog> {
        MatchingService::new(
            Arc::new(MemoryTrialCatalog { trials }),
            Arc::new(EmptyTreatmentCatalog),
            MatchConfig::default(),
            MatchingLimits {
                max_candidates: 100,
            },
        )
    }
}

use common::*;

#[test]
fn competitor_analysis_ranks_by_similarity_and_aggregates() {
    let service = build_service(vec![
        competitor("NCT20000001", "Hawkeye Therapeutics", "Phase 2"),
        competitor("NCT20000002", "Hawkeye Therapeutics", "Phase 3"),
        competitor("NCT20000003", "Prairie Biosciences", "Phase 2"),
    ]);

    let analysis = service
        .analyze_competitors(researcher_profile())
        .expect("analysis runs");

    assert_eq!(analysis.total_competitors, 3);
    // Same-phase competitors outrank the adjacent-phase one.
    assert_eq!(analysis.competitors[0].phase.as_deref(), Some("Phase 2"));
    let scores: Vec<f64> = analysis
        .competitors
        .iter()
        .map(|c| c.similarity_score)
        .collect();
    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| b.partial_cmp(a).expect("comparable"));
    assert_eq!(scores, sorted);

    let insights = &analysis.insights;
    assert_eq!(insights.total_competing_trials, 3);
    assert_eq!(insights.top_sponsors[0].name, "Hawkeye Therapeutics");
    assert_eq!(insights.top_sponsors[0].count, 2);
    assert_eq!(insights.phase_distribution.get("Phase 2"), Some(&2));
    assert_eq!(insights.common_biomarkers[0].name, "EGFR");
    assert!(insights.avg_similarity_score > 0.0);
}

#[test]
fn empty_competitor_set_returns_zeroed_insights_without_errors() {
    let service = build_service(Vec::new());

    let analysis = service
        .analyze_competitors(researcher_profile())
        .expect("analysis runs");

    assert_eq!(analysis.total_competitors, 0);
    assert_eq!(analysis.insights.total_competing_trials, 0);
    assert_eq!(analysis.insights.avg_similarity_score, 0.0);
    assert!(analysis.insights.top_sponsors.is_empty());
    assert!(analysis.insights.geographic_hotspots.is_empty());
    assert!(analysis.insights.common_biomarkers.is_empty());
}

#[test]
fn equal_similarity_preserves_catalog_order() {
    let service = build_service(vec![
        competitor("NCT30000001", "Sponsor A", "Phase 2"),
        competitor("NCT30000002", "Sponsor B", "Phase 2"),
    ]);

    let analysis = service
        .analyze_competitors(researcher_profile())
        .expect("analysis runs");

    assert_eq!(analysis.competitors.len(), 2);
    assert_eq!(
        analysis.competitors[0].similarity_score,
        analysis.competitors[1].similarity_score
    );
    assert_eq!(analysis.competitors[0].registry_id, "NCT30000001");
    assert_eq!(analysis.competitors[1].registry_id, "NCT30000002");
}

#[test]
fn profile_import_feeds_competitor_analysis() {
    let service = build_service(vec![
        competitor("NCT40000001", "Sponsor A", "Phase 2"),
        competitor("NCT40000002", "Sponsor B", "Phase 2"),
    ]);

    let profile = service
        .trial_as_profile("NCT40000001")
        .expect("profile built");
    assert_eq!(profile.registry_id.as_deref(), Some("NCT40000001"));

    let analysis = service.analyze_competitors(profile).expect("analysis runs");
    // The imported trial never competes with itself.
    assert!(analysis
        .competitors
        .iter()
        .all(|c| c.registry_id != "NCT40000001"));
    assert_eq!(analysis.total_competitors, 1);
}
