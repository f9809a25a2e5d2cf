use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::MatchingLimits;
use crate::matching::domain::{
    PatientProfile, ResearcherTrialProfile, TreatmentRecord, TrialRecord, TrialSite, TrialStatus,
};
use crate::matching::eligibility::{
    AgeRequirement, BiomarkerRequirements, EcogRequirement, StructuredEligibility,
};
use crate::matching::engine::{MatchConfig, MatchEngine};
use crate::matching::repository::{
    CatalogError, TreatmentCatalog, TrialCatalog,
};
use crate::matching::service::MatchingService;

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

pub(super) fn patient() -> PatientProfile {
    PatientProfile {
        cancer_type: "NSCLC".to_string(),
        histology: Some("adenocarcinoma".to_string()),
        stage: Some("IV".to_string()),
        biomarkers: biomarkers(&[("EGFR", &["L858R"])]),
        age: Some(52),
        ecog_status: Some(1),
        prior_treatments: Vec::new(),
        brain_metastases: None,
        location: None,
    }
}

pub(super) fn egfr_eligibility() -> StructuredEligibility {
    StructuredEligibility {
        age: AgeRequirement {
            min: Some(18),
            max: Some(99),
        },
        ecog: EcogRequirement {
            min: None,
            max: Some(2),
        },
        biomarkers: BiomarkerRequirements {
            required_positive: biomarkers(&[("EGFR", &["L858R", "exon 19 deletion"])]),
            ..BiomarkerRequirements::default()
        },
        ..StructuredEligibility::default()
    }
}

pub(super) fn trial(registry_id: &str, eligibility: Option<StructuredEligibility>) -> TrialRecord {
    TrialRecord {
        registry_id: registry_id.to_string(),
        title: Some(format!("Study {registry_id}")),
        brief_summary: Some("Open-label study in advanced NSCLC".to_string()),
        phase: Some("Phase 2".to_string()),
        status: TrialStatus::Recruiting,
        sponsor: Some("Midwest Oncology Group".to_string()),
        conditions: vec!["Non-small cell lung cancer".to_string()],
        biomarker_requirements: BTreeMap::new(),
        sites: vec![
            site("Mercy Cancer Center", "Des Moines", "Iowa"),
            site("University Hospital", "Boston", "Massachusetts"),
        ],
        study_url: Some(format!("https://trials.example.org/{registry_id}")),
        structured_eligibility: eligibility,
        eligibility_extraction_version: Some("v2".to_string()),
        eligibility_extracted_at: None,
        primary_completion_date: None,
        last_updated: None,
    }
}

pub(super) fn site(facility: &str, city: &str, region: &str) -> TrialSite {
    TrialSite {
        facility: Some(facility.to_string()),
        city: Some(city.to_string()),
        region: Some(region.to_string()),
        country: Some("USA".to_string()),
    }
}

pub(super) fn egfr_trial() -> TrialRecord {
    trial("NCT00000001", Some(egfr_eligibility()))
}

pub(super) fn treatment(
    id: &str,
    generic_name: &str,
    drug_class: &str,
    requirements: BTreeMap<String, Vec<String>>,
) -> TreatmentRecord {
    TreatmentRecord {
        id: id.to_string(),
        generic_name: generic_name.to_string(),
        brand_names: Vec::new(),
        drug_class: Some(drug_class.to_string()),
        mechanism_of_action: None,
        fda_approval_status: Some("approved".to_string()),
        biomarker_requirements: requirements,
    }
}

pub(super) fn treatment_fixtures() -> Vec<TreatmentRecord> {
    vec![
        treatment(
            "tr-osi",
            "osimertinib",
            "EGFR TKI",
            biomarkers(&[("EGFR", &["L858R", "exon 19 deletion", "T790M"])]),
        ),
        treatment(
            "tr-alec",
            "alectinib",
            "ALK inhibitor",
            biomarkers(&[("ALK", &["positive", "rearrangement"])]),
        ),
        treatment(
            "tr-carbo",
            "carboplatin",
            "Platinum-based chemotherapy",
            BTreeMap::new(),
        ),
        treatment("tr-niche", "example-niche", "Hormone therapy", BTreeMap::new()),
    ]
}

pub(super) fn researcher_profile() -> ResearcherTrialProfile {
    ResearcherTrialProfile {
        registry_id: None,
        title: Some("Planned EGFR study".to_string()),
        phase: Some("Phase 2".to_string()),
        target_biomarkers: biomarkers(&[("EGFR", &["L858R"])]),
        target_stages: vec!["IIIB".to_string(), "IV".to_string()],
        target_histology: vec!["adenocarcinoma".to_string()],
        target_locations: vec!["Iowa".to_string(), "Massachusetts".to_string()],
        age_range: Some((18, 75)),
        ecog_max: Some(1),
        treatment_naive_only: Some(false),
        prior_treatments_excluded: Vec::new(),
    }
}

pub(super) fn engine() -> MatchEngine {
    MatchEngine::default()
}

pub(super) fn limits() -> MatchingLimits {
    MatchingLimits {
        max_candidates: 1000,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryTrialCatalog {
    pub(super) trials: Vec<TrialRecord>,
}

impl TrialCatalog for MemoryTrialCatalog {
    fn open_trials(&self, limit: usize) -> Result<Vec<TrialRecord>, CatalogError> {
        Ok(self
            .trials
            .iter()
            .filter(|trial| trial.status.is_open())
            .take(limit)
            .cloned()
            .collect())
    }

    fn find_trial(&self, registry_id: &str) -> Result<Option<TrialRecord>, CatalogError> {
        Ok(self
            .trials
            .iter()
            .find(|trial| trial.registry_id == registry_id)
            .cloned())
    }
}

/// Catalog that ignores the requested bound, for contract-violation tests.
#[derive(Default, Clone)]
pub(super) struct UnboundedTrialCatalog {
    pub(super) trials: Vec<TrialRecord>,
}

impl TrialCatalog for UnboundedTrialCatalog {
    fn open_trials(&self, _limit: usize) -> Result<Vec<TrialRecord>, CatalogError> {
        Ok(self.trials.clone())
    }

    fn find_trial(&self, registry_id: &str) -> Result<Option<TrialRecord>, CatalogError> {
        Ok(self
            .trials
            .iter()
            .find(|trial| trial.registry_id == registry_id)
            .cloned())
    }
}

pub(super) struct OfflineTrialCatalog;

impl TrialCatalog for OfflineTrialCatalog {
    fn open_trials(&self, _limit: usize) -> Result<Vec<TrialRecord>, CatalogError> {
        Err(CatalogError::Unavailable("trial store offline".to_string()))
    }

    fn find_trial(&self, _registry_id: &str) -> Result<Option<TrialRecord>, CatalogError> {
        Err(CatalogError::Unavailable("trial store offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryTreatmentCatalog {
    pub(super) treatments: Vec<TreatmentRecord>,
}

impl TreatmentCatalog for MemoryTreatmentCatalog {
    fn approved_treatments(&self) -> Result<Vec<TreatmentRecord>, CatalogError> {
        Ok(self.treatments.clone())
    }
}

pub(super) fn build_service(
    trials: Vec<TrialRecord>,
) -> MatchingService<MemoryTrialCatalog, MemoryTreatmentCatalog> {
    MatchingService::new(
        Arc::new(MemoryTrialCatalog { trials }),
        Arc::new(MemoryTreatmentCatalog {
            treatments: treatment_fixtures(),
        }),
        MatchConfig::default(),
        limits(),
    )
}
