use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::PrometheusHandle;
use trial_match::matching::eligibility::{
    AgeRequirement, BiomarkerRequirements, BrainMetastasesRequirement, EcogRequirement,
    ExpressionThreshold, ListRequirement, PriorTreatmentRequirements, StructuredEligibility,
};
use trial_match::matching::{
    CatalogError, TreatmentCatalog, TreatmentRecord, TrialCatalog, TrialRecord, TrialSite,
    TrialStatus,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory trial catalog backing the demo and the default server wiring.
/// A production deployment supplies its own `TrialCatalog` implementation.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTrialCatalog {
    trials: Arc<Mutex<Vec<TrialRecord>>>,
}

impl InMemoryTrialCatalog {
    pub(crate) fn seeded() -> Self {
        Self {
            trials: Arc::new(Mutex::new(seed_trials())),
        }
    }
}

impl TrialCatalog for InMemoryTrialCatalog {
    fn open_trials(&self, limit: usize) -> Result<Vec<TrialRecord>, CatalogError> {
        let guard = self.trials.lock().expect("trial catalog mutex poisoned");
        Ok(guard
            .iter()
            .filter(|trial| trial.status.is_open())
            .take(limit)
            .cloned()
            .collect())
    }

    fn find_trial(&self, registry_id: &str) -> Result<Option<TrialRecord>, CatalogError> {
        let guard = self.trials.lock().expect("trial catalog mutex poisoned");
        Ok(guard
            .iter()
            .find(|trial| trial.registry_id.eq_ignore_ascii_case(registry_id))
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTreatmentCatalog {
    treatments: Arc<Mutex<Vec<TreatmentRecord>>>,
}

impl InMemoryTreatmentCatalog {
    pub(crate) fn seeded() -> Self {
        Self {
            treatments: Arc::new(Mutex::new(seed_treatments())),
        }
    }
}

impl TreatmentCatalog for InMemoryTreatmentCatalog {
    fn approved_treatments(&self) -> Result<Vec<TreatmentRecord>, CatalogError> {
        let guard = self
            .treatments
            .lock()
            .expect("treatment catalog mutex poisoned");
        Ok(guard.clone())
    }
}

fn biomarkers(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
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

fn site(facility: &str, city: &str, region: &str) -> TrialSite {
    TrialSite {
        facility: Some(facility.to_string()),
        city: Some(city.to_string()),
        region: Some(region.to_string()),
        country: Some("USA".to_string()),
    }
}

fn trial(
    registry_id: &str,
    title: &str,
    phase: &str,
    sponsor: &str,
    sites: Vec<TrialSite>,
    eligibility: Option<StructuredEligibility>,
) -> TrialRecord {
    TrialRecord {
        registry_id: registry_id.to_string(),
        title: Some(title.to_string()),
        brief_summary: None,
        phase: Some(phase.to_string()),
        status: TrialStatus::Recruiting,
        sponsor: Some(sponsor.to_string()),
        conditions: vec!["Non-small cell lung cancer".to_string()],
        biomarker_requirements: BTreeMap::new(),
        sites,
        study_url: Some(format!(
            "https://clinicaltrials.example.org/study/{registry_id}"
        )),
        structured_eligibility: eligibility,
        eligibility_extraction_version: Some("v2".to_string()),
        eligibility_extracted_at: None,
        primary_completion_date: None,
        last_updated: None,
    }
}

pub(crate) fn seed_trials() -> Vec<TrialRecord> {
    vec![
        trial(
            "NCT05000001",
            "Osimertinib combination in EGFR-mutated advanced NSCLC",
            "Phase 2",
            "Midwest Oncology Group",
            vec![
                site("Mercy Cancer Center", "Des Moines", "Iowa"),
                site("University Hospital", "Iowa City", "Iowa"),
            ],
            Some(StructuredEligibility {
                age: AgeRequirement {
                    min: Some(18),
                    max: Some(99),
                },
                ecog: EcogRequirement {
                    min: None,
                    max: Some(2),
                },
                disease_stage: ListRequirement {
                    allowed: vec!["IIIB".to_string(), "IV".to_string()],
                    excluded: Vec::new(),
                },
                biomarkers: BiomarkerRequirements {
                    required_positive: biomarkers(&[("EGFR", &["L858R", "exon 19 deletion"])]),
                    ..BiomarkerRequirements::default()
                },
                ..StructuredEligibility::default()
            }),
        ),
        trial(
            "NCT05000002",
            "ALK inhibitor sequencing in ALK-rearranged NSCLC",
            "Phase 3",
            "Prairie Biosciences",
            vec![site("Lakeside Clinic", "Chicago", "Illinois")],
            Some(StructuredEligibility {
                age: AgeRequirement {
                    min: Some(18),
                    max: None,
                },
                biomarkers: BiomarkerRequirements {
                    required_positive: biomarkers(&[("ALK", &["positive", "rearrangement"])]),
                    required_negative: vec!["EGFR".to_string()],
                    ..BiomarkerRequirements::default()
                },
                brain_metastases: Some(BrainMetastasesRequirement {
                    allowed: true,
                    controlled_only: true,
                    untreated_allowed: false,
                }),
                ..StructuredEligibility::default()
            }),
        ),
        trial(
            "NCT05000003",
            "First-line immunotherapy for PD-L1 high NSCLC",
            "Phase 2",
            "Midwest Oncology Group",
            vec![site("Mercy Cancer Center", "Des Moines", "Iowa")],
            Some(StructuredEligibility {
                ecog: EcogRequirement {
                    min: None,
                    max: Some(1),
                },
                biomarkers: BiomarkerRequirements {
                    expression_threshold: Some(ExpressionThreshold {
                        min: Some(50.0),
                        max: None,
                        level: Some("high".to_string()),
                    }),
                    ..BiomarkerRequirements::default()
                },
                prior_treatments: PriorTreatmentRequirements {
                    treatment_naive_required: true,
                    ..PriorTreatmentRequirements::default()
                },
                ..StructuredEligibility::default()
            }),
        ),
        // Criteria extraction has not run for this record; the structured
        // scorer reports it as skipped.
        trial(
            "NCT05000004",
            "Investigator-initiated study in advanced NSCLC",
            "Phase 1/Phase 2",
            "Heartland University",
            vec![site("Heartland Medical Center", "Omaha", "Nebraska")],
            None,
        ),
    ]
}

pub(crate) fn seed_treatments() -> Vec<TreatmentRecord> {
    vec![
        TreatmentRecord {
            id: "tx-osimertinib".to_string(),
            generic_name: "osimertinib".to_string(),
            brand_names: vec!["Tagrisso".to_string()],
            drug_class: Some("EGFR TKI".to_string()),
            mechanism_of_action: Some("Third-generation EGFR tyrosine kinase inhibitor".to_string()),
            fda_approval_status: Some("approved".to_string()),
            biomarker_requirements: biomarkers(&[("EGFR", &["L858R", "exon 19 deletion", "T790M"])]),
        },
        TreatmentRecord {
            id: "tx-alectinib".to_string(),
            generic_name: "alectinib".to_string(),
            brand_names: vec!["Alecensa".to_string()],
            drug_class: Some("ALK inhibitor".to_string()),
            mechanism_of_action: Some("ALK tyrosine kinase inhibitor".to_string()),
            fda_approval_status: Some("approved".to_string()),
            biomarker_requirements: biomarkers(&[("ALK", &["positive", "rearrangement"])]),
        },
        TreatmentRecord {
            id: "tx-pembrolizumab".to_string(),
            generic_name: "pembrolizumab".to_string(),
            brand_names: vec!["Keytruda".to_string()],
            drug_class: Some("PD-1 immunotherapy".to_string()),
            mechanism_of_action: Some("PD-1 checkpoint inhibitor".to_string()),
            fda_approval_status: Some("approved".to_string()),
            biomarker_requirements: biomarkers(&[("PD-L1", &["positive"])]),
        },
        TreatmentRecord {
            id: "tx-carboplatin".to_string(),
            generic_name: "carboplatin".to_string(),
            brand_names: Vec::new(),
            drug_class: Some("Platinum-based chemotherapy".to_string()),
            mechanism_of_action: Some("DNA cross-linking agent".to_string()),
            fda_approval_status: Some("approved".to_string()),
            biomarker_requirements: BTreeMap::new(),
        },
    ]
}
