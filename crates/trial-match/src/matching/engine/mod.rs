//! Stateless scoring engine. Every method is a pure function over its inputs
//! plus the immutable [`MatchConfig`], so callers may share one engine across
//! threads without coordination.

mod config;
mod treatment;
mod trial;

pub use config::{MatchConfig, SimilarityWeights, TreatmentDeltas, TrialDeltas};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{MatchTier, PatientProfile, TreatmentRecord, TrialRecord, TrialSite, TrialStatus};
use super::eligibility::StructuredEligibility;
use super::rank;

/// Number of site previews carried on each trial match.
const SITE_PREVIEW_LIMIT: usize = 5;

/// Bounded eligibility verdict for one (patient, trial) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityAssessment {
    /// Final score in [0,1], rounded to 3 decimals.
    pub score: f64,
    pub tier: MatchTier,
    /// Distance of the score from the neutral point, scaled to [0,1]. Not a
    /// calibrated probability.
    pub confidence: f64,
    pub matching_criteria: Vec<String>,
    pub excluding_criteria: Vec<String>,
    /// Soft-failure annotations (e.g. unreadable expression values).
    pub notes: Vec<String>,
    pub explanation: String,
}

/// A scored trial, ready for ranking and presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMatch {
    pub registry_id: String,
    pub title: Option<String>,
    pub phase: Option<String>,
    pub status: TrialStatus,
    pub sponsor: Option<String>,
    pub brief_summary: Option<String>,
    pub biomarker_requirements: BTreeMap<String, Vec<String>>,
    pub study_url: Option<String>,
    /// Sites near the subject when a location was given, otherwise the first
    /// few catalog sites.
    pub sites: Vec<TrialSite>,
    pub eligibility: EligibilityAssessment,
}

/// Trial matching output plus the candidates the structured path had to skip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMatchSet {
    pub matches: Vec<TrialMatch>,
    /// Candidates without structured eligibility; they need the fallback
    /// evaluation collaborator and are not scored here.
    pub skipped_unstructured: usize,
}

/// A scored approved treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentMatch {
    pub id: String,
    pub generic_name: String,
    pub brand_names: Vec<String>,
    pub drug_class: Option<String>,
    pub mechanism_of_action: Option<String>,
    pub fda_approval_status: Option<String>,
    pub biomarker_requirements: BTreeMap<String, Vec<String>>,
    pub match_reason: String,
    pub match_score: f64,
}

/// Stateless evaluator applying the configured rules to profiles.
pub struct MatchEngine {
    config: MatchConfig,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

impl MatchEngine {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Scores one patient against one trial's structured criteria.
    pub fn assess_trial(
        &self,
        profile: &PatientProfile,
        eligibility: &StructuredEligibility,
    ) -> EligibilityAssessment {
        trial::assess(profile, eligibility, &self.config)
    }

    /// Scores and ranks a candidate trial set. Candidates without structured
    /// eligibility are skipped and counted, never guessed at.
    pub fn match_trials(&self, profile: &PatientProfile, trials: &[TrialRecord]) -> TrialMatchSet {
        let mut matches = Vec::new();
        let mut skipped_unstructured = 0usize;

        for trial in trials {
            let Some(eligibility) = &trial.structured_eligibility else {
                skipped_unstructured += 1;
                continue;
            };
            let assessment = self.assess_trial(profile, eligibility);
            matches.push(TrialMatch {
                registry_id: trial.registry_id.clone(),
                title: trial.title.clone(),
                phase: trial.phase.clone(),
                status: trial.status,
                sponsor: trial.sponsor.clone(),
                brief_summary: trial.brief_summary.clone(),
                biomarker_requirements: trial.biomarker_requirements.clone(),
                study_url: trial.study_url.clone(),
                sites: site_preview(&trial.sites, profile.location.as_deref()),
                eligibility: assessment,
            });
        }

        rank::rank_trials(&mut matches);
        debug!(
            candidates = trials.len(),
            scored = matches.len(),
            skipped = skipped_unstructured,
            "trial matching pass complete"
        );

        TrialMatchSet {
            matches,
            skipped_unstructured,
        }
    }

    /// Scores and ranks the treatment catalog for one patient.
    pub fn match_treatments(
        &self,
        profile: &PatientProfile,
        treatments: &[TreatmentRecord],
    ) -> Vec<TreatmentMatch> {
        let mut matches: Vec<TreatmentMatch> = treatments
            .iter()
            .filter_map(|record| treatment::score(profile, record, &self.config))
            .collect();
        rank::rank_treatments(&mut matches);
        debug!(
            candidates = treatments.len(),
            matched = matches.len(),
            "treatment matching pass complete"
        );
        matches
    }
}

/// Keeps the sites nearest the subject: any site whose city/region/country
/// mentions the given location, capped to a short preview.
fn site_preview(sites: &[TrialSite], location: Option<&str>) -> Vec<TrialSite> {
    let filtered: Vec<TrialSite> = match location {
        Some(location) if !location.trim().is_empty() => {
            let needle = location.trim().to_lowercase();
            sites
                .iter()
                .filter(|site| {
                    [&site.city, &site.region, &site.country]
                        .into_iter()
                        .flatten()
                        .any(|field| field.to_lowercase().contains(&needle))
                })
                .cloned()
                .collect()
        }
        _ => sites.to_vec(),
    };
    filtered.into_iter().take(SITE_PREVIEW_LIMIT).collect()
}
