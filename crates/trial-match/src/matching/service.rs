use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::competitor::CompetitorAnalysis;
use super::domain::{
    PatientProfile, ProfileError, ResearcherTrialProfile, TrialRecord,
};
use super::engine::{MatchConfig, MatchEngine, TreatmentMatch, TrialMatch};
use super::repository::{CatalogError, TreatmentCatalog, TrialCatalog};
use crate::config::MatchingLimits;

/// Full matching output for one patient request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientMatchReport {
    pub profile: PatientProfile,
    pub treatments: Vec<TreatmentMatch>,
    pub trials: Vec<TrialMatch>,
    pub total_treatments: usize,
    pub total_trials: usize,
    /// Trials that carried no structured eligibility and were left to the
    /// fallback evaluation collaborator.
    pub skipped_unstructured: usize,
}

/// Service composing the catalog collaborators with the scoring engine.
pub struct MatchingService<T, D> {
    trials: Arc<T>,
    treatments: Arc<D>,
    engine: Arc<MatchEngine>,
    limits: MatchingLimits,
}

impl<T, D> MatchingService<T, D>
where
    T: TrialCatalog + 'static,
    D: TreatmentCatalog + 'static,
{
    pub fn new(trials: Arc<T>, treatments: Arc<D>, config: MatchConfig, limits: MatchingLimits) -> Self {
        Self {
            trials,
            treatments,
            engine: Arc::new(MatchEngine::new(config)),
            limits,
        }
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    /// Matches a patient profile against approved treatments and open trials.
    pub fn match_patient(
        &self,
        profile: PatientProfile,
    ) -> Result<PatientMatchReport, MatchServiceError> {
        let profile = profile.normalized()?;
        let candidates = self.bounded_candidates()?;

        let treatments = self
            .engine
            .match_treatments(&profile, &self.treatments.approved_treatments()?);
        let trial_set = self.engine.match_trials(&profile, &candidates);

        info!(
            treatments = treatments.len(),
            trials = trial_set.matches.len(),
            skipped = trial_set.skipped_unstructured,
            "patient match complete"
        );

        Ok(PatientMatchReport {
            profile,
            total_treatments: treatments.len(),
            total_trials: trial_set.matches.len(),
            treatments,
            trials: trial_set.matches,
            skipped_unstructured: trial_set.skipped_unstructured,
        })
    }

    /// Finds trials competing with the researcher's design and aggregates
    /// market insights.
    pub fn analyze_competitors(
        &self,
        profile: ResearcherTrialProfile,
    ) -> Result<CompetitorAnalysis, MatchServiceError> {
        let profile = profile.normalized()?;
        let candidates = self.bounded_candidates()?;
        let analysis = self.engine.analyze_competitors(&profile, &candidates);

        info!(
            competitors = analysis.competitors.len(),
            total = analysis.total_competitors,
            "competitor analysis complete"
        );

        Ok(analysis)
    }

    /// Loads a catalog trial and converts it into a researcher profile so an
    /// existing trial can seed competitive analysis.
    pub fn trial_as_profile(
        &self,
        registry_id: &str,
    ) -> Result<ResearcherTrialProfile, MatchServiceError> {
        let trial = self
            .trials
            .find_trial(registry_id)?
            .ok_or_else(|| MatchServiceError::UnknownTrial(registry_id.to_string()))?;
        Ok(profile_from_trial(&trial, self.engine.config()))
    }

    fn bounded_candidates(&self) -> Result<Vec<TrialRecord>, MatchServiceError> {
        let limit = self.limits.max_candidates;
        let candidates = self.trials.open_trials(limit)?;
        if candidates.len() > limit {
            return Err(MatchServiceError::TooManyCandidates {
                supplied: candidates.len(),
                limit,
            });
        }
        Ok(candidates)
    }
}

fn profile_from_trial(trial: &TrialRecord, config: &MatchConfig) -> ResearcherTrialProfile {
    let mut profile = ResearcherTrialProfile {
        registry_id: Some(trial.registry_id.clone()),
        title: trial.title.clone(),
        phase: trial.phase.clone(),
        target_biomarkers: trial
            .biomarker_requirements
            .iter()
            .map(|(name, values)| (name.to_uppercase(), values.clone()))
            .collect(),
        target_stages: Vec::new(),
        target_histology: Vec::new(),
        target_locations: trial.site_regions(),
        age_range: None,
        ecog_max: None,
        treatment_naive_only: None,
        prior_treatments_excluded: Vec::new(),
    };

    if let Some(eligibility) = &trial.structured_eligibility {
        let eligibility = eligibility.clone().normalized();
        profile.target_stages = eligibility.disease_stage.allowed.clone();
        profile.target_histology = eligibility.histology.allowed.clone();
        for (marker, mutations) in &eligibility.biomarkers.required_positive {
            profile
                .target_biomarkers
                .entry(marker.clone())
                .or_insert_with(|| mutations.clone());
        }
        if eligibility.age.min.is_some() || eligibility.age.max.is_some() {
            let (default_min, default_max) = config.default_trial_age;
            profile.age_range = Some((
                eligibility.age.min.unwrap_or(default_min),
                eligibility.age.max.unwrap_or(default_max),
            ));
        }
        profile.ecog_max = eligibility.ecog.max;
        profile.treatment_naive_only =
            Some(eligibility.prior_treatments.treatment_naive_required);
        profile.prior_treatments_excluded = eligibility.prior_treatments.excluded.clone();
    }

    profile
}

/// Error raised by the matching service. Catalog and contract failures are
/// the only classes that reach callers; scoring itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum MatchServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("candidate set of {supplied} exceeds the documented limit of {limit}")]
    TooManyCandidates { supplied: usize, limit: usize },
    #[error("trial '{0}' is not in the catalog")]
    UnknownTrial(String),
}
