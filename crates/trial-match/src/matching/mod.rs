//! Matching core: criterion comparators, eligibility and treatment scoring,
//! competitive similarity, ranking, and the service facade that composes the
//! catalog collaborators.

pub(crate) mod comparators;
pub mod competitor;
pub mod domain;
pub mod eligibility;
pub mod engine;
pub(crate) mod rank;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use competitor::{CompetitorAnalysis, CompetitorMatch, MarketInsights, NamedCount};
pub use domain::{
    MatchTier, PatientProfile, ProfileError, ResearcherTrialProfile, TreatmentRecord, TrialRecord,
    TrialSite, TrialStatus,
};
pub use eligibility::StructuredEligibility;
pub use engine::{
    EligibilityAssessment, MatchConfig, MatchEngine, TreatmentMatch, TrialMatch, TrialMatchSet,
};
pub use repository::{CatalogError, TreatmentCatalog, TrialCatalog};
pub use router::matching_router;
pub use service::{MatchServiceError, MatchingService, PatientMatchReport};
