use super::domain::{TreatmentRecord, TrialRecord};

/// Catalog of clinical trials, owned by an external data-store collaborator.
/// The engine only ever reads bounded, pre-filtered candidate sets.
pub trait TrialCatalog: Send + Sync {
    /// Trials open to enrollment, at most `limit` records.
    fn open_trials(&self, limit: usize) -> Result<Vec<TrialRecord>, CatalogError>;

    /// Lookup by registry identifier (e.g. NCT number).
    fn find_trial(&self, registry_id: &str) -> Result<Option<TrialRecord>, CatalogError>;
}

/// Catalog of approved treatments.
pub trait TreatmentCatalog: Send + Sync {
    fn approved_treatments(&self) -> Result<Vec<TreatmentRecord>, CatalogError>;
}

/// Error enumeration for catalog failures.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}
