use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::eligibility::StructuredEligibility;

/// Structured patient profile, already parsed from free text by an external
/// extraction collaborator. Biomarker keys are case-insensitive on input and
/// uppercased during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    #[serde(default = "default_cancer_type")]
    pub cancer_type: String,
    #[serde(default)]
    pub histology: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    /// Biomarker name -> detected values ("positive", "L858R", "TPS 50%", ...).
    #[serde(default)]
    pub biomarkers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub age: Option<u32>,
    /// ECOG performance status, 0 (fully active) through 4.
    #[serde(default)]
    pub ecog_status: Option<u8>,
    #[serde(default)]
    pub prior_treatments: Vec<String>,
    #[serde(default)]
    pub brain_metastases: Option<bool>,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_cancer_type() -> String {
    "NSCLC".to_string()
}

impl PatientProfile {
    /// One-shot normalization so scoring never re-validates: uppercases
    /// biomarker keys (merging duplicates) and trims value tokens. Rejects a
    /// performance status outside the 0-4 scale as caller misuse.
    pub fn normalized(mut self) -> Result<Self, ProfileError> {
        if let Some(ecog) = self.ecog_status {
            if ecog > 4 {
                return Err(ProfileError::EcogOutOfRange(ecog));
            }
        }

        let mut biomarkers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, values) in std::mem::take(&mut self.biomarkers) {
            let key = name.trim().to_uppercase();
            if key.is_empty() {
                continue;
            }
            let entry = biomarkers.entry(key).or_default();
            for value in values {
                let value = value.trim().to_string();
                if !value.is_empty() && !entry.contains(&value) {
                    entry.push(value);
                }
            }
        }
        self.biomarkers = biomarkers;

        self.prior_treatments.retain(|t| !t.trim().is_empty());
        Ok(self)
    }
}

/// A researcher's trial design used for competitive analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearcherTrialProfile {
    /// Registry identifier when imported from an existing trial; the matching
    /// trial is excluded from its own competitor set.
    #[serde(default)]
    pub registry_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    /// Target biomarker name -> required mutations.
    #[serde(default)]
    pub target_biomarkers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub target_stages: Vec<String>,
    #[serde(default)]
    pub target_histology: Vec<String>,
    /// Region identifiers (e.g. states) where the trial will enroll.
    #[serde(default)]
    pub target_locations: Vec<String>,
    #[serde(default)]
    pub age_range: Option<(u32, u32)>,
    #[serde(default)]
    pub ecog_max: Option<u8>,
    #[serde(default)]
    pub treatment_naive_only: Option<bool>,
    #[serde(default)]
    pub prior_treatments_excluded: Vec<String>,
}

impl ResearcherTrialProfile {
    pub fn normalized(mut self) -> Result<Self, ProfileError> {
        if let Some(ecog) = self.ecog_max {
            if ecog > 4 {
                return Err(ProfileError::EcogOutOfRange(ecog));
            }
        }
        if let Some((min, max)) = self.age_range {
            if min > max {
                return Err(ProfileError::EmptyAgeRange { min, max });
            }
        }

        let mut biomarkers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, values) in std::mem::take(&mut self.target_biomarkers) {
            let key = name.trim().to_uppercase();
            if key.is_empty() {
                continue;
            }
            biomarkers.entry(key).or_default().extend(values);
        }
        self.target_biomarkers = biomarkers;
        Ok(self)
    }
}

/// Caller-contract violations detected while normalizing a profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("ECOG performance status {0} is outside the 0-4 scale")]
    EcogOutOfRange(u8),
    #[error("age range minimum {min} exceeds maximum {max}")]
    EmptyAgeRange { min: u32, max: u32 },
}

/// Recruitment status carried on catalog trial records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrialStatus {
    Recruiting,
    ActiveNotRecruiting,
    EnrollingByInvitation,
    Completed,
    Suspended,
    Unknown,
}

impl TrialStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "RECRUITING" => Self::Recruiting,
            "ACTIVE_NOT_RECRUITING" => Self::ActiveNotRecruiting,
            "ENROLLING_BY_INVITATION" => Self::EnrollingByInvitation,
            "COMPLETED" => Self::Completed,
            "SUSPENDED" => Self::Suspended,
            _ => Self::Unknown,
        }
    }

    /// Whether the trial accepts (or may accept) new subjects.
    pub const fn is_open(self) -> bool {
        matches!(
            self,
            Self::Recruiting | Self::ActiveNotRecruiting | Self::EnrollingByInvitation
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Recruiting => "RECRUITING",
            Self::ActiveNotRecruiting => "ACTIVE_NOT_RECRUITING",
            Self::EnrollingByInvitation => "ENROLLING_BY_INVITATION",
            Self::Completed => "COMPLETED",
            Self::Suspended => "SUSPENDED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// One study site; `region` is the identifier used for geographic overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSite {
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A clinical trial from the catalog collaborator, consumed read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub registry_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brief_summary: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    pub status: TrialStatus,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub biomarker_requirements: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub sites: Vec<TrialSite>,
    #[serde(default)]
    pub study_url: Option<String>,
    /// Machine-readable criteria from the extraction collaborator. Absent
    /// when extraction has not run; such trials are skipped by the scorer.
    #[serde(default)]
    pub structured_eligibility: Option<StructuredEligibility>,
    #[serde(default)]
    pub eligibility_extraction_version: Option<String>,
    #[serde(default)]
    pub eligibility_extracted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub primary_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl TrialRecord {
    /// Biomarker names targeted by this trial: top-level requirements plus
    /// required-positive keys from structured eligibility, uppercased.
    pub fn biomarker_keys(&self) -> std::collections::BTreeSet<String> {
        let mut keys: std::collections::BTreeSet<String> = self
            .biomarker_requirements
            .keys()
            .map(|k| k.to_uppercase())
            .collect();
        if let Some(eligibility) = &self.structured_eligibility {
            keys.extend(
                eligibility
                    .biomarkers
                    .required_positive
                    .keys()
                    .map(|k| k.to_uppercase()),
            );
        }
        keys
    }

    /// Distinct site regions, preserving first-seen order.
    pub fn site_regions(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        let mut regions = Vec::new();
        for site in &self.sites {
            if let Some(region) = &site.region {
                if !region.is_empty() && seen.insert(region.clone()) {
                    regions.push(region.clone());
                }
            }
        }
        regions
    }
}

/// An approved treatment from the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub id: String,
    pub generic_name: String,
    #[serde(default)]
    pub brand_names: Vec<String>,
    #[serde(default)]
    pub drug_class: Option<String>,
    #[serde(default)]
    pub mechanism_of_action: Option<String>,
    #[serde(default)]
    pub fda_approval_status: Option<String>,
    /// Biomarker name -> required values; empty means broadly applicable
    /// (subject to the drug-class vocabulary check).
    #[serde(default)]
    pub biomarker_requirements: BTreeMap<String, Vec<String>>,
}

/// Eligibility tier derived from a bounded score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Eligible,
    Uncertain,
    Ineligible,
}

impl MatchTier {
    /// Sort rank: eligible trials come first, ineligible last.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Eligible => 0,
            Self::Uncertain => 1,
            Self::Ineligible => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::Uncertain => "uncertain",
            Self::Ineligible => "ineligible",
        }
    }
}
