//! Typed eligibility criteria extracted from free-text trial requirements by
//! an external collaborator. Every sub-object is optional: absence means the
//! criterion is unconstrained, never that it excludes everyone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Age bounds in years. A single open bound is evaluated alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRequirement {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

/// ECOG performance-status bounds on the 0-4 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcogRequirement {
    #[serde(default)]
    pub min: Option<u8>,
    #[serde(default)]
    pub max: Option<u8>,
}

/// Allow/deny lists for categorical criteria (stage, histology). A non-empty
/// allow list is treated as exhaustive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequirement {
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
}

impl ListRequirement {
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty() && self.excluded.is_empty()
    }
}

/// Expression-level bounds for percentage-expressed biomarkers (e.g. PD-L1 TPS).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionThreshold {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Qualitative level ("high", "low") when the source text gave no number.
    #[serde(default)]
    pub level: Option<String>,
}

/// Biomarker requirements: demanded-positive markers with optional specific
/// mutations, demanded-negative (wild-type) markers, and expression bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerRequirements {
    #[serde(default)]
    pub required_positive: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub required_negative: Vec<String>,
    #[serde(default)]
    pub expression_threshold: Option<ExpressionThreshold>,
    /// Marker the expression threshold applies to; defaults to PD-L1.
    #[serde(default)]
    pub expression_marker: Option<String>,
}

/// Prior-therapy constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorTreatmentRequirements {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub max_lines: Option<u32>,
    #[serde(default)]
    pub min_lines: Option<u32>,
    #[serde(default)]
    pub treatment_naive_required: bool,
}

impl PriorTreatmentRequirements {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
            && self.excluded.is_empty()
            && self.max_lines.is_none()
            && self.min_lines.is_none()
            && !self.treatment_naive_required
    }
}

/// Brain-metastases policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainMetastasesRequirement {
    #[serde(default = "default_true")]
    pub allowed: bool,
    #[serde(default)]
    pub controlled_only: bool,
    #[serde(default)]
    pub untreated_allowed: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BrainMetastasesRequirement {
    fn default() -> Self {
        Self {
            allowed: true,
            controlled_only: false,
            untreated_allowed: false,
        }
    }
}

/// Organ-function / lab-value constraints. The patient profile carries no
/// counterpart fields, so these are surfaced but never scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganFunctionRequirements {
    #[serde(default)]
    pub renal_exclusion: bool,
    #[serde(default)]
    pub hepatic_exclusion: bool,
    #[serde(default)]
    pub creatinine_max: Option<f64>,
    #[serde(default)]
    pub bilirubin_max: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Prior-malignancy exclusion window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorMalignancyRequirement {
    #[serde(default)]
    pub excluded: bool,
    #[serde(default)]
    pub years_lookback: Option<u32>,
    #[serde(default)]
    pub exceptions: Vec<String>,
}

/// Washout periods in days since prior therapy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WashoutRequirement {
    #[serde(default)]
    pub min_days_since_chemo: Option<u32>,
    #[serde(default)]
    pub min_days_since_radiation: Option<u32>,
    #[serde(default)]
    pub min_days_since_surgery: Option<u32>,
    #[serde(default)]
    pub min_days_since_immunotherapy: Option<u32>,
    #[serde(default)]
    pub general_min_days: Option<u32>,
}

/// Complete structured eligibility criteria for one trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredEligibility {
    #[serde(default)]
    pub age: AgeRequirement,
    #[serde(default)]
    pub ecog: EcogRequirement,
    #[serde(default)]
    pub disease_stage: ListRequirement,
    #[serde(default)]
    pub histology: ListRequirement,
    #[serde(default)]
    pub biomarkers: BiomarkerRequirements,
    #[serde(default)]
    pub prior_treatments: PriorTreatmentRequirements,
    #[serde(default)]
    pub brain_metastases: Option<BrainMetastasesRequirement>,
    #[serde(default)]
    pub organ_function: OrganFunctionRequirements,
    #[serde(default)]
    pub prior_malignancy: PriorMalignancyRequirement,
    #[serde(default)]
    pub washout: WashoutRequirement,
    #[serde(default)]
    pub common_exclusions: Vec<String>,
    /// Extraction collaborator's confidence in its own parse, 0-1.
    #[serde(default = "default_extraction_confidence")]
    pub extraction_confidence: f64,
    #[serde(default)]
    pub extraction_notes: Vec<String>,
}

fn default_extraction_confidence() -> f64 {
    0.5
}

impl StructuredEligibility {
    /// One-shot cleanup performed when a candidate is loaded: uppercases
    /// biomarker keys, drops blank list entries, orders bound pairs, and
    /// clamps extraction confidence to [0,1]. Comparators assume this has run
    /// and never re-validate.
    pub fn normalized(mut self) -> Self {
        if let (Some(min), Some(max)) = (self.age.min, self.age.max) {
            if min > max {
                self.age = AgeRequirement {
                    min: Some(max),
                    max: Some(min),
                };
            }
        }
        if let (Some(min), Some(max)) = (self.ecog.min, self.ecog.max) {
            if min > max {
                self.ecog = EcogRequirement {
                    min: Some(max),
                    max: Some(min),
                };
            }
        }

        clean_list(&mut self.disease_stage.allowed);
        clean_list(&mut self.disease_stage.excluded);
        clean_list(&mut self.histology.allowed);
        clean_list(&mut self.histology.excluded);
        clean_list(&mut self.prior_treatments.required);
        clean_list(&mut self.prior_treatments.excluded);
        clean_list(&mut self.common_exclusions);

        let mut required_positive: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, mutations) in std::mem::take(&mut self.biomarkers.required_positive) {
            let key = name.trim().to_uppercase();
            if key.is_empty() {
                continue;
            }
            let entry = required_positive.entry(key).or_default();
            for mutation in mutations {
                let mutation = mutation.trim().to_string();
                if !mutation.is_empty() && !entry.contains(&mutation) {
                    entry.push(mutation);
                }
            }
        }
        self.biomarkers.required_positive = required_positive;

        self.biomarkers.required_negative = std::mem::take(&mut self.biomarkers.required_negative)
            .into_iter()
            .map(|name| name.trim().to_uppercase())
            .filter(|name| !name.is_empty())
            .collect();

        if let Some(marker) = &self.biomarkers.expression_marker {
            self.biomarkers.expression_marker = Some(marker.trim().to_uppercase());
        }

        self.extraction_confidence = self.extraction_confidence.clamp(0.0, 1.0);
        self
    }
}

fn clean_list(values: &mut Vec<String>) {
    values.retain(|value| !value.trim().is_empty());
    for value in values.iter_mut() {
        *value = value.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_orders_swapped_bounds_and_clamps_confidence() {
        let eligibility = StructuredEligibility {
            age: AgeRequirement {
                min: Some(80),
                max: Some(18),
            },
            extraction_confidence: 3.2,
            ..StructuredEligibility::default()
        };

        let normalized = eligibility.normalized();

        assert_eq!(normalized.age.min, Some(18));
        assert_eq!(normalized.age.max, Some(80));
        assert_eq!(normalized.extraction_confidence, 1.0);
    }

    #[test]
    fn normalization_uppercases_and_dedupes_biomarker_entries() {
        let mut eligibility = StructuredEligibility::default();
        eligibility.biomarkers.required_positive.insert(
            " egfr ".to_string(),
            vec!["L858R".to_string(), " L858R ".to_string(), String::new()],
        );
        eligibility.biomarkers.required_negative =
            vec!["alk".to_string(), "  ".to_string()];

        let normalized = eligibility.normalized();

        let egfr = normalized
            .biomarkers
            .required_positive
            .get("EGFR")
            .expect("key uppercased");
        assert_eq!(egfr, &vec!["L858R".to_string()]);
        assert_eq!(normalized.biomarkers.required_negative, vec!["ALK".to_string()]);
    }

    #[test]
    fn absent_sections_stay_unconstrained() {
        let normalized = StructuredEligibility::default().normalized();
        assert!(normalized.disease_stage.is_empty());
        assert!(normalized.prior_treatments.is_empty());
        assert!(normalized.brain_metastases.is_none());
    }
}
