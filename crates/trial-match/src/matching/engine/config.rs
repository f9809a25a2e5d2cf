use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Signed contributions used by the trial eligibility fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDeltas {
    pub range_met: f64,
    pub range_violated: f64,
    pub list_allowed: f64,
    pub list_excluded: f64,
    pub list_not_allowed: f64,
    pub biomarker_mutation: f64,
    pub biomarker_positive: f64,
    pub biomarker_unconfirmed: f64,
    pub biomarker_wild_type: f64,
    pub biomarker_conflict: f64,
    pub negative_marker_met: f64,
    pub negative_marker_violated: f64,
    pub expression_met: f64,
    pub expression_violated: f64,
    pub flag_agreement: f64,
    pub flag_violated: f64,
    pub history_required_met: f64,
    pub history_required_missing: f64,
    pub history_excluded_hit: f64,
    pub history_excluded_clear: f64,
    pub history_lines_met: f64,
    pub history_lines_violated: f64,
    pub naive_met: f64,
    pub naive_violated: f64,
}

impl Default for TrialDeltas {
    fn default() -> Self {
        Self {
            range_met: 0.1,
            range_violated: -0.5,
            list_allowed: 0.15,
            list_excluded: -0.5,
            list_not_allowed: -0.3,
            biomarker_mutation: 0.5,
            biomarker_positive: 0.4,
            biomarker_unconfirmed: 0.2,
            biomarker_wild_type: 0.2,
            biomarker_conflict: -0.5,
            negative_marker_met: 0.2,
            negative_marker_violated: -0.4,
            expression_met: 0.3,
            expression_violated: -0.3,
            flag_agreement: 0.05,
            flag_violated: -0.4,
            history_required_met: 0.15,
            history_required_missing: -0.3,
            history_excluded_hit: -0.4,
            history_excluded_clear: 0.1,
            history_lines_met: 0.05,
            history_lines_violated: -0.3,
            naive_met: 0.1,
            naive_violated: -0.4,
        }
    }
}

/// Contributions used by the treatment scorer (positive accumulation only;
/// treatments rank by score, there is no exclusion tier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentDeltas {
    pub mutation: f64,
    pub positive: f64,
    pub unconfirmed: f64,
    pub wild_type: f64,
    pub broad_class: f64,
}

impl Default for TreatmentDeltas {
    fn default() -> Self {
        Self {
            mutation: 1.0,
            positive: 0.8,
            unconfirmed: 0.5,
            wild_type: 0.6,
            broad_class: 0.3,
        }
    }
}

/// Component weights for the competitive similarity score; they sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub biomarker: f64,
    pub stage: f64,
    pub geographic: f64,
    pub phase: f64,
    pub eligibility: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            biomarker: 0.35,
            stage: 0.20,
            geographic: 0.20,
            phase: 0.10,
            eligibility: 0.15,
        }
    }
}

/// Immutable knobs for every scorer. Alternative weighting schemes are
/// expressed by constructing a different config, never by editing comparator
/// logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Recentering shift applied to the raw accumulator before clamping, so
    /// "net zero evidence" lands in the uncertain band.
    /// TODO: the shift and both tier thresholds are inherited defaults with no
    /// documented derivation; product-side calibration is still pending.
    pub score_shift: f64,
    /// Scores at or above this are tiered eligible.
    pub eligible_threshold: f64,
    /// Scores at or above this (but below eligible) are tiered uncertain.
    pub uncertain_threshold: f64,
    pub trial_deltas: TrialDeltas,
    pub treatment_deltas: TreatmentDeltas,
    pub similarity: SimilarityWeights,
    /// Named phases mapped onto an ordinal scale; combined phases sit on
    /// half steps.
    pub phase_positions: BTreeMap<String, f64>,
    /// Similarity decay per phase step.
    pub phase_step_penalty: f64,
    /// Similarity decay per ECOG step.
    pub ecog_step_penalty: f64,
    /// Trial-side age bounds assumed when structured criteria leave one open.
    pub default_trial_age: (u32, u32),
    /// Competitors at or below this overall similarity are discarded.
    pub min_similarity: f64,
    /// Surviving competitor list is truncated to this length after ranking.
    pub max_competitors: usize,
    /// Entries per frequency table in market insights.
    pub insight_table_size: usize,
    /// Drug classes broadly applicable without biomarker requirements.
    pub broad_drug_classes: Vec<String>,
    /// Eligibility-overlap score granted when treatment-naive flags disagree.
    pub naive_disagreement_score: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        let mut phase_positions = BTreeMap::new();
        phase_positions.insert("Phase 1".to_string(), 1.0);
        phase_positions.insert("Phase 1/Phase 2".to_string(), 1.5);
        phase_positions.insert("Phase 2".to_string(), 2.0);
        phase_positions.insert("Phase 2/Phase 3".to_string(), 2.5);
        phase_positions.insert("Phase 3".to_string(), 3.0);
        phase_positions.insert("Phase 4".to_string(), 4.0);

        Self {
            score_shift: 0.5,
            eligible_threshold: 0.7,
            uncertain_threshold: 0.3,
            trial_deltas: TrialDeltas::default(),
            treatment_deltas: TreatmentDeltas::default(),
            similarity: SimilarityWeights::default(),
            phase_positions,
            phase_step_penalty: 0.3,
            ecog_step_penalty: 0.5,
            default_trial_age: (18, 100),
            min_similarity: 0.1,
            max_competitors: 50,
            insight_table_size: 10,
            broad_drug_classes: vec![
                "chemotherapy".to_string(),
                "immunotherapy".to_string(),
                "pd-1".to_string(),
                "pd-l1".to_string(),
            ],
            naive_disagreement_score: 0.3,
        }
    }
}

impl MatchConfig {
    /// Ordinal position for a named phase, `None` for unmapped phases.
    pub fn phase_position(&self, phase: &str) -> Option<f64> {
        let needle = phase.trim();
        self.phase_positions
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(needle))
            .map(|(_, position)| *position)
    }

    /// Whether a drug class counts as broadly applicable systemic therapy.
    pub fn is_broad_drug_class(&self, drug_class: &str) -> bool {
        let class = drug_class.to_lowercase();
        self.broad_drug_classes
            .iter()
            .any(|term| class.contains(term))
    }
}
