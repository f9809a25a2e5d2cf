use super::config::MatchConfig;
use super::TreatmentMatch;
use crate::matching::comparators::{required_positive_signal, BiomarkerSignal};
use crate::matching::domain::{PatientProfile, TreatmentRecord};
use crate::matching::rank::round3;

/// Scores one approved treatment against the patient's biomarkers.
///
/// Treatments rank by score alone; a record with neither score nor reasons is
/// dropped rather than surfaced as uncertain.
pub(crate) fn score(
    profile: &PatientProfile,
    treatment: &TreatmentRecord,
    config: &MatchConfig,
) -> Option<TreatmentMatch> {
    let deltas = &config.treatment_deltas;
    let mut raw = 0.0;
    let mut reasons: Vec<String> = Vec::new();

    if treatment.biomarker_requirements.is_empty() {
        let drug_class = treatment.drug_class.as_deref().unwrap_or("");
        if !config.is_broad_drug_class(drug_class) {
            return None;
        }
        raw = deltas.broad_class;
        reasons.push("Broadly applicable systemic therapy".to_string());
    }

    for (marker, required_values) in &treatment.biomarker_requirements {
        let marker = marker.trim().to_uppercase();
        let patient_values = profile.biomarkers.get(&marker).map(Vec::as_slice);
        match required_positive_signal(patient_values, required_values) {
            BiomarkerSignal::MutationMatch(shared) => {
                raw += deltas.mutation;
                reasons.push(format!("{marker} mutation match ({})", shared.join(", ")));
            }
            BiomarkerSignal::PositiveMatch => {
                raw += deltas.positive;
                reasons.push(format!("{marker} positive match"));
            }
            BiomarkerSignal::UnconfirmedMutation => {
                raw += deltas.unconfirmed;
                reasons.push(format!("{marker} positive (specific mutation check needed)"));
            }
            BiomarkerSignal::WildTypeMatch => {
                raw += deltas.wild_type;
                reasons.push(format!("{marker} wild-type match"));
            }
            BiomarkerSignal::Conflict
            | BiomarkerSignal::NoData
            | BiomarkerSignal::NoSignal => {}
        }
    }

    // Accumulation across several requirements can pass 1.0; renormalize by
    // the number of requirement entries so multi-marker therapies stay in
    // bounds.
    let requirement_count = treatment.biomarker_requirements.len().max(1);
    let score = if raw > 1.0 {
        (raw / requirement_count as f64).min(1.0)
    } else {
        raw
    };

    if score <= 0.0 && reasons.is_empty() {
        return None;
    }

    Some(TreatmentMatch {
        id: treatment.id.clone(),
        generic_name: treatment.generic_name.clone(),
        brand_names: treatment.brand_names.clone(),
        drug_class: treatment.drug_class.clone(),
        mechanism_of_action: treatment.mechanism_of_action.clone(),
        fda_approval_status: treatment.fda_approval_status.clone(),
        biomarker_requirements: treatment.biomarker_requirements.clone(),
        match_reason: reasons.join("; "),
        match_score: round3(score),
    })
}
