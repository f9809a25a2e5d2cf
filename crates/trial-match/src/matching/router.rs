use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;

use super::competitor::{CompetitorMatch, MarketInsights};
use super::domain::{PatientProfile, ResearcherTrialProfile};
use super::engine::{TreatmentMatch, TrialMatch};
use super::repository::{TreatmentCatalog, TrialCatalog};
use super::service::{MatchServiceError, MatchingService};

/// Router builder exposing HTTP endpoints for patient matching and
/// competitive analysis. Inputs are structured profiles; free-text parsing
/// belongs to an upstream collaborator.
pub fn matching_router<T, D>(service: Arc<MatchingService<T, D>>) -> Router
where
    T: TrialCatalog + 'static,
    D: TreatmentCatalog + 'static,
{
    Router::new()
        .route("/api/v1/match/patient", post(match_patient_handler::<T, D>))
        .route(
            "/api/v1/competitors/analyze",
            post(analyze_competitors_handler::<T, D>),
        )
        .route(
            "/api/v1/competitors/profile/:registry_id",
            get(trial_profile_handler::<T, D>),
        )
        .with_state(service)
}

#[derive(Debug, Serialize)]
struct PatientMatchResponse {
    profile: PatientProfile,
    treatments: Vec<TreatmentMatch>,
    trials: Vec<TrialMatch>,
    total_treatments: usize,
    total_trials: usize,
    skipped_unstructured: usize,
    processing_time_ms: u128,
}

#[derive(Debug, Serialize)]
struct CompetitorAnalysisResponse {
    profile: ResearcherTrialProfile,
    competitors: Vec<CompetitorMatch>,
    insights: MarketInsights,
    total_competitors: usize,
    processing_time_ms: u128,
}

pub(crate) async fn match_patient_handler<T, D>(
    State(service): State<Arc<MatchingService<T, D>>>,
    axum::Json(profile): axum::Json<PatientProfile>,
) -> Response
where
    T: TrialCatalog + 'static,
    D: TreatmentCatalog + 'static,
{
    let started = Instant::now();
    match service.match_patient(profile) {
        Ok(report) => {
            let response = PatientMatchResponse {
                profile: report.profile,
                treatments: report.treatments,
                trials: report.trials,
                total_treatments: report.total_treatments,
                total_trials: report.total_trials,
                skipped_unstructured: report.skipped_unstructured,
                processing_time_ms: started.elapsed().as_millis(),
            };
            (StatusCode::OK, axum::Json(response)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn analyze_competitors_handler<T, D>(
    State(service): State<Arc<MatchingService<T, D>>>,
    axum::Json(profile): axum::Json<ResearcherTrialProfile>,
) -> Response
where
    T: TrialCatalog + 'static,
    D: TreatmentCatalog + 'static,
{
    let started = Instant::now();
    let echo = profile.clone();
    match service.analyze_competitors(profile) {
        Ok(analysis) => {
            let response = CompetitorAnalysisResponse {
                profile: echo,
                competitors: analysis.competitors,
                insights: analysis.insights,
                total_competitors: analysis.total_competitors,
                processing_time_ms: started.elapsed().as_millis(),
            };
            (StatusCode::OK, axum::Json(response)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn trial_profile_handler<T, D>(
    State(service): State<Arc<MatchingService<T, D>>>,
    Path(registry_id): Path<String>,
) -> Response
where
    T: TrialCatalog + 'static,
    D: TreatmentCatalog + 'static,
{
    match service.trial_as_profile(&registry_id) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: MatchServiceError) -> Response {
    let status = match &error {
        MatchServiceError::Profile(_) | MatchServiceError::TooManyCandidates { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MatchServiceError::UnknownTrial(_) => StatusCode::NOT_FOUND,
        MatchServiceError::Catalog(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
