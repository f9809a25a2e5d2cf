//! Competitive similarity between a researcher's trial design and catalog
//! trials, plus market-level aggregation over the surviving set.

mod insights;
mod similarity;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{ResearcherTrialProfile, TrialRecord, TrialSite, TrialStatus};
use super::engine::MatchEngine;
use super::rank;

/// A competing trial with per-component similarity metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorMatch {
    pub registry_id: String,
    pub title: Option<String>,
    pub phase: Option<String>,
    pub status: TrialStatus,
    pub sponsor: Option<String>,
    /// Weighted overall similarity in [0,1], rounded to 3 decimals.
    pub similarity_score: f64,
    pub biomarker_overlap: f64,
    pub stage_overlap: f64,
    pub geographic_overlap: f64,
    pub phase_proximity: f64,
    pub eligibility_similarity: f64,
    pub overlapping_biomarkers: Vec<String>,
    pub overlapping_stages: Vec<String>,
    pub overlapping_locations: Vec<String>,
    pub sites: Vec<TrialSite>,
    pub study_url: Option<String>,
    pub brief_summary: Option<String>,
}

/// Name/count pair for frequency tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

/// Aggregated market intelligence over the surviving competitor set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInsights {
    pub total_competing_trials: usize,
    pub top_sponsors: Vec<NamedCount>,
    pub geographic_hotspots: Vec<NamedCount>,
    pub phase_distribution: BTreeMap<String, usize>,
    pub common_biomarkers: Vec<NamedCount>,
    /// Mean overall similarity, 0.0 for an empty set.
    pub avg_similarity_score: f64,
}

/// Competitor matches plus insights, in ranked order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    pub competitors: Vec<CompetitorMatch>,
    pub insights: MarketInsights,
    pub total_competitors: usize,
}

impl MatchEngine {
    /// Scores every candidate trial against the researcher's design,
    /// discards weak overlaps, ranks the survivors, and aggregates insights
    /// over the full surviving set before truncation.
    pub fn analyze_competitors(
        &self,
        profile: &ResearcherTrialProfile,
        candidates: &[TrialRecord],
    ) -> CompetitorAnalysis {
        let config = self.config();
        let mut survivors: Vec<CompetitorMatch> = candidates
            .iter()
            .filter(|trial| {
                profile
                    .registry_id
                    .as_deref()
                    .map(|own| !own.eq_ignore_ascii_case(&trial.registry_id))
                    .unwrap_or(true)
            })
            .filter_map(|trial| similarity::score(profile, trial, config))
            .collect();

        rank::rank_competitors(&mut survivors);

        let insights = insights::generate(&survivors, config.insight_table_size);
        let total_competitors = survivors.len();
        survivors.truncate(config.max_competitors);

        debug!(
            candidates = candidates.len(),
            survivors = total_competitors,
            returned = survivors.len(),
            "competitor analysis pass complete"
        );

        CompetitorAnalysis {
            competitors: survivors,
            insights,
            total_competitors,
        }
    }
}
