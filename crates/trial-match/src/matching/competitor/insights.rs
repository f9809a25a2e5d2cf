use std::collections::BTreeMap;

use super::{CompetitorMatch, MarketInsights, NamedCount};
use crate::matching::rank::round3;

/// Aggregates the full surviving competitor set into market-level tables.
/// An empty set produces zeroed insights, never a division error.
pub(crate) fn generate(competitors: &[CompetitorMatch], table_size: usize) -> MarketInsights {
    if competitors.is_empty() {
        return MarketInsights {
            total_competing_trials: 0,
            top_sponsors: Vec::new(),
            geographic_hotspots: Vec::new(),
            phase_distribution: BTreeMap::new(),
            common_biomarkers: Vec::new(),
            avg_similarity_score: 0.0,
        };
    }

    let mut sponsor_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut region_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut phase_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut biomarker_counts: BTreeMap<String, usize> = BTreeMap::new();

    for competitor in competitors {
        if let Some(sponsor) = &competitor.sponsor {
            *sponsor_counts.entry(sponsor.clone()).or_default() += 1;
        }
        for site in &competitor.sites {
            if let Some(region) = &site.region {
                *region_counts.entry(region.clone()).or_default() += 1;
            }
        }
        if let Some(phase) = &competitor.phase {
            *phase_distribution.entry(phase.clone()).or_default() += 1;
        }
        for biomarker in &competitor.overlapping_biomarkers {
            *biomarker_counts.entry(biomarker.clone()).or_default() += 1;
        }
    }

    let total = competitors.len();
    let avg = competitors
        .iter()
        .map(|c| c.similarity_score)
        .sum::<f64>()
        / total as f64;

    MarketInsights {
        total_competing_trials: total,
        top_sponsors: top_counts(sponsor_counts, table_size),
        geographic_hotspots: top_counts(region_counts, table_size),
        phase_distribution,
        common_biomarkers: top_counts(biomarker_counts, table_size),
        avg_similarity_score: round3(avg),
    }
}

/// Highest counts first; equal counts break ties by name so the tables are
/// deterministic across runs.
fn top_counts(counts: BTreeMap<String, usize>, table_size: usize) -> Vec<NamedCount> {
    let mut entries: Vec<NamedCount> = counts
        .into_iter()
        .map(|(name, count)| NamedCount { name, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(table_size);
    entries
}
