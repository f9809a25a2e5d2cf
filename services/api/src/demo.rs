use crate::infra::{seed_treatments, seed_trials, InMemoryTreatmentCatalog, InMemoryTrialCatalog};
use clap::Args;
use std::collections::BTreeMap;
use std::sync::Arc;
use trial_match::config::MatchingLimits;
use trial_match::error::AppError;
use trial_match::matching::{
    MatchConfig, MatchingService, PatientProfile, ResearcherTrialProfile,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Patient age for the demo profile
    #[arg(long, default_value_t = 52)]
    pub(crate) age: u32,
    /// ECOG performance status (0-4)
    #[arg(long, default_value_t = 1)]
    pub(crate) ecog: u8,
    /// Disease stage (e.g. IV)
    #[arg(long, default_value = "IV")]
    pub(crate) stage: String,
    /// Biomarker findings as NAME=value[,value...]; repeatable
    #[arg(long = "biomarker", default_value = "EGFR=L858R")]
    pub(crate) biomarkers: Vec<String>,
    /// Patient location used to filter trial sites
    #[arg(long)]
    pub(crate) location: Option<String>,
    /// Skip the competitor analysis portion of the demo
    #[arg(long)]
    pub(crate) skip_competitors: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = Arc::new(MatchingService::new(
        Arc::new(InMemoryTrialCatalog::seeded()),
        Arc::new(InMemoryTreatmentCatalog::seeded()),
        MatchConfig::default(),
        MatchingLimits {
            max_candidates: 1000,
        },
    ));

    let profile = PatientProfile {
        cancer_type: "NSCLC".to_string(),
        histology: Some("adenocarcinoma".to_string()),
        stage: Some(args.stage.clone()),
        biomarkers: parse_biomarkers(&args.biomarkers),
        age: Some(args.age),
        ecog_status: Some(args.ecog),
        prior_treatments: Vec::new(),
        brain_metastases: None,
        location: args.location.clone(),
    };

    println!("Trial matching demo");
    println!(
        "Catalog: {} trials, {} treatments (in-memory seed)",
        seed_trials().len(),
        seed_treatments().len()
    );
    println!(
        "Patient: age {}, ECOG {}, stage {}, biomarkers {:?}",
        args.age, args.ecog, args.stage, profile.biomarkers
    );

    let report = service.match_patient(profile).map_err(AppError::from)?;

    println!("\nTreatment matches ({})", report.total_treatments);
    for treatment in &report.treatments {
        println!(
            "- {} [{}] score {:.3}: {}",
            treatment.generic_name,
            treatment.drug_class.as_deref().unwrap_or("unclassified"),
            treatment.match_score,
            treatment.match_reason
        );
    }

    println!(
        "\nTrial matches ({}, {} skipped without structured criteria)",
        report.total_trials, report.skipped_unstructured
    );
    for trial in &report.trials {
        let eligibility = &trial.eligibility;
        println!(
            "- {} [{}] {} (score {:.3}, confidence {:.3})",
            trial.registry_id,
            trial.phase.as_deref().unwrap_or("unknown phase"),
            eligibility.tier.label(),
            eligibility.score,
            eligibility.confidence
        );
        println!("  {}", eligibility.explanation);
        for note in &eligibility.notes {
            println!("  note: {note}");
        }
    }

    if args.skip_competitors {
        return Ok(());
    }

    println!("\nCompetitor analysis demo");
    let researcher = ResearcherTrialProfile {
        registry_id: None,
        title: Some("Planned EGFR combination study".to_string()),
        phase: Some("Phase 2".to_string()),
        target_biomarkers: parse_biomarkers(&args.biomarkers),
        target_stages: vec!["IIIB".to_string(), "IV".to_string()],
        target_histology: vec!["adenocarcinoma".to_string()],
        target_locations: vec!["Iowa".to_string()],
        age_range: Some((18, 75)),
        ecog_max: Some(2),
        treatment_naive_only: Some(false),
        prior_treatments_excluded: Vec::new(),
    };

    let analysis = service
        .analyze_competitors(researcher)
        .map_err(AppError::from)?;

    println!("Competing trials: {}", analysis.total_competitors);
    for competitor in &analysis.competitors {
        println!(
            "- {} similarity {:.3} (biomarker {:.2}, stage {:.2}, geo {:.2}, phase {:.2}, eligibility {:.2})",
            competitor.registry_id,
            competitor.similarity_score,
            competitor.biomarker_overlap,
            competitor.stage_overlap,
            competitor.geographic_overlap,
            competitor.phase_proximity,
            competitor.eligibility_similarity
        );
    }

    let insights = &analysis.insights;
    println!(
        "Average similarity: {:.3}",
        insights.avg_similarity_score
    );
    if !insights.top_sponsors.is_empty() {
        println!("Top sponsors:");
        for sponsor in &insights.top_sponsors {
            println!("  - {} ({} trials)", sponsor.name, sponsor.count);
        }
    }
    if !insights.geographic_hotspots.is_empty() {
        println!("Geographic hotspots:");
        for hotspot in &insights.geographic_hotspots {
            println!("  - {} ({} sites)", hotspot.name, hotspot.count);
        }
    }
    if !insights.phase_distribution.is_empty() {
        println!("Phase distribution:");
        for (phase, count) in &insights.phase_distribution {
            println!("  - {phase}: {count}");
        }
    }

    Ok(())
}

/// Parses repeated NAME=value[,value...] biomarker arguments.
fn parse_biomarkers(raw: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut biomarkers = BTreeMap::new();
    for entry in raw {
        let (name, values) = match entry.split_once('=') {
            Some((name, values)) => (name, values),
            None => (entry.as_str(), "positive"),
        };
        let values: Vec<String> = values
            .split(',')
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();
        if !name.trim().is_empty() {
            biomarkers.insert(name.trim().to_string(), values);
        }
    }
    biomarkers
}
