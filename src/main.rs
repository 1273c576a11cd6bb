use affmatch_lib::matching::manager::create_default_service;
use affmatch_lib::matching::voter::VoterConfig;
use affmatch_lib::models::core::{
    Affiliation, DocumentToProject, Organization, ProjectToOrganization,
};
use affmatch_lib::models::stats_models::PipelineStats;
use affmatch_lib::utils::constants::HIGH_MEMORY_WARNING_MB;
use affmatch_lib::utils::env::load_env;
use affmatch_lib::utils::get_memory_usage;
use affmatch_lib::utils::progress_bars::progress_config::ProgressConfig;
use affmatch_lib::utils::record_io::{read_records, stream_records, write_records};
use anyhow::{Context, Error, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

/// Matches document affiliations against an organization registry.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AffMatchArgs {
    /// Affiliations (JSON Lines file or directory)
    #[arg(long, env = "AFFMATCH_INPUT_AFF_PATH")]
    input_aff_path: PathBuf,

    /// Organizations (JSON Lines file or directory)
    #[arg(long, env = "AFFMATCH_INPUT_ORG_PATH")]
    input_org_path: PathBuf,

    /// Document to project relations
    #[arg(long, env = "AFFMATCH_INPUT_DOC_PROJ_PATH")]
    input_doc_proj_path: PathBuf,

    /// Project to organization relations
    #[arg(long, env = "AFFMATCH_INPUT_PROJ_ORG_PATH")]
    input_proj_org_path: PathBuf,

    /// Output file of matched organizations
    #[arg(long, env = "AFFMATCH_OUTPUT_PATH")]
    output_path: PathBuf,

    /// Minimum confidence a document to project relation needs to be used, in [0, 1]
    #[arg(long, env = "AFFMATCH_DOC_PROJ_CONFIDENCE_THRESHOLD")]
    doc_proj_confidence_threshold: Option<f32>,

    /// Allowed edit distance of fuzzy name matching, as a fraction of the name length, in [0, 1)
    #[arg(long, env = "AFFMATCH_LEVENSHTEIN_RATIO", default_value_t = 0.1)]
    levenshtein_ratio: f64,

    /// Maximum number of matchers running at once (defaults to the CPU count)
    #[arg(long, env = "AFFMATCH_MAX_CONCURRENT_MATCHERS")]
    max_concurrent_matchers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = AffMatchArgs::parse();
    info!("Starting affiliation matching job");

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );

    let run_id = Uuid::new_v4().to_string();
    let run_timestamp = Utc::now().naive_utc();
    let mut stats = PipelineStats::new(run_id.clone(), run_timestamp);
    info!("Run ID: {} started at {}", run_id, run_timestamp);
    info!("Memory usage at start: {} MB", get_memory_usage().await);

    let voter_config = VoterConfig::with_levenshtein_ratio(args.levenshtein_ratio)
        .context("Invalid voter configuration")?;
    let mut service = create_default_service(args.doc_proj_confidence_threshold, &voter_config)
        .context("Failed to configure affiliation matching service")?
        .with_progress_config(progress_config);
    if let Some(limit) = args.max_concurrent_matchers {
        service = service.with_max_concurrent_matchers(limit);
    }

    let load_start = Instant::now();
    let organizations: Vec<Organization> = read_records(&args.input_org_path)
        .context("Failed to read organizations")?;
    let document_projects: Vec<DocumentToProject> = read_records(&args.input_doc_proj_path)
        .context("Failed to read document to project relations")?;
    let project_organizations: Vec<ProjectToOrganization> = read_records(&args.input_proj_org_path)
        .context("Failed to read project to organization relations")?;
    info!("Organizations and relations loaded in {:.2?}", load_start.elapsed());

    // Affiliations are decoded while they are prepared. The first bad record ends the stream.
    let mut affiliation_error: Option<Error> = None;
    let affiliations = stream_records::<Affiliation>(&args.input_aff_path)
        .context("Failed to open affiliations")?
        .scan(&mut affiliation_error, |error, record| match record {
            Ok(affiliation) => Some(affiliation),
            Err(e) => {
                **error = Some(e);
                None
            }
        });

    let matched = service
        .run(
            affiliations,
            &organizations,
            &document_projects,
            &project_organizations,
            &mut stats,
        )
        .await
        .context("Affiliation matching failed")?;
    if let Some(e) = affiliation_error {
        return Err(e.context("Failed to read affiliations"));
    }

    write_records(&args.output_path, &matched).context("Failed to write matched organizations")?;

    let memory_mb = get_memory_usage().await;
    if memory_mb > HIGH_MEMORY_WARNING_MB {
        warn!("⚠️ High memory usage: {} MB", memory_mb);
    }
    info!("===== RUN SUMMARY =====");
    info!("Run ID: {}", stats.run_id);
    info!(
        "Affiliations: {}, organizations: {}, documents with project evidence: {}",
        stats.total_affiliations, stats.total_organizations, stats.total_documents_with_evidence
    );
    info!(
        "Preparation: {:.2}s, matching: {:.2}s",
        stats.preparation_time, stats.matching_time
    );
    info!(
        "Matched organizations written: {} -> {}",
        stats.total_matches,
        args.output_path.display()
    );
    info!("Memory usage at end: {} MB", memory_mb);
    Ok(())
}
