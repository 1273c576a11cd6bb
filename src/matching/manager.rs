// src/matching/manager.rs - Runs every configured matcher and reconciles their results
use anyhow::{bail, Context, Result};
use chrono::Utc;
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::borrow::Borrow;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::matching::bucket::{FallbackSectionPick, NameHasher};
use crate::matching::computer::AffOrgMatchComputer;
use crate::matching::joiner::AffOrgJoiner;
use crate::matching::matcher::AffOrgMatcher;
use crate::matching::normalize::{prepare_affiliation, prepare_organization};
use crate::matching::project_org::DocumentOrganizationFetcher;
use crate::matching::voter::{create_default_voters, VoterConfig};
use crate::models::core::{
    Affiliation, DocumentToProject, MatchedOrganization, Organization, ProjectToOrganization,
};
use crate::models::matching::MatchingInputs;
use crate::models::stats_models::{MatcherStats, MatcherType, PipelineStats};
use crate::utils::get_memory_usage;
use crate::utils::progress_bars::logging::{
    log_pipeline_completion, log_pipeline_matcher_completed, log_pipeline_matcher_failed,
    log_pipeline_matcher_starting, log_pipeline_phase, log_pipeline_start,
};
use crate::utils::progress_bars::progress_config::ProgressConfig;

type MatcherResult = (Vec<MatchedOrganization>, MatcherStats);

/// Runs matchers over shared inputs. When several matchers link the same
/// (document, organization), the record of the earliest matcher is kept.
pub struct AffMatchingService {
    matchers: Vec<Arc<AffOrgMatcher>>,
    fetcher: DocumentOrganizationFetcher,
    max_concurrent_matchers: usize,
    progress_config: ProgressConfig,
}

impl AffMatchingService {
    pub fn new(matchers: Vec<AffOrgMatcher>, fetcher: DocumentOrganizationFetcher) -> Result<Self> {
        if matchers.is_empty() {
            bail!("Affiliation matching service requires at least one matcher");
        }
        Ok(Self {
            matchers: matchers.into_iter().map(Arc::new).collect(),
            fetcher,
            max_concurrent_matchers: num_cpus::get().max(1),
            progress_config: ProgressConfig {
                enabled: false,
                ..ProgressConfig::default()
            },
        })
    }

    pub fn with_max_concurrent_matchers(mut self, max_concurrent_matchers: usize) -> Self {
        self.max_concurrent_matchers = max_concurrent_matchers.max(1);
        self
    }

    pub fn with_progress_config(mut self, progress_config: ProgressConfig) -> Self {
        self.progress_config = progress_config;
        self
    }

    pub fn matcher_types(&self) -> Vec<MatcherType> {
        self.matchers
            .iter()
            .map(|matcher| matcher.matcher_type().clone())
            .collect()
    }

    /// Matches affiliations against organizations. Every input sequence is consumed
    /// once. Output is sorted by (document id, organization id) with one record per pair.
    pub async fn match_affiliations<A, O, D, P>(
        &self,
        affiliations: A,
        organizations: O,
        document_projects: D,
        project_organizations: P,
    ) -> Result<Vec<MatchedOrganization>>
    where
        A: IntoIterator,
        A::Item: Borrow<Affiliation>,
        O: IntoIterator,
        O::Item: Borrow<Organization>,
        D: IntoIterator,
        D::Item: Borrow<DocumentToProject>,
        P: IntoIterator,
        P::Item: Borrow<ProjectToOrganization>,
    {
        let mut stats = PipelineStats::new(Uuid::new_v4().to_string(), Utc::now().naive_utc());
        self.run(
            affiliations,
            organizations,
            document_projects,
            project_organizations,
            &mut stats,
        )
        .await
    }

    /// Same as [`AffMatchingService::match_affiliations`], recording counters and timings in `stats`.
    pub async fn run<A, O, D, P>(
        &self,
        affiliations: A,
        organizations: O,
        document_projects: D,
        project_organizations: P,
        stats: &mut PipelineStats,
    ) -> Result<Vec<MatchedOrganization>>
    where
        A: IntoIterator,
        A::Item: Borrow<Affiliation>,
        O: IntoIterator,
        O::Item: Borrow<Organization>,
        D: IntoIterator,
        D::Item: Borrow<DocumentToProject>,
        P: IntoIterator,
        P::Item: Borrow<ProjectToOrganization>,
    {
        let matcher_types = self.matcher_types();
        log_pipeline_start(&stats.run_id, &matcher_types, self.max_concurrent_matchers);

        log_pipeline_phase("Preparation", Some("normalizing records and fetching project evidence"));
        let preparation_start = Instant::now();
        let inputs = Arc::new(MatchingInputs {
            affiliations: affiliations
                .into_iter()
                .map(|affiliation| prepare_affiliation(affiliation.borrow()))
                .collect(),
            organizations: organizations
                .into_iter()
                .map(|organization| prepare_organization(organization.borrow()))
                .collect(),
            document_organizations: self.fetcher.fetch(document_projects, project_organizations),
        });
        stats.total_affiliations = inputs.affiliations.len();
        stats.total_organizations = inputs.organizations.len();
        stats.total_documents_with_evidence = inputs.document_organizations.len();
        stats.preparation_time = preparation_start.elapsed().as_secs_f64();
        info!(
            "Prepared {} affiliations, {} organizations, {} documents with project evidence in {:.2}s",
            stats.total_affiliations,
            stats.total_organizations,
            stats.total_documents_with_evidence,
            stats.preparation_time
        );

        log_pipeline_phase("Execution", Some("running matchers concurrently"));
        let matching_start = Instant::now();
        let multi_progress = self.progress_config.create_multi_progress();
        let main_pb = match &multi_progress {
            Some(mp) => Some(self.create_main_progress_bar(mp)?),
            None => None,
        };

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_matchers));
        let tasks: Vec<JoinHandle<Result<MatcherResult>>> = self
            .matchers
            .iter()
            .map(|matcher| {
                let matcher_pb = match &multi_progress {
                    Some(mp) if self.progress_config.should_show_detailed() => {
                        Some(self.create_matcher_spinner(mp, matcher.matcher_type()))
                    }
                    _ => None,
                };
                spawn_matcher_task(
                    Arc::clone(matcher),
                    Arc::clone(&inputs),
                    Arc::clone(&semaphore),
                    main_pb.clone(),
                    matcher_pb,
                )
            })
            .collect();

        let mut matcher_outputs = Vec::with_capacity(tasks.len());
        for (join_result, matcher_type) in join_all(tasks).await.into_iter().zip(&matcher_types) {
            match join_result {
                Ok(Ok(output)) => matcher_outputs.push(output),
                Ok(Err(e)) => {
                    log_pipeline_matcher_failed(matcher_type, &e);
                    return Err(e.context(format!("Matcher {} failed", matcher_type.as_str())));
                }
                Err(join_err) => {
                    log_pipeline_matcher_failed(matcher_type, &join_err);
                    bail!("Matcher {} task panicked: {}", matcher_type.as_str(), join_err);
                }
            }
        }

        log_pipeline_phase("Reconciliation", Some("keeping the first matcher's record per document-organization pair"));
        let (matched, kept_by_matcher) = reconcile_first_matcher_wins(&matcher_outputs);

        stats.matching_time = matching_start.elapsed().as_secs_f64();
        stats.total_matches = matched.len();
        stats.matcher_stats = matcher_outputs.into_iter().map(|(_, s)| s).collect();

        if let Some(pb) = &main_pb {
            let message = if self.progress_config.should_show_memory() {
                format!(
                    "{} matches (Memory: {} MB)",
                    matched.len(),
                    get_memory_usage().await
                )
            } else {
                format!("{} matches", matched.len())
            };
            pb.finish_with_message(message);
        }

        log_pipeline_completion(
            stats.total_matches,
            &stats.matcher_stats,
            &kept_by_matcher,
            matching_start.elapsed(),
        );
        Ok(matched)
    }

    fn create_main_progress_bar(&self, mp: &MultiProgress) -> Result<ProgressBar> {
        let pb = mp.add(ProgressBar::new(self.matchers.len() as u64));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.blue} [{elapsed_precise}] {bar:30.green/blue} {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb.set_message("Running matchers...");
        Ok(pb)
    }

    fn create_matcher_spinner(&self, mp: &MultiProgress, matcher_type: &MatcherType) -> ProgressBar {
        let spinner = mp.add(ProgressBar::new_spinner());
        match ProgressStyle::default_spinner().template("    {spinner:.cyan} {msg}") {
            Ok(style) => spinner.set_style(style),
            Err(e) => debug!("Falling back to default spinner style: {}", e),
        }
        spinner.enable_steady_tick(self.progress_config.refresh_interval());
        spinner.set_message(format!("{}: queued", matcher_type.as_str()));
        spinner
    }
}

fn spawn_matcher_task(
    matcher: Arc<AffOrgMatcher>,
    inputs: Arc<MatchingInputs>,
    semaphore: Arc<Semaphore>,
    main_pb: Option<ProgressBar>,
    matcher_pb: Option<ProgressBar>,
) -> JoinHandle<Result<MatcherResult>> {
    tokio::spawn(async move {
        let _permit = semaphore
            .acquire_owned()
            .await
            .context("Matcher semaphore closed")?;
        let matcher_type = matcher.matcher_type().clone();
        log_pipeline_matcher_starting(&matcher_type);
        if let Some(pb) = &matcher_pb {
            pb.set_message(format!("{}: matching...", matcher_type.as_str()));
        }

        let start = Instant::now();
        let (matched, stats) =
            tokio::task::spawn_blocking(move || matcher.match_affiliations(&inputs))
                .await
                .with_context(|| format!("Matcher {} panicked", matcher_type.as_str()))?;
        log_pipeline_matcher_completed(&stats, start.elapsed());

        if let Some(pb) = &matcher_pb {
            pb.finish_with_message(format!("{}: {} matches", matcher_type.as_str(), stats.matches));
        }
        if let Some(pb) = &main_pb {
            pb.inc(1);
        }
        Ok((matched, stats))
    })
}

/// Merges matcher outputs given in priority order. Returns the merged records sorted by
/// (document id, organization id) and the number of records each matcher contributed.
pub fn reconcile_first_matcher_wins(
    matcher_outputs: &[MatcherResult],
) -> (Vec<MatchedOrganization>, Vec<(String, usize)>) {
    let mut merged: BTreeMap<(&str, &str), &MatchedOrganization> = BTreeMap::new();
    let mut kept_by_matcher = Vec::with_capacity(matcher_outputs.len());
    for (matched, stats) in matcher_outputs {
        let mut kept = 0usize;
        for record in matched {
            match merged.entry((record.document_id.as_str(), record.organization_id.as_str())) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                    kept += 1;
                }
                Entry::Occupied(existing) => debug!(
                    "Dropping {} -> {} from {}, already matched by {}",
                    record.document_id,
                    record.organization_id,
                    record.matcher,
                    existing.get().matcher
                ),
            }
        }
        kept_by_matcher.push((stats.matcher.clone(), kept));
    }
    (merged.into_values().cloned().collect(), kept_by_matcher)
}

/// The default matchers in priority order, each with the full default voter list.
pub fn create_default_matchers(voter_config: &VoterConfig) -> Result<Vec<AffOrgMatcher>> {
    let matchers = vec![
        AffOrgMatcher::new(
            MatcherType::DocOrgRelation,
            AffOrgJoiner::DocOrgRelation,
            AffOrgMatchComputer::new(create_default_voters(voter_config))?,
        ),
        AffOrgMatcher::new(
            MatcherType::MainSectionHashBucket,
            AffOrgJoiner::hash_bucket(
                NameHasher::main_section(FallbackSectionPick::LastSection),
                NameHasher::main_section(FallbackSectionPick::FirstSection),
            ),
            AffOrgMatchComputer::new(create_default_voters(voter_config))?,
        ),
        AffOrgMatcher::new(
            MatcherType::FirstWordsHashBucket,
            AffOrgJoiner::hash_bucket(NameHasher::first_words(), NameHasher::first_words()),
            AffOrgMatchComputer::new(create_default_voters(voter_config))?,
        ),
    ];
    Ok(matchers)
}

pub fn create_default_service(
    doc_proj_confidence_threshold: Option<f32>,
    voter_config: &VoterConfig,
) -> Result<AffMatchingService> {
    voter_config.validate()?;
    let fetcher = DocumentOrganizationFetcher::new(doc_proj_confidence_threshold)?;
    if fetcher.threshold().is_none() {
        warn!("No document-project confidence threshold set, all project relations are used");
    }
    AffMatchingService::new(create_default_matchers(voter_config)?, fetcher)
}
