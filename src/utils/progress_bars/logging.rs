// src/utils/progress_bars/logging.rs - Logging helpers for matchers and the matching pipeline
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::models::stats_models::{MatcherStats, MatcherType};

fn matcher_label(matcher_type: &MatcherType) -> (&'static str, &'static str) {
    match matcher_type {
        MatcherType::DocOrgRelation => ("DOC-ORG", "🔗"),
        MatcherType::MainSectionHashBucket => ("MAIN-SECTION", "🏛️"),
        MatcherType::FirstWordsHashBucket => ("FIRST-WORDS", "🔤"),
        MatcherType::Custom(_) => ("CUSTOM", "⚙️"),
    }
}

#[derive(Clone)]
pub struct MatchingLogger {
    matcher_name: &'static str,
    matcher_emoji: &'static str,
    start_time: Instant,
}

impl MatchingLogger {
    pub fn new(matcher_type: MatcherType) -> Self {
        let (matcher_name, matcher_emoji) = matcher_label(&matcher_type);
        Self {
            matcher_name,
            matcher_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, affiliation_count: usize, organization_count: usize) {
        info!(
            "[{}] {} 🚀 Starting matcher over {} affiliations and {} organizations",
            self.matcher_name, self.matcher_emoji, affiliation_count, organization_count
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.matcher_name, self.matcher_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.matcher_name, self.matcher_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_candidate_pairs(&self, candidate_pairs: usize, affiliation_count: usize) {
        let per_affiliation = if affiliation_count > 0 {
            candidate_pairs as f64 / affiliation_count as f64
        } else {
            0.0
        };
        info!(
            "[{}] {} 📈 Evaluated {} candidate pairs ({:.1} per affiliation)",
            self.matcher_name, self.matcher_emoji, candidate_pairs, per_affiliation
        );
    }

    pub fn log_voter_breakdown(&self, matches_by_voter: &BTreeMap<String, usize>) {
        for (voter, count) in matches_by_voter {
            debug!(
                "[{}] {}    • {}: {} matches",
                self.matcher_name, self.matcher_emoji, voter, count
            );
        }
    }

    pub fn log_completion(&self, matches: usize, documents_matched: usize) {
        info!(
            "[{}] {} 🎉 COMPLETED: {} document-organization matches across {} documents in {:.2?}",
            self.matcher_name,
            self.matcher_emoji,
            matches,
            documents_matched,
            self.start_time.elapsed()
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.matcher_name, self.matcher_emoji, message);
    }
}

// Pipeline-level logging functions
pub fn log_pipeline_start(run_id: &str, matchers: &[MatcherType], concurrency_limit: usize) {
    info!("🚀 ===== AFFILIATION MATCHING PIPELINE STARTING =====");
    info!("📅 Pipeline Run ID: {}", run_id);
    info!("⚙️  Configuration:");
    info!("   • {} matchers enabled", matchers.len());
    info!("   • Concurrency limit: {} simultaneous matchers", concurrency_limit);
    let labels: Vec<String> = matchers
        .iter()
        .map(|m| {
            let (_, emoji) = matcher_label(m);
            format!("{} {}", m.as_str(), emoji)
        })
        .collect();
    info!("🎯 Matchers (in priority order): {}", labels.join(", "));
    info!("=====================================================");
}

pub fn log_pipeline_phase(phase: &str, details: Option<&str>) {
    let msg = if let Some(details) = details {
        format!("🔄 Pipeline Phase: {} - {}", phase, details)
    } else {
        format!("🔄 Pipeline Phase: {}", phase)
    };
    info!("{}", msg);
}

pub fn log_pipeline_matcher_starting(matcher_type: &MatcherType) {
    let (name, emoji) = matcher_label(matcher_type);
    info!("🚦 [{}] {} Processing slot acquired, starting matcher", name, emoji);
}

pub fn log_pipeline_matcher_completed(stats: &MatcherStats, duration: Duration) {
    info!(
        "✅ [{}] completed in {:.2?}: {} candidate pairs, {} matches, {} documents",
        stats.matcher, duration, stats.candidate_pairs, stats.matches, stats.documents_matched
    );
}

pub fn log_pipeline_matcher_failed(matcher_type: &MatcherType, err: &dyn std::fmt::Display) {
    let (name, emoji) = matcher_label(matcher_type);
    error!("❌ [{}] {} Matcher failed: {}", name, emoji, err);
}

/// Final summary. `kept_by_matcher` holds the records each matcher contributed after
/// reconciliation, in matcher order.
pub fn log_pipeline_completion(
    total_matches: usize,
    matcher_stats: &[MatcherStats],
    kept_by_matcher: &[(String, usize)],
    duration: Duration,
) {
    info!("🏁 ===== AFFILIATION MATCHING PIPELINE COMPLETE =====");
    info!("⏱️  Total matching time: {:.2?}", duration);
    info!("📊 Total document-organization matches: {}", total_matches);
    for stats in matcher_stats {
        let kept = kept_by_matcher
            .iter()
            .find(|(matcher, _)| *matcher == stats.matcher)
            .map_or(0, |(_, kept)| *kept);
        info!(
            "   • {}: {} candidate pairs, {} matches, {} kept after reconciliation",
            stats.matcher, stats.candidate_pairs, stats.matches, kept
        );
        for (voter, count) in &stats.matches_by_voter {
            info!("       - {}: {}", voter, count);
        }
    }
    info!("=====================================================");
}
