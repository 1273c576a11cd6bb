// src/models/stats_models.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifies a matching strategy. Written into every [`MatchedOrganization`](super::core::MatchedOrganization).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatcherType {
    DocOrgRelation,
    MainSectionHashBucket,
    FirstWordsHashBucket,
    Custom(String),
}

impl MatcherType {
    pub fn as_str(&self) -> &str {
        match self {
            MatcherType::DocOrgRelation => "docOrgRelation",
            MatcherType::MainSectionHashBucket => "mainSectionHashBucket",
            MatcherType::FirstWordsHashBucket => "firstWordsHashBucket",
            MatcherType::Custom(name) => name,
        }
    }
}

/// Outcome counters of one matcher run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatcherStats {
    pub matcher: String,
    pub affiliations_total: usize,
    pub candidate_pairs: usize,
    /// Distinct (document, organization) links emitted by the matcher.
    pub matches: usize,
    pub documents_matched: usize,
    pub matches_by_voter: BTreeMap<String, usize>,
}

/// Counters and timings of a whole affiliation matching run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub total_affiliations: usize,
    pub total_organizations: usize,
    pub total_documents_with_evidence: usize,
    pub total_matches: usize,
    pub preparation_time: f64,
    pub matching_time: f64,
    pub matcher_stats: Vec<MatcherStats>,
}

impl PipelineStats {
    pub fn new(run_id: String, run_timestamp: NaiveDateTime) -> Self {
        Self {
            run_id,
            run_timestamp,
            total_affiliations: 0,
            total_organizations: 0,
            total_documents_with_evidence: 0,
            total_matches: 0,
            preparation_time: 0.0,
            matching_time: 0.0,
            matcher_stats: Vec::new(),
        }
    }
}
