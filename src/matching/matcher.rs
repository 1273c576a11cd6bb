// src/matching/matcher.rs - One matching strategy: a candidate source plus a match computer
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::matching::computer::AffOrgMatchComputer;
use crate::matching::joiner::AffOrgJoiner;
use crate::models::core::MatchedOrganization;
use crate::models::matching::{MatchStrength, MatchingInputs};
use crate::models::stats_models::{MatcherStats, MatcherType};
use crate::utils::progress_bars::logging::MatchingLogger;

#[derive(Debug)]
pub struct AffOrgMatcher {
    matcher_type: MatcherType,
    joiner: AffOrgJoiner,
    computer: AffOrgMatchComputer,
}

impl AffOrgMatcher {
    pub fn new(matcher_type: MatcherType, joiner: AffOrgJoiner, computer: AffOrgMatchComputer) -> Self {
        Self {
            matcher_type,
            joiner,
            computer,
        }
    }

    pub fn matcher_type(&self) -> &MatcherType {
        &self.matcher_type
    }

    /// Evaluates every candidate pair of the joiner. When several affiliations of a
    /// document match the same organization, the strongest verdict is kept.
    /// Output is sorted by (document id, organization id).
    pub fn match_affiliations(&self, inputs: &MatchingInputs) -> (Vec<MatchedOrganization>, MatcherStats) {
        let logger = MatchingLogger::new(self.matcher_type.clone());
        logger.log_start(inputs.affiliations.len(), inputs.organizations.len());
        logger.log_phase("Candidate evaluation", Some(self.joiner.describe()));

        let mut best: HashMap<(&str, &str), MatchStrength> = HashMap::new();
        let mut candidate_pairs = 0usize;
        for pair in self.joiner.join(inputs) {
            candidate_pairs += 1;
            if let Some(strength) = self.computer.evaluate(&pair) {
                best.entry((
                    pair.affiliation.document_id.as_str(),
                    pair.organization.id.as_str(),
                ))
                .and_modify(|current| {
                    if strength < *current {
                        *current = strength;
                    }
                })
                .or_insert(strength);
            }
        }
        logger.log_candidate_pairs(candidate_pairs, inputs.affiliations.len());
        if candidate_pairs == 0 && !inputs.affiliations.is_empty() {
            logger.log_warning("No candidate pairs produced, nothing to evaluate");
        }

        let mut matches_by_voter: BTreeMap<String, usize> = BTreeMap::new();
        let mut documents_matched: HashSet<&str> = HashSet::new();
        let mut matched = Vec::with_capacity(best.len());
        for ((document_id, organization_id), strength) in best {
            let voter = self
                .computer
                .voter_name(strength)
                .unwrap_or_default()
                .to_string();
            *matches_by_voter.entry(voter.clone()).or_insert(0) += 1;
            documents_matched.insert(document_id);
            matched.push(MatchedOrganization {
                document_id: document_id.to_string(),
                organization_id: organization_id.to_string(),
                matcher: self.matcher_type.as_str().to_string(),
                voter,
            });
        }
        matched.sort();

        let stats = MatcherStats {
            matcher: self.matcher_type.as_str().to_string(),
            affiliations_total: inputs.affiliations.len(),
            candidate_pairs,
            matches: matched.len(),
            documents_matched: documents_matched.len(),
            matches_by_voter,
        };
        logger.log_voter_breakdown(&stats.matches_by_voter);
        logger.log_completion(stats.matches, stats.documents_matched);

        (matched, stats)
    }
}
