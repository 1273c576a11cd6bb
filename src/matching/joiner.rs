// src/matching/joiner.rs - Candidate pair sources for matchers
use log::debug;
use std::collections::HashMap;
use std::rc::Rc;

use crate::matching::bucket::{BucketKey, NameHasher};
use crate::models::matching::{AffMatchOrganization, AffOrgPair, MatchingInputs};

pub type CandidatePairs<'a> = Box<dyn Iterator<Item = AffOrgPair<'a>> + 'a>;

/// Produces the (affiliation, organization) pairs a matcher evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffOrgJoiner {
    /// Pairs affiliations and organizations whose names hash to the same bucket.
    HashBucket {
        aff_hasher: NameHasher,
        org_hasher: NameHasher,
    },
    /// Pairs each affiliation with the organizations its document is linked to
    /// through project relations.
    DocOrgRelation,
}

impl AffOrgJoiner {
    pub fn hash_bucket(aff_hasher: NameHasher, org_hasher: NameHasher) -> Self {
        AffOrgJoiner::HashBucket {
            aff_hasher,
            org_hasher,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            AffOrgJoiner::HashBucket { .. } => "name hash buckets",
            AffOrgJoiner::DocOrgRelation => "document-organization relations",
        }
    }

    /// Lazily yields candidate pairs. Organizations are indexed once up front,
    /// affiliations are streamed.
    pub fn join<'a>(&self, inputs: &'a MatchingInputs) -> CandidatePairs<'a> {
        match *self {
            AffOrgJoiner::HashBucket {
                aff_hasher,
                org_hasher,
            } => {
                let buckets = index_by_bucket(&inputs.organizations, &org_hasher);
                debug!(
                    "Indexed {} organizations into {} buckets",
                    inputs.organizations.len(),
                    buckets.len()
                );
                Box::new(inputs.affiliations.iter().flat_map(move |affiliation| {
                    let key = aff_hasher.hash_sections(&affiliation.sections);
                    buckets.get(&key).map(Rc::clone).into_iter().flat_map(move |bucket| {
                        (0..bucket.len()).map(move |i| AffOrgPair::new(affiliation, bucket[i]))
                    })
                }))
            }
            AffOrgJoiner::DocOrgRelation => {
                let organizations_by_id: HashMap<&'a str, &'a AffMatchOrganization> = inputs
                    .organizations
                    .iter()
                    .map(|organization| (organization.id.as_str(), organization))
                    .collect();
                let evidence = &inputs.document_organizations;
                Box::new(inputs.affiliations.iter().flat_map(move |affiliation| {
                    let linked: Vec<&'a AffMatchOrganization> = evidence
                        .get(&affiliation.document_id)
                        .into_iter()
                        .flatten()
                        .filter_map(|org_id| {
                            let found = organizations_by_id.get(org_id.as_str()).copied();
                            if found.is_none() {
                                debug!(
                                    "Document {} linked to unknown organization {}, skipping",
                                    affiliation.document_id, org_id
                                );
                            }
                            found
                        })
                        .collect();
                    linked
                        .into_iter()
                        .map(move |organization| AffOrgPair::new(affiliation, organization))
                }))
            }
        }
    }
}

type Bucket<'a> = Rc<[&'a AffMatchOrganization]>;

/// Groups organizations by bucket key. Buckets are shared, not copied, by every
/// affiliation that probes them.
fn index_by_bucket<'a>(
    organizations: &'a [AffMatchOrganization],
    hasher: &NameHasher,
) -> HashMap<BucketKey, Bucket<'a>> {
    let mut buckets: HashMap<BucketKey, Vec<&'a AffMatchOrganization>> = HashMap::new();
    for organization in organizations {
        buckets
            .entry(hasher.hash_sections(&organization.sections))
            .or_default()
            .push(organization);
    }
    buckets
        .into_iter()
        .map(|(key, bucket)| (key, Rc::from(bucket)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::bucket::FallbackSectionPick;
    use crate::matching::project_org::combine_document_organizations;
    use crate::matching::voter::tests::{aff, org};

    fn ids(pairs: CandidatePairs<'_>) -> Vec<(String, String)> {
        let mut ids: Vec<(String, String)> = pairs
            .map(|pair| {
                (
                    pair.affiliation.document_id.clone(),
                    pair.organization.id.clone(),
                )
            })
            .collect();
        ids.sort();
        ids
    }

    fn main_section_joiner() -> AffOrgJoiner {
        AffOrgJoiner::hash_bucket(
            NameHasher::main_section(FallbackSectionPick::LastSection),
            NameHasher::main_section(FallbackSectionPick::FirstSection),
        )
    }

    #[test]
    fn test_hash_bucket_pairs_share_key() {
        let inputs = MatchingInputs {
            affiliations: vec![
                aff("D1", "Univ. of Warsaw, Poland", Some("PL")),
                aff("D2", "Jagiellonian University, Krakow", None),
            ],
            organizations: vec![
                org("O1", "University of Warsaw", None, Some("PL")),
                org("O2", "Warsaw University of Technology", None, Some("PL")),
            ],
            ..Default::default()
        };
        assert_eq!(
            ids(main_section_joiner().join(&inputs)),
            vec![("D1".to_string(), "O1".to_string())]
        );
    }

    #[test]
    fn test_hash_bucket_fans_out_many_to_many() {
        let inputs = MatchingInputs {
            affiliations: vec![
                aff("D1", "University of Warsaw", None),
                aff("D2", "Physics Dept., University of Warsaw", None),
            ],
            organizations: vec![
                org("O1", "University of Warsaw", None, None),
                org("O2", "University of Warsaw Library", None, None),
            ],
            ..Default::default()
        };
        assert_eq!(ids(main_section_joiner().join(&inputs)).len(), 4);
    }

    #[test]
    fn test_hash_bucket_empty_inputs_and_buckets() {
        let empty = MatchingInputs::default();
        assert_eq!(main_section_joiner().join(&empty).count(), 0);

        let no_orgs = MatchingInputs {
            affiliations: vec![aff("D1", "University of Warsaw", None)],
            ..Default::default()
        };
        assert_eq!(main_section_joiner().join(&no_orgs).count(), 0);
    }

    #[test]
    fn test_blank_names_share_one_bucket() {
        let inputs = MatchingInputs {
            affiliations: (0..50).map(|i| aff(&format!("D{}", i), "...", None)).collect(),
            organizations: vec![
                org("O1", " ", None, None),
                org("O2", "-", None, None),
                org("O3", "University of Warsaw", None, None),
            ],
            ..Default::default()
        };
        let buckets = index_by_bucket(&inputs.organizations, &NameHasher::first_words());
        assert_eq!(buckets[""].len(), 2);

        let pairs = ids(AffOrgJoiner::hash_bucket(NameHasher::first_words(), NameHasher::first_words())
            .join(&inputs));
        assert_eq!(pairs.len(), 100);
        assert!(pairs.iter().all(|(_, org_id)| org_id != "O3"));
    }

    #[test]
    fn test_relation_joiner_uses_document_evidence() {
        let inputs = MatchingInputs {
            affiliations: vec![
                aff("D1", "Some Lab, Somewhere", None),
                aff("D1", "Another Lab", None),
                aff("D2", "Unrelated", None),
            ],
            organizations: vec![
                org("O1", "University of Warsaw", None, None),
                org("O2", "CERN", None, None),
            ],
            document_organizations: combine_document_organizations(vec![
                ("D1", "O1"),
                ("D1", "O404"),
            ]),
        };
        assert_eq!(
            ids(AffOrgJoiner::DocOrgRelation.join(&inputs)),
            vec![
                ("D1".to_string(), "O1".to_string()),
                ("D1".to_string(), "O1".to_string()),
            ]
        );
    }
}
