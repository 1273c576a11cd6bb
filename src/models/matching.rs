// src/models/matching.rs
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Normalized view of an [`Affiliation`](super::core::Affiliation), built once before matching.
#[derive(Debug, Clone, PartialEq)]
pub struct AffMatchAffiliation {
    pub document_id: String,
    pub position: u32,
    /// Normalized name, sections joined by a single space.
    pub organization_name: String,
    /// Normalized comma-delimited sections of the name, in order.
    pub sections: Vec<String>,
    /// Sections folded the same way but with abbreviations left as written,
    /// compared against organization short names.
    pub plain_sections: Vec<String>,
    pub country_code: Option<String>,
}

/// Normalized view of an [`Organization`](super::core::Organization).
#[derive(Debug, Clone, PartialEq)]
pub struct AffMatchOrganization {
    pub id: String,
    pub name: String,
    pub sections: Vec<String>,
    pub short_name: Option<String>,
    pub country_code: Option<String>,
}

/// A candidate (affiliation, organization) pair produced by a joiner.
#[derive(Debug, Clone, Copy)]
pub struct AffOrgPair<'a> {
    pub affiliation: &'a AffMatchAffiliation,
    pub organization: &'a AffMatchOrganization,
}

impl<'a> AffOrgPair<'a> {
    pub fn new(affiliation: &'a AffMatchAffiliation, organization: &'a AffMatchOrganization) -> Self {
        Self {
            affiliation,
            organization,
        }
    }
}

/// Position of the voter that affirmed a pair. Lower is stricter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchStrength(pub usize);

impl MatchStrength {
    pub fn rank(&self) -> usize {
        self.0
    }
}

impl fmt::Display for MatchStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Organization ids linked to each document, deduplicated.
pub type DocumentOrganizations = HashMap<String, BTreeSet<String>>;

/// Prepared records shared read-only by every matcher of a run.
#[derive(Debug, Clone, Default)]
pub struct MatchingInputs {
    pub affiliations: Vec<AffMatchAffiliation>,
    pub organizations: Vec<AffMatchOrganization>,
    /// Indirect evidence from project relations.
    pub document_organizations: DocumentOrganizations,
}
