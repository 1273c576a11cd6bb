// src/matching/voter.rs - Match voters deciding whether an affiliation names an organization
use anyhow::{bail, Result};
use std::fmt;

use strsim::levenshtein;

use crate::models::matching::{AffMatchOrganization, AffOrgPair};

/// A single deterministic matching heuristic.
pub trait AffOrgMatchVoter: fmt::Debug + Send + Sync {
    /// Stable identifier, written into the matched organization records.
    fn name(&self) -> &str;

    fn vote(&self, pair: &AffOrgPair<'_>) -> bool;
}

/// Tunables of the default voter family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoterConfig {
    /// Allowed edit distance as a fraction of the longer string's length.
    pub levenshtein_max_distance_ratio: f64,
    /// Strings shorter than this must match exactly.
    pub levenshtein_min_length: usize,
    /// Short names shorter than this are never compared.
    pub min_short_name_length: usize,
}

impl VoterConfig {
    /// Builds a config, rejecting a distance ratio that is not finite or outside `[0, 1)`.
    pub fn new(
        levenshtein_max_distance_ratio: f64,
        levenshtein_min_length: usize,
        min_short_name_length: usize,
    ) -> Result<Self> {
        let config = Self {
            levenshtein_max_distance_ratio,
            levenshtein_min_length,
            min_short_name_length,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_levenshtein_ratio(ratio: f64) -> Result<Self> {
        let defaults = Self::default();
        Self::new(ratio, defaults.levenshtein_min_length, defaults.min_short_name_length)
    }

    pub fn validate(&self) -> Result<()> {
        let ratio = self.levenshtein_max_distance_ratio;
        if !ratio.is_finite() || !(0.0..1.0).contains(&ratio) {
            bail!(
                "Levenshtein distance ratio must be a number in [0, 1), got {}",
                ratio
            );
        }
        Ok(())
    }
}

impl Default for VoterConfig {
    fn default() -> Self {
        Self {
            levenshtein_max_distance_ratio: 0.1,
            levenshtein_min_length: 5,
            min_short_name_length: 2,
        }
    }
}

/// Organization full name followed by its sections.
fn organization_names<'a>(org: &'a AffMatchOrganization) -> impl Iterator<Item = &'a str> {
    std::iter::once(org.name.as_str())
        .chain(org.sections.iter().map(String::as_str))
        .filter(|name| !name.is_empty())
}

#[derive(Debug, Default)]
pub struct CountryCodeStrictMatchVoter;

impl AffOrgMatchVoter for CountryCodeStrictMatchVoter {
    fn name(&self) -> &str {
        "countryCodeStrict"
    }

    fn vote(&self, pair: &AffOrgPair<'_>) -> bool {
        match (&pair.affiliation.country_code, &pair.organization.country_code) {
            (Some(aff_country), Some(org_country)) => aff_country == org_country,
            _ => false,
        }
    }
}

/// Affirms unless both countries are known and differ.
#[derive(Debug, Default)]
pub struct CountryCodeLooseMatchVoter;

impl AffOrgMatchVoter for CountryCodeLooseMatchVoter {
    fn name(&self) -> &str {
        "countryCodeLoose"
    }

    fn vote(&self, pair: &AffOrgPair<'_>) -> bool {
        match (&pair.affiliation.country_code, &pair.organization.country_code) {
            (Some(aff_country), Some(org_country)) => aff_country == org_country,
            _ => true,
        }
    }
}

#[derive(Debug, Default)]
pub struct NameStrictMatchVoter;

impl AffOrgMatchVoter for NameStrictMatchVoter {
    fn name(&self) -> &str {
        "nameStrict"
    }

    fn vote(&self, pair: &AffOrgPair<'_>) -> bool {
        let aff_name = &pair.affiliation.organization_name;
        !aff_name.is_empty() && *aff_name == pair.organization.name
    }
}

/// Affirms when a section of the affiliation equals the organization name or one of its sections.
#[derive(Debug, Default)]
pub struct SectionedNameStrictMatchVoter;

impl AffOrgMatchVoter for SectionedNameStrictMatchVoter {
    fn name(&self) -> &str {
        "sectionedNameStrict"
    }

    fn vote(&self, pair: &AffOrgPair<'_>) -> bool {
        pair.affiliation.sections.iter().any(|aff_section| {
            organization_names(pair.organization).any(|org_name| org_name == aff_section)
        })
    }
}

/// Like [`SectionedNameStrictMatchVoter`], tolerating a bounded edit distance.
#[derive(Debug)]
pub struct SectionedNameLevenshteinMatchVoter {
    max_distance_ratio: f64,
    min_length: usize,
}

impl SectionedNameLevenshteinMatchVoter {
    pub fn new(config: &VoterConfig) -> Self {
        Self {
            max_distance_ratio: config.levenshtein_max_distance_ratio,
            min_length: config.levenshtein_min_length,
        }
    }

    fn within_distance(&self, a: &str, b: &str) -> bool {
        let (len_a, len_b) = (a.chars().count(), b.chars().count());
        let max_len = len_a.max(len_b);
        if max_len < self.min_length {
            return a == b;
        }
        let max_distance = (max_len as f64 * self.max_distance_ratio).floor() as usize;
        if len_a.abs_diff(len_b) > max_distance {
            return false;
        }
        levenshtein(a, b) <= max_distance
    }
}

impl AffOrgMatchVoter for SectionedNameLevenshteinMatchVoter {
    fn name(&self) -> &str {
        "sectionedNameLevenshtein"
    }

    fn vote(&self, pair: &AffOrgPair<'_>) -> bool {
        pair.affiliation.sections.iter().any(|aff_section| {
            organization_names(pair.organization)
                .any(|org_name| self.within_distance(aff_section, org_name))
        })
    }
}

/// Affirms when a section, or a word of a section, equals the organization's short name.
/// Both sides are compared as written, without abbreviation expansion.
#[derive(Debug)]
pub struct SectionedShortNameStrictMatchVoter {
    min_short_name_length: usize,
}

impl SectionedShortNameStrictMatchVoter {
    pub fn new(config: &VoterConfig) -> Self {
        Self {
            min_short_name_length: config.min_short_name_length,
        }
    }
}

impl AffOrgMatchVoter for SectionedShortNameStrictMatchVoter {
    fn name(&self) -> &str {
        "sectionedShortNameStrict"
    }

    fn vote(&self, pair: &AffOrgPair<'_>) -> bool {
        let short_name = match pair.organization.short_name.as_deref() {
            Some(short) if short.chars().count() >= self.min_short_name_length => short,
            _ => return false,
        };
        pair.affiliation.plain_sections.iter().any(|section| {
            section.replace(' ', "") == short_name
                || section.split_whitespace().any(|word| word == short_name)
        })
    }
}

/// Affirms iff every one of its voters affirms.
#[derive(Debug)]
pub struct CompositeMatchVoter {
    name: String,
    voters: Vec<Box<dyn AffOrgMatchVoter>>,
}

impl CompositeMatchVoter {
    pub fn new(name: impl Into<String>, voters: Vec<Box<dyn AffOrgMatchVoter>>) -> Self {
        Self {
            name: name.into(),
            voters,
        }
    }
}

impl AffOrgMatchVoter for CompositeMatchVoter {
    fn name(&self) -> &str {
        &self.name
    }

    fn vote(&self, pair: &AffOrgPair<'_>) -> bool {
        !self.voters.is_empty() && self.voters.iter().all(|voter| voter.vote(pair))
    }
}

pub fn create_name_country_strict_match_voter() -> Box<dyn AffOrgMatchVoter> {
    Box::new(CompositeMatchVoter::new(
        "nameCountryStrict",
        vec![
            Box::new(NameStrictMatchVoter),
            Box::new(CountryCodeStrictMatchVoter),
        ],
    ))
}

pub fn create_name_strict_country_loose_match_voter() -> Box<dyn AffOrgMatchVoter> {
    Box::new(CompositeMatchVoter::new(
        "nameStrictCountryLoose",
        vec![
            Box::new(NameStrictMatchVoter),
            Box::new(CountryCodeLooseMatchVoter),
        ],
    ))
}

pub fn create_sectioned_name_strict_country_loose_match_voter() -> Box<dyn AffOrgMatchVoter> {
    Box::new(CompositeMatchVoter::new(
        "sectionedNameStrictCountryLoose",
        vec![
            Box::new(SectionedNameStrictMatchVoter),
            Box::new(CountryCodeLooseMatchVoter),
        ],
    ))
}

pub fn create_sectioned_name_levenshtein_country_loose_match_voter(
    config: &VoterConfig,
) -> Box<dyn AffOrgMatchVoter> {
    Box::new(CompositeMatchVoter::new(
        "sectionedNameLevenshteinCountryLoose",
        vec![
            Box::new(SectionedNameLevenshteinMatchVoter::new(config)),
            Box::new(CountryCodeLooseMatchVoter),
        ],
    ))
}

pub fn create_sectioned_short_name_strict_country_loose_match_voter(
    config: &VoterConfig,
) -> Box<dyn AffOrgMatchVoter> {
    Box::new(CompositeMatchVoter::new(
        "sectionedShortNameStrictCountryLoose",
        vec![
            Box::new(SectionedShortNameStrictMatchVoter::new(config)),
            Box::new(CountryCodeLooseMatchVoter),
        ],
    ))
}

/// The default voter list, strictest first.
pub fn create_default_voters(config: &VoterConfig) -> Vec<Box<dyn AffOrgMatchVoter>> {
    vec![
        create_name_country_strict_match_voter(),
        create_name_strict_country_loose_match_voter(),
        create_sectioned_name_strict_country_loose_match_voter(),
        create_sectioned_name_levenshtein_country_loose_match_voter(config),
        create_sectioned_short_name_strict_country_loose_match_voter(config),
    ]
}
