// src/matching/computer.rs - Ordered voter evaluation producing a match strength
use anyhow::{bail, Result};

use crate::matching::voter::AffOrgMatchVoter;
use crate::models::matching::{AffOrgPair, MatchStrength};

/// Runs an ordered voter list over candidate pairs. The first affirming voter decides
/// the strength, so earlier voters must be the stricter ones.
#[derive(Debug)]
pub struct AffOrgMatchComputer {
    voters: Vec<Box<dyn AffOrgMatchVoter>>,
}

impl AffOrgMatchComputer {
    pub fn new(voters: Vec<Box<dyn AffOrgMatchVoter>>) -> Result<Self> {
        if voters.is_empty() {
            bail!("Match computer requires at least one voter");
        }
        Ok(Self { voters })
    }

    /// Strength of the first voter affirming the pair, `None` when no voter does.
    pub fn evaluate(&self, pair: &AffOrgPair<'_>) -> Option<MatchStrength> {
        self.voters
            .iter()
            .position(|voter| voter.vote(pair))
            .map(MatchStrength)
    }

    pub fn voter_name(&self, strength: MatchStrength) -> Option<&str> {
        self.voters.get(strength.rank()).map(|voter| voter.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::voter::tests::{aff, org};
    use crate::matching::voter::{create_default_voters, VoterConfig};

    #[test]
    fn test_empty_voter_list_is_rejected() {
        let err = AffOrgMatchComputer::new(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("at least one voter"));
    }

    #[test]
    fn test_first_affirming_voter_decides() {
        let computer = AffOrgMatchComputer::new(create_default_voters(&VoterConfig::default())).unwrap();
        let o = org("O1", "University of Warsaw", Some("UW"), Some("PL"));

        let exact = aff("D1", "University of Warsaw", Some("PL"));
        let strength = computer.evaluate(&AffOrgPair::new(&exact, &o)).unwrap();
        assert_eq!(strength, MatchStrength(0));
        assert_eq!(computer.voter_name(strength), Some("nameCountryStrict"));

        let no_country = aff("D1", "University of Warsaw", None);
        let strength = computer.evaluate(&AffOrgPair::new(&no_country, &o)).unwrap();
        assert_eq!(computer.voter_name(strength), Some("nameStrictCountryLoose"));

        let sectioned = aff("D1", "Faculty of Physics, University of Warsaw", None);
        let strength = computer.evaluate(&AffOrgPair::new(&sectioned, &o)).unwrap();
        assert_eq!(computer.voter_name(strength), Some("sectionedNameStrictCountryLoose"));

        let typo = aff("D1", "Faculty of Physics, Universty of Warsaw", None);
        let strength = computer.evaluate(&AffOrgPair::new(&typo, &o)).unwrap();
        assert_eq!(computer.voter_name(strength), Some("sectionedNameLevenshteinCountryLoose"));

        let short = aff("D1", "ICM UW, Warsaw", None);
        let strength = computer.evaluate(&AffOrgPair::new(&short, &o)).unwrap();
        assert_eq!(computer.voter_name(strength), Some("sectionedShortNameStrictCountryLoose"));
    }

    #[test]
    fn test_no_voter_affirms() {
        let computer = AffOrgMatchComputer::new(create_default_voters(&VoterConfig::default())).unwrap();
        let o = org("O1", "University of Warsaw", None, Some("PL"));
        let other = aff("D1", "Jagiellonian University, Krakow", Some("PL"));
        assert_eq!(computer.evaluate(&AffOrgPair::new(&other, &o)), None);

        let wrong_country = aff("D1", "University of Warsaw", Some("DE"));
        assert_eq!(computer.evaluate(&AffOrgPair::new(&wrong_country, &o)), None);
    }

    #[test]
    fn test_adding_voters_never_loses_a_match() {
        let config = VoterConfig::default();
        let o = org("O1", "University of Warsaw", Some("UW"), Some("PL"));
        let candidates = [
            aff("D1", "University of Warsaw", Some("PL")),
            aff("D1", "Dept. of Chemistry, Univ. of Warsaw", None),
            aff("D1", "ICM UW", None),
            aff("D1", "Warsaw School of Economics", None),
        ];

        let all = create_default_voters(&config);
        for prefix_len in 1..all.len() {
            let shorter = AffOrgMatchComputer::new(
                create_default_voters(&config).into_iter().take(prefix_len).collect(),
            )
            .unwrap();
            let longer = AffOrgMatchComputer::new(
                create_default_voters(&config).into_iter().take(prefix_len + 1).collect(),
            )
            .unwrap();
            for candidate in &candidates {
                let pair = AffOrgPair::new(candidate, &o);
                if let Some(strength) = shorter.evaluate(&pair) {
                    assert_eq!(longer.evaluate(&pair), Some(strength));
                }
            }
        }
    }
}
