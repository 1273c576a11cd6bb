// src/matching/normalize.rs - Name and country normalization shared by hashers and voters
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

use crate::models::core::{Affiliation, Organization};
use crate::models::matching::{AffMatchAffiliation, AffMatchOrganization};

/// Characters delimiting the sections of an affiliation or organization name.
pub const SECTION_DELIMITERS: [char; 2] = [',', ';'];

const CHAR_SUBSTITUTIONS: [(&str, &str); 9] = [
    ("&", " and "),
    ("+", " and "),
    ("'", ""),
    ("\u{2019}", ""),
    ("-", " "),
    (".", " "),
    ("/", " "),
    ("(", " "),
    (")", " "),
];

static ABBREVIATIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("univ", "university"),
        ("uni", "university"),
        ("inst", "institute"),
        ("dept", "department"),
        ("dpt", "department"),
        ("lab", "laboratory"),
        ("tech", "technology"),
        ("technol", "technology"),
        ("natl", "national"),
        ("intl", "international"),
        ("acad", "academy"),
        ("coll", "college"),
        ("sci", "science"),
        ("hosp", "hospital"),
        ("ctr", "center"),
        ("cntr", "center"),
        ("centre", "center"),
        ("assoc", "association"),
        ("assn", "association"),
        ("fac", "faculty"),
        ("sch", "school"),
    ])
});

static ABBREVIATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    let mut words: Vec<&str> = ABBREVIATIONS.keys().copied().collect();
    words.sort_unstable();
    Regex::new(&format!(r"\b({})\b", words.join("|"))).expect("invalid abbreviation regex")
});

/// Lowercases and folds punctuation to spaces, leaving words as written.
fn fold_punctuation(section: &str) -> String {
    let mut normalized = section.to_lowercase();
    for (pattern, replacement) in &CHAR_SUBSTITUTIONS {
        normalized = normalized.replace(pattern, replacement);
    }
    normalized
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes one section of a name: lowercase, punctuation folded to spaces,
/// abbreviations expanded, whitespace collapsed.
pub fn normalize_section(section: &str) -> String {
    let normalized = fold_punctuation(section);
    let expanded = ABBREVIATION_REGEX.replace_all(&normalized, |caps: &Captures| {
        ABBREVIATIONS
            .get(&caps[1])
            .copied()
            .unwrap_or_default()
            .to_string()
    });
    collapse_whitespace(&expanded)
}

/// Like [`normalize_section`] without abbreviation expansion. Short forms such as
/// "UNI" or "LAB" keep their written form.
pub fn normalize_plain_section(section: &str) -> String {
    collapse_whitespace(&fold_punctuation(section))
}

/// Splits a name on the section delimiters and normalizes every section.
/// Sections left empty by normalization are dropped, so blank input yields no sections.
pub fn split_sections(name: &str) -> Vec<String> {
    name.split(&SECTION_DELIMITERS[..])
        .map(normalize_section)
        .filter(|section| !section.is_empty())
        .collect()
}

/// Normalizes a whole name: its sections joined by a single space.
pub fn normalize_name(name: &str) -> String {
    split_sections(name).join(" ")
}

/// Sections normalized with [`normalize_plain_section`], empty ones dropped.
pub fn split_plain_sections(name: &str) -> Vec<String> {
    name.split(&SECTION_DELIMITERS[..])
        .map(normalize_plain_section)
        .filter(|section| !section.is_empty())
        .collect()
}

/// Short names are compared without spaces, so "U.W." and "UW" agree.
/// Abbreviations are not expanded.
pub fn compact_short_name(short_name: &str) -> String {
    fold_punctuation(short_name)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

pub fn normalize_country_code(code: Option<&str>) -> Option<String> {
    code.map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty())
}

pub fn prepare_affiliation(affiliation: &Affiliation) -> AffMatchAffiliation {
    let name = affiliation.matching_name();
    let sections = split_sections(name);
    AffMatchAffiliation {
        document_id: affiliation.document_id.clone(),
        position: affiliation.position,
        organization_name: sections.join(" "),
        sections,
        plain_sections: split_plain_sections(name),
        country_code: normalize_country_code(affiliation.country_code.as_deref()),
    }
}

pub fn prepare_organization(organization: &Organization) -> AffMatchOrganization {
    let sections = split_sections(&organization.name);
    AffMatchOrganization {
        id: organization.id.clone(),
        name: sections.join(" "),
        sections,
        short_name: organization
            .short_name
            .as_deref()
            .map(compact_short_name)
            .filter(|s| !s.is_empty()),
        country_code: normalize_country_code(organization.country_code.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_section() {
        assert_eq!(normalize_section("Univ. of Warsaw"), "university of warsaw");
        assert_eq!(normalize_section("  Dept.  of Physics "), "department of physics");
        assert_eq!(normalize_section("AT&T Bell Labs"), "at and t bell labs");
        assert_eq!(normalize_section("King's College"), "kings college");
        assert_eq!(normalize_section("King\u{2019}s College"), "kings college");
        assert_eq!(normalize_section("Max-Planck-Inst."), "max planck institute");
        assert_eq!(normalize_section("Université Paris-Sud"), "université paris sud");
        assert_eq!(normalize_section("..."), "");
    }

    #[test]
    fn test_abbreviations_only_expand_whole_words() {
        assert_eq!(normalize_section("University"), "university");
        assert_eq!(normalize_section("Institution"), "institution");
        assert_eq!(normalize_section("Lab of Labs"), "laboratory of labs");
    }

    #[test]
    fn test_short_names_keep_written_form() {
        assert_eq!(compact_short_name("UNI"), "uni");
        assert_eq!(compact_short_name("Tech. Lab"), "techlab");
        assert_eq!(compact_short_name("U.W."), "uw");
        assert_eq!(compact_short_name(" . "), "");
        assert_eq!(
            split_plain_sections("Lab of Sci., UNI Lima"),
            vec!["lab of sci", "uni lima"]
        );
    }

    #[test]
    fn test_split_sections() {
        assert_eq!(
            split_sections("Dept. of Physics, Univ. of Warsaw; Poland"),
            vec!["department of physics", "university of warsaw", "poland"]
        );
        assert_eq!(split_sections("ICM,, ,Warsaw"), vec!["icm", "warsaw"]);
        assert!(split_sections("").is_empty());
        assert!(split_sections(" , ;").is_empty());
    }

    #[test]
    fn test_normalize_name_joins_sections() {
        assert_eq!(normalize_name("Univ. of Warsaw, Poland"), "university of warsaw poland");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_normalize_country_code() {
        assert_eq!(normalize_country_code(Some(" pl ")), Some("PL".to_string()));
        assert_eq!(normalize_country_code(Some("  ")), None);
        assert_eq!(normalize_country_code(None), None);
    }

    #[test]
    fn test_prepare_records() {
        let aff = Affiliation {
            document_id: "D1".to_string(),
            position: 2,
            raw_text: "Univ. of Warsaw, Poland".to_string(),
            organization_name: None,
            country_code: Some("pl".to_string()),
            country_name: Some("Poland".to_string()),
        };
        let prepared = prepare_affiliation(&aff);
        assert_eq!(prepared.document_id, "D1");
        assert_eq!(prepared.position, 2);
        assert_eq!(prepared.sections, vec!["university of warsaw", "poland"]);
        assert_eq!(prepared.organization_name, "university of warsaw poland");
        assert_eq!(prepared.plain_sections, vec!["univ of warsaw", "poland"]);
        assert_eq!(prepared.country_code.as_deref(), Some("PL"));

        let org = Organization {
            id: "O1".to_string(),
            name: "University of Warsaw".to_string(),
            short_name: Some("U.W.".to_string()),
            country_code: None,
        };
        let prepared = prepare_organization(&org);
        assert_eq!(prepared.name, "university of warsaw");
        assert_eq!(prepared.short_name.as_deref(), Some("uw"));
        assert!(prepared.country_code.is_none());
    }
}
