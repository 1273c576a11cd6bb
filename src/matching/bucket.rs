// src/matching/bucket.rs - Bucket keys used to block affiliation/organization comparisons
use serde::{Deserialize, Serialize};

use crate::matching::normalize::split_sections;

/// Normalized blocking key. Records are compared only when their keys are equal.
/// The empty string is the bucket of names with nothing usable in them.
pub type BucketKey = String;

pub const EMPTY_BUCKET_KEY: &str = "";

/// Word prefixes marking the section that names the institution itself.
const MAIN_SECTION_WORD_PREFIXES: [&str; 8] = [
    "universit",
    "uniwersyt",
    "univerz",
    "universid",
    "polytechn",
    "politechn",
    "politecn",
    "hochschule",
];

const FIRST_WORDS_STOPWORDS: [&str; 26] = [
    "a", "an", "and", "at", "da", "de", "del", "della", "der", "des", "di", "do", "du", "et",
    "for", "in", "la", "le", "les", "of", "on", "the", "und", "van", "von", "y",
];

/// Which section to take from a multi-section name when no single main section is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackSectionPick {
    FirstSection,
    LastSection,
}

/// Hashes text to the first letters of its first significant words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstWordsHasher {
    pub number_of_words: usize,
    pub letters_per_word: usize,
}

impl Default for FirstWordsHasher {
    fn default() -> Self {
        Self {
            number_of_words: 2,
            letters_per_word: 3,
        }
    }
}

impl FirstWordsHasher {
    pub fn hash(&self, normalized: &str) -> BucketKey {
        normalized
            .split_whitespace()
            .filter(|word| !FIRST_WORDS_STOPWORDS.contains(word))
            .take(self.number_of_words)
            .flat_map(|word| word.chars().take(self.letters_per_word))
            .collect()
    }
}

/// Derives a [`BucketKey`] from a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameHasher {
    /// Hashes the main section of the name, falling back to the first or last section.
    MainSection {
        fallback: FallbackSectionPick,
        words: FirstWordsHasher,
    },
    /// Hashes the first words of the whole name.
    FirstWords(FirstWordsHasher),
}

impl NameHasher {
    pub fn main_section(fallback: FallbackSectionPick) -> Self {
        NameHasher::MainSection {
            fallback,
            words: FirstWordsHasher::default(),
        }
    }

    pub fn first_words() -> Self {
        NameHasher::FirstWords(FirstWordsHasher::default())
    }

    pub fn hash(&self, name: &str) -> BucketKey {
        self.hash_sections(&split_sections(name))
    }

    /// Same as [`NameHasher::hash`] for a name already split into normalized sections.
    pub fn hash_sections(&self, sections: &[String]) -> BucketKey {
        match self {
            NameHasher::MainSection { fallback, words } => pick_main_section(sections, *fallback)
                .map(|section| words.hash(section))
                .unwrap_or_default(),
            NameHasher::FirstWords(words) => words.hash(&sections.join(" ")),
        }
    }
}

fn is_main_section(section: &str) -> bool {
    section.split_whitespace().any(|word| {
        MAIN_SECTION_WORD_PREFIXES
            .iter()
            .any(|prefix| word.starts_with(prefix))
    })
}

/// Picks the section naming the institution. A name with exactly one section marked by a
/// university-like word yields that section; otherwise the fallback strategy decides.
pub fn pick_main_section(sections: &[String], fallback: FallbackSectionPick) -> Option<&str> {
    if sections.len() <= 1 {
        return sections.first().map(String::as_str);
    }
    let mut main_sections = sections.iter().filter(|s| is_main_section(s));
    if let (Some(main), None) = (main_sections.next(), main_sections.next()) {
        return Some(main.as_str());
    }
    let picked = match fallback {
        FallbackSectionPick::FirstSection => sections.first(),
        FallbackSectionPick::LastSection => sections.last(),
    };
    picked.map(String::as_str)
}
