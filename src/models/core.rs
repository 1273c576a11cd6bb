// src/models/core.rs
use serde::{Deserialize, Serialize};

/// An affiliation extracted from a document's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affiliation {
    pub document_id: String,
    /// Index of the affiliation within its document.
    #[serde(default)]
    pub position: u32,
    pub raw_text: String,
    /// Organization part of the affiliation, when the extractor could isolate it.
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
}

impl Affiliation {
    /// Text used for name matching: the parsed organization name, or the raw text.
    pub fn matching_name(&self) -> &str {
        match self.organization_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.raw_text,
        }
    }
}

/// An organization from the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentToProject {
    pub document_id: String,
    pub project_id: String,
    /// Confidence of the reference, in [0, 1]. Missing means fully confident.
    #[serde(default)]
    pub confidence_level: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectToOrganization {
    pub project_id: String,
    pub organization_id: String,
}

/// A link between a document and an organization, the output of affiliation matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedOrganization {
    pub document_id: String,
    pub organization_id: String,
    /// Strategy (matcher) that produced the link.
    pub matcher: String,
    /// Voter that affirmed the link.
    pub voter: String,
}
