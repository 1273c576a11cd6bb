// src/matching/project_org.rs - Document -> organization evidence derived through projects
use anyhow::{bail, Result};
use log::{debug, info};
use std::borrow::Borrow;
use std::collections::HashMap;

use crate::models::core::{DocumentToProject, ProjectToOrganization};
use crate::models::matching::DocumentOrganizations;

/// Joins document -> project relations with project -> organization relations.
/// Relations below the confidence threshold are dropped before the join.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DocumentOrganizationFetcher {
    threshold: Option<f32>,
}

impl DocumentOrganizationFetcher {
    pub fn new(threshold: Option<f32>) -> Result<Self> {
        if let Some(value) = threshold {
            if !(0.0..=1.0).contains(&value) {
                bail!(
                    "Document to project confidence threshold must be within [0, 1], got {}",
                    value
                );
            }
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> Option<f32> {
        self.threshold
    }

    /// A relation without a confidence level counts as fully confident.
    pub fn accepts(&self, relation: &DocumentToProject) -> bool {
        match self.threshold {
            None => true,
            Some(threshold) => relation.confidence_level.unwrap_or(1.0) >= threshold,
        }
    }

    /// Consumes both relation sequences once. Project relations are indexed by
    /// project before the document relations are streamed past the threshold filter.
    pub fn fetch<D, P>(&self, document_projects: D, project_organizations: P) -> DocumentOrganizations
    where
        D: IntoIterator,
        D::Item: Borrow<DocumentToProject>,
        P: IntoIterator,
        P::Item: Borrow<ProjectToOrganization>,
    {
        let mut organizations_by_project: HashMap<String, Vec<String>> = HashMap::new();
        for relation in project_organizations {
            let relation: &ProjectToOrganization = relation.borrow();
            organizations_by_project
                .entry(relation.project_id.clone())
                .or_default()
                .push(relation.organization_id.clone());
        }

        let mut total = 0usize;
        let mut filtered_out = 0usize;
        let mut evidence = Vec::new();
        for relation in document_projects {
            let relation: &DocumentToProject = relation.borrow();
            total += 1;
            if !self.accepts(relation) {
                filtered_out += 1;
                debug!(
                    "Skipping document {} -> project {} below confidence threshold ({:?} < {:?})",
                    relation.document_id, relation.project_id, relation.confidence_level, self.threshold
                );
                continue;
            }
            if let Some(org_ids) = organizations_by_project.get(&relation.project_id) {
                evidence.extend(
                    org_ids
                        .iter()
                        .map(|org_id| (relation.document_id.clone(), org_id.clone())),
                );
            }
        }

        let combined = combine_document_organizations(evidence);
        info!(
            "Indirect evidence: {} documents linked to organizations ({} of {} document-project relations below threshold)",
            combined.len(),
            filtered_out,
            total
        );
        combined
    }
}

/// Groups (document, organization) evidence by document. Duplicates collapse, so
/// combining already-combined evidence changes nothing.
pub fn combine_document_organizations<I, D, O>(evidence: I) -> DocumentOrganizations
where
    I: IntoIterator<Item = (D, O)>,
    D: Into<String>,
    O: Into<String>,
{
    let mut combined = DocumentOrganizations::new();
    for (document_id, organization_id) in evidence {
        combined
            .entry(document_id.into())
            .or_default()
            .insert(organization_id.into());
    }
    combined
}
