use affmatch_lib::matching::manager::create_default_service;
use affmatch_lib::matching::voter::VoterConfig;
use affmatch_lib::models::core::{
    Affiliation, DocumentToProject, MatchedOrganization, Organization, ProjectToOrganization,
};
use affmatch_lib::utils::record_io::{read_records, write_records};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const AFFILIATIONS: &str = r#"{"documentId":"D1","position":0,"rawText":"Univ. of Warsaw, Poland","countryCode":"PL"}
{"documentId":"D2","position":0,"rawText":"Institute of Nuclear Physics, Krakow"}
{"documentId":"D3","position":0,"rawText":"Faculty of Physics, University of Warsaw","countryCode":"PL"}
{"documentId":"D3","position":1,"rawText":"ICM UW, Warsaw"}

{"documentId":"D4","position":0,"rawText":"Department of Chemistry, Nowhere College"}
"#;

const ORGANIZATIONS: &str = r#"{"id":"O1","name":"University of Warsaw","shortName":"UW","countryCode":"PL"}
{"id":"O2","name":"Jagiellonian University","shortName":"UJ","countryCode":"PL"}
{"id":"O3","name":"CERN","countryCode":"CH"}
"#;

const DOC_PROJ: &str = r#"{"documentId":"D2","projectId":"P1","confidenceLevel":0.5}
{"documentId":"D3","projectId":"P2","confidenceLevel":0.9}
"#;

const PROJ_ORG: &str = r#"{"projectId":"P1","organizationId":"O2"}
{"projectId":"P2","organizationId":"O1"}
"#;

fn write_fixtures(dir: &Path) {
    fs::write(dir.join("affiliations.json"), AFFILIATIONS).unwrap();
    fs::create_dir_all(dir.join("organizations")).unwrap();
    fs::write(dir.join("organizations").join("part-00000.json"), ORGANIZATIONS).unwrap();
    fs::write(dir.join("doc_proj.json"), DOC_PROJ).unwrap();
    fs::write(dir.join("proj_org.json"), PROJ_ORG).unwrap();
}

fn record(doc: &str, org: &str, matcher: &str, voter: &str) -> MatchedOrganization {
    MatchedOrganization {
        document_id: doc.to_string(),
        organization_id: org.to_string(),
        matcher: matcher.to_string(),
        voter: voter.to_string(),
    }
}

fn expected() -> Vec<MatchedOrganization> {
    vec![
        record("D1", "O1", "mainSectionHashBucket", "sectionedNameStrictCountryLoose"),
        record("D3", "O1", "docOrgRelation", "sectionedNameStrictCountryLoose"),
    ]
}

#[tokio::test]
async fn test_job_over_json_lines_fixtures() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());

    let affiliations: Vec<Affiliation> = read_records(dir.path().join("affiliations.json")).unwrap();
    let organizations: Vec<Organization> = read_records(dir.path().join("organizations")).unwrap();
    let document_projects: Vec<DocumentToProject> =
        read_records(dir.path().join("doc_proj.json")).unwrap();
    let project_organizations: Vec<ProjectToOrganization> =
        read_records(dir.path().join("proj_org.json")).unwrap();
    assert_eq!(affiliations.len(), 5);

    let service = create_default_service(Some(0.8), &VoterConfig::default()).unwrap();
    let matched = service
        .match_affiliations(&affiliations, &organizations, &document_projects, &project_organizations)
        .await
        .unwrap();
    assert_eq!(matched, expected());

    let output = dir.path().join("output").join("matched.json");
    write_records(&output, &matched).unwrap();
    let written: Vec<MatchedOrganization> = read_records(&output).unwrap();
    assert_eq!(written, matched);
}

#[test]
fn test_binary_writes_matched_organizations() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());
    let output = dir.path().join("out").join("matched.json");

    assert!(run_binary(
        dir.path(),
        &output,
        &["--doc-proj-confidence-threshold", "0.8"]
    ));

    let written: Vec<MatchedOrganization> = read_records(&output).unwrap();
    assert_eq!(written, expected());
}

fn run_binary(dir: &Path, output: &Path, extra_args: &[&str]) -> bool {
    Command::new(env!("CARGO_BIN_EXE_affmatch"))
        .current_dir(dir)
        .env("PROGRESS_ENABLED", "false")
        .arg("--input-aff-path")
        .arg(dir.join("affiliations.json"))
        .arg("--input-org-path")
        .arg(dir.join("organizations"))
        .arg("--input-doc-proj-path")
        .arg(dir.join("doc_proj.json"))
        .arg("--input-proj-org-path")
        .arg(dir.join("proj_org.json"))
        .arg("--output-path")
        .arg(output)
        .args(extra_args)
        .status()
        .unwrap()
        .success()
}

#[test]
fn test_binary_rejects_out_of_range_threshold() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());
    let output = dir.path().join("matched.json");

    assert!(!run_binary(dir.path(), &output, &["--doc-proj-confidence-threshold", "1.5"]));
    assert!(!output.exists());
}

#[test]
fn test_binary_rejects_unbounded_levenshtein_ratio() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());
    let output = dir.path().join("matched.json");

    assert!(!run_binary(dir.path(), &output, &["--levenshtein-ratio", "1.0"]));
    assert!(!output.exists());
    assert!(run_binary(dir.path(), &output, &["--levenshtein-ratio", "0.2"]));
    assert!(output.exists());
}

#[test]
fn test_binary_fails_on_malformed_affiliation() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());
    fs::write(
        dir.path().join("affiliations.json"),
        format!("{}{{\"documentId\":\n", AFFILIATIONS),
    )
    .unwrap();
    let output = dir.path().join("matched.json");

    assert!(!run_binary(dir.path(), &output, &[]));
    assert!(!output.exists());
}
