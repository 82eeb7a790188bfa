//! Drift Tests
//!
//! Writes generated artifacts, then compares regenerated output against
//! them on disk and as committed to a git repository.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Repository, Signature};
use semconv_registry::codegen::{GeneratedArtifacts, Target, MANIFEST_FILE};
use semconv_registry::drift::{Baseline, ConsistencyChecker, DriftStatus, PersistedArtifacts};
use semconv_registry::pipeline::{self, GenerateRequest};
use semconv_registry::{RegistryError, RegistryVersion};
use tempfile::TempDir;

fn registry_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("registry")
}

fn generate() -> GeneratedArtifacts {
    pipeline::generate(&GenerateRequest::from_paths(vec![registry_dir()]))
        .unwrap()
        .artifacts
}

/// Copy of the sample registry with one brief edited
fn edited_registry(dir: &Path) -> PathBuf {
    let sources = dir.join("registry");
    fs::create_dir_all(&sources).unwrap();
    for name in ["code.yaml", "media.yaml", "user.yaml"] {
        let mut content = fs::read_to_string(registry_dir().join(name)).unwrap();
        if name == "user.yaml" {
            content = content.replace("Unique identifier of the user.", "Opaque identifier of the user.");
        }
        fs::write(sources.join(name), content).unwrap();
    }
    sources
}

fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Registry Bot", "registry@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).unwrap();
}

#[test]
fn test_fresh_output_matches_written_output() {
    let dir = TempDir::new().unwrap();
    let artifacts = generate();
    artifacts.write_to(dir.path()).unwrap();
    assert!(dir.path().join(MANIFEST_FILE).exists());

    let baseline = Baseline::Directory(dir.path().to_path_buf());
    let report = pipeline::check(&baseline.read(&artifacts).unwrap(), &generate());

    assert!(!report.drift_detected);
    assert!(!report.version_changed);
    assert!(report.artifacts.iter().all(|a| a.status == DriftStatus::Unchanged));
}

#[test]
fn test_edited_brief_is_drift_with_diff() {
    let dir = TempDir::new().unwrap();
    generate().write_to(&dir.path().join("generated")).unwrap();

    let sources = edited_registry(dir.path());
    let fresh = pipeline::generate(&GenerateRequest::from_paths(vec![sources]))
        .unwrap()
        .artifacts;
    let persisted = Baseline::Directory(dir.path().join("generated")).read(&fresh).unwrap();
    let report = pipeline::check(&persisted, &fresh);

    assert!(report.drift_detected);
    assert_eq!(report.drift_count(), 3);
    let rust = report.artifacts.iter().find(|a| a.target == Target::Rust).unwrap();
    match &rust.status {
        DriftStatus::Changed { diff } => {
            assert!(diff.contains("-/// Unique identifier of the user."));
            assert!(diff.contains("+/// Opaque identifier of the user."));
        }
        other => panic!("expected a change, got {:?}", other),
    }

    let strict = ConsistencyChecker::new().strict(true);
    assert!(matches!(strict.verify(&persisted, &fresh), Err(RegistryError::Drift { count: 3 })));
}

#[test]
fn test_never_generated_is_missing() {
    let dir = TempDir::new().unwrap();
    let fresh = generate();
    let persisted = Baseline::Directory(dir.path().to_path_buf()).read(&fresh).unwrap();

    assert!(persisted.is_empty());
    let report = pipeline::check(&persisted, &fresh);
    assert!(report.artifacts.iter().all(|a| a.status == DriftStatus::Missing));
    assert!(report.persisted_version.is_none());
}

#[test]
fn test_version_bump_is_reported() {
    let dir = TempDir::new().unwrap();
    generate().write_to(dir.path()).unwrap();

    let bumped = pipeline::generate(
        &GenerateRequest::from_paths(vec![registry_dir()]).version(RegistryVersion::parse("1.1.0").unwrap()),
    )
    .unwrap()
    .artifacts;
    let persisted = Baseline::Directory(dir.path().to_path_buf()).read(&bumped).unwrap();
    let report = pipeline::check(&persisted, &bumped);

    assert!(report.version_changed);
    assert_eq!(report.persisted_version.unwrap().to_string(), "1.0.0");
    assert!(report.drift_detected);
}

#[test]
fn test_git_baseline_reads_committed_snapshot() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    generate().write_to(&dir.path().join("generated")).unwrap();
    commit_all(&repo, "Generate attribute constants");

    // Uncommitted edits in the working tree are not part of the baseline
    fs::write(dir.path().join("generated/attributes.rs"), "// scratch\n").unwrap();

    let baseline = Baseline::GitRevision {
        repo: dir.path().to_path_buf(),
        revision: "HEAD".to_string(),
        subdir: PathBuf::from("generated"),
    };
    let fresh = generate();
    let persisted = baseline.read(&fresh).unwrap();

    assert_eq!(persisted.len(), 3);
    assert!(persisted.manifest().is_some());
    assert!(!pipeline::check(&persisted, &fresh).drift_detected);
}

#[test]
fn test_git_baseline_detects_drift_against_older_commit() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    generate().write_to(&dir.path().join("generated")).unwrap();
    commit_all(&repo, "Generate attribute constants");

    let sources = edited_registry(dir.path());
    let fresh = pipeline::generate(&GenerateRequest::from_paths(vec![sources]))
        .unwrap()
        .artifacts;
    let persisted =
        PersistedArtifacts::from_git(dir.path(), "HEAD", Path::new("generated"), &["attributes.rs"]).unwrap();

    let report = ConsistencyChecker::new().compare(&persisted, &fresh);
    let rust = report.artifacts.iter().find(|a| a.target == Target::Rust).unwrap();
    assert!(matches!(rust.status, DriftStatus::Changed { .. }));
    let python = report.artifacts.iter().find(|a| a.target == Target::Python).unwrap();
    assert_eq!(python.status, DriftStatus::Missing);
}

#[test]
fn test_git_baseline_unknown_revision_fails() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    generate().write_to(&dir.path().join("generated")).unwrap();
    commit_all(&repo, "Generate attribute constants");

    let baseline = Baseline::GitRevision {
        repo: dir.path().to_path_buf(),
        revision: "v9.9.9".to_string(),
        subdir: PathBuf::from("generated"),
    };
    assert!(matches!(baseline.read(&generate()), Err(RegistryError::Git(_))));
}
