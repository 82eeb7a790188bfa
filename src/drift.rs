//! Drift Detection
//!
//! Compares freshly generated artifacts against the persisted ones, read
//! either from a directory or from a git revision (the committed snapshot).
//! Drift is reported, not raised: only [`DriftReport::ensure_clean`] and a
//! strict [`ConsistencyChecker`] turn it into an error.

use git2::{ErrorCode, Repository};
use serde::Serialize;
use similar::TextDiff;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::codegen::{GeneratedArtifacts, Manifest, Target, MANIFEST_FILE};
use crate::error::{RegistryError, Result};
use crate::version::RegistryVersion;

/// Lines of context around each hunk
const DIFF_CONTEXT: usize = 3;

// =============================================================================
// Baseline
// =============================================================================

/// Where persisted artifacts are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// Files on disk
    Directory(PathBuf),
    /// Files committed at `revision` under `subdir` of the repository at `repo`
    GitRevision {
        repo: PathBuf,
        revision: String,
        subdir: PathBuf,
    },
}

impl Baseline {
    /// Read the persisted counterparts of `expected` (same file names)
    pub fn read(&self, expected: &GeneratedArtifacts) -> Result<PersistedArtifacts> {
        let names: Vec<&str> = expected.iter().map(|a| a.file_name.as_str()).collect();
        match self {
            Baseline::Directory(dir) => PersistedArtifacts::from_dir(dir, &names),
            Baseline::GitRevision { repo, revision, subdir } => {
                PersistedArtifacts::from_git(repo, revision, subdir, &names)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Baseline::Directory(dir) => dir.display().to_string(),
            Baseline::GitRevision { repo, revision, subdir } => {
                format!("{}@{}:{}", repo.display(), revision, subdir.display())
            }
        }
    }
}

// =============================================================================
// Persisted artifacts
// =============================================================================

/// Previously written artifacts, keyed by file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedArtifacts {
    files: BTreeMap<String, String>,
    manifest: Option<Manifest>,
}

impl PersistedArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: impl Into<String>, content: impl Into<String>) {
        self.files.insert(file_name.into(), content.into());
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.files.get(file_name).map(String::as_str)
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Read the named files from `dir`. Files that do not exist are absent
    /// from the result; any other read failure is an error.
    pub fn from_dir(dir: &Path, file_names: &[&str]) -> Result<Self> {
        let mut persisted = Self::new();
        for name in file_names {
            if let Some(content) = read_optional(&dir.join(name))? {
                persisted.insert(*name, content);
            }
        }
        if let Some(json) = read_optional(&dir.join(MANIFEST_FILE))? {
            persisted.manifest = Some(Manifest::from_json(&json)?);
        }
        debug!(dir = %dir.display(), files = persisted.len(), "read persisted artifacts");
        Ok(persisted)
    }

    /// Read the named files as committed at `revision`.
    ///
    /// `revision` is anything `git rev-parse` accepts (`HEAD`, a tag, a
    /// branch, a commit id). `subdir` is relative to the repository root.
    pub fn from_git(repo_path: &Path, revision: &str, subdir: &Path, file_names: &[&str]) -> Result<Self> {
        let repo = Repository::open(repo_path)?;
        let tree = repo.revparse_single(revision)?.peel_to_tree()?;

        let read = |name: &str| -> Result<Option<String>> {
            match tree.get_path(&subdir.join(name)) {
                Ok(entry) => {
                    let blob = entry.to_object(&repo)?.peel_to_blob()?;
                    Ok(Some(String::from_utf8_lossy(blob.content()).into_owned()))
                }
                Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        };

        let mut persisted = Self::new();
        for name in file_names {
            if let Some(content) = read(name)? {
                persisted.insert(*name, content);
            }
        }
        if let Some(json) = read(MANIFEST_FILE)? {
            persisted.manifest = Some(Manifest::from_json(&json)?);
        }
        debug!(revision, files = persisted.len(), "read committed artifacts");
        Ok(persisted)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RegistryError::io(path, e)),
    }
}

// =============================================================================
// Report
// =============================================================================

/// Comparison outcome for one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DriftStatus {
    Unchanged,
    /// Unified diff from persisted to fresh
    Changed { diff: String },
    /// Never persisted
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDrift {
    pub target: Target,
    pub file_name: String,
    #[serde(flatten)]
    pub status: DriftStatus,
}

impl ArtifactDrift {
    pub fn is_drift(&self) -> bool {
        self.status != DriftStatus::Unchanged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub drift_detected: bool,
    /// Persisted manifest records a different registry version
    pub version_changed: bool,
    pub registry_version: RegistryVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted_version: Option<RegistryVersion>,
    pub artifacts: Vec<ArtifactDrift>,
}

impl DriftReport {
    pub fn drifted(&self) -> impl Iterator<Item = &ArtifactDrift> {
        self.artifacts.iter().filter(|a| a.is_drift())
    }

    pub fn drift_count(&self) -> usize {
        self.drifted().count()
    }

    /// Fail when any artifact drifted
    pub fn ensure_clean(&self) -> Result<()> {
        if self.drift_detected {
            Err(RegistryError::Drift {
                count: self.drift_count(),
            })
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// Checker
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyChecker {
    strict: bool,
}

impl ConsistencyChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat drift as an error in [`ConsistencyChecker::verify`]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Compare every fresh artifact with its persisted counterpart
    pub fn compare(&self, persisted: &PersistedArtifacts, fresh: &GeneratedArtifacts) -> DriftReport {
        let artifacts: Vec<ArtifactDrift> = fresh
            .iter()
            .map(|artifact| {
                let status = match persisted.get(&artifact.file_name) {
                    None => DriftStatus::Missing,
                    Some(old) if old == artifact.content => DriftStatus::Unchanged,
                    Some(old) => DriftStatus::Changed {
                        diff: unified_diff(&artifact.file_name, old, &artifact.content),
                    },
                };
                ArtifactDrift {
                    target: artifact.target,
                    file_name: artifact.file_name.clone(),
                    status,
                }
            })
            .collect();

        let persisted_version = persisted.manifest().map(|m| m.registry_version.clone());
        let version_changed = persisted_version
            .as_ref()
            .is_some_and(|v| v != fresh.registry_version());
        let drift_detected = artifacts.iter().any(ArtifactDrift::is_drift);

        if drift_detected {
            for drift in artifacts.iter().filter(|a| a.is_drift()) {
                warn!(target = %drift.target, file = %drift.file_name, "artifact drifted");
            }
        } else {
            info!(artifacts = artifacts.len(), "artifacts in sync");
        }

        DriftReport {
            drift_detected,
            version_changed,
            registry_version: fresh.registry_version().clone(),
            persisted_version,
            artifacts,
        }
    }

    /// Compare, failing in strict mode when drift is found
    pub fn verify(&self, persisted: &PersistedArtifacts, fresh: &GeneratedArtifacts) -> Result<DriftReport> {
        let report = self.compare(persisted, fresh);
        if self.strict {
            report.ensure_clean()?;
        }
        Ok(report)
    }
}

fn unified_diff(file_name: &str, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(DIFF_CONTEXT)
        .header(&format!("a/{}", file_name), &format!("b/{}", file_name))
        .to_string()
}
