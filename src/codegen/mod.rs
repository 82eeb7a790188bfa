//! Code Generation
//!
//! Renders a [`ValidatedRegistry`] into one source module per target
//! language.
//!
//! Architecture:
//! - AttributeDoc: everything an emitter needs about one attribute,
//!   computed once from the registry
//! - Emitters: language-specific formatters that consume AttributeDocs
//! - GeneratedArtifacts: ordered collection of outputs with checksums
//!
//! Emitters never read the registry directly and never touch the
//! filesystem, so rendering the same registry twice yields byte-identical
//! output. Targets render in parallel over the shared frozen registry.

pub mod config;
pub mod java;
pub mod names;
pub mod python;
pub mod rust;

pub use config::{CodegenConfig, JavaProfile, PythonProfile, RustProfile};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::checksum::Checksum;
use crate::error::{RegistryError, Result};
use crate::model::AttributeDefinition;
use crate::registry::ValidatedRegistry;
use crate::version::RegistryVersion;

/// First line of every generated file
pub const GENERATED_HEADER: &str = "DO NOT EDIT, this is an auto-generated file";

/// Name of the manifest written next to the artifacts
pub const MANIFEST_FILE: &str = "registry-manifest.json";

// =============================================================================
// Target
// =============================================================================

/// Output language
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Rust,
    Python,
    Java,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Rust, Target::Python, Target::Java];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Rust => "rust",
            Target::Python => "python",
            Target::Java => "java",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Target::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RegistryError::UnknownTarget(s.to_string()))
    }
}

// =============================================================================
// AttributeDoc
// =============================================================================

/// Pre-computed projection of one attribute for the emitters
#[derive(Debug, Clone)]
pub struct AttributeDoc<'a> {
    /// Generated constant name
    pub constant: String,
    pub attr: &'a AttributeDefinition,
    /// One sentence per signal constraint
    pub constraints: Vec<String>,
    /// Example literals as they read in source
    pub examples: Vec<String>,
    /// Replacement key and its constant, for deprecated attributes
    pub replacement: Option<(&'a str, String)>,
}

impl<'a> AttributeDoc<'a> {
    fn new(attr: &'a AttributeDefinition) -> Self {
        let replacement = attr
            .deprecated_by
            .as_deref()
            .filter(|_| attr.is_deprecated())
            .map(|key| (key, names::constant_name(key)));
        Self {
            constant: names::constant_name(&attr.key),
            attr,
            constraints: attr.constraints.iter().map(|c| c.describe()).collect(),
            examples: attr.examples.iter().map(|e| e.to_string()).collect(),
            replacement,
        }
    }

    /// Notes split into paragraphs on blank lines
    pub fn note_paragraphs(&self) -> Vec<Vec<&'a str>> {
        let Some(notes) = self.attr.notes.as_deref() else {
            return Vec::new();
        };
        let mut paragraphs = Vec::new();
        let mut current = Vec::new();
        for line in notes.trim().lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                if !current.is_empty() {
                    paragraphs.push(std::mem::take(&mut current));
                }
            } else {
                current.push(line);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current);
        }
        paragraphs
    }
}

/// Every attribute in key order
pub fn attribute_docs(registry: &ValidatedRegistry) -> Vec<AttributeDoc<'_>> {
    registry.attributes().map(AttributeDoc::new).collect()
}

// =============================================================================
// Artifacts
// =============================================================================

/// One rendered source module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub target: Target,
    pub file_name: String,
    pub content: String,
    pub checksum: Checksum,
}

impl GeneratedArtifact {
    pub fn new(target: Target, file_name: impl Into<String>, content: String) -> Self {
        Self {
            target,
            file_name: file_name.into(),
            checksum: Checksum::from_text(&content),
            content,
        }
    }
}

/// Entry in `registry-manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub target: Target,
    pub file_name: String,
    pub checksum: Checksum,
}

/// Record of what a generation run wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub registry_version: RegistryVersion,
    pub registry_checksum: Checksum,
    pub artifacts: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn entry(&self, target: Target) -> Option<&ManifestEntry> {
        self.artifacts.iter().find(|e| e.target == target)
    }
}

/// Artifacts from one run, keyed by target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifacts {
    registry_version: RegistryVersion,
    registry_checksum: Checksum,
    artifacts: BTreeMap<Target, GeneratedArtifact>,
}

impl GeneratedArtifacts {
    pub fn registry_version(&self) -> &RegistryVersion {
        &self.registry_version
    }

    pub fn get(&self, target: Target) -> Option<&GeneratedArtifact> {
        self.artifacts.get(&target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedArtifact> {
        self.artifacts.values()
    }

    pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
        self.artifacts.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            registry_version: self.registry_version.clone(),
            registry_checksum: self.registry_checksum.clone(),
            artifacts: self
                .artifacts
                .values()
                .map(|a| ManifestEntry {
                    target: a.target,
                    file_name: a.file_name.clone(),
                    checksum: a.checksum.clone(),
                })
                .collect(),
        }
    }

    /// Write every artifact and the manifest into `dir`.
    ///
    /// Returns the paths written, manifest last.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| RegistryError::io(dir, e))?;

        let mut written = Vec::with_capacity(self.artifacts.len() + 1);
        for artifact in self.artifacts.values() {
            let path = dir.join(&artifact.file_name);
            fs::write(&path, &artifact.content).map_err(|e| RegistryError::io(&path, e))?;
            debug!(target = %artifact.target, path = %path.display(), "wrote artifact");
            written.push(path);
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, self.manifest().to_json()?).map_err(|e| RegistryError::io(&manifest_path, e))?;
        written.push(manifest_path);

        info!(dir = %dir.display(), artifacts = self.artifacts.len(), "artifacts written");
        Ok(written)
    }
}

// =============================================================================
// Generation
// =============================================================================

/// Render one target
pub fn render(registry: &ValidatedRegistry, target: Target, config: &CodegenConfig) -> GeneratedArtifact {
    let docs = attribute_docs(registry);
    let version = registry.version();
    let content = match target {
        Target::Rust => rust::emit(&docs, version, &config.rust),
        Target::Python => python::emit(&docs, version, &config.python),
        Target::Java => java::emit(&docs, version, &config.java),
    };
    GeneratedArtifact::new(target, config.file_name(target), content)
}

/// Render every requested target in parallel. Duplicate targets are
/// rendered once.
pub fn generate(registry: &ValidatedRegistry, targets: &[Target], config: &CodegenConfig) -> GeneratedArtifacts {
    let mut targets = targets.to_vec();
    targets.sort();
    targets.dedup();

    let artifacts: BTreeMap<Target, GeneratedArtifact> = targets
        .par_iter()
        .map(|target| (*target, render(registry, *target, config)))
        .collect();

    info!(
        targets = artifacts.len(),
        attributes = registry.len(),
        version = %registry.version(),
        "generated artifacts"
    );

    GeneratedArtifacts {
        registry_version: registry.version().clone(),
        registry_checksum: registry.checksum(),
        artifacts,
    }
}

/// Comment line carrying the registry version, shared by all headers
pub(crate) fn version_line(version: &RegistryVersion) -> String {
    format!("Registry version: {}", version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::model::{AttributeType, ExampleValue, PrimitiveType};
    use crate::registry::Registry;
    use crate::validate::Validator;

    fn registry() -> ValidatedRegistry {
        let mut registry = Registry::new(RegistryVersion::parse("1.2.0").unwrap());
        registry.insert(
            AttributeDefinition::new(
                "user.id",
                AttributeType::Primitive(PrimitiveType::String),
                "Unique identifier of the user.",
                vec![ExampleValue::String("8f1c".into())],
            ),
            vec![],
        );
        Validator::new().validate(registry, Diagnostics::new()).unwrap()
    }

    #[test]
    fn test_target_from_str() {
        assert_eq!("rust".parse::<Target>().unwrap(), Target::Rust);
        assert_eq!("Java".parse::<Target>().unwrap(), Target::Java);
        assert!(matches!("go".parse::<Target>(), Err(RegistryError::UnknownTarget(t)) if t == "go"));
    }

    #[test]
    fn test_generate_dedups_targets() {
        let artifacts = generate(&registry(), &[Target::Java, Target::Rust, Target::Java], &CodegenConfig::default());
        assert_eq!(artifacts.targets().collect::<Vec<_>>(), vec![Target::Rust, Target::Java]);
    }

    #[test]
    fn test_every_artifact_has_header_and_version() {
        let artifacts = generate(&registry(), &Target::ALL, &CodegenConfig::default());
        for artifact in artifacts.iter() {
            assert!(artifact.content.lines().next().unwrap().contains(GENERATED_HEADER));
            assert!(artifact.content.contains("Registry version: 1.2.0"));
            assert!(artifact.content.contains("USER_ID"));
            assert!(artifact.checksum.verify(&artifact.content));
        }
    }

    #[test]
    fn test_manifest_round_trip() {
        let artifacts = generate(&registry(), &Target::ALL, &CodegenConfig::default());
        let manifest = artifacts.manifest();
        let parsed = Manifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
        assert_eq!(parsed.entry(Target::Python).unwrap().file_name, "attributes.py");
    }

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = generate(&registry(), &[Target::Rust], &CodegenConfig::default());
        let written = artifacts.write_to(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("attributes.rs").exists());
        assert!(dir.path().join(MANIFEST_FILE).exists());
    }

    #[test]
    fn test_note_paragraphs() {
        let attr = AttributeDefinition::new(
            "code.function.name",
            AttributeType::Primitive(PrimitiveType::String),
            "brief",
            vec![],
        )
        .with_notes("\nFirst line  \nsecond line\n\n  \n\nNext paragraph\t\n");
        let doc = AttributeDoc::new(&attr);
        assert_eq!(
            doc.note_paragraphs(),
            vec![vec!["First line", "second line"], vec!["Next paragraph"]]
        );
    }
}
