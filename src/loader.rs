//! Schema Loading
//!
//! Discovers registry documents on disk, reads them, and parses each one
//! into unresolved [`Fragment`]s tagged with their provenance.
//!
//! Reading is fatal on failure (the run aborts on the first unreadable
//! file). Parsing is not: a document that breaks the declaration grammar
//! becomes a `MalformedSchema` diagnostic and the remaining documents are
//! still parsed, so every malformed document is reported in one pass.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::error::{RegistryError, Result};
use crate::model::{AttributeDefinition, Fragment, Provenance};
use crate::version::RegistryVersion;

/// Configuration for document discovery
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Directory names never descended into
    pub skip_dirs: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            skip_dirs: vec![
                "target".to_string(),
                ".git".to_string(),
                "node_modules".to_string(),
            ],
        }
    }
}

/// Serialization format of a registry document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// A registry document read into memory
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Name used in provenance (the path as given)
    pub name: String,
    pub format: DocumentFormat,
    pub content: String,
}

impl SourceDocument {
    pub fn yaml(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: DocumentFormat::Yaml,
            content: content.into(),
        }
    }

    pub fn json(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: DocumentFormat::Json,
            content: content.into(),
        }
    }

    /// Read a document from disk. Files without a known extension are read as YAML.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
        Ok(Self {
            name: path.display().to_string(),
            format: DocumentFormat::from_path(path).unwrap_or(DocumentFormat::Yaml),
            content,
        })
    }
}

// =============================================================================
// Document grammar
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    groups: Vec<RawGroup>,
    #[serde(default)]
    attributes: Vec<AttributeDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGroup {
    namespace: String,
    #[serde(default)]
    #[allow(dead_code)]
    brief: Option<String>,
    attributes: Vec<AttributeDefinition>,
}

/// A successfully parsed document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub name: String,
    /// Registry version the document declares, if any
    pub version: Option<RegistryVersion>,
    pub fragments: Vec<Fragment>,
}

/// Parse one document into fragments.
///
/// Returns every grammar problem found in the document; a document with
/// any problem contributes no fragments.
pub fn parse_document(doc: &SourceDocument) -> std::result::Result<ParsedDocument, Vec<DiagnosticItem>> {
    let malformed = |message: String| DiagnosticItem::new(&doc.name, DiagnosticCode::MalformedSchema, message);

    if doc.content.trim().is_empty() {
        return Ok(ParsedDocument {
            name: doc.name.clone(),
            version: None,
            fragments: Vec::new(),
        });
    }

    let raw: RawDocument = match doc.format {
        DocumentFormat::Yaml => serde_yaml_ng::from_str(&doc.content).map_err(|e| vec![malformed(e.to_string())])?,
        DocumentFormat::Json => serde_json::from_str(&doc.content).map_err(|e| vec![malformed(e.to_string())])?,
    };

    let mut problems = Vec::new();

    let version = match raw.version.as_deref().map(RegistryVersion::parse) {
        Some(Ok(v)) => Some(v),
        Some(Err(e)) => {
            problems.push(malformed(format!("invalid registry version: {}", e)));
            None
        }
        None => None,
    };

    let mut fragments = Vec::new();
    let mut index = 0;
    for group in raw.groups {
        if group.namespace.trim().is_empty() {
            problems.push(malformed("group namespace must not be empty".to_string()));
        }
        for definition in group.attributes {
            if !in_namespace(&group.namespace, &definition.key) {
                problems.push(
                    malformed(format!(
                        "attribute '{}' is declared outside its group namespace '{}'",
                        definition.key, group.namespace
                    ))
                    .with_context(format!("declaration #{}", index)),
                );
            }
            fragments.push(Fragment {
                definition,
                provenance: Provenance {
                    document: doc.name.clone(),
                    index,
                },
            });
            index += 1;
        }
    }

    for definition in raw.attributes {
        fragments.push(Fragment {
            definition,
            provenance: Provenance {
                document: doc.name.clone(),
                index,
            },
        });
        index += 1;
    }

    if !problems.is_empty() {
        return Err(problems);
    }

    Ok(ParsedDocument {
        name: doc.name.clone(),
        version,
        fragments,
    })
}

/// Group namespaces may be dotted (`media.song`), so match on the literal prefix
fn in_namespace(namespace: &str, key: &str) -> bool {
    key.strip_prefix(namespace)
        .is_some_and(|rest| rest.starts_with('.') && rest.len() > 1)
}

/// Result of loading a set of documents
#[derive(Debug, Clone, Default)]
pub struct LoadedSources {
    pub documents: Vec<ParsedDocument>,
    /// `MalformedSchema` diagnostics for rejected documents
    pub diagnostics: Diagnostics,
}

impl LoadedSources {
    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.documents.iter().flat_map(|d| d.fragments.iter())
    }

    pub fn fragment_count(&self) -> usize {
        self.documents.iter().map(|d| d.fragments.len()).sum()
    }
}

/// Parse documents already in memory
pub fn load_documents(docs: &[SourceDocument]) -> LoadedSources {
    let mut loaded = LoadedSources::default();

    for doc in docs {
        match parse_document(doc) {
            Ok(parsed) => {
                debug!(document = %parsed.name, fragments = parsed.fragments.len(), "parsed document");
                loaded.documents.push(parsed);
            }
            Err(problems) => {
                debug!(document = %doc.name, problems = problems.len(), "rejected malformed document");
                for item in problems {
                    loaded.diagnostics.push(item);
                }
            }
        }
    }

    loaded
}

// =============================================================================
// Filesystem discovery
// =============================================================================

/// Discovers and reads registry documents
#[derive(Debug, Clone, Default)]
pub struct SchemaLoader {
    config: LoadConfig,
}

impl SchemaLoader {
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    /// Expand files and directories into a sorted, deduplicated document list
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();

        for path in paths {
            let meta = fs::metadata(path).map_err(|e| RegistryError::io(path, e))?;
            if meta.is_file() {
                found.push(path.clone());
                continue;
            }

            let walker = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !self.is_skipped(e.path(), e.depth()));

            for entry in walker {
                let entry = entry.map_err(|e| {
                    let at = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.clone());
                    RegistryError::io(at, e.into())
                })?;
                if entry.file_type().is_file() && DocumentFormat::from_path(entry.path()).is_some() {
                    found.push(entry.into_path());
                }
            }
        }

        found.sort();
        found.dedup();
        Ok(found)
    }

    fn is_skipped(&self, path: &Path, depth: usize) -> bool {
        depth > 0
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| self.config.skip_dirs.iter().any(|s| s == name))
    }

    /// Read every document under `paths`. The first unreadable file aborts.
    pub fn read_documents(&self, paths: &[PathBuf]) -> Result<Vec<SourceDocument>> {
        self.discover(paths)?
            .iter()
            .map(|p| SourceDocument::read(p))
            .collect()
    }

    /// Discover, read and parse documents
    pub fn load_paths(&self, paths: &[PathBuf]) -> Result<LoadedSources> {
        let docs = self.read_documents(paths)?;
        let loaded = load_documents(&docs);
        info!(
            documents = docs.len(),
            fragments = loaded.fragment_count(),
            malformed = loaded.diagnostics.error_count(),
            "loaded registry sources"
        );
        Ok(loaded)
    }
}
