//! Pipeline
//!
//! The library command surface: load, resolve, validate and render in one
//! call, and compare the result with what was persisted.
//!
//! Every semantic problem found along the way (malformed documents,
//! conflicts, validation failures) comes back together in a single
//! [`RegistryError::Invalid`]. Only I/O failures stop a run early.

use std::path::PathBuf;
use tracing::info;

use crate::codegen::{self, CodegenConfig, GeneratedArtifacts, Target};
use crate::diagnostics::Diagnostics;
use crate::drift::{ConsistencyChecker, DriftReport, PersistedArtifacts};
use crate::error::{RegistryError, Result};
use crate::loader::{load_documents, LoadConfig, SchemaLoader, SourceDocument};
use crate::registry::ValidatedRegistry;
use crate::resolve::Resolver;
use crate::validate::Validator;
use crate::version::RegistryVersion;

/// Where registry documents come from
#[derive(Debug, Clone)]
pub enum Sources {
    /// Files and directories on disk
    Paths(Vec<PathBuf>),
    /// Documents already in memory
    Documents(Vec<SourceDocument>),
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub sources: Sources,
    pub targets: Vec<Target>,
    /// Overrides any version declared in documents
    pub version: Option<RegistryVersion>,
    pub codegen: CodegenConfig,
    pub warnings_as_errors: bool,
    pub load: LoadConfig,
}

impl GenerateRequest {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            targets: Target::ALL.to_vec(),
            version: None,
            codegen: CodegenConfig::default(),
            warnings_as_errors: false,
            load: LoadConfig::default(),
        }
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self::new(Sources::Paths(paths))
    }

    pub fn from_documents(documents: Vec<SourceDocument>) -> Self {
        Self::new(Sources::Documents(documents))
    }

    pub fn targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = targets;
        self
    }

    pub fn version(mut self, version: RegistryVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn codegen(mut self, codegen: CodegenConfig) -> Self {
        self.codegen = codegen;
        self
    }

    pub fn warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct GenerationRun {
    pub registry: ValidatedRegistry,
    pub artifacts: GeneratedArtifacts,
}

impl GenerationRun {
    /// Warnings raised while validating
    pub fn warnings(&self) -> &Diagnostics {
        self.registry.warnings()
    }
}

/// Load, resolve and validate without rendering
pub fn compile(request: &GenerateRequest) -> Result<ValidatedRegistry> {
    let loaded = match &request.sources {
        Sources::Paths(paths) => SchemaLoader::new(request.load.clone()).load_paths(paths)?,
        Sources::Documents(documents) => load_documents(documents),
    };

    let mut resolver = Resolver::new();
    if let Some(version) = &request.version {
        resolver = resolver.with_version(version.clone());
    }
    let resolution = resolver.resolve(&loaded.documents);

    let mut diagnostics = loaded.diagnostics;
    diagnostics.merge(resolution.diagnostics);

    Validator::new()
        .warnings_as_errors(request.warnings_as_errors)
        .validate(resolution.registry, diagnostics)
        .map_err(RegistryError::Invalid)
}

/// Run the whole pipeline
pub fn generate(request: &GenerateRequest) -> Result<GenerationRun> {
    let registry = compile(request)?;
    let artifacts = codegen::generate(&registry, &request.targets, &request.codegen);
    info!(
        version = %registry.version(),
        checksum = %registry.checksum().short(),
        "generation complete"
    );
    Ok(GenerationRun { registry, artifacts })
}

/// Compare fresh artifacts against persisted ones. Never fails; drift is
/// reported in the returned value.
pub fn check(persisted: &PersistedArtifacts, fresh: &GeneratedArtifacts) -> DriftReport {
    ConsistencyChecker::new().compare(persisted, fresh)
}
