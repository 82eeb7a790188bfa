//! Semantic Convention Registry
//!
//! Compiles YAML/JSON attribute documents into a single validated registry
//! and generates constant modules for Rust, Python and Java from it.
//!
//! ## Features
//!
//! - **Exhaustive Diagnostics**: Every malformed document, conflict and
//!   invariant violation is reported in one run
//! - **Order Independence**: The registry depends only on the set of
//!   declarations, never on the order documents were read
//! - **Deterministic Output**: Generated files and manifests are
//!   byte-identical across runs
//! - **Drift Detection**: Fresh output is compared with a directory or a
//!   git revision
//!
//! ## Pipeline
//!
//! ```text
//! documents ──► loader ──► resolve ──► validate ──► codegen ──► artifacts
//!                  │           │           │                       │
//!                  └───────────┴───────────┴─► Diagnostics         ▼
//!                                                        drift ◄── baseline
//! ```

pub mod checksum;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod drift;
pub mod error;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod validate;
pub mod version;

pub use checksum::Checksum;
pub use codegen::{CodegenConfig, GeneratedArtifact, GeneratedArtifacts, Manifest, Target};
pub use config::SemconvConfig;
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use drift::{Baseline, ConsistencyChecker, DriftReport, DriftStatus, PersistedArtifacts};
pub use error::{RegistryError, Result};
pub use loader::{SchemaLoader, SourceDocument};
pub use model::{AttributeDefinition, AttributeType, Constraint, ExampleValue, SignalKind, Stability};
pub use pipeline::{GenerateRequest, GenerationRun};
pub use registry::{Registry, ValidatedRegistry};
pub use resolve::Resolver;
pub use validate::Validator;
pub use version::RegistryVersion;
