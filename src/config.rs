//! Configuration management for the registry compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (semconv.toml)
//! - Environment variables (SEMCONV__*)
//!
//! ## Example config file (semconv.toml):
//! ```toml
//! [registry]
//! sources = ["registry"]
//! version = "1.0.0"
//!
//! [generate]
//! targets = ["rust", "python", "java"]
//! output_dir = "generated"
//!
//! [codegen.java]
//! package = "dev.jcosta.semconv"
//!
//! [validation]
//! warnings_as_errors = false
//!
//! [check]
//! strict = true
//! git_revision = "HEAD"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::codegen::{CodegenConfig, Target};
use crate::drift::Baseline;
use crate::error::Result;
use crate::loader::LoadConfig;
use crate::pipeline::GenerateRequest;
use crate::version::RegistryVersion;

/// Default file name, also written by `semconv-config init`
pub const CONFIG_FILE: &str = "semconv.toml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemconvConfig {
    /// Registry settings
    #[serde(default)]
    pub registry: RegistrySection,

    /// Generation settings
    #[serde(default)]
    pub generate: GenerateSection,

    /// Per-target render profiles
    #[serde(default)]
    pub codegen: CodegenConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationSection,

    /// Drift check settings
    #[serde(default)]
    pub check: CheckSection,
}

/// Where documents are read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Files or directories holding registry documents
    #[serde(default = "default_sources")]
    pub sources: Vec<PathBuf>,

    /// Overrides versions declared in documents
    #[serde(default)]
    pub version: Option<String>,

    /// Directory names skipped while walking sources
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateSection {
    #[serde(default = "default_targets")]
    pub targets: Vec<Target>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSection {
    /// Fail validation on warnings
    #[serde(default)]
    pub warnings_as_errors: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckSection {
    /// Exit non-zero on drift
    #[serde(default)]
    pub strict: bool,

    /// Directory holding persisted artifacts (defaults to `generate.output_dir`)
    #[serde(default)]
    pub baseline_dir: Option<PathBuf>,

    /// Read persisted artifacts from this git revision instead of the
    /// working tree
    #[serde(default)]
    pub git_revision: Option<String>,

    /// Repository holding the committed artifacts
    #[serde(default)]
    pub git_repo: Option<PathBuf>,
}

fn default_sources() -> Vec<PathBuf> {
    vec![PathBuf::from("registry")]
}

fn default_skip_dirs() -> Vec<String> {
    LoadConfig::default().skip_dirs
}

fn default_targets() -> Vec<Target> {
    Target::ALL.to_vec()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            version: None,
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl Default for GenerateSection {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            output_dir: default_output_dir(),
        }
    }
}

impl SemconvConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["semconv.toml", ".semconv.toml", "config/semconv.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "jcosta", "semconv") {
            let xdg_config = config_dir.config_dir().join(CONFIG_FILE);
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SEMCONV__GENERATE__TARGETS=rust,java
        builder = builder.add_source(
            Environment::with_prefix("SEMCONV")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("registry.sources")
                .with_list_parse_key("registry.skip_dirs")
                .with_list_parse_key("generate.targets"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Configured version override, parsed
    pub fn version(&self) -> Result<Option<RegistryVersion>> {
        Ok(self
            .registry
            .version
            .as_deref()
            .map(RegistryVersion::parse)
            .transpose()?)
    }

    /// Pipeline request for the configured sources and targets
    pub fn request(&self) -> Result<GenerateRequest> {
        let mut request = GenerateRequest::from_paths(self.registry.sources.clone())
            .targets(self.generate.targets.clone())
            .codegen(self.codegen.clone())
            .warnings_as_errors(self.validation.warnings_as_errors);
        request.load = LoadConfig {
            skip_dirs: self.registry.skip_dirs.clone(),
        };
        if let Some(version) = self.version()? {
            request = request.version(version);
        }
        Ok(request)
    }

    /// Where the drift check reads persisted artifacts from
    pub fn baseline(&self) -> Baseline {
        let dir = self
            .check
            .baseline_dir
            .clone()
            .unwrap_or_else(|| self.generate.output_dir.clone());
        match &self.check.git_revision {
            Some(revision) => Baseline::GitRevision {
                repo: self.check.git_repo.clone().unwrap_or_else(|| PathBuf::from(".")),
                revision: revision.clone(),
                subdir: dir,
            },
            None => Baseline::Directory(dir),
        }
    }

    /// Problems that would make a run fail before it starts
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.registry.sources.is_empty() {
            problems.push("registry.sources is empty".to_string());
        }
        if self.generate.targets.is_empty() {
            problems.push("generate.targets is empty".to_string());
        }
        if let Err(e) = self.version() {
            problems.push(format!("registry.version: {}", e));
        }
        if let Some(mismatch) = self.codegen.java.mismatch() {
            problems.push(mismatch);
        }
        if self.check.git_repo.is_some() && self.check.git_revision.is_none() {
            problems.push("check.git_repo is set without check.git_revision".to_string());
        }
        problems
    }
}
