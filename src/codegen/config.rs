//! Codegen Configuration
//!
//! One render profile per target language. Profiles only affect how output
//! is laid out (file names, package, class name); which attributes appear
//! and in what order is fixed by the registry.
//!
//! Every field has a default so a config file may override a single value:
//!
//! ```toml
//! [codegen.java]
//! package = "com.example.semconv"
//! ```

use serde::{Deserialize, Serialize};

use super::Target;

/// Render profiles for every target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodegenConfig {
    #[serde(default)]
    pub rust: RustProfile,

    #[serde(default)]
    pub python: PythonProfile,

    #[serde(default)]
    pub java: JavaProfile,
}

impl CodegenConfig {
    /// Output file name for a target
    pub fn file_name(&self, target: Target) -> String {
        match target {
            Target::Rust => self.rust.file_name.clone(),
            Target::Python => self.python.file_name.clone(),
            Target::Java => self.java.file_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RustProfile {
    #[serde(default = "default_rust_file")]
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonProfile {
    #[serde(default = "default_python_file")]
    pub file_name: String,

    /// Class holding the constants
    #[serde(default = "default_class_name")]
    pub class_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JavaProfile {
    /// Defaults to `<class_name>.java`; javac requires the two to agree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default = "default_java_package")]
    pub package: String,

    #[serde(default = "default_class_name")]
    pub class_name: String,
}

fn default_rust_file() -> String {
    "attributes.rs".to_string()
}

fn default_python_file() -> String {
    "attributes.py".to_string()
}

fn default_java_package() -> String {
    "dev.jcosta.semconv".to_string()
}

fn default_class_name() -> String {
    "Attributes".to_string()
}

impl Default for RustProfile {
    fn default() -> Self {
        Self {
            file_name: default_rust_file(),
        }
    }
}

impl Default for PythonProfile {
    fn default() -> Self {
        Self {
            file_name: default_python_file(),
            class_name: default_class_name(),
        }
    }
}

impl JavaProfile {
    pub fn file_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("{}.java", self.class_name))
    }

    /// Explicit file name that does not match the public class
    pub fn mismatch(&self) -> Option<String> {
        let expected = format!("{}.java", self.class_name);
        match &self.file_name {
            Some(name) if *name != expected => Some(format!(
                "codegen.java.file_name '{}' does not match class '{}' (expected '{}')",
                name, self.class_name, expected
            )),
            _ => None,
        }
    }
}

impl Default for JavaProfile {
    fn default() -> Self {
        Self {
            file_name: None,
            package: default_java_package(),
            class_name: default_class_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_names() {
        let config = CodegenConfig::default();
        assert_eq!(config.file_name(Target::Rust), "attributes.rs");
        assert_eq!(config.file_name(Target::Python), "attributes.py");
        assert_eq!(config.file_name(Target::Java), "Attributes.java");
    }

    #[test]
    fn test_partial_override() {
        let config: CodegenConfig = toml::from_str(
            r#"
[java]
package = "com.example.semconv"
"#,
        )
        .unwrap();
        assert_eq!(config.java.package, "com.example.semconv");
        assert_eq!(config.java.class_name, "Attributes");
        assert_eq!(config.rust, RustProfile::default());
    }

    #[test]
    fn test_java_file_follows_class_name() {
        let config: CodegenConfig = toml::from_str(
            r#"
[java]
class_name = "SemconvAttributes"
"#,
        )
        .unwrap();
        assert_eq!(config.file_name(Target::Java), "SemconvAttributes.java");
        assert!(config.java.mismatch().is_none());
    }

    #[test]
    fn test_java_explicit_file_name_mismatch() {
        let mut java = JavaProfile::default();
        java.file_name = Some("Attributes.java".to_string());
        assert!(java.mismatch().is_none());

        java.class_name = "SemconvAttributes".to_string();
        assert_eq!(java.file_name(), "Attributes.java");
        assert!(java.mismatch().unwrap().contains("SemconvAttributes.java"));
    }
}
