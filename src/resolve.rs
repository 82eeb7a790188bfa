//! Fragment Resolution
//!
//! Merges fragments from every document into one [`Registry`]. The merge is
//! commutative and associative: fragments are grouped in ordered maps and
//! provenances are sorted, so the result depends only on the set of
//! fragments and never on the order documents were loaded in.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::loader::ParsedDocument;
use crate::model::{AttributeDefinition, Fragment, Provenance};
use crate::registry::Registry;
use crate::version::RegistryVersion;

/// Outcome of a merge.
///
/// A conflicting key keeps the variant declared first (by provenance) so
/// the validator can still run over it and report everything else in the
/// same pass; the conflict itself is an error in `diagnostics`.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub registry: Registry,
    pub diagnostics: Diagnostics,
}

impl Resolution {
    pub fn into_result(self) -> Result<Registry, Diagnostics> {
        if self.diagnostics.has_errors() {
            Err(self.diagnostics)
        } else {
            Ok(self.registry)
        }
    }
}

/// One distinct definition of a key and where it was declared
struct Variant {
    definition: AttributeDefinition,
    declared_at: Vec<Provenance>,
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    version_override: Option<RegistryVersion>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag the registry with `version` regardless of what documents declare
    pub fn with_version(mut self, version: RegistryVersion) -> Self {
        self.version_override = Some(version);
        self
    }

    /// Merge parsed documents
    pub fn resolve(&self, documents: &[ParsedDocument]) -> Resolution {
        let fragments = documents.iter().flat_map(|d| d.fragments.iter().cloned());
        let versions = documents
            .iter()
            .filter_map(|d| d.version.clone().map(|v| (d.name.clone(), v)));
        self.resolve_fragments(fragments, versions)
    }

    /// Merge fragments and the versions their documents declared
    pub fn resolve_fragments(
        &self,
        fragments: impl IntoIterator<Item = Fragment>,
        declared_versions: impl IntoIterator<Item = (String, RegistryVersion)>,
    ) -> Resolution {
        let mut diagnostics = Diagnostics::new();
        let version = self.resolve_version(declared_versions, &mut diagnostics);
        let mut registry = Registry::new(version);

        let mut by_key: BTreeMap<String, BTreeMap<Checksum, Variant>> = BTreeMap::new();
        for fragment in fragments {
            let checksum = fragment.definition.checksum();
            let variants = by_key.entry(fragment.definition.key.clone()).or_default();
            variants
                .entry(checksum)
                .or_insert_with(|| Variant {
                    definition: fragment.definition,
                    declared_at: Vec::new(),
                })
                .declared_at
                .push(fragment.provenance);
        }

        for (key, variants) in by_key {
            let mut variants: Vec<Variant> = variants.into_values().collect();
            for variant in &mut variants {
                variant.declared_at.sort();
            }
            variants.sort_by(|a, b| a.declared_at.first().cmp(&b.declared_at.first()));

            if variants.len() > 1 {
                report_conflicts(&key, &variants, &mut diagnostics);
            } else if variants[0].declared_at.len() > 1 {
                debug!(key = %key, declarations = variants[0].declared_at.len(), "identical re-declaration");
            }

            let mut variants = variants.into_iter();
            if let Some(first) = variants.next() {
                registry.insert(first.definition, first.declared_at);
            }
        }

        debug!(attributes = registry.len(), version = %registry.version(), "resolved registry");
        Resolution { registry, diagnostics }
    }

    fn resolve_version(
        &self,
        declared: impl IntoIterator<Item = (String, RegistryVersion)>,
        diagnostics: &mut Diagnostics,
    ) -> RegistryVersion {
        let mut by_version: BTreeMap<RegistryVersion, Vec<String>> = BTreeMap::new();
        for (document, version) in declared {
            by_version.entry(version).or_default().push(document);
        }

        if let Some(version) = &self.version_override {
            return version.clone();
        }

        if by_version.len() > 1 {
            let mut item = DiagnosticItem::new(
                "registry",
                DiagnosticCode::VersionConflict,
                format!("documents declare {} different registry versions", by_version.len()),
            );
            for (version, documents) in &mut by_version {
                documents.sort();
                item = item.with_context(format!("{}: {}", version, documents.join(", ")));
            }
            warn!("registry version conflict across documents");
            diagnostics.push(item);
        }

        by_version.into_keys().next().unwrap_or_default()
    }
}

fn report_conflicts(key: &str, variants: &[Variant], diagnostics: &mut Diagnostics) {
    let first = &variants[0];
    for other in &variants[1..] {
        let (Some(a), Some(b)) = (first.declared_at.first(), other.declared_at.first()) else {
            continue;
        };
        let mut item = DiagnosticItem::new(
            key,
            DiagnosticCode::ConflictingDefinition,
            format!("conflicting definitions of '{}' in {} and {}", key, a.document, b.document),
        )
        .with_context(format!("first declared at {}", a))
        .with_context(format!("conflicting declaration at {}", b));

        let fields = differing_fields(&first.definition, &other.definition);
        if !fields.is_empty() {
            item = item.with_context(format!("differs in: {}", fields.join(", ")));
        }
        diagnostics.push(item);
    }
}

/// Names of the fields that differ between two definitions of the same key
fn differing_fields(a: &AttributeDefinition, b: &AttributeDefinition) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if a.attr_type != b.attr_type {
        fields.push("type");
    }
    if a.brief != b.brief {
        fields.push("brief");
    }
    if a.notes != b.notes {
        fields.push("notes");
    }
    if a.examples != b.examples {
        fields.push("examples");
    }
    if a.stability != b.stability {
        fields.push("stability");
    }
    if a.deprecated_by != b.deprecated_by {
        fields.push("deprecated_by");
    }
    if a.constraints != b.constraints {
        fields.push("constraints");
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeType, ExampleValue, PrimitiveType};

    fn fragment(key: &str, brief: &str, document: &str, index: usize) -> Fragment {
        Fragment {
            definition: AttributeDefinition::new(
                key,
                AttributeType::Primitive(PrimitiveType::String),
                brief,
                vec![ExampleValue::String("x".into())],
            ),
            provenance: Provenance {
                document: document.to_string(),
                index,
            },
        }
    }

    #[test]
    fn test_identical_redeclaration_is_merged() {
        let resolution = Resolver::new().resolve_fragments(
            vec![
                fragment("user.id", "Unique identifier of the user.", "a.yaml", 0),
                fragment("user.id", "Unique identifier of the user.", "b.yaml", 4),
            ],
            vec![],
        );
        assert!(resolution.diagnostics.is_empty());
        let registry = resolution.into_result().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.provenance("user.id").len(), 2);
    }

    #[test]
    fn test_conflicting_brief_names_key_and_both_documents() {
        let resolution = Resolver::new().resolve_fragments(
            vec![
                fragment("user.id", "Unique identifier of the user.", "b.yaml", 0),
                fragment("user.id", "The user id.", "a.yaml", 2),
            ],
            vec![],
        );
        let diagnostics = resolution.into_result().unwrap_err();
        let conflict: Vec<_> = diagnostics.with_code(DiagnosticCode::ConflictingDefinition).collect();
        assert_eq!(conflict.len(), 1);
        assert_eq!(conflict[0].subject, "user.id");
        assert!(conflict[0].message.contains("a.yaml"));
        assert!(conflict[0].message.contains("b.yaml"));
        assert!(conflict[0].context.iter().any(|c| c == "differs in: brief"));
    }

    #[test]
    fn test_conflict_keeps_first_declared_variant() {
        let forward = Resolver::new().resolve_fragments(
            vec![
                fragment("user.id", "second", "b.yaml", 0),
                fragment("user.id", "first", "a.yaml", 0),
            ],
            vec![],
        );
        let backward = Resolver::new().resolve_fragments(
            vec![
                fragment("user.id", "first", "a.yaml", 0),
                fragment("user.id", "second", "b.yaml", 0),
            ],
            vec![],
        );
        assert_eq!(forward.registry, backward.registry);
        assert_eq!(forward.diagnostics, backward.diagnostics);
        assert_eq!(forward.registry.get("user.id").unwrap().brief, "first");
    }

    #[test]
    fn test_version_conflict() {
        let resolution = Resolver::new().resolve_fragments(
            vec![],
            vec![
                ("a.yaml".to_string(), RegistryVersion::parse("1.0.0").unwrap()),
                ("b.yaml".to_string(), RegistryVersion::parse("1.1.0").unwrap()),
            ],
        );
        assert_eq!(resolution.diagnostics.with_code(DiagnosticCode::VersionConflict).count(), 1);
    }

    #[test]
    fn test_version_override_wins() {
        let resolution = Resolver::new()
            .with_version(RegistryVersion::parse("2.0.0").unwrap())
            .resolve_fragments(
                vec![],
                vec![
                    ("a.yaml".to_string(), RegistryVersion::parse("1.0.0").unwrap()),
                    ("b.yaml".to_string(), RegistryVersion::parse("1.1.0").unwrap()),
                ],
            );
        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.registry.version().to_string(), "2.0.0");
    }

    #[test]
    fn test_agreeing_versions() {
        let resolution = Resolver::new().resolve_fragments(
            vec![],
            vec![
                ("a.yaml".to_string(), RegistryVersion::parse("1.0.0").unwrap()),
                ("b.yaml".to_string(), RegistryVersion::parse("v1.0.0").unwrap()),
            ],
        );
        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.registry.version().to_string(), "1.0.0");
    }
}
