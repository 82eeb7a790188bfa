//! Attribute Registry
//!
//! [`Registry`] is the merged `key -> definition` map produced by the
//! resolver. [`ValidatedRegistry`] is the same data frozen after the
//! validator accepted it; it is the only thing the code generator takes,
//! and the validator is the only place one can be constructed.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;

use crate::checksum::Checksum;
use crate::diagnostics::Diagnostics;
use crate::model::{AttributeDefinition, Namespace, Provenance, SignalKind};
use crate::version::RegistryVersion;

/// Resolved registry, not yet validated
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Registry {
    version: RegistryVersion,
    attributes: BTreeMap<String, AttributeDefinition>,
    #[serde(skip)]
    provenance: BTreeMap<String, Vec<Provenance>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new(version: RegistryVersion) -> Self {
        Self {
            version,
            attributes: BTreeMap::new(),
            provenance: BTreeMap::new(),
        }
    }

    /// Insert a definition together with every place it was declared
    pub(crate) fn insert(&mut self, definition: AttributeDefinition, mut declared_at: Vec<Provenance>) {
        declared_at.sort();
        declared_at.dedup();
        self.provenance.insert(definition.key.clone(), declared_at);
        self.attributes.insert(definition.key.clone(), definition);
    }

    pub fn version(&self) -> &RegistryVersion {
        &self.version
    }

    pub fn get(&self, key: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// All definitions in lexicographic key order
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Documents that declared `key`, sorted
    pub fn provenance(&self, key: &str) -> &[Provenance] {
        self.provenance.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Namespaces implied by the registered keys
    pub fn namespaces(&self) -> BTreeSet<Namespace> {
        self.attributes.values().map(AttributeDefinition::namespace).collect()
    }

    pub fn attributes_in<'a>(&'a self, namespace: &'a Namespace) -> impl Iterator<Item = &'a AttributeDefinition> + 'a {
        self.attributes.values().filter(move |a| namespace.contains(&a.key))
    }

    pub fn deprecated(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.values().filter(|a| a.is_deprecated())
    }
}

/// A registry the validator accepted. Read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRegistry {
    registry: Registry,
    warnings: Diagnostics,
}

impl ValidatedRegistry {
    pub(crate) fn freeze(registry: Registry, warnings: Diagnostics) -> Self {
        Self { registry, warnings }
    }

    /// Warnings raised during validation (never errors)
    pub fn warnings(&self) -> &Diagnostics {
        &self.warnings
    }

    /// Attributes that may be attached to a given signal
    pub fn attributes_for(&self, signal: SignalKind) -> impl Iterator<Item = &AttributeDefinition> {
        self.registry
            .attributes()
            .filter(move |a| a.constraints.iter().all(|c| c.allows(signal)))
    }

    /// Follow `deprecated_by` to the attribute callers should use instead.
    ///
    /// Returns the attribute itself when it is not deprecated. Validation
    /// guarantees termination; the hop bound only guards direct misuse.
    pub fn replacement_for(&self, key: &str) -> Option<&AttributeDefinition> {
        let mut current = self.registry.get(key)?;
        for _ in 0..=self.registry.len() {
            match (&current.deprecated_by, current.is_deprecated()) {
                (Some(next), true) => current = self.registry.get(next)?,
                _ => return Some(current),
            }
        }
        None
    }

    /// Checksum over the version and every definition
    pub fn checksum(&self) -> Checksum {
        Checksum::of(&self.registry)
    }

    pub fn into_inner(self) -> Registry {
        self.registry
    }
}

impl Deref for ValidatedRegistry {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        &self.registry
    }
}
