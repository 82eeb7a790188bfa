//! Diagnostics
//!
//! Collects warnings and errors raised while loading, resolving and
//! validating a registry. Nothing here short-circuits: every pass appends to
//! a [`Diagnostics`] collection so one run reports the full defect list.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Loading ===
    /// Document violates the declaration grammar
    MalformedSchema,

    // === Resolution ===
    /// Two non-identical fragments share a key
    ConflictingDefinition,
    /// Documents declare different registry versions
    VersionConflict,

    // === Attribute shape ===
    /// Key does not follow the dotted lowercase grammar
    InvalidKey,
    /// No examples declared
    MissingExamples,
    /// Example literal does not match the declared type
    ExampleTypeMismatch,
    /// Enum type without members, or with mixed member value kinds
    InvalidEnum,
    /// Brief is blank
    EmptyBrief,

    // === Deprecation ===
    /// Deprecated attribute without a replacement
    MissingDeprecatedBy,
    /// Replacement declared on an attribute that is not deprecated
    UnexpectedDeprecatedBy,
    /// Replacement key does not exist
    DanglingDeprecation,
    /// Replacement key is itself deprecated
    DeprecationChain,
    /// Replacement references loop back
    DeprecationCycle,

    // === Signal constraints ===
    /// Constraint names a signal outside the fixed enumeration
    UnknownSignalKind,
    /// Constraints exclude every signal kind
    UnsatisfiableConstraint,
    /// Same signal listed twice in one constraint
    RedundantConstraint,

    // === Generation ===
    /// Two keys map to the same generated constant name
    ConstantNameCollision,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedSchema => "E001",
            Self::ConflictingDefinition => "E002",
            Self::VersionConflict => "E003",
            Self::InvalidKey => "E004",
            Self::MissingExamples => "E005",
            Self::ExampleTypeMismatch => "E006",
            Self::InvalidEnum => "E007",
            Self::MissingDeprecatedBy => "E008",
            Self::UnexpectedDeprecatedBy => "E009",
            Self::DanglingDeprecation => "E010",
            Self::DeprecationChain => "E011",
            Self::DeprecationCycle => "E012",
            Self::UnknownSignalKind => "E013",
            Self::UnsatisfiableConstraint => "E014",
            Self::ConstantNameCollision => "E015",
            Self::EmptyBrief => "W001",
            Self::RedundantConstraint => "W002",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::EmptyBrief | Self::RedundantConstraint => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Attribute key or document the diagnostic is about
    pub subject: String,
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Additional context (provenances, hints, cycle members)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            code,
            severity: code.severity(),
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code, self.severity, self.message, self.subject
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from the loading, resolution and validation passes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic item
    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    /// Add an item built from its parts
    pub fn report(&mut self, subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) {
        self.push(DiagnosticItem::new(subject, code, message));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(DiagnosticItem::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Items carrying a given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Merge another Diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Treat every warning as an error
    pub fn promote_warnings(&mut self) {
        for item in &mut self.items {
            if item.severity == Severity::Warning {
                item.severity = Severity::Error;
            }
        }
    }

    /// Order items by subject, then code, then message.
    ///
    /// Passes emit in whatever order they walk their inputs; sorting makes
    /// the reported list independent of document order.
    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| {
            a.subject
                .cmp(&b.subject)
                .then(a.code.cmp(&b.code))
                .then(a.message.cmp(&b.message))
        });
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_severity() {
        assert_eq!(DiagnosticCode::DeprecationCycle.severity(), Severity::Error);
        assert_eq!(DiagnosticCode::EmptyBrief.severity(), Severity::Warning);
    }

    #[test]
    fn test_severity_is_warning_or_error() {
        assert_eq!(serde_json::to_value(Severity::Warning).unwrap(), "warning");
        assert_eq!(serde_json::to_value(Severity::Error).unwrap(), "error");
        assert!(serde_json::from_str::<Severity>("\"info\"").is_err());
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut diags = Diagnostics::new();
        diags.report("user.id", DiagnosticCode::ConflictingDefinition, "conflict");
        diags.report("user.name", DiagnosticCode::EmptyBrief, "blank brief");

        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_promote_warnings() {
        let mut diags = Diagnostics::new();
        diags.report("user.name", DiagnosticCode::EmptyBrief, "blank brief");
        assert!(!diags.has_errors());

        diags.promote_warnings();
        assert!(diags.has_errors());
        assert_eq!(diags.warning_count(), 0);
    }

    #[test]
    fn test_sort_is_stable_across_insertion_order() {
        let mut a = Diagnostics::new();
        a.report("b.key", DiagnosticCode::InvalidKey, "x");
        a.report("a.key", DiagnosticCode::MissingExamples, "y");

        let mut b = Diagnostics::new();
        b.report("a.key", DiagnosticCode::MissingExamples, "y");
        b.report("b.key", DiagnosticCode::InvalidKey, "x");

        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_includes_code_and_context() {
        let item = DiagnosticItem::new("media.song", DiagnosticCode::DeprecationCycle, "cycle")
            .with_context("media.song -> media.track -> media.song");
        let text = item.to_string();
        assert!(text.starts_with("[E012] error: cycle (media.song)"));
        assert!(text.contains("media.track"));
    }
}
