//! Attribute definitions and their building blocks
//!
//! These types are deserialized straight from registry documents with
//! unknown fields rejected, so optional fields are explicit `Option`s and
//! every field a document may carry is named here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::checksum::Checksum;

// =============================================================================
// Signal kinds
// =============================================================================

/// Telemetry signal an attribute may be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Trace,
    Log,
    Metric,
    Profile,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::Trace,
        SignalKind::Log,
        SignalKind::Metric,
        SignalKind::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Trace => "trace",
            SignalKind::Log => "log",
            SignalKind::Metric => "metric",
            SignalKind::Profile => "profile",
        }
    }

    /// Parse a signal name as written in a document (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Stability
// =============================================================================

/// Lifecycle state of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Experimental,
    Stable,
    Deprecated,
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stability::Experimental => f.write_str("experimental"),
            Stability::Stable => f.write_str("stable"),
            Stability::Deprecated => f.write_str("deprecated"),
        }
    }
}

// =============================================================================
// Attribute types
// =============================================================================

/// Scalar and array value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "int", alias = "integer")]
    Int,
    #[serde(rename = "double")]
    Double,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "int[]", alias = "integer[]")]
    IntArray,
    #[serde(rename = "double[]")]
    DoubleArray,
    #[serde(rename = "boolean[]")]
    BooleanArray,
}

impl PrimitiveType {
    /// Element type for array kinds
    pub fn element(&self) -> Option<PrimitiveType> {
        match self {
            PrimitiveType::StringArray => Some(PrimitiveType::String),
            PrimitiveType::IntArray => Some(PrimitiveType::Int),
            PrimitiveType::DoubleArray => Some(PrimitiveType::Double),
            PrimitiveType::BooleanArray => Some(PrimitiveType::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Int => "int",
            PrimitiveType::Double => "double",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::StringArray => "string[]",
            PrimitiveType::IntArray => "int[]",
            PrimitiveType::DoubleArray => "double[]",
            PrimitiveType::BooleanArray => "boolean[]",
        }
    }

    /// Whether a literal has the shape of this type
    pub fn accepts(&self, value: &ExampleValue) -> bool {
        match (self, value) {
            (PrimitiveType::String, ExampleValue::String(_)) => true,
            (PrimitiveType::Int, ExampleValue::Int(_)) => true,
            (PrimitiveType::Double, ExampleValue::Double(_) | ExampleValue::Int(_)) => true,
            (PrimitiveType::Boolean, ExampleValue::Bool(_)) => true,
            (array, ExampleValue::Array(items)) => match array.element() {
                Some(element) => items.iter().all(|item| element.accepts(item)),
                None => false,
            },
            _ => false,
        }
    }
}

/// Value carried by an enum member
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Int(i64),
    String(String),
}

impl EnumValue {
    fn matches(&self, value: &ExampleValue) -> bool {
        match (self, value) {
            (EnumValue::Int(a), ExampleValue::Int(b)) => a == b,
            (EnumValue::String(a), ExampleValue::String(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumMember {
    pub id: String,
    pub value: EnumValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumType {
    pub members: Vec<EnumMember>,
}

impl EnumType {
    /// Whether the members agree on a single value kind
    pub fn is_homogeneous(&self) -> bool {
        let ints = self
            .members
            .iter()
            .filter(|m| matches!(m.value, EnumValue::Int(_)))
            .count();
        ints == 0 || ints == self.members.len()
    }

    pub fn contains(&self, value: &ExampleValue) -> bool {
        self.members.iter().any(|m| m.value.matches(value))
    }
}

/// Semantic value kind of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeType {
    Primitive(PrimitiveType),
    Enum(EnumType),
}

impl AttributeType {
    /// Whether an example literal matches this type
    pub fn accepts(&self, value: &ExampleValue) -> bool {
        match self {
            AttributeType::Primitive(primitive) => primitive.accepts(value),
            AttributeType::Enum(enum_type) => enum_type.contains(value),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Primitive(primitive) => f.write_str(primitive.as_str()),
            AttributeType::Enum(_) => f.write_str("enum"),
        }
    }
}

// =============================================================================
// Example literals
// =============================================================================

/// An example literal as written in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExampleValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<ExampleValue>),
}

impl ExampleValue {
    /// Short name of the literal's shape, for messages
    pub fn kind(&self) -> &'static str {
        match self {
            ExampleValue::Bool(_) => "boolean",
            ExampleValue::Int(_) => "int",
            ExampleValue::Double(_) => "double",
            ExampleValue::String(_) => "string",
            ExampleValue::Array(_) => "array",
        }
    }
}

/// Renders the literal the way it reads in source: strings quoted and
/// escaped, doubles always carrying a fraction or exponent.
impl fmt::Display for ExampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExampleValue::Bool(b) => write!(f, "{}", b),
            ExampleValue::Int(i) => write!(f, "{}", i),
            ExampleValue::Double(d) => {
                let text = d.to_string();
                if d.is_finite() && !text.contains(['.', 'e', 'E']) {
                    write!(f, "{}.0", text)
                } else {
                    f.write_str(&text)
                }
            }
            ExampleValue::String(s) => write_quoted(f, s),
            ExampleValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{{{:04x}}}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

// =============================================================================
// Signal constraints
// =============================================================================

/// A signal-scope restriction.
///
/// Signal names stay as written until validation so a misspelled kind is
/// reported instead of being dropped at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraint {
    /// MUST NOT be used on these signals
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_on: Vec<String>,
    /// MAY only be used on these signals
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub only_on: Vec<String>,
    /// Rationale carried into generated documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Constraint {
    pub fn not_on(signals: &[SignalKind]) -> Self {
        Self {
            not_on: signals.iter().map(|s| s.as_str().to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn only_on(signals: &[SignalKind]) -> Self {
        Self {
            only_on: signals.iter().map(|s| s.as_str().to_string()).collect(),
            ..Self::default()
        }
    }

    /// Every signal name mentioned, as written
    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.not_on.iter().chain(self.only_on.iter()).map(String::as_str)
    }

    /// Whether this constraint permits the signal. Unknown names never match.
    pub fn allows(&self, signal: SignalKind) -> bool {
        let listed = |names: &[String]| names.iter().any(|n| SignalKind::parse(n) == Some(signal));
        if listed(&self.not_on) {
            return false;
        }
        self.only_on.is_empty() || listed(&self.only_on)
    }

    /// Human-readable rule, e.g. "MUST NOT be used on `profile` signals"
    pub fn describe(&self) -> String {
        let list = |names: &[String]| {
            names
                .iter()
                .map(|n| format!("`{}`", n))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut parts = Vec::new();
        if !self.not_on.is_empty() {
            parts.push(format!("MUST NOT be used on {} signals", list(&self.not_on)));
        }
        if !self.only_on.is_empty() {
            parts.push(format!("MAY only be used on {} signals", list(&self.only_on)));
        }
        let mut text = parts.join("; ");
        if let Some(reason) = &self.reason {
            text.push_str(". ");
            text.push_str(reason.trim_end_matches('.'));
        }
        text.push('.');
        text
    }
}

// =============================================================================
// Attribute definition
// =============================================================================

/// The central entity: one telemetry attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeDefinition {
    /// Globally unique dotted identifier (e.g. `media.song.name`)
    pub key: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    pub brief: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub examples: Vec<ExampleValue>,
    pub stability: Stability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl AttributeDefinition {
    /// Create a stable attribute with no notes or constraints
    pub fn new(
        key: impl Into<String>,
        attr_type: AttributeType,
        brief: impl Into<String>,
        examples: Vec<ExampleValue>,
    ) -> Self {
        Self {
            key: key.into(),
            attr_type,
            brief: brief.into(),
            notes: None,
            examples,
            stability: Stability::Stable,
            deprecated_by: None,
            constraints: Vec::new(),
        }
    }

    /// Mark as deprecated in favour of `replacement`
    pub fn deprecated_in_favor_of(mut self, replacement: impl Into<String>) -> Self {
        self.stability = Stability::Deprecated;
        self.deprecated_by = Some(replacement.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_stability(mut self, stability: Stability) -> Self {
        self.stability = stability;
        self
    }

    pub fn is_deprecated(&self) -> bool {
        self.stability == Stability::Deprecated
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::of(&self.key)
    }

    /// Signals this attribute may be attached to after applying all constraints
    pub fn allowed_signals(&self) -> BTreeSet<SignalKind> {
        SignalKind::ALL
            .into_iter()
            .filter(|signal| self.constraints.iter().all(|c| c.allows(*signal)))
            .collect()
    }

    /// Checksum of the canonical JSON encoding, used to compare re-declarations
    pub fn checksum(&self) -> Checksum {
        Checksum::of(self)
    }
}

// =============================================================================
// Namespaces and provenance
// =============================================================================

/// Organizational prefix implied by attribute keys (`media`, `code`, `user`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Namespace of a key: its first dotted segment
    pub fn of(key: &str) -> Self {
        Self(key.split('.').next().unwrap_or(key).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `key` lives under this namespace
    pub fn contains(&self, key: &str) -> bool {
        key.strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('.') && rest.len() > 1)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a fragment was declared
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Provenance {
    /// Document name (its path as given to the loader)
    pub document: String,
    /// Position of the declaration within the document, counting from zero
    pub index: usize,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document, self.index)
    }
}

/// An unresolved attribute declaration with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub definition: AttributeDefinition,
    pub provenance: Provenance,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_attr(key: &str) -> AttributeDefinition {
        AttributeDefinition::new(
            key,
            AttributeType::Primitive(PrimitiveType::String),
            "brief",
            vec![ExampleValue::String("x".into())],
        )
    }

    #[test]
    fn test_signal_kind_parse() {
        assert_eq!(SignalKind::parse("profile"), Some(SignalKind::Profile));
        assert_eq!(SignalKind::parse("Trace"), Some(SignalKind::Trace));
        assert_eq!(SignalKind::parse("profil"), None);
    }

    #[test]
    fn test_type_accepts() {
        let double = AttributeType::Primitive(PrimitiveType::Double);
        assert!(double.accepts(&ExampleValue::Double(1.5)));
        assert!(double.accepts(&ExampleValue::Int(3)));
        assert!(!double.accepts(&ExampleValue::String("3".into())));

        let ints = AttributeType::Primitive(PrimitiveType::IntArray);
        assert!(ints.accepts(&ExampleValue::Array(vec![ExampleValue::Int(1), ExampleValue::Int(2)])));
        assert!(!ints.accepts(&ExampleValue::Int(1)));
        assert!(!ints.accepts(&ExampleValue::Array(vec![ExampleValue::Bool(true)])));
    }

    #[test]
    fn test_enum_accepts_members_only() {
        let subscription = AttributeType::Enum(EnumType {
            members: vec![
                EnumMember { id: "free".into(), value: EnumValue::String("Free".into()), brief: None },
                EnumMember { id: "premium".into(), value: EnumValue::String("Premium".into()), brief: None },
            ],
        });
        assert!(subscription.accepts(&ExampleValue::String("Free".into())));
        assert!(!subscription.accepts(&ExampleValue::String("Gold".into())));
    }

    #[test]
    fn test_example_display() {
        assert_eq!(ExampleValue::String("Nevermind".into()).to_string(), "\"Nevermind\"");
        assert_eq!(ExampleValue::String("a\"b\\c\n".into()).to_string(), "\"a\\\"b\\\\c\\n\"");
        assert_eq!(ExampleValue::Int(301000).to_string(), "301000");
        assert_eq!(ExampleValue::Double(2.0).to_string(), "2.0");
        assert_eq!(ExampleValue::Double(0.25).to_string(), "0.25");
        assert_eq!(
            ExampleValue::Array(vec![ExampleValue::Bool(true), ExampleValue::Bool(false)]).to_string(),
            "[true, false]"
        );
    }

    #[test]
    fn test_allowed_signals() {
        let attr = string_attr("code.file.path").with_constraint(Constraint::not_on(&[SignalKind::Profile]));
        let allowed = attr.allowed_signals();
        assert!(!allowed.contains(&SignalKind::Profile));
        assert_eq!(allowed.len(), 3);

        let only_logs = string_attr("log.record.uid").with_constraint(Constraint::only_on(&[SignalKind::Log]));
        assert_eq!(only_logs.allowed_signals().into_iter().collect::<Vec<_>>(), vec![SignalKind::Log]);
    }

    #[test]
    fn test_constraint_describe() {
        let mut constraint = Constraint::not_on(&[SignalKind::Profile]);
        constraint.reason = Some("The data is already captured in 'message Function'.".into());
        assert_eq!(
            constraint.describe(),
            "MUST NOT be used on `profile` signals. The data is already captured in 'message Function'."
        );
    }

    #[test]
    fn test_namespace() {
        let ns = Namespace::of("media.song.name");
        assert_eq!(ns.as_str(), "media");
        assert!(ns.contains("media.album.name"));
        assert!(!ns.contains("mediation.name"));
        assert!(!ns.contains("media"));
    }

    #[test]
    fn test_checksum_tracks_every_field() {
        let a = string_attr("user.id");
        let mut b = a.clone();
        assert_eq!(a.checksum(), b.checksum());

        b.brief = "different".into();
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_deserialize_definition_from_yaml() {
        let yaml = r#"
key: media.song.year
type: int
brief: The release year of the song.
examples: [1991, 1975]
stability: experimental
constraints:
  - not_on: [profile]
"#;
        let attr: AttributeDefinition = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(attr.attr_type, AttributeType::Primitive(PrimitiveType::Int));
        assert_eq!(attr.examples, vec![ExampleValue::Int(1991), ExampleValue::Int(1975)]);
        assert_eq!(attr.stability, Stability::Experimental);
        assert_eq!(attr.constraints[0].not_on, vec!["profile".to_string()]);
    }

    #[test]
    fn test_deserialize_rejects_unknown_stability() {
        let yaml = r#"
key: user.id
type: string
brief: Unique identifier of the user.
examples: ["abc"]
stability: sunset
"#;
        assert!(serde_yaml_ng::from_str::<AttributeDefinition>(yaml).is_err());
    }
}
