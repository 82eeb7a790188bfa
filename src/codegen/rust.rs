//! Rust Code Emitter
//!
//! One `pub const NAME: &str = "key";` per attribute with rustdoc sections
//! for notes, signal constraints and examples. Deprecated attributes carry
//! `#[deprecated]` with a note naming the replacement key.

use super::{version_line, AttributeDoc, RustProfile, GENERATED_HEADER};
use crate::version::RegistryVersion;

// =============================================================================
// Public API
// =============================================================================

/// Emit the Rust module for a set of attributes
pub fn emit(docs: &[AttributeDoc<'_>], version: &RegistryVersion, _profile: &RustProfile) -> String {
    let mut output = String::new();

    output.push_str(&format!("// {}\n", GENERATED_HEADER));
    output.push_str(&format!("// {}\n", version_line(version)));

    for doc in docs {
        output.push('\n');
        emit_constant(&mut output, doc);
    }

    output
}

// =============================================================================
// Constant Emission
// =============================================================================

fn emit_constant(output: &mut String, doc: &AttributeDoc<'_>) {
    doc_lines(output, &doc.attr.brief);

    let paragraphs = doc.note_paragraphs();
    if !paragraphs.is_empty() {
        output.push_str("///\n/// ## Notes\n");
        for paragraph in &paragraphs {
            output.push_str("///\n");
            for line in paragraph {
                doc_lines(output, line);
            }
        }
    }

    if !doc.constraints.is_empty() {
        output.push_str("///\n/// ## Constraints\n///\n");
        for constraint in &doc.constraints {
            output.push_str(&format!("/// - {}\n", constraint));
        }
    }

    if !doc.examples.is_empty() {
        output.push_str("///\n/// ## Examples\n///\n");
        for example in &doc.examples {
            output.push_str(&format!("/// - `{}`\n", example));
        }
    }

    if let Some((key, _)) = &doc.replacement {
        output.push_str(&format!(
            "#[deprecated(note = \"{{note: Replaced by `{key}`., reason: renamed, renamed_to: {key}}}\")]\n",
            key = key
        ));
    }

    output.push_str(&format!("pub const {}: &str = {:?};\n", doc.constant, doc.attr.key));
}

/// Prefix every line with `/// `, keeping blank lines as bare `///`
fn doc_lines(output: &mut String, text: &str) {
    for line in text.trim().lines() {
        if line.trim().is_empty() {
            output.push_str("///\n");
        } else {
            output.push_str(&format!("/// {}\n", line.trim_end()));
        }
    }
}
