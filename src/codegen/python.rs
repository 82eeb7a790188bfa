//! Python Code Emitter
//!
//! Constants live on a single class with a docstring under each one.
//! Deprecations are also recorded in the module-level
//! `DEPRECATED_ATTRIBUTES` mapping (deprecated key to replacement key) so
//! tooling can read them without parsing docstrings.

use super::{version_line, AttributeDoc, PythonProfile, GENERATED_HEADER};
use crate::version::RegistryVersion;

const INDENT: &str = "    ";

pub fn emit(docs: &[AttributeDoc<'_>], version: &RegistryVersion, profile: &PythonProfile) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n", GENERATED_HEADER));
    output.push_str(&format!("# {}\n", version_line(version)));
    output.push_str(&format!("\nclass {}:\n", profile.class_name));

    if docs.is_empty() {
        output.push_str(&format!("{}pass\n", INDENT));
    }
    for doc in docs {
        output.push('\n');
        emit_constant(&mut output, doc);
    }

    output.push('\n');
    emit_deprecations(&mut output, docs);
    output
}

fn emit_constant(output: &mut String, doc: &AttributeDoc<'_>) {
    output.push_str(&format!("{}{} = \"{}\"\n", INDENT, doc.constant, doc.attr.key));
    output.push_str(&format!("{}\"\"\"\n", INDENT));

    docstring_lines(output, &doc.attr.brief);

    if let Some((key, _)) = &doc.replacement {
        output.push('\n');
        docstring_lines(output, &format!("Deprecated: replaced by `{}`.", key));
    }

    let paragraphs = doc.note_paragraphs();
    if !paragraphs.is_empty() {
        output.push_str(&format!("\n{}## Notes\n", INDENT));
        for paragraph in &paragraphs {
            output.push('\n');
            for line in paragraph {
                docstring_lines(output, line);
            }
        }
    }

    if !doc.constraints.is_empty() {
        output.push_str(&format!("\n{}## Constraints\n\n", INDENT));
        for constraint in &doc.constraints {
            docstring_lines(output, &format!("- {}", constraint));
        }
    }

    if !doc.examples.is_empty() {
        output.push_str(&format!("\n{}## Examples\n\n", INDENT));
        for example in &doc.examples {
            docstring_lines(output, &format!("- `{}`", example));
        }
    }

    output.push_str(&format!("{}\"\"\"\n", INDENT));
}

fn emit_deprecations(output: &mut String, docs: &[AttributeDoc<'_>]) {
    let deprecated: Vec<_> = docs
        .iter()
        .filter_map(|doc| doc.replacement.as_ref().map(|(key, _)| (doc.attr.key.as_str(), *key)))
        .collect();

    if deprecated.is_empty() {
        output.push_str("DEPRECATED_ATTRIBUTES: dict[str, str] = {}\n");
        return;
    }

    output.push_str("DEPRECATED_ATTRIBUTES: dict[str, str] = {\n");
    for (key, replacement) in deprecated {
        output.push_str(&format!("{}\"{}\": \"{}\",\n", INDENT, key, replacement));
    }
    output.push_str("}\n");
}

fn docstring_lines(output: &mut String, text: &str) {
    for line in text.trim().lines() {
        if line.trim().is_empty() {
            output.push('\n');
        } else {
            output.push_str(INDENT);
            output.push_str(&escape_docstring(line.trim_end()));
            output.push('\n');
        }
    }
}

/// Keep text literal inside a non-raw `"""` docstring
fn escape_docstring(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}
