//! Java Code Emitter
//!
//! A final class of `public static final String` constants with HTML
//! javadoc. Inline code spans written with backticks become `<c>` tags.

use super::{version_line, AttributeDoc, JavaProfile, GENERATED_HEADER};
use crate::version::RegistryVersion;

pub fn emit(docs: &[AttributeDoc<'_>], version: &RegistryVersion, profile: &JavaProfile) -> String {
    let mut output = String::new();

    output.push_str(&format!("// {}\n", GENERATED_HEADER));
    output.push_str(&format!("// {}\n", version_line(version)));
    output.push_str(&format!("\npackage {};\n\n", profile.package));
    output.push_str(&format!("public final class {} {{\n", profile.class_name));

    for doc in docs {
        emit_constant(&mut output, doc);
        output.push('\n');
    }

    output.push_str(&format!("    private {}() {{}}\n", profile.class_name));
    output.push_str("}\n");
    output
}

fn emit_constant(output: &mut String, doc: &AttributeDoc<'_>) {
    output.push_str("    /**\n");
    javadoc(output, &format!("<p>{}</p>", inline(&doc.attr.brief)));

    let paragraphs = doc.note_paragraphs();
    if !paragraphs.is_empty() {
        let body: String = paragraphs
            .iter()
            .map(|lines| format!("<p>{}</p>", inline(&lines.join(" "))))
            .collect();
        javadoc(output, &format!("<h2>Notes</h2>{}", body));
    }

    if !doc.constraints.is_empty() {
        javadoc(output, "<h2>Constraints</h2>");
        javadoc(output, "<ul>");
        for constraint in &doc.constraints {
            javadoc(output, &format!("  <li>{}</li>", inline(constraint)));
        }
        javadoc(output, "</ul>");
    }

    if !doc.examples.is_empty() {
        javadoc(output, "<h2>Examples</h2>");
        javadoc(output, "<ul>");
        for example in &doc.examples {
            javadoc(output, &format!("  <li><c>{}</c></li>", escape_html(example)));
        }
        javadoc(output, "</ul>");
    }

    if let Some((_, constant)) = &doc.replacement {
        javadoc(output, &format!("@deprecated Replaced by {{@link #{}}}.", constant));
    }

    output.push_str("     */\n");
    if doc.replacement.is_some() {
        output.push_str("    @Deprecated\n");
    }
    output.push_str(&format!(
        "    public static final String {} = \"{}\";\n",
        doc.constant, doc.attr.key
    ));
}

fn javadoc(output: &mut String, line: &str) {
    output.push_str("     * ");
    output.push_str(line);
    output.push('\n');
}

/// Escape prose and turn `code` spans into `<c>code</c>`
fn inline(text: &str) -> String {
    let escaped = escape_html(text.trim());
    let mut out = String::with_capacity(escaped.len());
    let mut parts = escaped.split('`');
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    let rest: Vec<&str> = parts.collect();
    // An unpaired trailing backtick stays literal
    let paired = rest.len() - rest.len() % 2;
    for (i, part) in rest.iter().enumerate() {
        if i >= paired {
            out.push('`');
            out.push_str(part);
        } else if i % 2 == 0 {
            out.push_str("<c>");
            out.push_str(part);
        } else {
            out.push_str("</c>");
            out.push_str(part);
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            // javac decodes `\u` escapes even inside comments
            '\\' => out.push_str("&#92;"),
            c => out.push(c),
        }
    }
    // Would close the javadoc comment
    out.replace("*/", "*&#47;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeDefinition, AttributeType, ExampleValue, PrimitiveType};

    fn render(attrs: &[AttributeDefinition]) -> String {
        let docs: Vec<_> = attrs.iter().map(AttributeDoc::new).collect();
        emit(&docs, &RegistryVersion::parse("1.0.0").unwrap(), &JavaProfile::default())
    }

    #[test]
    fn test_emit_class() {
        let attr = AttributeDefinition::new(
            "media.album.name",
            AttributeType::Primitive(PrimitiveType::String),
            "The name of the album containing the song.",
            vec![ExampleValue::String("Nevermind".into())],
        );
        let expected = "\
// DO NOT EDIT, this is an auto-generated file
// Registry version: 1.0.0

package dev.jcosta.semconv;

public final class Attributes {
    /**
     * <p>The name of the album containing the song.</p>
     * <h2>Examples</h2>
     * <ul>
     *   <li><c>\"Nevermind\"</c></li>
     * </ul>
     */
    public static final String MEDIA_ALBUM_NAME = \"media.album.name\";

    private Attributes() {}
}
";
        assert_eq!(render(&[attr]), expected);
    }

    #[test]
    fn test_emit_deprecated() {
        let attr = AttributeDefinition::new(
            "media.song",
            AttributeType::Primitive(PrimitiveType::String),
            "The name/title of the song being queried.",
            vec![ExampleValue::String("Lithium".into())],
        )
        .deprecated_in_favor_of("media.song.name")
        .with_notes("Use `media.song.name` for new implementations.");
        let output = render(&[attr]);
        assert!(output.contains("<h2>Notes</h2><p>Use <c>media.song.name</c> for new implementations.</p>"));
        assert!(output.contains("     * @deprecated Replaced by {@link #MEDIA_SONG_NAME}.\n     */\n    @Deprecated\n"));
    }

    #[test]
    fn test_inline_code_spans() {
        assert_eq!(inline("use `a` and `b`"), "use <c>a</c> and <c>b</c>");
        assert_eq!(inline("odd ` tick"), "odd ` tick");
        assert_eq!(inline("a < b"), "a &lt; b");
    }

    #[test]
    fn test_backslashes_escaped_in_docs() {
        let attr = AttributeDefinition::new(
            "code.file.path",
            AttributeType::Primitive(PrimitiveType::String),
            "Source file path.",
            vec![ExampleValue::String("C:\\users\\me\\app.rs".into())],
        )
        .with_notes("On Windows this is C:\\users\\me");
        let output = render(&[attr]);
        assert!(output.contains("<p>On Windows this is C:&#92;users&#92;me</p>"));
        assert!(output.contains("<li><c>\"C:&#92;&#92;users&#92;&#92;me&#92;&#92;app.rs\"</c></li>"));
        assert!(!output.contains("\\u"));
    }

    #[test]
    fn test_escape_comment_terminator() {
        assert_eq!(escape_html("/usr/*/bin"), "/usr/*&#47;bin");
    }
}
