//! Property tests: resolution and generation do not depend on the order in
//! which documents are supplied.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use semconv_registry::codegen::Target;
use semconv_registry::loader::SourceDocument;
use semconv_registry::pipeline::{self, GenerateRequest};
use semconv_registry::{DiagnosticCode, RegistryError};

const DOCUMENTS: usize = 4;

/// Attribute key -> indices of the documents declaring it
fn layout() -> impl Strategy<Value = BTreeMap<String, BTreeSet<usize>>> {
    prop::collection::btree_map(
        "[a-z]{1,6}\\.[a-z]{1,6}",
        prop::collection::btree_set(0..DOCUMENTS, 1..=DOCUMENTS),
        1..12,
    )
}

/// Render one YAML document per index. With `conflicting`, each document
/// gives its declarations a document-specific brief.
fn documents(layout: &BTreeMap<String, BTreeSet<usize>>, conflicting: bool) -> Vec<SourceDocument> {
    (0..DOCUMENTS)
        .map(|i| {
            let mut content = String::from("version: 2.3.0\n");
            let keys: Vec<&String> = layout.iter().filter(|(_, docs)| docs.contains(&i)).map(|(k, _)| k).collect();
            if keys.is_empty() {
                content.push_str("attributes: []\n");
            } else {
                content.push_str("attributes:\n");
                for key in keys {
                    let brief = if conflicting {
                        format!("Declared by document {}.", i)
                    } else {
                        format!("The {} attribute.", key)
                    };
                    content.push_str(&format!(
                        "  - key: {}\n    type: string\n    brief: {}\n    examples: [\"value\"]\n    stability: stable\n",
                        key, brief
                    ));
                }
            }
            SourceDocument::yaml(format!("doc{}.yaml", i), content)
        })
        .collect()
}

fn layout_and_order() -> impl Strategy<Value = (BTreeMap<String, BTreeSet<usize>>, Vec<usize>)> {
    (layout(), Just((0..DOCUMENTS).collect::<Vec<_>>()).prop_shuffle())
}

fn reorder(docs: &[SourceDocument], order: &[usize]) -> Vec<SourceDocument> {
    order.iter().map(|&i| docs[i].clone()).collect()
}

proptest! {
    #[test]
    fn prop_document_order_is_irrelevant((layout, order) in layout_and_order()) {
        let docs = documents(&layout, false);
        let a = pipeline::generate(&GenerateRequest::from_documents(docs.clone())).unwrap();
        let b = pipeline::generate(&GenerateRequest::from_documents(reorder(&docs, &order))).unwrap();

        prop_assert_eq!(a.registry.len(), layout.len());
        prop_assert_eq!(&*a.registry, &*b.registry);
        prop_assert_eq!(&a.artifacts, &b.artifacts);
        prop_assert_eq!(a.registry.checksum(), b.registry.checksum());
    }

    #[test]
    fn prop_provenance_lists_every_declaring_document(layout in layout()) {
        let run = pipeline::generate(&GenerateRequest::from_documents(documents(&layout, false))).unwrap();

        for (key, declared_in) in &layout {
            let documents: BTreeSet<String> =
                run.registry.provenance(key).iter().map(|p| p.document.clone()).collect();
            let expected: BTreeSet<String> = declared_in.iter().map(|i| format!("doc{}.yaml", i)).collect();
            prop_assert_eq!(documents, expected);
        }
    }

    #[test]
    fn prop_generation_is_deterministic(layout in layout()) {
        let request = GenerateRequest::from_documents(documents(&layout, false)).targets(vec![Target::Python]);
        let first = pipeline::generate(&request).unwrap();
        let second = pipeline::generate(&request).unwrap();

        prop_assert_eq!(
            &first.artifacts.get(Target::Python).unwrap().content,
            &second.artifacts.get(Target::Python).unwrap().content
        );
        prop_assert_eq!(first.artifacts.manifest(), second.artifacts.manifest());
    }

    #[test]
    fn prop_conflicts_are_order_independent((layout, order) in layout_and_order()) {
        let docs = documents(&layout, true);
        let diagnostics = |docs: Vec<SourceDocument>| match pipeline::compile(&GenerateRequest::from_documents(docs)) {
            Err(RegistryError::Invalid(diagnostics)) => Some(diagnostics),
            _ => None,
        };

        let expected: usize = layout.values().map(|docs| docs.len() - 1).sum();
        let forward = diagnostics(docs.clone());
        let shuffled = diagnostics(reorder(&docs, &order));

        if expected == 0 {
            prop_assert!(forward.is_none());
            prop_assert!(shuffled.is_none());
        } else {
            let forward = forward.unwrap();
            prop_assert_eq!(forward.with_code(DiagnosticCode::ConflictingDefinition).count(), expected);
            prop_assert_eq!(Some(forward), shuffled);
        }
    }
}
