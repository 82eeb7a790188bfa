//! Registry Validation
//!
//! Checks every invariant of a resolved [`Registry`] and collects all
//! violations in one pass. Only a registry with no errors is frozen into a
//! [`ValidatedRegistry`].
//!
//! Deprecation references form a graph with out-degree at most one per
//! attribute. Cycles are found as strongly connected components of that
//! graph, which bounds the work by the registry size no matter how the
//! references are arranged.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::codegen::names::find_collisions;
use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::model::{AttributeDefinition, AttributeType, SignalKind};
use crate::registry::{Registry, ValidatedRegistry};

/// Dotted lowercase segments, at least two of them
const KEY_PATTERN: &str = r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)+$";

/// Validates resolved registries
#[derive(Debug, Clone)]
pub struct Validator {
    key_pattern: Regex,
    warnings_as_errors: bool,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self {
            key_pattern: Regex::new(KEY_PATTERN).expect("key pattern is a valid regex"),
            warnings_as_errors: false,
        }
    }

    /// Fail validation on warnings too
    pub fn warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// Validate and freeze.
    ///
    /// `prior` carries diagnostics from earlier passes (malformed documents,
    /// conflicts) so the caller gets one combined, sorted list.
    pub fn validate(&self, registry: Registry, prior: Diagnostics) -> Result<ValidatedRegistry, Diagnostics> {
        let mut diagnostics = prior;
        diagnostics.merge(self.check(&registry));
        if self.warnings_as_errors {
            diagnostics.promote_warnings();
        }
        diagnostics.sort();

        if diagnostics.has_errors() {
            warn!(
                errors = diagnostics.error_count(),
                warnings = diagnostics.warning_count(),
                "registry rejected"
            );
            return Err(diagnostics);
        }

        for item in diagnostics.warnings() {
            warn!("{}", item);
        }
        info!(attributes = registry.len(), version = %registry.version(), "registry validated");
        Ok(ValidatedRegistry::freeze(registry, diagnostics))
    }

    /// Run every check and return what was found
    pub fn check(&self, registry: &Registry) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        for attr in registry.attributes() {
            self.check_key(attr, &mut diagnostics);
            check_brief(attr, &mut diagnostics);
            check_examples(attr, &mut diagnostics);
            check_constraints(attr, &mut diagnostics);
            check_deprecation_fields(attr, registry, &mut diagnostics);
        }

        check_deprecation_graph(registry, &mut diagnostics);
        check_constant_names(registry, &mut diagnostics);

        debug!(findings = diagnostics.len(), "validation checks complete");
        diagnostics
    }

    fn check_key(&self, attr: &AttributeDefinition, diagnostics: &mut Diagnostics) {
        if !self.key_pattern.is_match(&attr.key) {
            diagnostics.push(
                DiagnosticItem::new(
                    &attr.key,
                    DiagnosticCode::InvalidKey,
                    format!("key '{}' is not a dotted lowercase identifier", attr.key),
                )
                .with_context(format!("expected pattern {}", KEY_PATTERN)),
            );
        }
    }
}

fn check_brief(attr: &AttributeDefinition, diagnostics: &mut Diagnostics) {
    if attr.brief.trim().is_empty() {
        diagnostics.report(&attr.key, DiagnosticCode::EmptyBrief, "brief is blank");
    }
}

fn check_examples(attr: &AttributeDefinition, diagnostics: &mut Diagnostics) {
    if let AttributeType::Enum(enum_type) = &attr.attr_type {
        if enum_type.members.is_empty() {
            diagnostics.report(&attr.key, DiagnosticCode::InvalidEnum, "enum type declares no members");
        } else if !enum_type.is_homogeneous() {
            diagnostics.report(
                &attr.key,
                DiagnosticCode::InvalidEnum,
                "enum members mix string and integer values",
            );
        }
        let mut ids = BTreeSet::new();
        for member in &enum_type.members {
            if !ids.insert(member.id.as_str()) {
                diagnostics.report(
                    &attr.key,
                    DiagnosticCode::InvalidEnum,
                    format!("enum member id '{}' is declared twice", member.id),
                );
            }
        }
    }

    if attr.examples.is_empty() {
        diagnostics.report(&attr.key, DiagnosticCode::MissingExamples, "no examples declared");
        return;
    }

    for (i, example) in attr.examples.iter().enumerate() {
        if !attr.attr_type.accepts(example) {
            diagnostics.push(DiagnosticItem::new(
                &attr.key,
                DiagnosticCode::ExampleTypeMismatch,
                format!(
                    "example #{} {} ({}) does not match type '{}'",
                    i,
                    example,
                    example.kind(),
                    attr.attr_type
                ),
            ));
        }
    }
}

fn check_constraints(attr: &AttributeDefinition, diagnostics: &mut Diagnostics) {
    let mut all_known = true;

    for constraint in &attr.constraints {
        if constraint.not_on.is_empty() && constraint.only_on.is_empty() {
            diagnostics.report(
                &attr.key,
                DiagnosticCode::RedundantConstraint,
                "constraint restricts no signal kind",
            );
        }

        for list in [&constraint.not_on, &constraint.only_on] {
            let mut seen = BTreeSet::new();
            for name in list {
                match SignalKind::parse(name) {
                    Some(kind) => {
                        if !seen.insert(kind) {
                            diagnostics.report(
                                &attr.key,
                                DiagnosticCode::RedundantConstraint,
                                format!("signal kind '{}' is listed twice", kind),
                            );
                        }
                    }
                    None => {
                        all_known = false;
                        let mut item = DiagnosticItem::new(
                            &attr.key,
                            DiagnosticCode::UnknownSignalKind,
                            format!("unknown signal kind '{}'", name),
                        );
                        if let Some(hint) = suggest(name, SignalKind::ALL.iter().map(|k| k.as_str())) {
                            item = item.with_context(format!("did you mean '{}'?", hint));
                        }
                        item = item.with_context("expected one of: trace, log, metric, profile");
                        diagnostics.push(item);
                    }
                }
            }
        }
    }

    if all_known && !attr.constraints.is_empty() && attr.allowed_signals().is_empty() {
        diagnostics.report(
            &attr.key,
            DiagnosticCode::UnsatisfiableConstraint,
            "constraints exclude every signal kind",
        );
    }
}

fn check_deprecation_fields(attr: &AttributeDefinition, registry: &Registry, diagnostics: &mut Diagnostics) {
    match (&attr.deprecated_by, attr.is_deprecated()) {
        (None, true) => diagnostics.report(
            &attr.key,
            DiagnosticCode::MissingDeprecatedBy,
            "deprecated attribute does not name a replacement (deprecated_by)",
        ),
        (Some(target), false) => diagnostics.report(
            &attr.key,
            DiagnosticCode::UnexpectedDeprecatedBy,
            format!(
                "deprecated_by '{}' is set but stability is '{}'",
                target, attr.stability
            ),
        ),
        (Some(target), true) if !registry.contains(target) => {
            let mut item = DiagnosticItem::new(
                &attr.key,
                DiagnosticCode::DanglingDeprecation,
                format!("deprecated_by references unknown key '{}'", target),
            );
            if let Some(hint) = suggest(target, registry.keys().filter(|k| *k != attr.key)) {
                item = item.with_context(format!("did you mean '{}'?", hint));
            }
            diagnostics.push(item);
        }
        _ => {}
    }
}

/// Cycles and chains across `deprecated_by` references
fn check_deprecation_graph(registry: &Registry, diagnostics: &mut Diagnostics) {
    let edges: Vec<(&str, &str)> = registry
        .deprecated()
        .filter_map(|attr| {
            let target = registry.get(attr.deprecated_by.as_deref()?)?;
            Some((attr.key.as_str(), target.key.as_str()))
        })
        .collect();

    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for (from, to) in &edges {
        for key in [*from, *to] {
            if !nodes.contains_key(key) {
                nodes.insert(key, graph.add_node(key));
            }
        }
        graph.add_edge(nodes[from], nodes[to], ());
    }

    let mut in_cycle: BTreeSet<&str> = BTreeSet::new();
    for scc in kosaraju_scc(&graph) {
        let self_loop = scc.len() == 1 && graph.contains_edge(scc[0], scc[0]);
        if scc.len() < 2 && !self_loop {
            continue;
        }
        let members: BTreeSet<&str> = scc.iter().map(|idx| graph[*idx]).collect();
        in_cycle.extend(members.iter().copied());

        let Some(start) = members.first().copied() else {
            continue;
        };
        let path = walk_deprecations(registry, start, members.len() + 1);
        diagnostics.push(
            DiagnosticItem::new(
                start,
                DiagnosticCode::DeprecationCycle,
                if self_loop {
                    format!("'{}' is deprecated in favour of itself", start)
                } else {
                    format!("deprecation cycle through {} attributes", members.len())
                },
            )
            .with_context(format!("cycle: {}", path.join(" -> "))),
        );
    }

    for attr in registry.deprecated() {
        if in_cycle.contains(attr.key.as_str()) {
            continue;
        }
        let Some(target) = attr.deprecated_by.as_deref().and_then(|t| registry.get(t)) else {
            continue;
        };
        if target.is_deprecated() {
            let path = walk_deprecations(registry, &attr.key, registry.len() + 1);
            let mut item = DiagnosticItem::new(
                &attr.key,
                DiagnosticCode::DeprecationChain,
                format!("deprecated_by '{}' is itself deprecated", target.key),
            )
            .with_context(format!("chain: {}", path.join(" -> ")));
            if let Some(terminal) = path.last().filter(|k| !in_cycle.contains(*k)) {
                if registry.get(terminal).is_some_and(|a| !a.is_deprecated()) {
                    item = item.with_context(format!("point deprecated_by at '{}' instead", terminal));
                }
            }
            diagnostics.push(item);
        }
    }
}

/// Follow `deprecated_by` from `start`, stopping at a non-deprecated or
/// unknown key, a revisit, or after `max_hops` steps
fn walk_deprecations<'a>(registry: &'a Registry, start: &'a str, max_hops: usize) -> Vec<&'a str> {
    let mut path = vec![start];
    let mut current = start;
    for _ in 0..max_hops {
        let Some(next) = registry
            .get(current)
            .filter(|a| a.is_deprecated())
            .and_then(|a| a.deprecated_by.as_deref())
        else {
            break;
        };
        let revisit = path.contains(&next);
        path.push(next);
        if revisit || !registry.contains(next) {
            break;
        }
        current = next;
    }
    path
}

fn check_constant_names(registry: &Registry, diagnostics: &mut Diagnostics) {
    for (name, keys) in find_collisions(registry.keys()) {
        diagnostics.push(
            DiagnosticItem::new(
                keys[0],
                DiagnosticCode::ConstantNameCollision,
                format!("keys {} all generate the constant {}", keys.join(", "), name),
            )
            .with_context("rename one of the keys"),
        );
    }
}

/// Closest candidate by fuzzy score; ties go to the lexicographically smallest
fn suggest<'a>(needle: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let matcher = SkimMatcherV2::default();
    let mut candidates: Vec<&str> = candidates.collect();
    candidates.sort_unstable();

    let mut best: Option<(i64, &str)> = None;
    for candidate in candidates {
        if let Some(score) = matcher.fuzzy_match(candidate, needle) {
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, candidate));
            }
        }
    }
    best.map(|(_, candidate)| candidate)
}
