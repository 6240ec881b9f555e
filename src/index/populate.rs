//! Routing facts into cubes.
//!
//! The first pass builds a cube per presentation linkrole, indexes every
//! usable fact and collects embedded commands. The recovery pass reruns the
//! fact routing for the leftover facts against the single uncategorized cube.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use super::{deduplicate, PeriodDescriptor};
use crate::command::{parse_embedded_command, ParseOutcome};
use crate::compile::FilingState;
use crate::cube::{AxisMemberMap, Cube, CubeId, FactMembership};
use crate::diagnostics::{codes, Diagnostic};
use crate::model::{FactId, QName};

static QNAME_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z-]+:[a-zA-Z]+$").expect("valid regex"));

/// First pass over the whole filing.
pub fn populate(state: &mut FilingState<'_>) {
    let instance = state.instance;

    state.duplicates = deduplicate(instance, &mut state.diagnostics);
    let duplicates: Vec<FactId> = state.duplicates.iter().copied().collect();
    for fact in duplicates {
        state.mark_broken(fact);
    }

    for linkrole in instance.presentation_network().linkroles() {
        let definition = instance.role_definition(linkrole).unwrap_or(linkrole);
        state.add_cube(|id| Cube::new(id, linkrole, definition));
    }
    detect_missing_defaults(state);

    for (qname, facts) in instance.facts_by_qname() {
        match instance.concept(&qname) {
            None => {
                state.diagnostics.push(
                    Diagnostic::warning(
                        codes::FACT_CONCEPT_UNDECLARED,
                        format!(
                            "{} fact(s) of {} have no declared concept and will not be rendered.",
                            facts.len(),
                            qname
                        ),
                    )
                    .with("qname", &qname),
                );
                continue;
            }
            Some(concept) if concept.data_type.is_none() => {
                state.diagnostics.push(
                    Diagnostic::warning(
                        codes::FACT_TYPE_UNDECLARED,
                        format!(
                            "Concept {} has no declared type; its facts will not be rendered.",
                            qname
                        ),
                    )
                    .with("qname", &qname),
                );
                continue;
            }
            Some(_) => {}
        }
        let usable = facts
            .iter()
            .any(|&f| !state.duplicates.contains(&f) && instance.context_of(f).is_some());
        if usable {
            state.entities.element_or_insert(&qname);
        }
    }

    for cube in 0..state.cubes.len() {
        let cube = CubeId(cube);
        let Some(tree) = instance
            .presentation_network()
            .tree(&state.cubes[cube.0].linkrole)
        else {
            continue;
        };
        for concept in tree.targets() {
            if let Some(element) = state.entities.element_id(concept) {
                state.entities.link_element_cube(element, cube);
            }
        }
    }

    for footnote in &instance.footnotes {
        state
            .footnotes
            .entry(footnote.fact)
            .or_default()
            .push(footnote.text.clone());
    }

    for fact in instance.fact_ids() {
        route_fact(state, fact);
    }

    tracing::info!(
        cubes = state.cubes.len(),
        elements = state.entities.element_count(),
        axes = state.entities.axis_count(),
        periods = state.entities.period_count(),
        duplicates = state.duplicates.len(),
        "indexed filing"
    );
}

/// Recovery pass: index only `facts`, all routed to the uncategorized cube.
pub fn populate_uncategorized(state: &mut FilingState<'_>, cube: CubeId, facts: &BTreeSet<FactId>) {
    let instance = state.instance;
    for &fact in facts {
        let qname = &instance.fact(fact).qname;
        let declared = instance.concept(qname).is_some_and(|c| c.data_type.is_some());
        if declared && instance.context_of(fact).is_some() {
            let element = state.entities.element_or_insert(qname);
            state.entities.link_element_cube(element, cube);
        }
    }
    for &fact in facts {
        route_fact(state, fact);
    }
}

/// One cube for every axis in a tree whose defaults are missing or unreachable.
fn detect_missing_defaults(state: &mut FilingState<'_>) {
    let instance = state.instance;
    let network = instance.presentation_network();
    for index in 0..state.cubes.len() {
        let Some(tree) = network.tree(&state.cubes[index].linkrole) else {
            continue;
        };
        let mut missing = BTreeSet::new();
        for concept in tree.concepts() {
            if !instance.concept(concept).is_some_and(|c| c.is_dimension) {
                continue;
            }
            let defaults: BTreeSet<&QName> = instance.defaults_of(concept).collect();
            let reachable: BTreeSet<&QName> = tree
                .descendants(concept)
                .into_iter()
                .filter(|d| defaults.contains(d))
                .collect();
            if defaults.is_empty() || defaults != reachable {
                missing.insert(concept.clone());
            }
        }
        if missing.is_empty() {
            continue;
        }
        let cube = &mut state.cubes[index];
        let axes: Vec<String> = missing.iter().map(QName::prefixed).collect();
        let diagnostic = Diagnostic::warning(
            codes::NO_DEFAULTS,
            format!(
                "In {}, the axes {} have no default member reachable in the presentation tree. \
                 Facts without a member on these axes are not shown.",
                cube.short_name,
                axes.join(", ")
            ),
        )
        .with("linkrole", &cube.linkrole)
        .with("axes", axes.join(", "));
        cube.default_missing_axes = missing;
        state.diagnostics.push(diagnostic);
    }
}

/// Validate one fact and append it to every cube its element belongs to.
fn route_fact(state: &mut FilingState<'_>, id: FactId) {
    let instance = state.instance;
    let fact = instance.fact(id);

    if fact.tuple {
        state.diagnostics.push(
            Diagnostic::warning(
                codes::TUPLE_IGNORED,
                format!(
                    "The tuple {} on line {} is not allowed and will not be rendered.",
                    fact.qname, fact.source_line
                ),
            )
            .with("fact", &fact.qname)
            .with("line", fact.source_line),
        );
        state.mark_broken(id);
        return;
    }

    let Some(context) = instance.context_of(id) else {
        state.diagnostics.push(
            Diagnostic::warning(
                codes::CONTEXT_MISSING,
                format!(
                    "The fact {} on line {} has a missing or broken context {} and will not be rendered.",
                    fact.qname,
                    fact.source_line,
                    fact.context_ref.as_deref().unwrap_or("(none)")
                ),
            )
            .with("fact", &fact.qname)
            .with("line", fact.source_line),
        );
        state.mark_broken(id);
        return;
    };

    if context.has_scenario && !state.is_recovery {
        state.diagnostics.push(
            Diagnostic::warning(
                codes::SCENARIO_DISALLOWED,
                format!("Context {} has a scenario element, which is not allowed.", context.id),
            )
            .with("context", &context.id),
        );
    }

    let Some(element) = state.entities.element_id(&fact.qname) else {
        state.mark_broken(id);
        return;
    };
    if state.duplicates.contains(&id) {
        return;
    }

    let concept = instance.concept(&fact.qname);
    if !concept.is_some_and(|c| c.is_numeric()) {
        let is_command = concept.is_some_and(|c| c.is_text_block()) && embedded_command(state, id);
        if !is_command {
            record_qname_value(state, id);
        }
    }

    let period = state
        .entities
        .period_or_insert(PeriodDescriptor::key_of(&context.period));
    let unit = fact
        .unit_ref
        .as_ref()
        .filter(|u| instance.unit(u).is_some())
        .cloned();
    let cubes: Vec<CubeId> = state.entities.element(element).cubes.iter().copied().collect();

    let mut members = BTreeMap::new();
    for dim in &context.dimensions {
        if instance.concept(&dim.dimension).is_none() {
            if !state.is_recovery {
                state.diagnostics.push(
                    Diagnostic::warning(
                        codes::UNDECLARED_DIMENSION,
                        format!(
                            "The axis {} in context {} is not declared; the fact {} is shown without it.",
                            dim.dimension, context.id, fact.qname
                        ),
                    )
                    .with("axis", &dim.dimension)
                    .with("context", &context.id),
                );
            }
            continue;
        }
        if instance.concept(&dim.member).is_none() {
            if !state.is_recovery {
                state.diagnostics.push(
                    Diagnostic::warning(
                        codes::UNDECLARED_MEMBER,
                        format!(
                            "The member {} in context {} is not declared; the fact {} is shown without it.",
                            dim.member, context.id, fact.qname
                        ),
                    )
                    .with("member", &dim.member)
                    .with("context", &context.id),
                );
            }
            continue;
        }

        let axis = state.entities.axis_or_insert(&dim.dimension, || {
            instance.defaults_of(&dim.dimension).next().cloned()
        });
        let member = state.entities.member_or_insert(&dim.member);
        state.entities.link_member(axis, member);
        for &cube in &cubes {
            state.entities.link_axis_cube(axis, cube);
            let cube = &mut state.cubes[cube.0];
            cube.axes.insert(dim.dimension.clone(), axis);
            cube.members.insert(dim.member.clone(), member);
        }
        members.insert(dim.dimension.clone(), dim.member.clone());
    }

    for cube in cubes {
        let membership = FactMembership {
            fact: id,
            coordinates: AxisMemberMap {
                period: Some(period),
                unit: unit.clone(),
                members: members.clone(),
            },
            period_label: None,
        };
        state.cubes[cube.0].add_membership(membership, &fact.qname);
    }
}

/// Parse an embedded command in a text block and register its embedding.
fn embedded_command(state: &mut FilingState<'_>, id: FactId) -> bool {
    if state.is_recovery {
        return false;
    }
    let instance = state.instance;
    let fact = instance.fact(id);
    let describe = format!("fact {} on line {}", fact.qname, fact.source_line);
    let parse = parse_embedded_command(
        &fact.value,
        |target| state.is_cube(target),
        &instance.namespaces,
        &describe,
    );
    state.diagnostics.extend(parse.diagnostics);

    match parse.outcome {
        ParseOutcome::NotCommand => false,
        ParseOutcome::Invalid => {
            state.diagnostics.push(
                Diagnostic::info(
                    codes::EMBEDDED_COMMAND_INVALID,
                    format!("The {} is rendered as ordinary text.", describe),
                )
                .with("fact", &fact.qname),
            );
            false
        }
        ParseOutcome::Parsed(command) => {
            let Some(cube) = state.cube_id(&command.target) else {
                return false;
            };
            let Ok(embedding) = state.add_embedding(cube, command.groups, Some(id)) else {
                return false;
            };
            state.cubes[cube.0].is_embedded = true;
            state.has_embeddings = true;
            state.disallow_embeddings = false;
            state.fact_to_embedding.insert(id, embedding);
            tracing::debug!(%cube, fact = %fact.qname, "embedded command");
            true
        }
    }
}

/// Text facts whose whole value is a known `prefix:Name`.
fn record_qname_value(state: &mut FilingState<'_>, id: FactId) {
    let instance = state.instance;
    let value = instance.fact(id).value.trim();
    if !QNAME_VALUE.is_match(value) {
        return;
    }
    if let Some(qname) = QName::from_prefixed(value, &instance.namespaces) {
        if instance.concept(&qname).is_some() {
            state.qname_values.insert(id, qname);
        }
    }
}
