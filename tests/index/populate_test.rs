//! Tests for entity indexing and cube linking.

use std::collections::BTreeSet;

use factcube::compile::{CompileOptions, FactUse, FilingState};
use factcube::cube::Cube;
use factcube::diagnostics::codes;
use factcube::index::{populate, populate_uncategorized};
use factcube::model::{ymd, DataType, FactId, Instance, InstanceBuilder, Period, QName};

const OPS: &str = "urn:role:ops";
const SEGMENTS: &str = "urn:role:segments";

fn q(local: &str) -> QName {
    QName::new("t", "urn:t", local)
}

fn year() -> Period {
    Period::Duration {
        start: ymd(2023, 1, 1),
        end: ymd(2023, 12, 31),
    }
}

/// Operations statement plus a segment disclosure sharing `t:Revenue`.
fn builder() -> InstanceBuilder {
    let mut b = InstanceBuilder::new("abc-20231231.htm");
    b.prefix("t", "urn:t")
        .concept("t:Revenue", DataType::Monetary)
        .concept("t:Policy", DataType::String)
        .concept("t:Note", DataType::TextBlock)
        .abstract_concept("t:OpsAbstract")
        .axis("t:SegmentAxis")
        .member("t:AllSegments")
        .member("t:EastMember")
        .member("t:WestMember")
        .dimension_default("t:SegmentAxis", "t:AllSegments")
        .role(OPS, "0010 - Statement - Operations")
        .role(SEGMENTS, "0020 - Disclosure - Segments")
        .arc(OPS, "t:OpsAbstract", "t:Revenue")
        .arc(SEGMENTS, "t:OpsAbstract", "t:SegmentAxis")
        .arc(SEGMENTS, "t:SegmentAxis", "t:AllSegments")
        .arc(SEGMENTS, "t:AllSegments", "t:EastMember")
        .arc(SEGMENTS, "t:AllSegments", "t:WestMember")
        .arc(SEGMENTS, "t:OpsAbstract", "t:Revenue")
        .arc(SEGMENTS, "t:OpsAbstract", "t:Note")
        .unit("usd", "iso4217:USD")
        .duration("d1", ymd(2023, 1, 1), ymd(2023, 12, 31))
        .dimensional("d1e", year(), &[("t:SegmentAxis", "t:EastMember")])
        .dimensional("d1w", year(), &[("t:SegmentAxis", "t:WestMember")]);
    b
}

fn populated<'a>(instance: &'a Instance, options: &'a CompileOptions) -> FilingState<'a> {
    let mut state = FilingState::new(instance, options);
    populate(&mut state);
    state
}

fn is_broken(state: &FilingState<'_>, fact: FactId) -> bool {
    state
        .used_or_broken
        .get(&fact)
        .is_some_and(|uses| uses.contains(&FactUse::Broken))
}

// ============================================================================
// Linking
// ============================================================================

#[test]
fn test_fact_routes_to_every_cube_showing_its_concept() {
    let mut b = builder();
    let total = b.numeric("t:Revenue", "d1", "usd", "100", "0");
    let east = b.numeric("t:Revenue", "d1e", "usd", "60", "0");
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    let ops = state.cube_id(OPS).unwrap();
    let segments = state.cube_id(SEGMENTS).unwrap();
    let routed = |cube: usize| -> Vec<FactId> {
        state.cubes[cube].memberships.iter().map(|m| m.fact).collect()
    };
    assert_eq!(routed(ops.0), vec![total, east]);
    assert_eq!(routed(segments.0), vec![total, east]);

    let element = state.entities.element_id(&q("Revenue")).unwrap();
    assert_eq!(state.entities.element(element).cubes.len(), 2);
    assert_eq!(state.cubes[segments.0].units, vec!["usd".to_string()]);
    assert_eq!(state.cubes[segments.0].periods.len(), 1);
}

#[test]
fn test_axis_and_member_are_linked() {
    let mut b = builder();
    b.numeric("t:Revenue", "d1e", "usd", "60", "0");
    b.numeric("t:Revenue", "d1w", "usd", "40", "0");
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    let axis = state.entities.axis_by_name(&q("SegmentAxis")).unwrap();
    assert_eq!(axis.default, Some(q("AllSegments")));
    assert_eq!(axis.members.len(), 2);
    let east = state.entities.member_id(&q("EastMember")).unwrap();
    assert_eq!(state.entities.member(east).axis, state.entities.axis_id(&q("SegmentAxis")));

    let cube = &state.cubes[state.cube_id(SEGMENTS).unwrap().0];
    assert!(cube.axes.contains_key(&q("SegmentAxis")));
    assert_eq!(
        cube.memberships[0].coordinates.member(&q("SegmentAxis")),
        Some(&q("EastMember"))
    );
}

// ============================================================================
// Broken facts
// ============================================================================

#[test]
fn test_unusable_facts_are_warned_and_marked_broken() {
    let mut b = builder();
    b.untyped_concept("t:Untyped");
    let tuple = b.fact("t:Policy", "d1", "grouped");
    b.fact_mut(tuple).tuple = true;
    let dangling = b.numeric("t:Revenue", "missing", "usd", "1", "0");
    let ghost = b.fact("t:Ghost", "d1", "boo");
    let untyped = b.fact("t:Untyped", "d1", "x");
    let good = b.numeric("t:Revenue", "d1", "usd", "100", "0");
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    for fact in [tuple, dangling, ghost, untyped] {
        assert!(is_broken(&state, fact), "{} should be broken", fact);
    }
    assert!(!is_broken(&state, good));
    assert_eq!(state.diagnostics.with_code(codes::TUPLE_IGNORED).count(), 1);
    assert_eq!(state.diagnostics.with_code(codes::CONTEXT_MISSING).count(), 1);
    assert_eq!(state.diagnostics.with_code(codes::FACT_CONCEPT_UNDECLARED).count(), 1);
    assert_eq!(state.diagnostics.with_code(codes::FACT_TYPE_UNDECLARED).count(), 1);

    let unused = state.unused_facts();
    assert!(unused.contains(&good));
    assert!(!unused.contains(&ghost));
}

#[test]
fn test_duplicates_are_never_indexed() {
    let mut b = builder();
    let kept = b.numeric("t:Revenue", "d1", "usd", "100", "0");
    let dropped = b.numeric("t:Revenue", "d1", "usd", "100", "-3");
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    assert_eq!(state.duplicates, BTreeSet::from([dropped]));
    assert!(is_broken(&state, dropped));
    let ops = &state.cubes[state.cube_id(OPS).unwrap().0];
    let routed: Vec<FactId> = ops.memberships.iter().map(|m| m.fact).collect();
    assert_eq!(routed, vec![kept]);
}

#[test]
fn test_scenario_warns_but_still_routes() {
    let mut b = builder();
    b.context_mut("d1").unwrap().has_scenario = true;
    let fact = b.numeric("t:Revenue", "d1", "usd", "100", "0");
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    assert_eq!(state.diagnostics.with_code(codes::SCENARIO_DISALLOWED).count(), 1);
    let ops = &state.cubes[state.cube_id(OPS).unwrap().0];
    assert_eq!(ops.memberships[0].fact, fact);
}

#[test]
fn test_undeclared_member_is_dropped_from_the_fact() {
    let mut b = builder();
    b.dimensional("d1n", year(), &[("t:SegmentAxis", "t:NorthMember")]);
    let fact = b.numeric("t:Revenue", "d1n", "usd", "5", "0");
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    assert_eq!(state.diagnostics.with_code(codes::UNDECLARED_MEMBER).count(), 1);
    let ops = &state.cubes[state.cube_id(OPS).unwrap().0];
    assert_eq!(ops.memberships[0].fact, fact);
    assert!(ops.memberships[0].coordinates.members.is_empty());
    assert!(!is_broken(&state, fact));
}

#[test]
fn test_missing_default_is_reported_once_per_cube() {
    let mut b = builder();
    b.axis("t:RegionAxis")
        .member("t:NorthRegion")
        .arc(SEGMENTS, "t:OpsAbstract", "t:RegionAxis")
        .arc(SEGMENTS, "t:RegionAxis", "t:NorthRegion");
    b.numeric("t:Revenue", "d1", "usd", "100", "0");
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    let warnings: Vec<_> = state.diagnostics.with_code(codes::NO_DEFAULTS).collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].payload["linkrole"], SEGMENTS);
    let segments = &state.cubes[state.cube_id(SEGMENTS).unwrap().0];
    assert_eq!(segments.default_missing_axes, BTreeSet::from([q("RegionAxis")]));
    let ops = &state.cubes[state.cube_id(OPS).unwrap().0];
    assert!(ops.default_missing_axes.is_empty());
}

// ============================================================================
// Text facts
// ============================================================================

#[test]
fn test_embedded_command_marks_target_cube() {
    let mut b = builder();
    b.numeric("t:Revenue", "d1", "usd", "100", "0");
    let note = b.fact("t:Note", "d1", &format!("<p>~ {} row primary compact ~</p>", OPS));
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    let ops = state.cube_id(OPS).unwrap();
    assert!(state.cubes[ops.0].is_embedded);
    assert!(state.has_embeddings);
    assert!(!state.disallow_embeddings);
    let embedding = state.fact_to_embedding[&note];
    assert_eq!(state.embeddings[embedding.0].cube, ops);
    assert_eq!(state.embeddings[embedding.0].trigger, Some(note));
    assert_eq!(state.embeddings[embedding.0].explicit.len(), 1);
}

#[test]
fn test_invalid_command_renders_as_text() {
    let mut b = builder();
    b.numeric("t:Revenue", "d1", "usd", "100", "0");
    b.fact("t:Note", "d1", &format!("~ {} rows primary compact ~", OPS));
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    assert!(!state.has_embeddings);
    assert!(state.embeddings.is_empty());
    assert_eq!(state.diagnostics.with_code(codes::MALFORMED_TOKEN).count(), 1);
    assert_eq!(state.diagnostics.with_code(codes::EMBEDDED_COMMAND_INVALID).count(), 1);
}

#[test]
fn test_qname_valued_text_is_recorded() {
    let mut b = builder();
    let named = b.fact("t:Policy", "d1", "t:Revenue");
    let unknown = b.fact("t:Policy", "d1w", "t:Nothing");
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let state = populated(&instance, &options);

    assert_eq!(state.qname_values.get(&named), Some(&q("Revenue")));
    assert!(!state.qname_values.contains_key(&unknown));
}

// ============================================================================
// Recovery pass
// ============================================================================

#[test]
fn test_recovery_rebuilds_entities_from_the_subset() {
    let mut b = builder();
    b.context_mut("d1e").unwrap().has_scenario = true;
    b.numeric("t:Revenue", "d1", "usd", "100", "0");
    let east = b.numeric("t:Revenue", "d1e", "usd", "60", "0");
    b.numeric("t:Revenue", "d1w", "usd", "40", "0");
    b.fact("t:Note", "d1", &format!("~ {} row primary compact ~", OPS));
    let instance = b.build().unwrap();
    let options = CompileOptions::default();
    let mut state = populated(&instance, &options);
    assert_eq!(state.entities.member_count(), 2);
    let scenario_warnings = state.diagnostics.with_code(codes::SCENARIO_DISALLOWED).count();

    state.clear_for_recovery();
    assert!(state.cube_id(OPS).is_none());
    let cube = state.add_cube(|id| Cube::uncategorized(id, "abc-20231231.htm"));
    populate_uncategorized(&mut state, cube, &BTreeSet::from([east]));

    assert_eq!(state.entities.element_count(), 1);
    assert_eq!(state.entities.axis_count(), 1);
    assert_eq!(state.entities.member_count(), 1);
    assert_eq!(state.entities.period_count(), 1);
    let element = state.entities.element_id(&q("Revenue")).unwrap();
    assert_eq!(element.index(), 0);
    assert_eq!(
        state.entities.element(element).cubes,
        BTreeSet::from([cube])
    );

    let uncategorized = &state.cubes[cube.0];
    assert_eq!(uncategorized.memberships.len(), 1);
    assert_eq!(uncategorized.memberships[0].fact, east);
    assert_eq!(
        state.diagnostics.with_code(codes::SCENARIO_DISALLOWED).count(),
        scenario_warnings
    );
}
