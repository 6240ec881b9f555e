//! Tests for the embedded command grammar.

use std::collections::BTreeMap;

use factcube::command::{
    parse_embedded_command, AxisSelector, CommandParse, DisplayMode, MemberSelection,
    ParseOutcome, Placement,
};
use factcube::diagnostics::{codes, Severity};

const SEGMENTS: &str = "http://example.com/role/Segments";

fn prefixes() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("us-gaap".to_string(), "http://fasb.org/us-gaap/2023".to_string());
    map
}

fn parse(value: &str) -> CommandParse {
    parse_embedded_command(
        value,
        |target| target == SEGMENTS,
        &prefixes(),
        "fact us-gaap:SegmentTextBlock on line 12",
    )
}

fn codes_of(parse: &CommandParse) -> Vec<&'static str> {
    parse.diagnostics.iter().map(|d| d.code).collect()
}

// ============================================================================
// Valid commands
// ============================================================================

#[test]
fn test_two_groups() {
    let parsed = parse(&format!(
        "<p>~ {} column period compact * row us-gaap_SegmentAxis compact \
         us-gaap_EastMember us-gaap_WestMember ~</p>",
        SEGMENTS
    ));
    let command = parsed.command().unwrap();
    assert_eq!(command.target, SEGMENTS);
    assert_eq!(command.groups.len(), 2);

    let period = &command.groups[0];
    assert_eq!(period.placement, Placement::Column);
    assert_eq!(period.axis, AxisSelector::Period);
    assert_eq!(period.members, MemberSelection::All);

    let segment = &command.groups[1];
    assert_eq!(segment.placement, Placement::Row);
    match (&segment.axis, &segment.members) {
        (AxisSelector::Axis(axis), MemberSelection::List(members)) => {
            assert_eq!(axis.local_name, "SegmentAxis");
            let names: Vec<&str> = members.iter().map(|m| m.local_name.as_str()).collect();
            assert_eq!(names, vec!["EastMember", "WestMember"]);
        }
        other => panic!("unexpected group {:?}", other),
    }
    assert!(parsed.diagnostics.is_empty());
}

#[test]
fn test_keywords_ignore_case() {
    let parsed = parse(&format!("~{} ROW Primary NoDisplay~", SEGMENTS));
    let group = &parsed.command().unwrap().groups[0];
    assert_eq!(group.axis, AxisSelector::Primary);
    assert_eq!(group.mode, DisplayMode::NoDisplay);
    assert_eq!(group.members, MemberSelection::Unspecified);
}

#[test]
fn test_target_alone_has_no_groups() {
    let parsed = parse(&format!("~{}~", SEGMENTS));
    assert!(parsed.command().unwrap().groups.is_empty());
}

// ============================================================================
// Not a command
// ============================================================================

#[test]
fn test_text_without_command_syntax() {
    for value in ["plain text", "a single ~ tilde", "~~", "~ http://example.com/role/Other row primary compact ~"] {
        let parsed = parse(value);
        assert_eq!(parsed.outcome, ParseOutcome::NotCommand, "{}", value);
        assert!(parsed.diagnostics.is_empty());
    }
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_bad_first_token_rejects_everything() {
    let parsed = parse(&format!("~ {} rows primary compact ~", SEGMENTS));
    assert_eq!(parsed.outcome, ParseOutcome::Invalid);
    assert_eq!(codes_of(&parsed), vec![codes::MALFORMED_TOKEN]);

    let error = &parsed.diagnostics[0];
    assert_eq!(error.severity, Severity::Error);
    assert_eq!(error.payload["position"], "2");
    insta::assert_snapshot!(error.message, @"The token rows, at position 2 in the list of tokens in fact us-gaap:SegmentTextBlock on line 12 (~http://example.com/role/Segments rows primary compact~), is malformed. An individual command can only start with row or column. These embedded commands will not be rendered.");
}

#[test]
fn test_axis_without_underscore_is_rejected() {
    let parsed = parse(&format!("~{} row Segment compact~", SEGMENTS));
    assert_eq!(parsed.outcome, ParseOutcome::Invalid);
    assert_eq!(codes_of(&parsed), vec![codes::MALFORMED_TOKEN_AXIS]);
    assert_eq!(parsed.diagnostics[0].payload["token"], "Segment");
}

#[test]
fn test_unknown_mode_is_rejected() {
    let parsed = parse(&format!("~{} row primary expanded~", SEGMENTS));
    assert_eq!(codes_of(&parsed), vec![codes::MALFORMED_SECOND_TOKEN]);
    assert_eq!(parsed.diagnostics[0].payload["position"], "4");
}

#[test]
fn test_wildcard_must_stand_alone() {
    let alone = parse(&format!("~{} row us-gaap_SegmentAxis compact *~", SEGMENTS));
    assert_eq!(alone.command().unwrap().groups[0].members, MemberSelection::All);

    let mixed = parse(&format!(
        "~{} row us-gaap_SegmentAxis compact * us-gaap_EastMember~",
        SEGMENTS
    ));
    assert_eq!(mixed.outcome, ParseOutcome::Invalid);
    assert_eq!(codes_of(&mixed), vec![codes::MALFORMED_MEMBER_TOKEN]);
    assert_eq!(mixed.diagnostics[0].payload["position"], "5");
}

// ============================================================================
// Legacy keywords
// ============================================================================

#[test]
fn test_separator_is_skipped_with_notice() {
    let parsed = parse(&format!(
        "~{} row separator \"|\" column period compact~",
        SEGMENTS
    ));
    let command = parsed.command().unwrap();
    assert_eq!(command.groups.len(), 1);
    assert_eq!(command.groups[0].axis, AxisSelector::Period);
    assert_eq!(codes_of(&parsed), vec![codes::TOKEN_NOT_SUPPORTED]);
    assert_eq!(parsed.diagnostics[0].severity, Severity::Info);
}

#[test]
fn test_grouped_and_unitcell_become_compact() {
    let parsed = parse(&format!(
        "~{} row primary grouped column unit unitcell~",
        SEGMENTS
    ));
    let command = parsed.command().unwrap();
    assert!(command.groups.iter().all(|g| g.mode == DisplayMode::Compact));
    assert_eq!(
        codes_of(&parsed),
        vec![codes::GROUPED_TOKEN, codes::UNITCELL_TOKEN]
    );
}

#[test]
fn test_notices_survive_a_later_rejection() {
    let parsed = parse(&format!("~{} row primary grouped column bogus~", SEGMENTS));
    assert_eq!(parsed.outcome, ParseOutcome::Invalid);
    assert_eq!(
        codes_of(&parsed),
        vec![codes::GROUPED_TOKEN, codes::MALFORMED_TOKEN_AXIS]
    );
}
