//! Reports realized from embedded commands in text blocks.

use factcube::compile::{compile_filing, CompileOptions, CompileOutput};
use factcube::diagnostics::codes;
use factcube::emit::MemorySink;
use factcube::model::{ymd, DataType, InstanceBuilder, Period};
use factcube::report::RenderedReport;

const OPS: &str = "urn:role:ops";
const SEGMENTS: &str = "urn:role:segments";
const NOTE: &str = "urn:role:note";

fn year() -> Period {
    Period::Duration {
        start: ymd(2023, 1, 1),
        end: ymd(2023, 12, 31),
    }
}

/// Operations, a segment breakdown, and a note whose text block asks for
/// the breakdown by segment. `note_context` is the context of the note fact.
fn filing(note_context: &str) -> InstanceBuilder {
    let mut b = InstanceBuilder::new("abc-20231231.htm");
    b.prefix("t", "urn:t")
        .abstract_concept("t:OperationsAbstract")
        .abstract_concept("t:SegmentsAbstract")
        .abstract_concept("t:NoteAbstract")
        .concept("t:Revenue", DataType::Monetary)
        .concept("t:SegmentNote", DataType::TextBlock)
        .axis("t:SegmentAxis")
        .member("t:AllSegments")
        .member("t:EastMember")
        .member("t:WestMember")
        .dimension_default("t:SegmentAxis", "t:AllSegments")
        .role(OPS, "0010 - Statement - Operations")
        .role(SEGMENTS, "0020 - Disclosure - Segments")
        .role(NOTE, "0030 - Disclosure - Segment Note")
        .arc(OPS, "t:OperationsAbstract", "t:Revenue")
        .arc(SEGMENTS, "t:SegmentsAbstract", "t:SegmentAxis")
        .arc(SEGMENTS, "t:SegmentAxis", "t:AllSegments")
        .arc(SEGMENTS, "t:AllSegments", "t:EastMember")
        .arc(SEGMENTS, "t:AllSegments", "t:WestMember")
        .arc(SEGMENTS, "t:SegmentsAbstract", "t:Revenue")
        .arc(NOTE, "t:NoteAbstract", "t:SegmentNote")
        .unit("usd", "iso4217:USD")
        .duration("d23", ymd(2023, 1, 1), ymd(2023, 12, 31))
        .dimensional("d23e", year(), &[("t:SegmentAxis", "t:EastMember")])
        .dimensional("d23w", year(), &[("t:SegmentAxis", "t:WestMember")]);
    b.numeric("t:Revenue", "d23", "usd", "100", "0");
    b.numeric("t:Revenue", "d23e", "usd", "60", "0");
    b.numeric("t:Revenue", "d23w", "usd", "40", "0");
    b.fact(
        "t:SegmentNote",
        note_context,
        &format!(
            "<div>Revenue by segment: ~ {} row t_SegmentAxis compact * column period compact ~</div>",
            SEGMENTS
        ),
    );
    b
}

fn compile(b: InstanceBuilder, options: &CompileOptions) -> (CompileOutput, MemorySink) {
    let instance = b.build().unwrap();
    let mut sink = MemorySink::new();
    let output = compile_filing(&instance, options, &mut sink).unwrap();
    (output, sink)
}

fn headings(report: &RenderedReport) -> Vec<&str> {
    report.rows.iter().map(|r| r.heading.as_str()).collect()
}

// ============================================================================
// Realized inline
// ============================================================================

#[test]
fn test_command_renders_inside_the_note() {
    let (output, sink) = compile(filing("d23"), &CompileOptions::default());
    assert!(output.summary.has_embeddings);
    assert!(!output.flow_through_applied);

    let names: Vec<&str> = output.summary.reports.iter().map(|r| r.short_name.as_str()).collect();
    assert_eq!(names, vec!["Operations", "Segment Note"]);

    let note = &output.summary.reports[1];
    assert!(note.has_embedded_reports);
    assert_eq!(note.file_number, Some(3));

    let rendered = sink.report("Segment Note").unwrap();
    assert_eq!(rendered.embedded.len(), 1);
    let segments = &rendered.embedded[0];
    assert_eq!(segments.title, "Segments");
    assert_eq!(segments.column_headings, vec!["USD ($)"]);
    assert_eq!(
        headings(segments),
        vec!["Revenue", "EastMember | Revenue", "WestMember | Revenue"]
    );
    assert_eq!(segments.cell("EastMember | Revenue", 0), Some("60"));
    assert_eq!(output.summary.unused_facts, 0);
}

#[test]
fn test_embedded_cube_is_numbered_but_not_written_alone() {
    let (output, sink) = compile(filing("d23"), &CompileOptions::default());

    let segments = output
        .cube_outcomes
        .iter()
        .find(|c| c.linkrole == SEGMENTS)
        .unwrap();
    assert!(segments.is_embedded);
    assert_eq!(segments.file_number, Some(2));
    assert_eq!(segments.embeddings, 1);
    assert!(sink.report("Segments").is_none());
}

#[test]
fn test_spreadsheet_skipped_with_embedded_commands() {
    let (output, sink) = compile(filing("d23"), &CompileOptions::default().with_excel(true));

    assert!(sink.worksheets.is_empty());
    assert_eq!(
        output.diagnostics.iter().filter(|d| d.code == codes::SKIPPED_EXCEL).count(),
        1
    );
}

// ============================================================================
// Never realized
// ============================================================================

#[test]
fn test_hidden_trigger_leaves_the_default_view() {
    // The note fact sits on a segment the note never shows.
    let (output, sink) = compile(filing("d23e"), &CompileOptions::default());

    let segments = output
        .cube_outcomes
        .iter()
        .find(|c| c.linkrole == SEGMENTS)
        .unwrap();
    assert_eq!(segments.embeddings, 2);

    let summary = output
        .summary
        .reports
        .iter()
        .find(|r| r.short_name == "Segments")
        .unwrap();
    assert!(summary.is_default);
    assert_eq!(summary.file_number, Some(2));

    let report = sink.report("Segments").unwrap();
    assert_eq!(report.column_headings, vec!["USD ($)"]);
    assert_eq!(
        headings(report),
        vec!["SegmentsAbstract", "Revenue", "EastMember | Revenue", "WestMember | Revenue"]
    );
    assert_eq!(report.cell("WestMember | Revenue", 0), Some("40"));
    assert!(sink.report("Segment Note").is_none());
    assert!(output.summary.reports.last().unwrap().is_uncategorized);
}
