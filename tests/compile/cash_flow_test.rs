//! Short-period columns on cash-flow statements.

use factcube::compile::{compile_filing, CompileOptions, CompileOutput};
use factcube::diagnostics::codes;
use factcube::emit::MemorySink;
use factcube::model::{ymd, DataType, InstanceBuilder, Period};

const CASH_FLOWS: &str = "urn:role:cashflows";
const OPS: &str = "urn:role:ops";
const SEGMENTS: &str = "urn:role:segments";

const LINES: [&str; 8] = [
    "t:NetIncome",
    "t:Depreciation",
    "t:Receivables",
    "t:Payables",
    "t:Capex",
    "t:Dividends",
    "t:Borrowings",
    "t:Repayments",
];

/// Eight line items for two full years, and `quarter` of them for the fourth
/// quarter as well.
fn filing(role: &str, definition: &str, quarter: usize) -> InstanceBuilder {
    let mut b = InstanceBuilder::new("abc-20231231.htm");
    b.prefix("t", "urn:t")
        .abstract_concept("t:StatementAbstract")
        .role(role, definition)
        .unit("usd", "iso4217:USD")
        .duration("d23", ymd(2023, 1, 1), ymd(2023, 12, 31))
        .duration("q4", ymd(2023, 10, 1), ymd(2023, 12, 31))
        .duration("d22", ymd(2022, 1, 1), ymd(2022, 12, 31));
    for line in LINES {
        b.concept(line, DataType::Monetary)
            .arc(role, "t:StatementAbstract", line);
    }
    for (i, line) in LINES.iter().enumerate() {
        b.numeric(line, "d23", "usd", &format!("{}", 101 + i), "0");
        b.numeric(line, "d22", "usd", &format!("{}", 201 + i), "0");
    }
    for (i, line) in LINES.iter().take(quarter).enumerate() {
        b.numeric(line, "q4", "usd", &format!("{}", 31 + i), "0");
    }
    b
}

fn compile(b: InstanceBuilder) -> (CompileOutput, MemorySink) {
    let instance = b.build().unwrap();
    let mut sink = MemorySink::new();
    let output = compile_filing(&instance, &CompileOptions::default(), &mut sink).unwrap();
    (output, sink)
}

#[test]
fn test_sparse_quarter_is_removed() {
    let (output, sink) = compile(filing(
        CASH_FLOWS,
        "0040 - Statement - Consolidated Statements of Cash Flows",
        1,
    ));

    let report = sink.report("Consolidated Statements of Cash Flows").unwrap();
    assert_eq!(report.hidden_columns, 1);
    assert_eq!(
        report.column_headings,
        vec![
            "12 Months Ended Dec. 31, 2023 | USD ($)",
            "12 Months Ended Dec. 31, 2022 | USD ($)"
        ]
    );
    assert_eq!(report.cell("NetIncome", 0), Some("101"));
    assert_eq!(report.cell("NetIncome", 1), Some("201"));

    let notice = output
        .diagnostics
        .iter()
        .find(|d| d.code == codes::SHORTER_COLUMNS_REMOVED)
        .unwrap();
    assert_eq!(notice.payload["threshold"], "2");
    assert_eq!(notice.payload["removed"], "1");
    insta::assert_snapshot!(notice.message, @"In Consolidated Statements of Cash Flows, 1 column(s) shorter than 12 months with fewer than 2 facts were removed: 3 Months Ended Dec. 31, 2023.");
}

#[test]
fn test_removed_fact_is_recovered_as_uncategorized() {
    let (output, sink) = compile(filing(
        CASH_FLOWS,
        "0040 - Statement - Consolidated Statements of Cash Flows",
        1,
    ));

    assert_eq!(output.summary.unused_facts, 1);
    let (summary, report) = sink.reports.last().unwrap();
    assert!(summary.is_uncategorized);
    assert_eq!(report.column_headings, vec!["3 Months Ended Dec. 31, 2023 | USD ($)"]);
    assert_eq!(report.cell("NetIncome (t:NetIncome)", 0), Some("31"));
}

#[test]
fn test_quarter_at_threshold_is_kept() {
    let (output, sink) = compile(filing(
        CASH_FLOWS,
        "0040 - Statement - Consolidated Statements of Cash Flows",
        2,
    ));

    let report = sink.report("Consolidated Statements of Cash Flows").unwrap();
    assert_eq!(report.hidden_columns, 0);
    assert_eq!(report.column_headings.len(), 3);
    assert_eq!(output.summary.unused_facts, 0);
}

#[test]
fn test_other_statements_keep_short_columns() {
    let (output, sink) = compile(filing(OPS, "0020 - Statement - Operations", 1));

    let report = sink.report("Operations").unwrap();
    assert_eq!(report.hidden_columns, 0);
    assert_eq!(report.column_headings.len(), 3);
    assert!(output
        .diagnostics
        .iter()
        .all(|d| d.code != codes::SHORTER_COLUMNS_REMOVED));
}

// ============================================================================
// After flow-through suppression
// ============================================================================

/// The prior year repeats what a segment disclosure shows, the current year
/// adds one line of its own, and the quarter reports a single other line.
fn with_segment_disclosure() -> InstanceBuilder {
    let mut b = filing(
        CASH_FLOWS,
        "0040 - Statement - Consolidated Statements of Cash Flows",
        0,
    );
    b.abstract_concept("t:SegmentsAbstract")
        .concept("t:Interest", DataType::Monetary)
        .concept("t:Leases", DataType::Monetary)
        .arc(CASH_FLOWS, "t:StatementAbstract", "t:Interest")
        .arc(CASH_FLOWS, "t:StatementAbstract", "t:Leases")
        .axis("t:SegmentAxis")
        .member("t:EastMember")
        .role(SEGMENTS, "0090 - Disclosure - Segments")
        .arc(SEGMENTS, "t:SegmentsAbstract", "t:SegmentAxis")
        .arc(SEGMENTS, "t:SegmentAxis", "t:EastMember")
        .dimensional(
            "d22e",
            Period::Duration {
                start: ymd(2022, 1, 1),
                end: ymd(2022, 12, 31),
            },
            &[("t:SegmentAxis", "t:EastMember")],
        );
    for line in LINES {
        b.arc(SEGMENTS, "t:SegmentsAbstract", line);
    }
    for (i, line) in LINES.iter().enumerate() {
        b.numeric(line, "d22e", "usd", &format!("{}", 401 + i), "0");
    }
    b.numeric("t:Interest", "d23", "usd", "9", "0");
    b.numeric("t:Leases", "q4", "usd", "3", "0");
    b
}

#[test]
fn test_pruning_keeps_facts_hidden_by_flow_through() {
    let (output, sink) = compile(with_segment_disclosure());
    assert!(output.flow_through_applied);

    let suppressed = output
        .diagnostics
        .iter()
        .find(|d| d.code == codes::COLUMNS_SUPPRESSED)
        .unwrap();
    assert_eq!(suppressed.payload["columns"], "3");
    let pruned = output
        .diagnostics
        .iter()
        .find(|d| d.code == codes::SHORTER_COLUMNS_REMOVED)
        .unwrap();
    assert_eq!(pruned.payload["removed"], "1");

    let report = sink.report("Consolidated Statements of Cash Flows").unwrap();
    assert_eq!(report.hidden_columns, 2);
    assert_eq!(
        report.column_headings,
        vec!["12 Months Ended Dec. 31, 2023 | USD ($)"]
    );

    assert_eq!(output.summary.unused_facts, 1);
    let (summary, uncategorized) = sink.reports.last().unwrap();
    assert!(summary.is_uncategorized);
    let recovered: Vec<&str> = uncategorized.rows.iter().map(|r| r.heading.as_str()).collect();
    assert_eq!(recovered, vec!["Leases (t:Leases)"]);
}
