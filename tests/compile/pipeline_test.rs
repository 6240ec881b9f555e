//! End-to-end compilation of small filings.

use factcube::compile::{compile_filing, CompileOptions, CompileOutput};
use factcube::cube::CubeState;
use factcube::diagnostics::codes;
use factcube::emit::MemorySink;
use factcube::model::{ymd, DataType, Instance, InstanceBuilder};
use factcube::report::LineKind;

const BS: &str = "urn:role:bs";
const OPS: &str = "urn:role:ops";
const EMPTY: &str = "urn:role:empty";
const RESERVE: &str = "urn:role:reserve";
const TRANSPOSED: &str = "urn:role:transposed";

const START: &str = "http://www.xbrl.org/2003/role/periodStartLabel";
const END: &str = "http://www.xbrl.org/2003/role/periodEndLabel";

/// Balance sheet and operations statements plus a disclosure with no facts.
/// The linkroles appear in reverse of their definition order.
fn statements() -> InstanceBuilder {
    let mut b = InstanceBuilder::new("abc-20231231.htm");
    b.prefix("t", "urn:t")
        .abstract_concept("t:BalanceSheetAbstract")
        .abstract_concept("t:OperationsAbstract")
        .abstract_concept("t:NothingAbstract")
        .concept("t:Cash", DataType::Monetary)
        .concept("t:Revenue", DataType::Monetary)
        .concept("t:Unreported", DataType::Monetary)
        .label("t:BalanceSheetAbstract", "Balance Sheet [Abstract]")
        .label("t:Cash", "Cash and equivalents")
        .role(BS, "0010 - Statement - Balance Sheet")
        .role(OPS, "0020 - Statement - Operations")
        .role(EMPTY, "0030 - Disclosure - Nothing Reported")
        .arc(EMPTY, "t:NothingAbstract", "t:Unreported")
        .arc(OPS, "t:OperationsAbstract", "t:Revenue")
        .arc(BS, "t:BalanceSheetAbstract", "t:Cash")
        .unit("usd", "iso4217:USD")
        .instant("c23", ymd(2023, 12, 31))
        .instant("c22", ymd(2022, 12, 31))
        .duration("d23", ymd(2023, 1, 1), ymd(2023, 12, 31));
    b.numeric("t:Cash", "c23", "usd", "1500", "0");
    b.numeric("t:Cash", "c22", "usd", "1200", "0");
    b.numeric("t:Revenue", "d23", "usd", "9000000", "-6");
    b
}

fn compile(instance: &Instance, options: &CompileOptions) -> (CompileOutput, MemorySink) {
    let mut sink = MemorySink::new();
    let output = compile_filing(instance, options, &mut sink).unwrap();
    (output, sink)
}

// ============================================================================
// Numbering and summaries
// ============================================================================

#[test]
fn test_reports_follow_definition_order() {
    let instance = statements().build().unwrap();
    let (output, sink) = compile(&instance, &CompileOptions::default());

    let names: Vec<&str> = output.summary.reports.iter().map(|r| r.short_name.as_str()).collect();
    assert_eq!(names, vec!["Balance Sheet", "Operations"]);
    let numbers: Vec<Option<u32>> = output.summary.reports.iter().map(|r| r.file_number).collect();
    assert_eq!(numbers, vec![Some(1), Some(2)]);

    let first = &output.summary.reports[0];
    assert!(first.is_default);
    assert!(!first.is_uncategorized);
    assert!(!first.has_embedded_reports);
    assert_eq!(first.role, BS);
    assert_eq!(first.long_name, "0010 - Statement - Balance Sheet");
    assert_eq!(first.html_file_name.as_deref(), Some("R1.htm"));
    assert_eq!(first.xml_file_name.as_deref(), Some("R1.xml"));
    assert_eq!(first.content_hash.len(), 64);

    assert_eq!(output.summary.next_file_number, 3);
    assert_eq!(output.summary.next_uncategorized_file_number, 9999);
    assert_eq!(output.summary.unused_facts, 0);
    assert!(!output.summary.has_embeddings);
    assert!(!output.flow_through_applied);
    assert_eq!(sink.reports.len(), 2);

    let files: Vec<&str> = output
        .diagnostics
        .iter()
        .filter(|d| d.code == codes::CUBE_FILE)
        .map(|d| d.payload["fileNumber"].as_str())
        .collect();
    assert_eq!(files, vec!["1", "2"]);
}

#[test]
fn test_empty_cube_is_suppressed_and_released() {
    let instance = statements().build().unwrap();
    let (output, _) = compile(&instance, &CompileOptions::default());

    let empty = output
        .cube_outcomes
        .iter()
        .find(|c| c.linkrole == EMPTY)
        .unwrap();
    assert_eq!(empty.file_number, None);
    assert_eq!(empty.embeddings, 0);
    assert!(output
        .cube_outcomes
        .iter()
        .all(|c| c.state == CubeState::Released));
}

#[test]
fn test_numbering_starts_where_configured() {
    let instance = statements().build().unwrap();
    let options = CompileOptions::default().with_first_file_number(5);
    let (output, _) = compile(&instance, &options);

    let numbers: Vec<Option<u32>> = output.summary.reports.iter().map(|r| r.file_number).collect();
    assert_eq!(numbers, vec![Some(5), Some(6)]);
    assert_eq!(output.summary.next_file_number, 7);
}

#[test]
fn test_worksheet_per_report_when_enabled() {
    let instance = statements().build().unwrap();
    let (output, sink) = compile(&instance, &CompileOptions::default().with_excel(true));

    assert_eq!(sink.worksheets, vec!["Balance Sheet", "Operations"]);
    assert_eq!(
        output.diagnostics.iter().filter(|d| d.code == codes::SKIPPED_EXCEL).count(),
        0
    );
}

#[test]
fn test_content_hash_is_stable_across_runs() {
    let instance = statements().build().unwrap();
    let (first, _) = compile(&instance, &CompileOptions::default());
    let (second, _) = compile(&instance, &CompileOptions::default());

    let hashes = |o: &CompileOutput| -> Vec<String> {
        o.summary.reports.iter().map(|r| r.content_hash.clone()).collect()
    };
    assert_eq!(hashes(&first), hashes(&second));
    assert_ne!(hashes(&first)[0], hashes(&first)[1]);
}

#[test]
fn test_duplicates_are_not_uncategorized() {
    let mut b = statements();
    b.numeric("t:Cash", "c23", "usd", "1500", "-2");
    let instance = b.build().unwrap();
    let (output, sink) = compile(&instance, &CompileOptions::default());

    assert_eq!(output.summary.unused_facts, 0);
    assert_eq!(sink.reports.len(), 2);
    assert_eq!(
        output.diagnostics.iter().filter(|d| d.code == codes::MULTIPLE_FACTS).count(),
        1
    );
}

// ============================================================================
// Grids
// ============================================================================

#[test]
fn test_balance_sheet_grid() {
    let instance = statements().build().unwrap();
    let (_, sink) = compile(&instance, &CompileOptions::default());
    let report = sink.report("Balance Sheet").unwrap();

    assert_eq!(report.title, "Balance Sheet");
    assert_eq!(
        report.column_headings,
        vec!["Dec. 31, 2023 | USD ($)", "Dec. 31, 2022 | USD ($)"]
    );
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].kind, LineKind::Abstract);
    assert_eq!(report.rows[0].heading, "Balance Sheet [Abstract]");
    assert!(report.rows[0].cells.is_empty());
    assert_eq!(report.rows[1].kind, LineKind::Data);
    assert_eq!(report.cell("Cash and equivalents", 0), Some("1500"));
    assert_eq!(report.cell("Cash and equivalents", 1), Some("1200"));
    assert_eq!(report.hidden_columns, 0);
}

#[test]
fn test_monetary_values_are_scaled() {
    let instance = statements().build().unwrap();
    let (_, sink) = compile(&instance, &CompileOptions::default());
    let report = sink.report("Operations").unwrap();

    assert_eq!(report.title, "Operations (In Millions)");
    assert_eq!(
        report.column_headings,
        vec!["12 Months Ended Dec. 31, 2023 | USD ($)"]
    );
    assert_eq!(report.cell("Revenue", 0), Some("9"));
}

#[test]
fn test_transposed_statement_has_no_abstract_rows() {
    let mut b = statements();
    b.role(TRANSPOSED, "0040 - Statement - Cash Position {Transposed}")
        .arc(TRANSPOSED, "t:BalanceSheetAbstract", "t:Cash");
    let instance = b.build().unwrap();
    let (_, sink) = compile(&instance, &CompileOptions::default());
    let report = sink.report("Cash Position").unwrap();

    assert_eq!(report.column_headings, vec!["Cash and equivalents"]);
    let headings: Vec<&str> = report.rows.iter().map(|r| r.heading.as_str()).collect();
    assert_eq!(headings, vec!["Dec. 31, 2023 | USD ($)", "Dec. 31, 2022 | USD ($)"]);
    assert!(report.rows.iter().all(|r| r.kind == LineKind::Data));
    assert_eq!(report.cell("Dec. 31, 2022 | USD ($)", 0), Some("1200"));
}

// ============================================================================
// Period start and end labels
// ============================================================================

/// A roll-forward: opening balance, additions, closing balance, plus one
/// balance whose date matches no duration.
fn rollforward() -> InstanceBuilder {
    let mut b = InstanceBuilder::new("abc-20231231.htm");
    b.prefix("t", "urn:t")
        .abstract_concept("t:ReserveAbstract")
        .concept("t:Reserve", DataType::Integer)
        .concept("t:Additions", DataType::Integer)
        .label("t:ReserveAbstract", "Reserve Rollforward [Abstract]")
        .role(RESERVE, "0050 - Disclosure - Reserve")
        .arc_with_label(RESERVE, "t:ReserveAbstract", "t:Reserve", START)
        .arc(RESERVE, "t:ReserveAbstract", "t:Additions")
        .arc_with_label(RESERVE, "t:ReserveAbstract", "t:Reserve", END)
        .instant("c21", ymd(2021, 6, 30))
        .instant("c22", ymd(2022, 12, 31))
        .instant("c23", ymd(2023, 12, 31))
        .duration("d23", ymd(2023, 1, 1), ymd(2023, 12, 31));
    b.fact("t:Reserve", "c22", "10");
    b.fact("t:Additions", "d23", "5");
    b.fact("t:Reserve", "c23", "15");
    b.fact("t:Reserve", "c21", "7");
    b
}

#[test]
fn test_balances_move_onto_the_duration() {
    let instance = rollforward().build().unwrap();
    let (_, sink) = compile(&instance, &CompileOptions::default());
    let report = sink.report("Reserve").unwrap();

    assert_eq!(report.column_headings, vec!["12 Months Ended Dec. 31, 2023"]);
    let headings: Vec<&str> = report.rows.iter().map(|r| r.heading.as_str()).collect();
    assert_eq!(
        headings,
        vec!["Reserve Rollforward [Abstract]", "Reserve", "Additions", "Reserve"]
    );
    assert_eq!(report.rows[1].cells, vec!["10"]);
    assert_eq!(report.rows[2].cells, vec!["5"]);
    assert_eq!(report.rows[3].cells, vec!["15"]);
}

#[test]
fn test_unmatched_balance_is_explained_and_recovered() {
    let instance = rollforward().build().unwrap();
    let (output, sink) = compile(&instance, &CompileOptions::default());

    let notes: Vec<&str> = output
        .diagnostics
        .iter()
        .filter(|d| d.code == codes::FACT_NOT_SHOWN)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(notes.len(), 2);
    insta::assert_snapshot!(notes[0], @"In Reserve, the fact t:Reserve on line 13 was not shown because no duration ending at its date was found.");
    assert!(notes[1].contains("no duration starting"));

    assert_eq!(output.summary.unused_facts, 1);
    let last = output.summary.reports.last().unwrap();
    assert!(last.is_uncategorized);
    assert_eq!(last.file_number, Some(9999));
    assert!(sink.reports.iter().any(|(s, _)| s.is_uncategorized));
}
