//! Flow-through suppression across statements.

use factcube::compile::{compile_filing, CompileOptions, CompileOutput};
use factcube::diagnostics::codes;
use factcube::emit::MemorySink;
use factcube::model::{ymd, DataType, InstanceBuilder};

const OPS: &str = "urn:role:ops";
const QUARTERLY: &str = "urn:role:quarterly";

/// An operations statement with a fourth-quarter column that only repeats
/// net income, and a quarterly disclosure that also reports it.
fn filing(with_disclosure: bool) -> InstanceBuilder {
    let mut b = InstanceBuilder::new("abc-20231231.htm");
    b.prefix("t", "urn:t")
        .abstract_concept("t:OperationsAbstract")
        .abstract_concept("t:QuarterlyAbstract")
        .concept("t:Revenue", DataType::Monetary)
        .concept("t:NetIncome", DataType::Monetary)
        .role(OPS, "0020 - Statement - Operations")
        .arc(OPS, "t:OperationsAbstract", "t:Revenue")
        .arc(OPS, "t:OperationsAbstract", "t:NetIncome")
        .unit("usd", "iso4217:USD")
        .duration("d23", ymd(2023, 1, 1), ymd(2023, 12, 31))
        .duration("q4", ymd(2023, 10, 1), ymd(2023, 12, 31))
        .duration("d22", ymd(2022, 1, 1), ymd(2022, 12, 31));
    if with_disclosure {
        b.role(QUARTERLY, "0090 - Disclosure - Quarterly Results")
            .arc(QUARTERLY, "t:QuarterlyAbstract", "t:NetIncome");
    }
    b.numeric("t:Revenue", "d23", "usd", "1234", "0");
    b.numeric("t:NetIncome", "d23", "usd", "321", "0");
    b.numeric("t:NetIncome", "q4", "usd", "77", "0");
    b.numeric("t:Revenue", "d22", "usd", "1111", "0");
    b.numeric("t:NetIncome", "d22", "usd", "299", "0");
    b
}

fn compile(b: InstanceBuilder) -> (CompileOutput, MemorySink) {
    let instance = b.build().unwrap();
    let mut sink = MemorySink::new();
    let output = compile_filing(&instance, &CompileOptions::default(), &mut sink).unwrap();
    (output, sink)
}

#[test]
fn test_column_shown_elsewhere_is_hidden() {
    let (output, sink) = compile(filing(true));
    assert!(output.flow_through_applied);

    let report = sink.report("Operations").unwrap();
    assert_eq!(report.hidden_columns, 1);
    assert_eq!(
        report.column_headings,
        vec![
            "12 Months Ended Dec. 31, 2023 | USD ($)",
            "12 Months Ended Dec. 31, 2022 | USD ($)"
        ]
    );
    assert_eq!(report.cell("NetIncome", 0), Some("321"));
    assert_eq!(report.cell("NetIncome", 1), Some("299"));

    let notice = output
        .diagnostics
        .iter()
        .find(|d| d.code == codes::COLUMNS_SUPPRESSED)
        .unwrap();
    assert_eq!(notice.payload["report"], "Operations");
    assert_eq!(notice.payload["columns"], "2");
    insta::assert_snapshot!(notice.message, @"In Operations, column(s) 2 are contained in other reports, so were removed by flow through suppression.");
}

#[test]
fn test_hidden_fact_stays_in_its_disclosure() {
    let (output, sink) = compile(filing(true));

    let quarterly = sink.report("Quarterly Results").unwrap();
    let cells: Vec<&str> = quarterly
        .rows
        .iter()
        .flat_map(|r| r.cells.iter().map(String::as_str))
        .filter(|c| !c.is_empty())
        .collect();
    assert!(cells.contains(&"77"));
    assert_eq!(output.summary.unused_facts, 0);
}

#[test]
fn test_nothing_hidden_without_another_report() {
    let (output, sink) = compile(filing(false));
    assert!(!output.flow_through_applied);

    let report = sink.report("Operations").unwrap();
    assert_eq!(report.hidden_columns, 0);
    assert_eq!(report.column_headings.len(), 3);
    assert_eq!(report.column_headings[1], "3 Months Ended Dec. 31, 2023 | USD ($)");
    assert!(output
        .diagnostics
        .iter()
        .all(|d| d.code != codes::COLUMNS_SUPPRESSED));
}
