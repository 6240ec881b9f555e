//! Footnote markers on rendered reports.

use factcube::compile::{compile_filing, CompileOptions};
use factcube::emit::MemorySink;
use factcube::model::{ymd, DataType, InstanceBuilder};
use factcube::report::RenderedReport;

const BS: &str = "urn:role:bs";

/// Cash is footnoted in both years with the same text; debt only in the
/// current year.
fn footnoted() -> RenderedReport {
    let mut b = InstanceBuilder::new("abc-20231231.htm");
    b.prefix("t", "urn:t")
        .abstract_concept("t:BalanceSheetAbstract")
        .concept("t:Cash", DataType::Monetary)
        .concept("t:Debt", DataType::Monetary)
        .role(BS, "0010 - Statement - Balance Sheet")
        .arc(BS, "t:BalanceSheetAbstract", "t:Cash")
        .arc(BS, "t:BalanceSheetAbstract", "t:Debt")
        .unit("usd", "iso4217:USD")
        .instant("c23", ymd(2023, 12, 31))
        .instant("c22", ymd(2022, 12, 31));
    let cash23 = b.numeric("t:Cash", "c23", "usd", "1500", "0");
    let cash22 = b.numeric("t:Cash", "c22", "usd", "1200", "0");
    let debt23 = b.numeric("t:Debt", "c23", "usd", "700", "0");
    b.numeric("t:Debt", "c22", "usd", "650", "0");
    b.footnote(cash23, "Includes restricted cash.")
        .footnote(cash22, "Includes restricted cash.")
        .footnote(debt23, "Refinanced in January.");

    let instance = b.build().unwrap();
    let mut sink = MemorySink::new();
    compile_filing(&instance, &CompileOptions::default(), &mut sink).unwrap();
    sink.report("Balance Sheet").unwrap().clone()
}

#[test]
fn test_markers_numbered_by_first_appearance() {
    let report = footnoted();
    assert_eq!(
        report.footnotes,
        vec!["Includes restricted cash.", "Refinanced in January."]
    );
}

#[test]
fn test_shared_footnote_moves_to_row_heading() {
    let report = footnoted();
    assert_eq!(report.cell("Cash [1]", 0), Some("1500"));
    assert_eq!(report.cell("Cash [1]", 1), Some("1200"));
    assert_eq!(report.cell("Cash", 0), None);
}

#[test]
fn test_single_cell_footnote_stays_on_cell() {
    let report = footnoted();
    assert_eq!(report.cell("Debt", 0), Some("700 [2]"));
    assert_eq!(report.cell("Debt", 1), Some("650"));
    assert_eq!(
        report.column_headings,
        vec!["Dec. 31, 2023 | USD ($)", "Dec. 31, 2022 | USD ($)"]
    );
}
