//! # Factcube
//!
//! Compiles the dimensional fact graph of an XBRL filing into a
//! deterministic set of tabular reports.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Instance (host document model)              │
//! │  (concepts, contexts, units, facts, presentation trees)  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [index: dedup, entities, cube linking]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Cubes (one per linkrole) + Embeddings             │
//! │        + embedded commands parsed from text blocks       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compile: cube/embedding/report phases]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Reports (row/column grids) after flow-through,         │
//! │   cash-flow pruning and uncategorized recovery           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [emit]
//! ┌─────────────────────────────────────────────────────────┐
//! │          ReportSink (summaries + rendered grids)          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use factcube::compile::{compile_filing, CompileOptions};
//! use factcube::emit::MemorySink;
//! use factcube::model::{ymd, DataType, InstanceBuilder};
//!
//! let mut b = InstanceBuilder::new("abc-20231231.htm");
//! b.prefix("us-gaap", "http://fasb.org/us-gaap/2023")
//!     .concept("us-gaap:Cash", DataType::Monetary)
//!     .role("urn:bs", "0010 - Statement - Balance Sheet")
//!     .arc("urn:bs", "us-gaap:BalanceSheetAbstract", "us-gaap:Cash")
//!     .unit("usd", "iso4217:USD")
//!     .instant("c1", ymd(2023, 12, 31));
//! b.numeric("us-gaap:Cash", "c1", "usd", "1000", "0");
//! let instance = b.build().unwrap();
//!
//! let mut sink = MemorySink::new();
//! let output = compile_filing(&instance, &CompileOptions::default(), &mut sink).unwrap();
//! assert_eq!(output.summary.reports.len(), 1);
//! ```

pub mod command;
pub mod compile;
pub mod config;
pub mod cube;
pub mod diagnostics;
pub mod embedding;
pub mod emit;
pub mod index;
pub mod layout;
pub mod model;
pub mod report;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{compile_filing, CompileOptions, CompileOutput};
    pub use crate::config::Settings;
    pub use crate::diagnostics::{Diagnostic, Severity};
    pub use crate::emit::{MemorySink, ReportSink, ReportSummary};
    pub use crate::model::{Instance, InstanceBuilder, QName};
}
