//! Hand-off of finalized reports to whatever writes them out.
//!
//! HTML, XML and spreadsheet writers live with the host. The compiler only
//! produces a [`ReportSummary`] and a [`RenderedReport`] per report and
//! passes both to a [`ReportSink`].

mod hash;

pub use hash::compute_hash;

use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::report::RenderedReport;

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type EmitResult<T> = Result<T, EmitError>;

/// Ordering, naming and file information for one finalized report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub file_number: Option<u32>,
    /// Rendered from the cube's default view rather than an embedded command.
    pub is_default: bool,
    pub has_embedded_reports: bool,
    pub long_name: String,
    pub short_name: String,
    pub role: String,
    pub html_file_name: Option<String>,
    pub xml_file_name: Option<String>,
    pub is_uncategorized: bool,
    pub content_hash: String,
}

/// Result of compiling one filing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSummary {
    pub entry_point: String,
    pub reports: Vec<ReportSummary>,
    pub unused_facts: usize,
    pub has_embeddings: bool,
    pub next_file_number: u32,
    pub next_uncategorized_file_number: u32,
}

/// Receives every finalized report.
pub trait ReportSink {
    fn write_report(&mut self, summary: &ReportSummary, report: &RenderedReport) -> EmitResult<()>;

    /// One spreadsheet worksheet per report, when spreadsheets are enabled.
    fn write_worksheet(&mut self, _summary: &ReportSummary, _report: &RenderedReport) -> EmitResult<()> {
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub reports: Vec<(ReportSummary, RenderedReport)>,
    pub worksheets: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, short_name: &str) -> Option<&RenderedReport> {
        self.reports
            .iter()
            .find(|(s, _)| s.short_name == short_name)
            .map(|(_, r)| r)
    }
}

impl ReportSink for MemorySink {
    fn write_report(&mut self, summary: &ReportSummary, report: &RenderedReport) -> EmitResult<()> {
        self.reports.push((summary.clone(), report.clone()));
        Ok(())
    }

    fn write_worksheet(&mut self, summary: &ReportSummary, _report: &RenderedReport) -> EmitResult<()> {
        self.worksheets.push(summary.short_name.clone());
        Ok(())
    }
}

/// Writes `R<n>.json` per numbered report into a folder.
#[derive(Debug)]
pub struct JsonDirSink {
    folder: PathBuf,
}

impl JsonDirSink {
    pub fn create(folder: impl Into<PathBuf>) -> EmitResult<Self> {
        let folder = folder.into();
        fs::create_dir_all(&folder)?;
        Ok(Self { folder })
    }
}

impl ReportSink for JsonDirSink {
    fn write_report(&mut self, summary: &ReportSummary, report: &RenderedReport) -> EmitResult<()> {
        let Some(number) = summary.file_number else {
            return Ok(());
        };
        let path = self.folder.join(format!("R{}.json", number));
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        tracing::debug!(path = %path.display(), "wrote report");
        Ok(())
    }
}
