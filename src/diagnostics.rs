//! Structured compiler messages.
//!
//! Problems found in a filing (broken facts, malformed embedded commands,
//! suppressed columns) are never `Err` values. They are recorded as
//! [`Diagnostic`]s, mirrored to `tracing` as they are pushed, and returned
//! with the compilation output.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Message codes, shared with downstream log consumers.
pub mod codes {
    pub const MULTIPLE_FACTS: &str = "er3:multipleFacts";
    pub const NO_DEFAULTS: &str = "er3:noDefaults";
    pub const FACT_CONCEPT_UNDECLARED: &str = "er3:factConceptUndeclared";
    pub const FACT_TYPE_UNDECLARED: &str = "er3:factTypeUndeclared";
    pub const TUPLE_IGNORED: &str = "er3:tupleIgnored";
    pub const CONTEXT_MISSING: &str = "er3:contextMissing";
    pub const SCENARIO_DISALLOWED: &str = "er3:scenarioDisallowed";
    pub const UNDECLARED_DIMENSION: &str = "er3:undeclaredDimension";
    pub const UNDECLARED_MEMBER: &str = "er3:undeclaredMember";
    pub const MALFORMED_TOKEN: &str = "er3:malformedToken";
    pub const MALFORMED_TOKEN_AXIS: &str = "er3:malformedTokenAxis";
    pub const MALFORMED_SECOND_TOKEN: &str = "er3:malformedSecondToken";
    pub const MALFORMED_MEMBER_TOKEN: &str = "er3:malformedMemberToken";
    pub const TOKEN_NOT_SUPPORTED: &str = "er3:tokenNotSupported";
    pub const GROUPED_TOKEN: &str = "er3:groupedToken";
    pub const UNITCELL_TOKEN: &str = "er3:unitcellToken";
    pub const COLUMNS_SUPPRESSED: &str = "er3:columnsSuppresed";
    pub const SHORTER_COLUMNS_REMOVED: &str = "er3:shorterColumnsRemoved";
    pub const FACT_NOT_SHOWN: &str = "er3:factNotShown";
    pub const CUBE_FILE: &str = "er3:cubeFile";
    pub const EMBEDDED_COMMAND_INVALID: &str = "er3:embeddedCommandInvalid";
    pub const SKIPPED_EXCEL: &str = "ex3:skippedExcelWithEmbeddedCommands";
    pub const GENERATING_REPORTS: &str = "ex3:generatingReports";
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    /// Expected, benign deviations.
    Info,
    /// A fact or minor structure is unusable and was excluded.
    Warning,
    /// A requested embedded command is malformed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One compiler message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    /// Named values the message was rendered from.
    pub payload: BTreeMap<String, String>,
}

impl Diagnostic {
    pub fn new(code: &'static str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            payload: BTreeMap::new(),
        }
    }

    pub fn debug(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Debug, message)
    }

    pub fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, message)
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, message)
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    /// Attach a payload entry.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.payload.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

/// Collects diagnostics in emission order.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        let code = diagnostic.code;
        match diagnostic.severity {
            Severity::Debug => tracing::debug!(code, "{}", diagnostic.message),
            Severity::Info => tracing::info!(code, "{}", diagnostic.message),
            Severity::Warning => tracing::warn!(code, "{}", diagnostic.message),
            Severity::Error => tracing::error!(code, "{}", diagnostic.message),
        }
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
