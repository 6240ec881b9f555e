//! Facts, contexts and units as exposed by the host document model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::qname::QName;

/// Stable handle to a fact: its position in [`Instance::facts`](super::Instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactId(pub usize);

impl FactId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fact#{}", self.0)
    }
}

/// One reported value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub qname: QName,

    /// Context id; `None` or a dangling id means the context is broken.
    #[serde(default)]
    pub context_ref: Option<String>,

    #[serde(default)]
    pub unit_ref: Option<String>,

    #[serde(default)]
    pub value: String,

    /// The raw `decimals` attribute (`"INF"`, `"-3"`, ...).
    #[serde(default)]
    pub decimals: Option<String>,

    /// `xml:lang` of a text fact.
    #[serde(default)]
    pub lang: Option<String>,

    #[serde(default)]
    pub nil: bool,

    /// Tuples are forbidden in the target filing convention.
    #[serde(default)]
    pub tuple: bool,

    /// Line in the source instance document.
    #[serde(default)]
    pub source_line: u32,
}

impl Fact {
    pub fn new(qname: QName, context_ref: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            qname,
            context_ref: Some(context_ref.into()),
            unit_ref: None,
            value: value.into(),
            decimals: None,
            lang: None,
            nil: false,
            tuple: false,
            source_line: 0,
        }
    }

    /// Numeric precision, with `INF` mapped to positive infinity.
    pub fn decimals_value(&self) -> Option<f64> {
        let raw = self.decimals.as_deref()?.trim();
        if raw.eq_ignore_ascii_case("INF") {
            Some(f64::INFINITY)
        } else {
            raw.parse::<f64>().ok()
        }
    }
}

/// A context: period plus dimensional qualifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub period: Period,
    #[serde(default)]
    pub dimensions: Vec<DimensionValue>,
    /// True when the context carries a `scenario` element.
    #[serde(default)]
    pub has_scenario: bool,
}

impl Context {
    pub fn instant(id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            period: Period::Instant { date },
            dimensions: Vec::new(),
            has_scenario: false,
        }
    }

    pub fn duration(id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id: id.into(),
            period: Period::Duration { start, end },
            dimensions: Vec::new(),
            has_scenario: false,
        }
    }

    pub fn with_dimension(mut self, dimension: QName, member: QName) -> Self {
        self.dimensions.push(DimensionValue { dimension, member });
        self
    }
}

/// Period of a context, with dates as reported (end dates inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Period {
    Instant { date: NaiveDate },
    Duration { start: NaiveDate, end: NaiveDate },
}

impl Period {
    /// The reported end (or instant) date.
    pub fn end_date(&self) -> NaiveDate {
        match self {
            Period::Instant { date } => *date,
            Period::Duration { end, .. } => *end,
        }
    }

    pub fn is_instant(&self) -> bool {
        matches!(self, Period::Instant { .. })
    }
}

/// An explicit dimension qualifier on a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionValue {
    pub dimension: QName,
    pub member: QName,
}

/// A unit of measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    /// Measure expression, e.g. `iso4217:USD` or `iso4217:USD/xbrli:shares`.
    pub measure: String,
}

impl Unit {
    pub fn is_monetary(&self) -> bool {
        self.measure.starts_with("iso4217:") && !self.measure.contains('/')
    }

    /// Column/row label for the unit, e.g. `USD ($)`.
    pub fn label(&self) -> String {
        let local = |m: &str| m.rsplit(':').next().unwrap_or(m).to_string();
        match self.measure.split_once('/') {
            Some((num, den)) => format!("{} / {}", local(num), local(den)),
            None if self.measure == "iso4217:USD" => "USD ($)".to_string(),
            None => local(&self.measure),
        }
    }
}
