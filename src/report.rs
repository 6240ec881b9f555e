//! The materialized row/column grid of one embedding.
//!
//! Rows and columns are [`Line`]s with ids that stay valid when header rows
//! are inserted later. Cells map a `(row, column)` pair to the fact shown there.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::command::Placement;
use crate::cube::CubeId;
use crate::embedding::{Coordinate, EmbeddingId, FlowKey};
use crate::index::PeriodId;
use crate::model::{FactId, QName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LineId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Data,
    Abstract,
    SegmentTitle,
}

/// A row or a column.
#[derive(Debug, Clone)]
pub struct Line {
    pub id: LineId,
    pub kind: LineKind,
    pub key: Vec<Coordinate>,
    pub hidden: bool,
    pub facts: Vec<FactId>,
    pub period: Option<PeriodId>,
    pub units: BTreeSet<String>,
    pub primary: Option<QName>,
    pub preferred_label: Option<String>,
    /// Concept/member pairs used when deciding whether a column is redundant.
    pub hiding_keys: BTreeSet<FlowKey>,
    pub heading: Vec<String>,
    pub footnotes: Vec<usize>,
}

impl Line {
    pub fn new(id: LineId, kind: LineKind, key: Vec<Coordinate>) -> Self {
        Self {
            id,
            kind,
            key,
            hidden: false,
            facts: Vec::new(),
            period: None,
            units: BTreeSet::new(),
            primary: None,
            preferred_label: None,
            hiding_keys: BTreeSet::new(),
            heading: Vec::new(),
            footnotes: Vec::new(),
        }
    }

    pub fn is_data(&self) -> bool {
        self.kind == LineKind::Data
    }
}

/// Magnitude applied to monetary values for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    #[default]
    Units,
    Thousands,
    Millions,
}

impl Scale {
    pub fn divisor(self) -> i128 {
        match self {
            Scale::Units => 1,
            Scale::Thousands => 1_000,
            Scale::Millions => 1_000_000,
        }
    }

    pub fn title_suffix(self) -> Option<&'static str> {
        match self {
            Scale::Units => None,
            Scale::Thousands => Some("In Thousands"),
            Scale::Millions => Some("In Millions"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub cube: CubeId,
    pub embedding: EmbeddingId,
    pub title: String,
    pub rows: Vec<Line>,
    pub columns: Vec<Line>,
    pub cells: BTreeMap<(LineId, LineId), FactId>,
    pub scale: Scale,
    /// Footnote texts in marker order (marker `n` is `footnotes[n - 1]`).
    pub footnotes: Vec<String>,
    pub fact_footnotes: BTreeMap<FactId, Vec<usize>>,
    /// Period headings are left off columns when every column has the same period.
    pub repress_period_headings: bool,
    /// Axis labels moved into the title because they never vary.
    pub promoted: Vec<String>,
    /// Reports realized from embedded commands inside this one, keyed by trigger fact.
    pub embedded: Vec<(FactId, RenderedReport)>,
    next_line: usize,
}

impl Report {
    pub fn new(cube: CubeId, embedding: EmbeddingId, title: impl Into<String>) -> Self {
        Self {
            cube,
            embedding,
            title: title.into(),
            rows: Vec::new(),
            columns: Vec::new(),
            cells: BTreeMap::new(),
            scale: Scale::Units,
            footnotes: Vec::new(),
            fact_footnotes: BTreeMap::new(),
            repress_period_headings: false,
            promoted: Vec::new(),
            embedded: Vec::new(),
            next_line: 0,
        }
    }

    pub fn next_line_id(&mut self) -> LineId {
        let id = LineId(self.next_line);
        self.next_line += 1;
        id
    }

    pub fn lines(&self, side: Placement) -> &[Line] {
        match side {
            Placement::Row => &self.rows,
            Placement::Column => &self.columns,
        }
    }

    pub fn lines_mut(&mut self, side: Placement) -> &mut Vec<Line> {
        match side {
            Placement::Row => &mut self.rows,
            Placement::Column => &mut self.columns,
        }
    }

    pub fn row(&self, id: LineId) -> Option<&Line> {
        self.rows.iter().find(|l| l.id == id)
    }

    pub fn column(&self, id: LineId) -> Option<&Line> {
        self.columns.iter().find(|l| l.id == id)
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &Line> {
        self.columns.iter().filter(|c| !c.hidden)
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Line> {
        self.rows.iter().filter(|r| !r.hidden)
    }

    fn visible_column_ids(&self) -> BTreeSet<LineId> {
        self.visible_columns().map(|c| c.id).collect()
    }

    /// Hide data rows with no cell left in a visible column.
    pub fn hide_empty_rows(&mut self) {
        let visible = self.visible_column_ids();
        let occupied: BTreeSet<LineId> = self
            .cells
            .keys()
            .filter(|(_, col)| visible.contains(col))
            .map(|(row, _)| *row)
            .collect();
        for row in self.rows.iter_mut().filter(|r| r.is_data()) {
            if !occupied.contains(&row.id) {
                row.hidden = true;
            }
        }
    }

    /// Hide data columns with no cell left in a visible row.
    pub fn hide_empty_columns(&mut self) {
        let visible: BTreeSet<LineId> = self.visible_rows().map(|r| r.id).collect();
        let occupied: BTreeSet<LineId> = self
            .cells
            .keys()
            .filter(|(row, _)| visible.contains(row))
            .map(|(_, col)| *col)
            .collect();
        for column in self.columns.iter_mut().filter(|c| c.is_data()) {
            if !occupied.contains(&column.id) {
                column.hidden = true;
            }
        }
    }

    /// Take a fact out of every line and cell.
    pub fn remove_fact(&mut self, fact: FactId) {
        self.cells.retain(|_, f| *f != fact);
        for line in self.rows.iter_mut().chain(self.columns.iter_mut()) {
            line.facts.retain(|f| *f != fact);
        }
    }

    /// Facts shown in visible cells, in row-major order.
    pub fn visible_facts(&self) -> Vec<FactId> {
        let rows: BTreeSet<LineId> = self.visible_rows().map(|r| r.id).collect();
        let columns = self.visible_column_ids();
        self.cells
            .iter()
            .filter(|((r, c), _)| rows.contains(r) && columns.contains(c))
            .map(|(_, f)| *f)
            .collect()
    }
}

/// A display-ready snapshot of a finalized report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedReport {
    pub title: String,
    pub column_headings: Vec<String>,
    pub rows: Vec<RenderedRow>,
    pub footnotes: Vec<String>,
    pub hidden_columns: usize,
    pub embedded: Vec<RenderedReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    pub heading: String,
    pub kind: LineKind,
    pub cells: Vec<String>,
}

impl RenderedReport {
    /// Cell text at a visible row heading and column index.
    pub fn cell(&self, row_heading: &str, column: usize) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.heading == row_heading)
            .and_then(|r| r.cells.get(column))
            .map(String::as_str)
    }
}
