//! Embeddings: one rendering view of a cube.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::command::{AxisSelector, CommandGroup, Placement};
use crate::cube::CubeId;
use crate::index::PeriodId;
use crate::model::{FactId, QName};
use crate::report::Report;

/// Handle to an [`Embedding`] in the filing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EmbeddingId(pub usize);

impl fmt::Display for EmbeddingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "embedding#{}", self.0)
    }
}

/// Lifecycle of an embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingState {
    Active,
    /// Commands or facts could not be resolved; no report is produced.
    Broken,
    Released,
}

/// A position on one row or column axis. Ordering is by `rank` first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Coordinate {
    pub rank: u64,
    pub value: Coord,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Coord {
    Primary(QName),
    Period(PeriodId),
    Unit(Option<String>),
    /// `None` stands for the axis default.
    Member { axis: QName, member: Option<QName> },
}

/// Key used by flow-through suppression: a concept, or a concept paired with
/// a non-default member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FlowKey {
    Concept(QName),
    ConceptMember(QName, QName),
}

/// A fact that passed filtering, with its row and column positions.
#[derive(Debug, Clone, PartialEq)]
pub struct FactPlacement {
    pub fact: FactId,
    pub primary: QName,
    pub period: Option<PeriodId>,
    pub unit: Option<String>,
    pub preferred_label: Option<String>,
    pub row_key: Vec<Coordinate>,
    pub column_key: Vec<Coordinate>,
    pub source_line: u32,
}

impl FactPlacement {
    pub fn key(&self, placement: Placement) -> &[Coordinate] {
        match placement {
            Placement::Row => &self.row_key,
            Placement::Column => &self.column_key,
        }
    }
}

/// One requested rendering of a cube.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub id: EmbeddingId,
    pub cube: CubeId,
    /// Groups from an embedded command; empty for the default view.
    pub explicit: Vec<CommandGroup>,
    /// The text-block fact holding the command.
    pub trigger: Option<FactId>,
    pub state: EmbeddingState,

    /// Commands in effect after defaults and transposition.
    pub commands: Vec<CommandGroup>,
    pub row_commands: Vec<CommandGroup>,
    pub column_commands: Vec<CommandGroup>,

    pub placements: Vec<FactPlacement>,
    /// Concepts of placed facts.
    pub elements: BTreeSet<QName>,
    pub flow_keys: BTreeSet<FlowKey>,
    pub report: Option<Report>,
}

impl Embedding {
    pub fn new(
        id: EmbeddingId,
        cube: CubeId,
        explicit: Vec<CommandGroup>,
        trigger: Option<FactId>,
    ) -> Self {
        Self {
            id,
            cube,
            explicit,
            trigger,
            state: EmbeddingState::Active,
            commands: Vec::new(),
            row_commands: Vec::new(),
            column_commands: Vec::new(),
            placements: Vec::new(),
            elements: BTreeSet::new(),
            flow_keys: BTreeSet::new(),
            report: None,
        }
    }

    pub fn is_default(&self) -> bool {
        self.trigger.is_none()
    }

    pub fn is_broken(&self) -> bool {
        self.state == EmbeddingState::Broken
    }

    pub fn is_released(&self) -> bool {
        self.state == EmbeddingState::Released
    }

    pub fn mark_broken(&mut self) {
        if self.state == EmbeddingState::Active {
            self.state = EmbeddingState::Broken;
        }
    }

    pub fn release(&mut self) {
        self.state = EmbeddingState::Released;
        self.placements = Vec::new();
        self.report = None;
    }

    pub fn commands_on(&self, placement: Placement) -> &[CommandGroup] {
        match placement {
            Placement::Row => &self.row_commands,
            Placement::Column => &self.column_commands,
        }
    }

    /// Index of `axis` among the commands on one side.
    pub fn position(&self, placement: Placement, axis: &AxisSelector) -> Option<usize> {
        self.commands_on(placement).iter().position(|c| &c.axis == axis)
    }

    pub fn row_period_position(&self) -> Option<usize> {
        self.position(Placement::Row, &AxisSelector::Period)
    }

    pub fn column_period_position(&self) -> Option<usize> {
        self.position(Placement::Column, &AxisSelector::Period)
    }

    pub fn row_unit_position(&self) -> Option<usize> {
        self.position(Placement::Row, &AxisSelector::Unit)
    }

    pub fn column_unit_position(&self) -> Option<usize> {
        self.position(Placement::Column, &AxisSelector::Unit)
    }

    pub fn row_primary_position(&self) -> Option<usize> {
        self.position(Placement::Row, &AxisSelector::Primary)
    }

    /// Which side carries `axis`, if any.
    pub fn side_of(&self, axis: &AxisSelector) -> Option<Placement> {
        if self.position(Placement::Row, axis).is_some() {
            Some(Placement::Row)
        } else if self.position(Placement::Column, axis).is_some() {
            Some(Placement::Column)
        } else {
            None
        }
    }

    /// Facts currently placed in this embedding.
    pub fn facts(&self) -> impl Iterator<Item = FactId> + '_ {
        self.placements.iter().map(|p| p.fact)
    }
}
