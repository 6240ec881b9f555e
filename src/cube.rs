//! Cubes: one per presentation linkrole.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::embedding::EmbeddingId;
use crate::index::{AxisId, MemberId, PeriodId};
use crate::layout::PresentationGroup;
use crate::model::{FactId, QName};

/// Handle to a [`Cube`] in the filing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CubeId(pub usize);

impl fmt::Display for CubeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cube#{}", self.0)
    }
}

/// Lifecycle of a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeState {
    Active,
    /// No facts, or every fact was suppressed.
    Suppressed,
    /// Finalized and freed; any further access is a bug.
    Released,
}

/// Role of the synthetic catch-all cube.
pub const UNCATEGORIZED_ROLE: &str = "http://xbrl.sec.gov/role/uncategorizedFacts";

static DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S+)\s+-\s+(\w+)\s+-\s+(.+?)\s*$").expect("valid regex"));
static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\{[^}]*\}").expect("valid regex"));

/// Routing of one fact into a cube: the fact, where it sits on every axis,
/// and, for facts moved by a period start/end label, the label it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FactMembership {
    pub fact: FactId,
    pub coordinates: AxisMemberMap,
    pub period_label: Option<String>,
}

/// Axis → member lookup of one fact, plus the `period` and `unit` pseudo-axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisMemberMap {
    pub period: Option<PeriodId>,
    pub unit: Option<String>,
    pub members: BTreeMap<QName, QName>,
}

impl AxisMemberMap {
    pub fn member(&self, axis: &QName) -> Option<&QName> {
        self.members.get(axis)
    }
}

/// A fact a cube could not place for an explainable reason, reported only if
/// no other report ends up showing it.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFact {
    pub fact: FactId,
    pub preferred_label: String,
    pub short_name: String,
}

/// One presentation view of the filing.
#[derive(Debug, Clone)]
pub struct Cube {
    pub id: CubeId,
    pub linkrole: String,
    /// Full role definition, e.g. `0040 - Statement - Cash Flows`.
    pub definition: String,
    /// Title without sort code, type, or `{...}` markers.
    pub short_name: String,
    /// Lower-cased middle part of the definition (`statement`, `disclosure`, ...).
    pub cube_type: String,
    pub state: CubeState,
    pub file_number: Option<u32>,

    pub exclude_from_numbering: bool,
    pub is_uncategorized: bool,
    pub is_elements: bool,
    pub is_transposed: bool,
    pub is_unlabeled: bool,
    /// Set once some fact carries a valid embedded command for this cube.
    pub is_embedded: bool,
    pub is_statement_of_cash_flows: bool,
    pub is_statement_of_equity: bool,

    pub memberships: Vec<FactMembership>,
    /// Concepts with routed facts.
    pub elements: BTreeSet<QName>,
    pub axes: BTreeMap<QName, AxisId>,
    pub members: BTreeMap<QName, MemberId>,
    /// Unit ids in first-seen order.
    pub units: Vec<String>,
    pub periods: BTreeSet<PeriodId>,
    /// Axes whose default is missing or not reachable in this tree.
    pub default_missing_axes: BTreeSet<QName>,
    pub embeddings: Vec<EmbeddingId>,

    pub presentation: Option<PresentationGroup>,
    /// Unit pseudo-axis order.
    pub unit_order: Vec<String>,
    /// Period pseudo-axis order.
    pub period_order: Vec<PeriodId>,
}

impl Cube {
    pub fn new(id: CubeId, linkrole: impl Into<String>, definition: impl Into<String>) -> Self {
        let linkrole = linkrole.into();
        let definition = definition.into();
        let (cube_type, title, parsed) = match DEFINITION.captures(&definition) {
            Some(caps) => (caps[2].to_lowercase(), caps[3].to_string(), true),
            None => ("unknown".to_string(), definition.clone(), false),
        };
        let short_name = MARKER.replace_all(&title, "").trim().to_string();
        let lower = short_name.to_lowercase();
        let is_statement = cube_type == "statement" && !lower.contains("parenthetical");
        let markers = definition.to_lowercase();

        Self {
            id,
            is_statement_of_cash_flows: is_statement && lower.contains("cash flow"),
            is_statement_of_equity: is_statement
                && !lower.contains("balance sheet")
                && !lower.contains("financial position")
                && !lower.contains("financial condition")
                && ["equity", "stockholders", "shareholders", "partners", "changes in capital"]
                    .iter()
                    .any(|w| lower.contains(w)),
            is_transposed: markers.contains("{transposed}"),
            is_unlabeled: markers.contains("{unlabeled}"),
            is_elements: markers.contains("{elements}"),
            linkrole,
            definition,
            short_name,
            cube_type,
            state: CubeState::Active,
            file_number: None,
            exclude_from_numbering: !parsed,
            is_uncategorized: false,
            is_embedded: false,
            memberships: Vec::new(),
            elements: BTreeSet::new(),
            axes: BTreeMap::new(),
            members: BTreeMap::new(),
            units: Vec::new(),
            periods: BTreeSet::new(),
            default_missing_axes: BTreeSet::new(),
            embeddings: Vec::new(),
            presentation: None,
            unit_order: Vec::new(),
            period_order: Vec::new(),
        }
    }

    /// The catch-all cube for facts no report claimed.
    pub fn uncategorized(id: CubeId, entry_point: &str) -> Self {
        let title = format!("Uncategorized Items - {}", entry_point);
        let mut cube = Self::new(id, UNCATEGORIZED_ROLE, title.clone());
        cube.short_name = title;
        cube.cube_type = "uncategorized".to_string();
        cube.is_uncategorized = true;
        cube.is_elements = true;
        cube.exclude_from_numbering = false;
        cube
    }

    pub fn is_statement(&self) -> bool {
        self.cube_type == "statement"
    }

    pub fn is_suppressed(&self) -> bool {
        self.state == CubeState::Suppressed
    }

    pub fn is_released(&self) -> bool {
        self.state == CubeState::Released
    }

    /// Mark the cube as having nothing to render.
    pub fn suppress(&mut self) {
        if self.state == CubeState::Active {
            self.state = CubeState::Suppressed;
        }
    }

    /// Free the cube's working data. Identity fields stay for bookkeeping.
    pub fn release(&mut self) {
        self.state = CubeState::Released;
        self.memberships = Vec::new();
        self.elements = BTreeSet::new();
        self.axes = BTreeMap::new();
        self.members = BTreeMap::new();
        self.periods = BTreeSet::new();
        self.presentation = None;
        self.unit_order = Vec::new();
        self.period_order = Vec::new();
    }

    /// Record a routed fact and the units, periods and concepts it brings.
    pub fn add_membership(&mut self, membership: FactMembership, concept: &QName) {
        self.elements.insert(concept.clone());
        if let Some(unit) = &membership.coordinates.unit {
            if !self.units.contains(unit) {
                self.units.push(unit.clone());
            }
        }
        if let Some(period) = membership.coordinates.period {
            self.periods.insert(period);
        }
        self.memberships.push(membership);
    }
}
