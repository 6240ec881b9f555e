//! Embedded rendering commands.
//!
//! A text-block fact can ask for an extra view of a cube by embedding a
//! command between tildes:
//!
//! ```text
//! ~ http://example.com/role/Segments column period compact * row us-gaap_SegmentAxis compact * ~
//! ```
//!
//! The first word names the target cube (its linkrole). The rest is a sequence
//! of groups, each `{row|column} <axis> <mode> [members...]`.

pub mod lexer;
pub mod parser;

pub use lexer::{command_text, lex, Lexed, Token};
pub use parser::{parse_embedded_command, CommandParse, ParseOutcome};

use serde::Serialize;
use std::fmt;

use crate::model::QName;

/// Which side of the grid a group is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Row,
    Column,
}

impl Placement {
    pub fn flipped(self) -> Self {
        match self {
            Placement::Row => Placement::Column,
            Placement::Column => Placement::Row,
        }
    }
}

/// The axis a group lays out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AxisSelector {
    Period,
    Unit,
    Primary,
    Axis(QName),
}

impl fmt::Display for AxisSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisSelector::Period => f.write_str("period"),
            AxisSelector::Unit => f.write_str("unit"),
            AxisSelector::Primary => f.write_str("primary"),
            AxisSelector::Axis(q) => write!(f, "{}", q),
        }
    }
}

/// How the axis shows up in headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Compact,
    NoDisplay,
}

/// Members requested for an axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MemberSelection {
    /// No member tokens were given.
    Unspecified,
    /// The `*` wildcard.
    All,
    List(Vec<QName>),
}

impl MemberSelection {
    pub fn accepts(&self, member: &QName) -> bool {
        match self {
            MemberSelection::Unspecified | MemberSelection::All => true,
            MemberSelection::List(list) => list.contains(member),
        }
    }

    /// Position of `member` in an explicit list.
    pub fn position(&self, member: &QName) -> Option<usize> {
        match self {
            MemberSelection::List(list) => list.iter().position(|m| m == member),
            _ => None,
        }
    }
}

/// One `{row|column} axis mode members...` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandGroup {
    pub placement: Placement,
    pub axis: AxisSelector,
    pub mode: DisplayMode,
    pub members: MemberSelection,
}

impl CommandGroup {
    pub fn new(placement: Placement, axis: AxisSelector) -> Self {
        Self {
            placement,
            axis,
            mode: DisplayMode::Compact,
            members: MemberSelection::Unspecified,
        }
    }
}

/// A fully parsed embedded command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedCommand {
    /// Linkrole of the cube to embed.
    pub target: String,
    pub groups: Vec<CommandGroup>,
}
