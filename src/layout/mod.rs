//! Layout: turning a cube into row/column commands and a report grid.
//!
//! The orchestrator drives every phase through the [`Layout`] trait. All
//! methods have working defaults, so [`PresentationLayout`] is just the trait
//! with nothing overridden; a host can replace any single step.
//!
//! ```text
//!   cube phase        embedding phase          report phase
//!  ┌──────────┐     ┌─────────────────┐     ┌──────────────────┐
//!  │ traverse │ ──▶ │ standard cmds   │ ──▶ │ scale, footnotes │
//!  │ phantoms │     │ materialize     │     │ segment/abstract │
//!  │ labels   │     │ filter, grid    │     │ headings, render │
//!  └──────────┘     └─────────────────┘     └──────────────────┘
//! ```

pub mod commands;
pub mod grid;
pub mod presentation;

pub use presentation::{NodeKind, PresentationGroup, PresentationNode};

use chrono::Duration;
use std::collections::{BTreeMap, BTreeSet};

use crate::command::{AxisSelector, Placement};
use crate::compile::FilingFlags;
use crate::config::RenderSettings;
use crate::cube::{Cube, FactMembership, SkippedFact};
use crate::embedding::Embedding;
use crate::index::{Entities, PeriodDescriptor};
use crate::model::{FactId, Instance, QName};
use crate::report::{RenderedReport, Report};

/// Reasons an embedding cannot be laid out.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("Axis {0} is not used by any fact in the cube")]
    UnknownAxis(QName),

    #[error("Member {member} was never reported on axis {axis}")]
    UnknownMember { axis: QName, member: QName },

    #[error("Axis {0} is named by more than one command")]
    DuplicateAxis(String),

    #[error("Cube has no presentation listing")]
    NoPresentation,

    #[error("No fact passed the commands")]
    NoFacts,
}

pub type LayoutResult<T> = Result<T, LayoutError>;

/// Read-only filing data layout needs.
#[derive(Clone, Copy)]
pub struct LayoutContext<'a> {
    pub instance: &'a Instance,
    pub entities: &'a Entities,
    pub flags: &'a FilingFlags,
    pub render: &'a RenderSettings,
    pub has_embeddings: bool,
    pub footnotes: &'a BTreeMap<FactId, Vec<String>>,
    /// Text facts whose value names a concept.
    pub qname_values: &'a BTreeMap<FactId, QName>,
}

impl LayoutContext<'_> {
    pub fn label(&self, qname: &QName) -> String {
        self.instance.label(qname)
    }
}

pub trait Layout {
    // -- cube phase --

    /// Attach the cube's presentation listing; suppress the cube when the
    /// tree shows none of its facts.
    fn traverse(&self, cx: &LayoutContext<'_>, cube: &mut Cube) {
        let Some(tree) = cx.instance.presentation_network().tree(&cube.linkrole) else {
            cube.suppress();
            return;
        };
        let group = PresentationGroup::from_tree(tree, cx.instance);
        if !cube.elements.iter().any(|e| group.contains_primary(e)) {
            cube.suppress();
        }
        cube.presentation = Some(group);
    }

    /// Listing for the uncategorized cube: its concepts in name order.
    fn flat_listing(&self, cx: &LayoutContext<'_>, cube: &mut Cube) {
        cube.presentation = Some(PresentationGroup::flat(&cube.elements, cx.instance));
    }

    /// Drop facts sitting on an axis that is neither in the tree nor defaulted.
    fn check_phantom_axes(&self, cx: &LayoutContext<'_>, cube: &mut Cube) {
        if cube.is_elements {
            return;
        }
        let Some(pg) = cube.presentation.as_ref() else {
            return;
        };
        let phantoms: Vec<QName> = cube
            .axes
            .keys()
            .filter(|axis| !pg.axes.contains(axis))
            .cloned()
            .collect();
        if phantoms.is_empty() {
            return;
        }
        tracing::debug!(cube = %cube.linkrole, ?phantoms, "phantom axes");
        cube.memberships.retain(|m| {
            phantoms.iter().all(|axis| {
                m.coordinates.member(axis).is_none() || cx.entities.default_of(axis).is_some()
            })
        });
        if cube.memberships.is_empty() {
            cube.suppress();
        }
    }

    /// Marker-driven layouts. The uncategorized cube is always a flat listing.
    fn detect_special_cases(&self, _cx: &LayoutContext<'_>, cube: &mut Cube) {
        if cube.is_uncategorized {
            cube.is_elements = true;
            cube.is_transposed = false;
        }
        if cube.is_elements {
            cube.is_unlabeled = false;
        }
    }

    /// Move instant facts shown under period start/end labels onto the
    /// matching durations. Facts with no match are returned as skipped.
    fn resolve_period_labels(&self, cx: &LayoutContext<'_>, cube: &mut Cube) -> Vec<SkippedFact> {
        let mut skipped = Vec::new();
        let Some(pg) = cube.presentation.as_ref() else {
            return skipped;
        };
        let labelled: Vec<QName> = pg.period_labelled_concepts().into_iter().cloned().collect();
        if labelled.is_empty() {
            return skipped;
        }
        let durations: Vec<&PeriodDescriptor> = cube
            .periods
            .iter()
            .map(|&p| cx.entities.period(p))
            .filter(|d| !d.is_instant())
            .collect();

        let mut kept = Vec::with_capacity(cube.memberships.len());
        for membership in std::mem::take(&mut cube.memberships) {
            let qname = &cx.instance.fact(membership.fact).qname;
            let instant = membership
                .coordinates
                .period
                .map(|p| cx.entities.period(p))
                .filter(|d| d.is_instant());
            let (Some(instant), true) = (instant, labelled.contains(qname)) else {
                kept.push(membership);
                continue;
            };

            let labels = pg.preferred_labels(qname);
            let roles: BTreeSet<&str> = labels.iter().flatten().copied().collect();
            let date = instant.end_date();
            for role in roles {
                let matches: Vec<&&PeriodDescriptor> = if presentation::is_period_start(role) {
                    durations
                        .iter()
                        .filter(|d| d.start == Some(date + Duration::days(1)))
                        .collect()
                } else if presentation::is_period_end(role) {
                    durations.iter().filter(|d| d.end_date() == date).collect()
                } else {
                    continue;
                };
                if matches.is_empty() {
                    skipped.push(SkippedFact {
                        fact: membership.fact,
                        preferred_label: role.to_string(),
                        short_name: cube.short_name.clone(),
                    });
                }
                for duration in matches {
                    let mut moved: FactMembership = membership.clone();
                    moved.coordinates.period = cx.entities.period_id(&duration.key());
                    moved.period_label = Some(role.to_string());
                    kept.push(moved);
                }
            }
            if labels.iter().any(|l| !presentation::is_period_label(*l)) {
                kept.push(membership);
            }
        }
        cube.memberships = kept;
        skipped
    }

    /// Period order: latest end first, then longer spans; units by first use.
    fn populate_pseudo_axes(&self, cx: &LayoutContext<'_>, cube: &mut Cube) {
        let mut periods: Vec<_> = cube
            .memberships
            .iter()
            .filter_map(|m| m.coordinates.period)
            .collect();
        periods.sort();
        periods.dedup();
        periods.sort_by(|a, b| {
            let (a, b) = (cx.entities.period(*a), cx.entities.period(*b));
            b.end
                .cmp(&a.end)
                .then_with(|| a.is_instant().cmp(&b.is_instant()))
                .then_with(|| a.start.cmp(&b.start))
        });
        cube.period_order = periods;
        cube.unit_order = cube.units.clone();
    }

    // -- embedding phase --

    fn standard_commands(&self, cx: &LayoutContext<'_>, cube: &Cube, embedding: &mut Embedding) {
        commands::standard_commands(cx, cube, embedding);
    }

    fn transpose(&self, embedding: &mut Embedding) {
        commands::transpose(embedding);
    }

    fn materialize(
        &self,
        cx: &LayoutContext<'_>,
        cube: &Cube,
        embedding: &mut Embedding,
    ) -> LayoutResult<()> {
        commands::materialize(cx, cube, embedding)
    }

    fn filter_facts(
        &self,
        cx: &LayoutContext<'_>,
        cube: &Cube,
        embedding: &mut Embedding,
    ) -> LayoutResult<()> {
        commands::filter_facts(cx, cube, embedding)
    }

    fn reorder_units(&self, _cx: &LayoutContext<'_>, embedding: &mut Embedding) {
        commands::reorder_units(embedding);
    }

    fn build_report(&self, _cx: &LayoutContext<'_>, cube: &Cube, embedding: &Embedding) -> Report {
        Report::build(cube, embedding)
    }

    /// Grid clean-up for everything but flat listings.
    fn refine_grid(
        &self,
        cx: &LayoutContext<'_>,
        cube: &Cube,
        embedding: &Embedding,
        report: &mut Report,
    ) {
        report.repress_duplicate_period_headings(cx.has_embeddings);
        if !cube.is_unlabeled {
            report.promote_axes(cx, embedding);
        }
        if let Some(side) = embedding.side_of(&AxisSelector::Unit) {
            report.merge_unit_compatible(side);
        }
        if let Some(side) = embedding.side_of(&AxisSelector::Period) {
            report.merge_instants_into_durations(cx, side);
        }
        report.hide_empty_rows();
        report.hide_empty_columns();
    }

    // -- report phase --

    fn hide_adjacent_instant_rows(&self, cx: &LayoutContext<'_>, report: &mut Report) {
        report.hide_empty_instant_rows(cx);
    }

    fn scale_units(&self, cx: &LayoutContext<'_>, report: &mut Report) {
        report.scale_units(cx);
    }

    fn attach_footnotes(&self, cx: &LayoutContext<'_>, report: &mut Report) {
        report.attach_footnotes(cx);
    }

    fn strip_vertical_separators(&self, report: &mut Report) {
        report.strip_vertical_separators();
    }

    fn segment_rows(&self, cx: &LayoutContext<'_>, embedding: &Embedding, report: &mut Report) {
        let periods_on_columns = embedding.side_of(&AxisSelector::Period)
            == Some(Placement::Column);
        let touches_stop_list = embedding.row_commands.iter().any(|c| match &c.axis {
            AxisSelector::Axis(q) => cx.flags.segment_stop_list.contains(q),
            _ => false,
        });
        if periods_on_columns && !touches_stop_list {
            return;
        }
        report.add_segment_rows(cx);
    }

    fn abstract_rows(&self, cx: &LayoutContext<'_>, cube: &Cube, report: &mut Report) {
        if let Some(pg) = cube.presentation.as_ref() {
            report.add_abstract_rows(cx, pg);
        }
    }

    fn headings(&self, cx: &LayoutContext<'_>, cube: &Cube, embedding: &Embedding, report: &mut Report) {
        report.apply_headings(cx, embedding, cube.is_elements);
    }

    fn render(&self, cx: &LayoutContext<'_>, report: &Report) -> RenderedReport {
        report.render(cx)
    }
}

/// The built-in layout driven by presentation trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresentationLayout;

impl Layout for PresentationLayout {}
