//! Filing compilation: the per-cube phase machine and the filing-wide passes.
//!
//! ```text
//! populate ─▶ cube phase ─▶ embedding phase ─▶ flow-through ─▶ numbering
//!                                                                 │
//!     recovery ◀─ unused facts ◀─ deferred cubes ◀─ report phase ◀┘
//! ```

pub mod flags;
pub mod flow_through;
pub mod phases;
pub mod recovery;
pub mod state;
pub mod stunted;

pub use flags::FilingFlags;
pub use flow_through::columns_to_suppress;
pub use state::{FactUse, FilingState, Split};
pub use stunted::{stunted_columns, StuntedPlan};

use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::{RenderSettings, Settings};
use crate::cube::{CubeId, CubeState};
use crate::diagnostics::{codes, Diagnostic};
use crate::embedding::EmbeddingId;
use crate::emit::{EmitError, InstanceSummary, ReportSink};
use crate::index::populate;
use crate::layout::{Layout, PresentationLayout};
use crate::model::{FactId, Instance};

/// Faults in the compiler itself. Problems in the filing are diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{0} was used after it was released")]
    CubeReleased(CubeId),

    #[error("{0} was used after it was released")]
    EmbeddingReleased(EmbeddingId),

    #[error("Unknown {0}")]
    UnknownCube(CubeId),

    #[error("Unknown {0}")]
    UnknownEmbedding(EmbeddingId),

    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Options for one compilation, usually derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub render: RenderSettings,
    pub html: bool,
    pub xml: bool,
    pub excel: bool,
    pub first_file_number: u32,
    pub uncategorized_file_number: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for CompileOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            render: settings.render.clone(),
            html: settings.output.html(),
            xml: settings.output.xml(),
            excel: settings.output.excel,
            first_file_number: settings.numbering.first_file_number,
            uncategorized_file_number: settings.numbering.first_uncategorized_file_number,
        }
    }
}

impl CompileOptions {
    pub fn with_excel(mut self, excel: bool) -> Self {
        self.excel = excel;
        self
    }

    pub fn with_first_file_number(mut self, number: u32) -> Self {
        self.first_file_number = number;
        self
    }
}

/// What became of one first-pass cube.
#[derive(Debug, Clone, Serialize)]
pub struct CubeOutcome {
    pub linkrole: String,
    pub definition: String,
    pub file_number: Option<u32>,
    pub state: CubeState,
    /// Some fact carried a valid embedded command for the cube.
    pub is_embedded: bool,
    pub embeddings: usize,
}

#[derive(Debug)]
pub struct CompileOutput {
    pub summary: InstanceSummary,
    pub diagnostics: Vec<Diagnostic>,
    pub cube_outcomes: Vec<CubeOutcome>,
    pub flow_through_applied: bool,
    /// Facts no first-pass report showed.
    pub unused_facts: BTreeSet<FactId>,
}

/// Compile a filing with the built-in presentation layout.
pub fn compile_filing(
    instance: &Instance,
    options: &CompileOptions,
    sink: &mut dyn ReportSink,
) -> CompileResult<CompileOutput> {
    compile_with_layout(instance, options, &PresentationLayout, sink)
}

pub fn compile_with_layout(
    instance: &Instance,
    options: &CompileOptions,
    layout: &dyn Layout,
    sink: &mut dyn ReportSink,
) -> CompileResult<CompileOutput> {
    let mut state = FilingState::new(instance, options);
    populate(&mut state);

    let mut order: Vec<CubeId> = (0..state.cubes.len()).map(CubeId).collect();
    order.sort_by(|a, b| state.cubes[a.0].definition.cmp(&state.cubes[b.0].definition));

    for &cube in &order {
        phases::cube_phase(&mut state, layout, cube)?;
        let current = state.cube(cube)?;
        if !current.is_embedded && !current.is_suppressed() {
            let embedding = state.add_embedding(cube, Vec::new(), None)?;
            phases::embedding_phase(&mut state, layout, embedding)?;
        }
    }

    let flow_through_applied = !state.has_embeddings && flow_through::apply(&mut state, &order)?;

    for &cube in &order {
        let number = state.next_file_number;
        let current = state.cube_mut(cube)?;
        if current.exclude_from_numbering || current.memberships.is_empty() {
            continue;
        }
        current.file_number = Some(number);
        let (embedded, message) = (
            current.is_embedded,
            format!("R{} is {} ({})", number, current.short_name, current.linkrole),
        );
        state.next_file_number += 1;
        state.diagnostics.push(
            Diagnostic::debug(codes::CUBE_FILE, message).with("fileNumber", number),
        );
        if embedded {
            state.embedded_cubes.insert(cube);
        }
    }
    let embed_targets = state.embedded_cubes.clone();

    let mut excel = options.excel;
    if excel && state.has_embeddings {
        state.diagnostics.push(Diagnostic::info(
            codes::SKIPPED_EXCEL,
            "The spreadsheet was not generated because the filing has embedded commands.",
        ));
        excel = false;
    }

    state.diagnostics.push(Diagnostic::debug(
        codes::GENERATING_REPORTS,
        format!("Generating reports for {} cubes.", order.len()),
    ));
    for &cube in &order {
        let current = state.cube(cube)?;
        if current.is_suppressed() {
            state.release_cube(cube)?;
            continue;
        }
        if current.is_embedded {
            continue;
        }
        let embeddings = current.embeddings.clone();
        for embedding in embeddings {
            if state.embedding(embedding).is_ok_and(|e| !e.is_broken()) {
                phases::report_phase(&mut state, layout, embedding)?;
                phases::finalize(&mut state, layout, embedding, sink, excel)?;
            }
        }
        state.release_cube(cube)?;
    }

    // Cubes whose commands were never realized get their default view.
    state.disallow_embeddings = true;
    let pending: Vec<CubeId> = state.embedded_cubes.iter().copied().collect();
    for cube in pending {
        let Ok(current) = state.cube_mut(cube) else {
            continue;
        };
        // Written as a standalone report from here on.
        current.is_embedded = false;
        let embedding = state.add_embedding(cube, Vec::new(), None)?;
        phases::embedding_phase(&mut state, layout, embedding)?;
        if !state.embedding(embedding)?.is_broken() {
            phases::report_phase(&mut state, layout, embedding)?;
            phases::finalize(&mut state, layout, embedding, sink, excel)?;
        }
    }
    for &cube in &order {
        if state.cube(cube).is_ok() {
            state.release_cube(cube)?;
        }
    }

    let unused = state.unused_facts();
    explain_skipped(&mut state, &unused);

    let cube_outcomes: Vec<CubeOutcome> = order
        .iter()
        .map(|&id| {
            let cube = &state.cubes[id.0];
            CubeOutcome {
                linkrole: cube.linkrole.clone(),
                definition: cube.definition.clone(),
                file_number: cube.file_number,
                state: cube.state,
                is_embedded: cube.is_embedded || embed_targets.contains(&id),
                embeddings: cube.embeddings.len(),
            }
        })
        .collect();
    let has_embeddings = state.has_embeddings;

    if !unused.is_empty() {
        tracing::info!(unused = unused.len(), "recovering uncategorized facts");
        recovery::run(&mut state, layout, sink, &unused)?;
    }

    let summary = InstanceSummary {
        entry_point: instance.entry_point.clone(),
        reports: state.summaries,
        unused_facts: unused.len(),
        has_embeddings,
        next_file_number: state.next_file_number,
        next_uncategorized_file_number: state.next_uncategorized_file_number,
    };
    Ok(CompileOutput {
        summary,
        diagnostics: state.diagnostics.into_vec(),
        cube_outcomes,
        flow_through_applied,
        unused_facts: unused,
    })
}

/// Explain unused facts that some cube had to skip.
fn explain_skipped(state: &mut FilingState<'_>, unused: &BTreeSet<FactId>) {
    let instance = state.instance;
    for skipped in std::mem::take(&mut state.skipped) {
        if !unused.contains(&skipped.fact) {
            continue;
        }
        let fact = instance.fact(skipped.fact);
        let which = if crate::layout::presentation::is_period_start(&skipped.preferred_label) {
            "starting"
        } else {
            "ending"
        };
        state.diagnostics.push(
            Diagnostic::info(
                codes::FACT_NOT_SHOWN,
                format!(
                    "In {}, the fact {} on line {} was not shown because no duration {} at its \
                     date was found.",
                    skipped.short_name, fact.qname, fact.source_line, which
                ),
            )
            .with("fact", &fact.qname)
            .with("line", fact.source_line)
            .with("report", &skipped.short_name),
        );
    }
}
