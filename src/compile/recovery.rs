//! Second pass for facts no first-pass report showed.

use std::collections::BTreeSet;

use super::{phases, CompileResult, FilingState};
use crate::cube::Cube;
use crate::emit::ReportSink;
use crate::index::populate_uncategorized;
use crate::layout::Layout;
use crate::model::FactId;

/// Rebuild the entity tables over `unused` alone and render them as one
/// uncategorized report. Spreadsheets are never produced for it.
pub fn run(
    state: &mut FilingState<'_>,
    layout: &dyn Layout,
    sink: &mut dyn ReportSink,
    unused: &BTreeSet<FactId>,
) -> CompileResult<()> {
    state.clear_for_recovery();

    let number = state.next_uncategorized_file_number;
    let entry_point = state.instance.entry_point.clone();
    let cube = state.add_cube(|id| {
        let mut cube = Cube::uncategorized(id, &entry_point);
        cube.file_number = Some(number);
        cube
    });
    populate_uncategorized(state, cube, unused);
    tracing::debug!(
        facts = unused.len(),
        elements = state.entities.element_count(),
        file = number,
        "uncategorized cube"
    );

    phases::cube_phase(state, layout, cube)?;
    if !state.cube(cube)?.is_suppressed() {
        let embedding = state.add_embedding(cube, Vec::new(), None)?;
        phases::embedding_phase(state, layout, embedding)?;
        if !state.embedding(embedding)?.is_broken() {
            phases::report_phase(state, layout, embedding)?;
            phases::finalize(state, layout, embedding, sink, false)?;
        }
    }
    state.release_cube(cube)?;
    state.next_uncategorized_file_number = number.saturating_sub(1);
    Ok(())
}
