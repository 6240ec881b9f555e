//! The cube, embedding and report phases, plus finalization.
//!
//! Every phase short-circuits when the cube was suppressed or the embedding
//! broke in an earlier phase.

use super::state::{live_cube, live_embedding};
use super::{stunted, CompileResult, FilingState, Split};
use crate::cube::{Cube, CubeId};
use crate::embedding::EmbeddingId;
use crate::emit::{compute_hash, EmitError, ReportSink, ReportSummary};
use crate::layout::Layout;
use crate::model::FactId;
use crate::report::RenderedReport;

/// Presentation listing, phantom axes, special cases, period labels and the
/// pseudo-axes of one cube.
pub fn cube_phase(state: &mut FilingState<'_>, layout: &dyn Layout, id: CubeId) -> CompileResult<()> {
    let debug = state.options.render.debug;
    let Split { cx, cubes, .. } = state.split();
    let cube = live_cube(cubes, id)?;

    if cube.is_uncategorized {
        layout.flat_listing(&cx, cube);
    } else if cube.elements.is_empty() || cube.memberships.is_empty() {
        cube.suppress();
        return Ok(());
    } else {
        layout.traverse(&cx, cube);
        if cube.is_suppressed() {
            return Ok(());
        }
    }

    layout.check_phantom_axes(&cx, cube);
    if cube.is_suppressed() {
        return Ok(());
    }
    layout.detect_special_cases(&cx, cube);
    let skipped = layout.resolve_period_labels(&cx, cube);
    layout.populate_pseudo_axes(&cx, cube);
    if debug {
        tracing::debug!(
            cube = %cube.linkrole,
            facts = cube.memberships.len(),
            axes = cube.axes.len(),
            periods = cube.period_order.len(),
            units = ?cube.unit_order,
            "cube phase"
        );
    }
    state.skipped.extend(skipped);
    Ok(())
}

/// Commands, fact filtering and the report grid of one embedding. A layout
/// failure breaks the embedding instead of failing the filing.
pub fn embedding_phase(
    state: &mut FilingState<'_>,
    layout: &dyn Layout,
    id: EmbeddingId,
) -> CompileResult<()> {
    let outcome = {
        let Split { cx, cubes, embeddings, .. } = state.split();
        let embedding = live_embedding(embeddings, id)?;
        let cube: &Cube = live_cube(cubes, embedding.cube)?;

        layout.standard_commands(&cx, cube, embedding);
        if cube.is_transposed {
            layout.transpose(embedding);
        }
        layout
            .materialize(&cx, cube, embedding)
            .and_then(|()| layout.filter_facts(&cx, cube, embedding))
            .map(|()| {
                layout.reorder_units(&cx, embedding);
                let mut report = layout.build_report(&cx, cube, embedding);
                if !cube.is_elements {
                    layout.refine_grid(&cx, cube, embedding, &mut report);
                }
                embedding.report = Some(report);
                embedding.facts().collect::<Vec<FactId>>()
            })
    };

    match outcome {
        Ok(facts) => {
            for fact in facts {
                state.mark_used(fact, id);
            }
        }
        Err(reason) => {
            tracing::debug!(embedding = %id, %reason, "embedding broken");
            state.break_embedding(id)?;
        }
    }
    Ok(())
}

/// Report clean-up, extra header rows and headings.
pub fn report_phase(state: &mut FilingState<'_>, layout: &dyn Layout, id: EmbeddingId) -> CompileResult<()> {
    let removed = {
        let Split { cx, cubes, embeddings, diagnostics } = state.split();
        let embedding = live_embedding(embeddings, id)?;
        let cube: &Cube = live_cube(cubes, embedding.cube)?;
        let Some(mut report) = embedding.report.take() else {
            return Ok(());
        };

        let mut removed = Vec::new();
        if embedding.row_period_position().is_some() {
            layout.hide_adjacent_instant_rows(&cx, &mut report);
        } else if cube.is_statement_of_cash_flows {
            removed = stunted::prune(&cx, embedding, &mut report, diagnostics);
        }
        layout.scale_units(&cx, &mut report);
        if report.visible_facts().iter().any(|f| cx.footnotes.contains_key(f)) {
            layout.attach_footnotes(&cx, &mut report);
        }
        layout.strip_vertical_separators(&mut report);
        if cube.is_elements || !cube.is_embedded {
            layout.segment_rows(&cx, embedding, &mut report);
            // Abstracts head primary concepts, so only when those are rows.
            if embedding.row_primary_position().is_some() && !cube.is_unlabeled {
                layout.abstract_rows(&cx, cube, &mut report);
            }
        }
        layout.headings(&cx, cube, embedding, &mut report);
        embedding.report = Some(report);
        removed
    };

    for fact in removed {
        state.unmark_used(fact, id);
    }
    Ok(())
}

/// Realize embedded reports, render, and hand the result to the sink.
pub fn finalize(
    state: &mut FilingState<'_>,
    layout: &dyn Layout,
    id: EmbeddingId,
    sink: &mut dyn ReportSink,
    excel: bool,
) -> CompileResult<()> {
    let Some(mut report) = state.embedding_mut(id)?.report.take() else {
        return Ok(());
    };

    if !state.disallow_embeddings {
        for fact in report.visible_facts() {
            if let Some(rendered) = realize_embedded(state, layout, fact)? {
                report.embedded.push((fact, rendered));
            }
        }
    }

    let rendered = {
        let Split { cx, .. } = state.split();
        layout.render(&cx, &report)
    };
    let embedding = state.embedding(id)?;
    let is_default = embedding.is_default();
    let cube = state.cube(embedding.cube)?;
    let file_number = cube.file_number;
    let summary = ReportSummary {
        file_number,
        is_default,
        has_embedded_reports: !report.embedded.is_empty(),
        long_name: cube.definition.clone(),
        short_name: cube.short_name.clone(),
        role: cube.linkrole.clone(),
        html_file_name: file_number
            .filter(|_| state.options.html)
            .map(|n| format!("R{}.htm", n)),
        xml_file_name: file_number
            .filter(|_| state.options.xml)
            .map(|n| format!("R{}.xml", n)),
        is_uncategorized: cube.is_uncategorized,
        content_hash: compute_hash(&rendered).map_err(EmitError::from)?,
    };

    sink.write_report(&summary, &rendered)?;
    if excel && !summary.is_uncategorized {
        sink.write_worksheet(&summary, &rendered)?;
    }
    tracing::debug!(
        report = %summary.short_name,
        file = ?summary.file_number,
        rows = rendered.rows.len(),
        "report finalized"
    );
    state.summaries.push(summary);
    Ok(())
}

/// Run the embedding a text block requests and render it inline.
fn realize_embedded(
    state: &mut FilingState<'_>,
    layout: &dyn Layout,
    trigger: FactId,
) -> CompileResult<Option<RenderedReport>> {
    let Some(&child) = state.fact_to_embedding.get(&trigger) else {
        return Ok(None);
    };
    let target = match state.embedding(child) {
        Ok(embedding) if !embedding.is_broken() => embedding.cube,
        _ => return Ok(None),
    };
    if state.cube(target).map_or(true, |cube| cube.is_suppressed()) {
        return Ok(None);
    }

    embedding_phase(state, layout, child)?;
    if state.embedding(child)?.is_broken() {
        return Ok(None);
    }
    report_phase(state, layout, child)?;
    let Some(report) = state.embedding_mut(child)?.report.take() else {
        return Ok(None);
    };
    let rendered = {
        let Split { cx, .. } = state.split();
        layout.render(&cx, &report)
    };
    state.embedded_cubes.remove(&target);
    state.release_embedding(child)?;
    tracing::debug!(embedding = %child, cube = %target, "embedded report realized");
    Ok(Some(rendered))
}
