//! Flow-through suppression: hide statement columns whose content every
//! other report already shows.

use std::collections::BTreeSet;

use super::{CompileResult, FilingState};
use crate::cube::CubeId;
use crate::diagnostics::{codes, Diagnostic};
use crate::embedding::{EmbeddingId, FlowKey};
use crate::model::{Instance, QName};
use crate::report::{Line, LineId};

/// Indices of the columns to hide: those whose keys all appear in
/// `elsewhere`, unless that is none or all of them.
pub fn columns_to_suppress(columns: &[BTreeSet<FlowKey>], elsewhere: &BTreeSet<FlowKey>) -> Vec<usize> {
    let hidden: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, keys)| keys.is_subset(elsewhere))
        .map(|(i, _)| i)
        .collect();
    if hidden.len() == columns.len() {
        return Vec::new();
    }
    hidden
}

/// Keys of one column: its facts' concepts plus the concept/member pairs
/// recorded for hiding.
fn column_keys(instance: &Instance, column: &Line) -> BTreeSet<FlowKey> {
    column
        .facts
        .iter()
        .map(|&f| FlowKey::Concept(instance.fact(f).qname.clone()))
        .chain(column.hiding_keys.iter().cloned())
        .collect()
}

fn key_concept(key: &FlowKey) -> &QName {
    match key {
        FlowKey::Concept(q) | FlowKey::ConceptMember(q, _) => q,
    }
}

/// Run suppression over the statements among `order`. Returns whether any
/// column was hidden.
pub fn apply(state: &mut FilingState<'_>, order: &[CubeId]) -> CompileResult<bool> {
    let instance = state.instance;

    let mut statements: Vec<(CubeId, EmbeddingId)> = Vec::new();
    let mut pooled: BTreeSet<FlowKey> = BTreeSet::new();
    for &id in order {
        let cube = state.cube(id)?;
        if cube.is_suppressed() {
            continue;
        }
        let live: Vec<EmbeddingId> = cube
            .embeddings
            .iter()
            .copied()
            .filter(|&e| state.embedding(e).is_ok_and(|e| !e.is_broken()))
            .collect();
        match live.as_slice() {
            [only] if cube.is_statement() && !cube.is_statement_of_equity => {
                statements.push((id, *only));
            }
            _ => {
                for embedding in live {
                    pooled.extend(state.embedding(embedding)?.flow_keys.iter().cloned());
                }
            }
        }
    }

    let mut applied = false;
    for (i, &(cube, id)) in statements.iter().enumerate() {
        let mut elsewhere = pooled.clone();
        for (j, &(_, other)) in statements.iter().enumerate() {
            if i != j {
                elsewhere.extend(state.embedding(other)?.flow_keys.iter().cloned());
            }
        }

        let embedding = state.embedding(id)?;
        let Some(report) = embedding.report.as_ref() else {
            continue;
        };
        let columns: Vec<&Line> = report.visible_columns().filter(|c| c.is_data()).collect();
        let keys: Vec<BTreeSet<FlowKey>> = columns.iter().map(|c| column_keys(instance, c)).collect();
        let hide = columns_to_suppress(&keys, &elsewhere);
        if hide.is_empty() {
            continue;
        }

        let hidden: BTreeSet<LineId> = hide.iter().map(|&k| columns[k].id).collect();
        let kept: BTreeSet<QName> = columns
            .iter()
            .filter(|c| !hidden.contains(&c.id))
            .flat_map(|c| c.facts.iter().map(|&f| instance.fact(f).qname.clone()))
            .collect();
        let positions: Vec<String> = hide.iter().map(|k| (k + 1).to_string()).collect();
        let short_name = state.cube(cube)?.short_name.clone();

        let embedding = state.embedding_mut(id)?;
        if let Some(report) = embedding.report.as_mut() {
            for column in report.columns.iter_mut().filter(|c| hidden.contains(&c.id)) {
                column.hidden = true;
            }
            report.hide_empty_rows();
        }
        embedding.flow_keys.retain(|k| kept.contains(key_concept(k)));
        embedding.elements = kept;
        applied = true;

        state.diagnostics.push(
            Diagnostic::info(
                codes::COLUMNS_SUPPRESSED,
                format!(
                    "In {}, column(s) {} are contained in other reports, so were removed by flow through suppression.",
                    short_name,
                    positions.join(", ")
                ),
            )
            .with("report", &short_name)
            .with("columns", positions.join(", ")),
        );
    }
    Ok(applied)
}
