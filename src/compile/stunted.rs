//! Pruning of short-period columns on cash-flow statements.

use std::collections::BTreeSet;

use crate::diagnostics::{codes, Diagnostic, Diagnostics};
use crate::embedding::Embedding;
use crate::layout::LayoutContext;
use crate::model::FactId;
use crate::report::Report;

/// Which columns to hide, and the numbers that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuntedPlan {
    pub max_months: u32,
    /// Fewest facts among the longest columns.
    pub min_facts: usize,
    pub threshold: usize,
    pub hidden: Vec<usize>,
}

/// Plan over `(months, fact count)` per visible column.
pub fn stunted_columns(columns: &[(u32, usize)]) -> StuntedPlan {
    let max_months = columns.iter().map(|(m, _)| *m).max().unwrap_or(0);
    let min_facts = columns
        .iter()
        .filter(|(m, _)| *m == max_months)
        .map(|(_, n)| *n)
        .min()
        .unwrap_or(0);
    let threshold = min_facts / 4;
    let hidden = columns
        .iter()
        .enumerate()
        .filter(|(_, (m, n))| *m < max_months && *n < threshold)
        .map(|(i, _)| i)
        .collect();
    StuntedPlan {
        max_months,
        min_facts,
        threshold,
        hidden,
    }
}

/// Hide stunted columns and drop the facts only they showed. Returns the
/// dropped facts.
pub fn prune(
    cx: &LayoutContext<'_>,
    embedding: &mut Embedding,
    report: &mut Report,
    diagnostics: &mut Diagnostics,
) -> Vec<FactId> {
    let visible: Vec<usize> = report
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_data() && !c.hidden)
        .map(|(i, _)| i)
        .collect();
    let shape: Vec<(u32, usize)> = visible
        .iter()
        .map(|&i| {
            let column = &report.columns[i];
            let months = column.period.map_or(0, |p| cx.entities.period(p).months);
            (months, column.facts.len())
        })
        .collect();
    let plan = stunted_columns(&shape);
    if plan.hidden.is_empty() {
        return Vec::new();
    }

    let mut headings = Vec::new();
    for &k in &plan.hidden {
        let column = &mut report.columns[visible[k]];
        column.hidden = true;
        if let Some(period) = column.period {
            let d = cx.entities.period(period);
            headings.push(match d.span_heading() {
                Some(span) => format!("{} {}", span, d.label),
                None => d.label.clone(),
            });
        }
    }

    let kept: BTreeSet<FactId> = report
        .visible_columns()
        .flat_map(|c| c.facts.iter().copied())
        .collect();
    // Columns hidden before this pass keep their facts.
    let removed: Vec<FactId> = plan
        .hidden
        .iter()
        .flat_map(|&k| report.columns[visible[k]].facts.iter().copied())
        .filter(|f| !kept.contains(f))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    for &fact in &removed {
        report.remove_fact(fact);
    }
    embedding.placements.retain(|p| !removed.contains(&p.fact));
    report.hide_empty_rows();

    diagnostics.push(
        Diagnostic::info(
            codes::SHORTER_COLUMNS_REMOVED,
            format!(
                "In {}, {} column(s) shorter than {} months with fewer than {} facts were removed: {}.",
                report.title,
                plan.hidden.len(),
                plan.max_months,
                plan.threshold,
                headings.join(", ")
            ),
        )
        .with("report", &report.title)
        .with("threshold", plan.threshold)
        .with("removed", removed.len()),
    );
    removed
}
