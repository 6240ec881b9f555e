//! Fact deduplication.
//!
//! Among facts sharing `(qname, context, unit)` exactly one is kept. Facts are
//! ordered by `(context id, discriminator, source line)` where the
//! discriminator puts higher numeric precision first, `en-US` (or no language)
//! before other languages, and nil values last.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::diagnostics::{codes, Diagnostic, Diagnostics};
use crate::model::{FactId, Instance};

#[derive(Debug, Clone, PartialEq)]
enum Discriminator {
    /// Negated decimals, so higher precision sorts first.
    Precision(f64),
    Language(String),
    Nil,
}

impl Discriminator {
    fn rank(&self) -> u8 {
        match self {
            Discriminator::Precision(_) => 0,
            Discriminator::Language(_) => 1,
            Discriminator::Nil => 2,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Discriminator::Precision(a), Discriminator::Precision(b)) => a.total_cmp(b),
            (Discriminator::Language(a), Discriminator::Language(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn discriminator(instance: &Instance, id: FactId) -> Discriminator {
    let fact = instance.fact(id);
    if fact.nil {
        return Discriminator::Nil;
    }
    if instance.concept_of(id).is_some_and(|c| c.is_numeric()) {
        let decimals = fact.decimals_value().unwrap_or(f64::NEG_INFINITY);
        return Discriminator::Precision(-decimals);
    }
    match fact.lang.as_deref() {
        None | Some("en-US") => Discriminator::Language("aa-AA".to_string()),
        Some(lang) => Discriminator::Language(lang.to_string()),
    }
}

/// Deduplicate one group of facts sharing a qualified name.
///
/// Returns the discarded facts. Emits one `er3:multipleFacts` notice per run
/// of two or more facts.
pub fn deduplicate_group(
    instance: &Instance,
    group: &[FactId],
    diagnostics: &mut Diagnostics,
) -> Vec<FactId> {
    if group.len() < 2 {
        return Vec::new();
    }

    let mut keyed: Vec<(FactId, Discriminator)> = group
        .iter()
        .map(|&id| (id, discriminator(instance, id)))
        .collect();
    keyed.sort_by(|(a, da), (b, db)| {
        let (fa, fb) = (instance.fact(*a), instance.fact(*b));
        fa.context_ref
            .cmp(&fb.context_ref)
            .then_with(|| da.compare(db))
            .then_with(|| fa.source_line.cmp(&fb.source_line))
    });

    let mut discarded = Vec::new();
    let mut i = 0;
    while i < keyed.len() {
        let kept = instance.fact(keyed[i].0);
        let mut lines = Vec::new();
        let mut j = i + 1;
        while j < keyed.len() {
            let candidate = instance.fact(keyed[j].0);
            if candidate.qname != kept.qname
                || candidate.context_ref != kept.context_ref
                || candidate.unit_ref != kept.unit_ref
            {
                break;
            }
            discarded.push(keyed[j].0);
            lines.push(candidate.source_line.to_string());
            j += 1;
        }

        if !lines.is_empty() {
            let mut ids = format!(
                "qname {}, context {}",
                kept.qname,
                kept.context_ref.as_deref().unwrap_or("")
            );
            if let Some(unit) = &kept.unit_ref {
                ids.push_str(", unit ");
                ids.push_str(unit);
            }
            diagnostics.push(
                Diagnostic::info(
                    codes::MULTIPLE_FACTS,
                    format!(
                        "There are multiple facts with {}. The fact on line {} of the instance \
                         document will be rendered, and the rest at line(s) {} will not.",
                        ids,
                        kept.source_line,
                        lines.join(", ")
                    ),
                )
                .with("contextUnitIds", &ids)
                .with("lineNumOfFactWeAreKeeping", kept.source_line)
                .with("linesDiscarded", lines.join(", ")),
            );
        }
        i = j;
    }
    discarded
}

/// Deduplicate every qname group of the instance.
///
/// Must finish before any fact is linked to a cube: linking consults the
/// returned set.
pub fn deduplicate(instance: &Instance, diagnostics: &mut Diagnostics) -> BTreeSet<FactId> {
    instance
        .facts_by_qname()
        .iter()
        .flat_map(|(_, group)| deduplicate_group(instance, group, diagnostics))
        .collect()
}
