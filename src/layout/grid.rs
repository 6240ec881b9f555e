//! Report grid construction, merges and rendering.

use std::collections::{BTreeMap, BTreeSet};

use super::{LayoutContext, PresentationGroup};
use crate::command::{AxisSelector, DisplayMode, Placement};
use crate::cube::Cube;
use crate::embedding::{Coord, Coordinate, Embedding, FactPlacement, FlowKey};
use crate::index::PeriodId;
use crate::model::{FactId, QName};
use crate::report::{Line, LineId, LineKind, RenderedReport, RenderedRow, Report, Scale};

impl Report {
    /// Lay the embedding's placements out on a grid. Placements that land in
    /// an occupied cell open another row with the same key.
    pub fn build(cube: &Cube, embedding: &Embedding) -> Self {
        let mut report = Report::new(cube.id, embedding.id, cube.short_name.clone());

        let column_keys: BTreeSet<&Vec<Coordinate>> =
            embedding.placements.iter().map(|p| &p.column_key).collect();
        let mut column_ids: BTreeMap<&Vec<Coordinate>, LineId> = BTreeMap::new();
        for key in column_keys {
            let id = report.next_line_id();
            report.columns.push(Line::new(id, LineKind::Data, key.clone()));
            column_ids.insert(key, id);
        }

        let mut ordered: Vec<&FactPlacement> = embedding.placements.iter().collect();
        if cube.is_elements {
            ordered.sort_by(|a, b| {
                a.row_key
                    .cmp(&b.row_key)
                    .then(a.source_line.cmp(&b.source_line))
            });
        } else {
            ordered.sort_by(|a, b| a.row_key.cmp(&b.row_key));
        }

        let mut group: Vec<LineId> = Vec::new();
        let mut group_key: Option<&Vec<Coordinate>> = None;
        for placement in ordered {
            if group_key != Some(&placement.row_key) {
                group.clear();
                group_key = Some(&placement.row_key);
            }
            let Some(&column) = column_ids.get(&placement.column_key) else {
                continue;
            };
            let free = group
                .iter()
                .copied()
                .find(|row| !report.cells.contains_key(&(*row, column)));
            let row = match free {
                Some(row) => row,
                None => {
                    let id = report.next_line_id();
                    report
                        .rows
                        .push(Line::new(id, LineKind::Data, placement.row_key.clone()));
                    group.push(id);
                    id
                }
            };
            report.cells.insert((row, column), placement.fact);
            if let Some(line) = report.rows.iter_mut().find(|l| l.id == row) {
                absorb(line, placement);
            }
            if let Some(line) = report.columns.iter_mut().find(|l| l.id == column) {
                absorb(line, placement);
            }
        }
        report
    }

    fn visible_ids(&self, side: Placement) -> BTreeSet<LineId> {
        self.lines(side)
            .iter()
            .filter(|l| !l.hidden)
            .map(|l| l.id)
            .collect()
    }

    /// Cells of one line, keyed by the line on the other side.
    fn occupancy(&self, side: Placement, id: LineId) -> BTreeMap<LineId, FactId> {
        self.cells
            .iter()
            .filter_map(|(&(row, column), &fact)| match side {
                Placement::Row if row == id => Some((column, fact)),
                Placement::Column if column == id => Some((row, fact)),
                _ => None,
            })
            .collect()
    }

    fn disjoint(&self, side: Placement, a: LineId, b: LineId) -> bool {
        let first = self.occupancy(side, a);
        self.occupancy(side, b)
            .keys()
            .all(|other| !first.contains_key(other))
    }

    /// Move every cell of `source` onto `target` and hide `source`.
    fn fold(&mut self, side: Placement, target: LineId, source: LineId) {
        for (other, fact) in self.occupancy(side, source) {
            self.cells.remove(&cell_key(side, source, other));
            self.cells.insert(cell_key(side, target, other), fact);
        }
        let lines = self.lines_mut(side);
        let Some(from) = lines.iter_mut().find(|l| l.id == source) else {
            return;
        };
        from.hidden = true;
        let facts = std::mem::take(&mut from.facts);
        let units = std::mem::take(&mut from.units);
        if let Some(to) = lines.iter_mut().find(|l| l.id == target) {
            to.facts.extend(facts);
            to.units.extend(units);
        }
    }

    fn data_lines(&self, side: Placement) -> Vec<(LineId, Option<PeriodId>, Vec<Coord>, Vec<Coord>)> {
        self.lines(side)
            .iter()
            .filter(|l| l.is_data() && !l.hidden)
            .map(|l| {
                let without_unit = values(&l.key, |c| !matches!(c, Coord::Unit(_)));
                let without_period = values(&l.key, |c| !matches!(c, Coord::Period(_)));
                (l.id, l.period, without_unit, without_period)
            })
            .collect()
    }

    /// Leave period headings off when every column shows the same period.
    pub fn repress_duplicate_period_headings(&mut self, has_embeddings: bool) {
        if !has_embeddings {
            return;
        }
        let periods: BTreeSet<Option<PeriodId>> = self
            .columns
            .iter()
            .filter(|c| c.is_data() && !c.hidden)
            .map(|c| c.period)
            .collect();
        self.repress_period_headings = periods.len() == 1 && !periods.contains(&None);
    }

    /// Move axes with a single non-default member into the title.
    pub fn promote_axes(&mut self, cx: &LayoutContext<'_>, embedding: &Embedding) {
        for command in embedding.row_commands.iter().chain(&embedding.column_commands) {
            let AxisSelector::Axis(axis) = &command.axis else {
                continue;
            };
            let members: BTreeSet<Option<&QName>> = embedding
                .placements
                .iter()
                .flat_map(|p| p.row_key.iter().chain(&p.column_key))
                .filter_map(|c| match &c.value {
                    Coord::Member { axis: a, member } if a == axis => Some(member.as_ref()),
                    _ => None,
                })
                .collect();
            if members.len() != 1 {
                continue;
            }
            if let Some(Some(member)) = members.into_iter().next() {
                let label = cx.label(member);
                if !self.promoted.contains(&label) {
                    self.promoted.push(label);
                }
            }
        }
    }

    /// Fold lines that differ only by unit and never share a cell.
    pub fn merge_unit_compatible(&mut self, side: Placement) {
        let lines = self.data_lines(side);
        let mut folded = BTreeSet::new();
        for (i, (target, _, key, _)) in lines.iter().enumerate() {
            if folded.contains(target) {
                continue;
            }
            for (source, _, other, _) in &lines[i + 1..] {
                if folded.contains(source) || key != other || !self.disjoint(side, *target, *source) {
                    continue;
                }
                self.fold(side, *target, *source);
                folded.insert(*source);
            }
        }
    }

    /// Fold instant lines into the duration line ending on the same date.
    pub fn merge_instants_into_durations(&mut self, cx: &LayoutContext<'_>, side: Placement) {
        let lines = self.data_lines(side);
        for (instant, period, _, key) in &lines {
            let Some(period) = period.map(|p| cx.entities.period(p)) else {
                continue;
            };
            if !period.is_instant() {
                continue;
            }
            let target = lines.iter().find(|(id, other, _, other_key)| {
                id != instant
                    && other_key == key
                    && other.is_some_and(|p| {
                        let d = cx.entities.period(p);
                        !d.is_instant() && d.end == period.end
                    })
                    && self.lines(side).iter().any(|l| l.id == *id && !l.hidden)
                    && self.disjoint(side, *id, *instant)
            });
            if let Some((duration, ..)) = target {
                self.fold(side, *duration, *instant);
            }
        }
    }

    /// Hide instant rows left without a visible cell.
    pub fn hide_empty_instant_rows(&mut self, cx: &LayoutContext<'_>) {
        let columns = self.visible_ids(Placement::Column);
        let occupied: BTreeSet<LineId> = self
            .cells
            .keys()
            .filter(|(_, c)| columns.contains(c))
            .map(|(r, _)| *r)
            .collect();
        for row in self.rows.iter_mut().filter(|r| r.is_data()) {
            let instant = row.period.is_some_and(|p| cx.entities.period(p).is_instant());
            if instant && !occupied.contains(&row.id) {
                row.hidden = true;
            }
        }
    }

    /// Show monetary values in thousands or millions when all of them divide evenly.
    pub fn scale_units(&mut self, cx: &LayoutContext<'_>) {
        let mut values = Vec::new();
        for fact in self.visible_facts() {
            let value = cx.instance.fact(fact);
            if value.nil || !cx.instance.unit_of(fact).is_some_and(|u| u.is_monetary()) {
                continue;
            }
            match parse_integral(&value.value) {
                Some(v) => values.push(v),
                None => return,
            }
        }
        if values.iter().all(|v| *v == 0) {
            return;
        }
        for scale in [Scale::Millions, Scale::Thousands] {
            if values.iter().all(|v| v % scale.divisor() == 0) {
                self.scale = scale;
                return;
            }
        }
    }

    /// Number footnotes by first appearance; lines whose cells all carry the
    /// same markers take them over.
    pub fn attach_footnotes(&mut self, cx: &LayoutContext<'_>) {
        let rows: Vec<LineId> = self.visible_rows().map(|r| r.id).collect();
        let columns: Vec<LineId> = self.visible_columns().map(|c| c.id).collect();
        for row in &rows {
            for column in &columns {
                let Some(&fact) = self.cells.get(&(*row, *column)) else {
                    continue;
                };
                let Some(texts) = cx.footnotes.get(&fact) else {
                    continue;
                };
                for text in texts {
                    let marker = match self.footnotes.iter().position(|t| t == text) {
                        Some(i) => i + 1,
                        None => {
                            self.footnotes.push(text.clone());
                            self.footnotes.len()
                        }
                    };
                    let markers = self.fact_footnotes.entry(fact).or_default();
                    if !markers.contains(&marker) {
                        markers.push(marker);
                    }
                }
            }
        }
        if self.fact_footnotes.is_empty() {
            return;
        }

        for side in [Placement::Row, Placement::Column] {
            let others = self.visible_ids(side.flipped());
            let ids: Vec<LineId> = self
                .lines(side)
                .iter()
                .filter(|l| l.is_data() && !l.hidden)
                .map(|l| l.id)
                .collect();
            for id in ids {
                let facts: Vec<FactId> = self
                    .occupancy(side, id)
                    .into_iter()
                    .filter(|(other, _)| others.contains(other))
                    .map(|(_, f)| f)
                    .collect();
                let Some(first) = facts.first().and_then(|f| self.fact_footnotes.get(f)) else {
                    continue;
                };
                let shared = first.clone();
                if facts.iter().any(|f| self.fact_footnotes.get(f) != Some(&shared)) {
                    continue;
                }
                for fact in &facts {
                    self.fact_footnotes.remove(fact);
                }
                if let Some(line) = self.lines_mut(side).iter_mut().find(|l| l.id == id) {
                    line.footnotes = shared;
                }
            }
        }
    }

    pub fn strip_vertical_separators(&mut self) {
        self.title = strip_bars(&self.title);
        for label in &mut self.promoted {
            *label = strip_bars(label);
        }
    }

    /// Insert a title row wherever the row members change.
    pub fn add_segment_rows(&mut self, cx: &LayoutContext<'_>) {
        let rows = std::mem::take(&mut self.rows);
        let mut out = Vec::with_capacity(rows.len());
        let mut previous: Option<Vec<QName>> = None;
        for row in rows {
            if row.is_data() && !row.hidden {
                let members: Vec<QName> = row
                    .key
                    .iter()
                    .filter_map(|c| match &c.value {
                        Coord::Member { member: Some(m), .. } => Some(m.clone()),
                        _ => None,
                    })
                    .collect();
                if previous.as_ref() != Some(&members) {
                    if !members.is_empty() {
                        let id = self.next_line_id();
                        let mut title = Line::new(id, LineKind::SegmentTitle, Vec::new());
                        let labels: Vec<String> = members.iter().map(|m| cx.label(m)).collect();
                        title.heading = vec![labels.join(&cx.render.row_separator)];
                        out.push(title);
                    }
                    previous = Some(members);
                }
            }
            out.push(row);
        }
        self.rows = out;
    }

    /// Insert header rows for the abstract concepts above each row.
    pub fn add_abstract_rows(&mut self, cx: &LayoutContext<'_>, pg: &PresentationGroup) {
        let rows = std::mem::take(&mut self.rows);
        let mut out = Vec::with_capacity(rows.len());
        let mut current: Vec<usize> = Vec::new();
        for row in rows {
            if row.kind == LineKind::SegmentTitle {
                current.clear();
            } else if row.is_data() && !row.hidden {
                let rank = row.key.iter().find_map(|c| match c.value {
                    Coord::Primary(_) => Some(c.rank as usize),
                    _ => None,
                });
                if let Some(rank) = rank {
                    let chain = pg.abstract_ancestors(rank);
                    let common = current
                        .iter()
                        .zip(&chain)
                        .take_while(|(a, b)| a == b)
                        .count();
                    for node in chain[common..].iter().filter_map(|&i| pg.node(i)) {
                        let id = self.next_line_id();
                        let mut header = Line::new(id, LineKind::Abstract, Vec::new());
                        header.heading = vec![cx.label(&node.concept)];
                        header.primary = Some(node.concept.clone());
                        out.push(header);
                    }
                    current = chain;
                }
            }
            out.push(row);
        }
        self.rows = out;
    }

    /// Fill in data-line headings from the commands on each side.
    pub fn apply_headings(&mut self, cx: &LayoutContext<'_>, embedding: &Embedding, elements: bool) {
        let promoted = self.promoted.clone();
        for side in [Placement::Row, Placement::Column] {
            let repress = side == Placement::Column && self.repress_period_headings;
            let commands = embedding.commands_on(side);
            for line in self.lines_mut(side).iter_mut().filter(|l| l.is_data()) {
                let mut heading = Vec::new();
                for command in commands {
                    if command.mode == DisplayMode::NoDisplay {
                        continue;
                    }
                    let Some(coordinate) = line.key.iter().find(|c| on_axis(&c.value, &command.axis))
                    else {
                        continue;
                    };
                    match &coordinate.value {
                        Coord::Primary(q) => {
                            let label = cx.label(q);
                            heading.push(if elements || cx.render.verbose_headings {
                                format!("{} ({})", label, q.prefixed())
                            } else {
                                label
                            });
                        }
                        Coord::Period(p) if !repress => {
                            let d = cx.entities.period(*p);
                            heading.push(match d.span_heading() {
                                Some(span) => format!("{} {}", span, d.label),
                                None => d.label.clone(),
                            });
                        }
                        Coord::Period(_) => {}
                        Coord::Unit(_) => {
                            let labels: Vec<String> = line
                                .units
                                .iter()
                                .map(|u| cx.instance.unit(u).map_or_else(|| u.clone(), |x| x.label()))
                                .collect();
                            if !labels.is_empty() {
                                heading.push(labels.join(", "));
                            }
                        }
                        Coord::Member { member: Some(m), .. } => {
                            let label = cx.label(m);
                            if !promoted.contains(&label) {
                                heading.push(label);
                            }
                        }
                        Coord::Member { member: None, .. } => {}
                    }
                }
                line.heading = heading;
            }
        }
    }

    pub fn render(&self, cx: &LayoutContext<'_>) -> RenderedReport {
        let separator = &cx.render.row_separator;
        let mut title = self.title.clone();
        for label in &self.promoted {
            title = format!("{}{}{}", title, cx.render.title_separator, label);
        }
        if let Some(suffix) = self.scale.title_suffix() {
            title = format!("{} ({})", title, suffix);
        }

        let columns: Vec<&Line> = self.visible_columns().filter(|c| c.is_data()).collect();
        let rows = self
            .visible_rows()
            .map(|row| RenderedRow {
                heading: with_markers(row.heading.join(separator), &row.footnotes),
                kind: row.kind,
                cells: if row.is_data() {
                    columns
                        .iter()
                        .map(|c| {
                            self.cells
                                .get(&(row.id, c.id))
                                .map(|&f| self.cell_text(cx, f))
                                .unwrap_or_default()
                        })
                        .collect()
                } else {
                    Vec::new()
                },
            })
            .collect();

        RenderedReport {
            title,
            column_headings: columns
                .iter()
                .map(|c| with_markers(c.heading.join(separator), &c.footnotes))
                .collect(),
            rows,
            footnotes: self.footnotes.clone(),
            hidden_columns: self.columns.iter().filter(|c| c.is_data() && c.hidden).count(),
            embedded: self.embedded.iter().map(|(_, r)| r.clone()).collect(),
        }
    }

    fn cell_text(&self, cx: &LayoutContext<'_>, fact: FactId) -> String {
        let value = cx.instance.fact(fact);
        let text = if value.nil {
            String::new()
        } else if let Some(concept) = cx.qname_values.get(&fact) {
            cx.label(concept)
        } else if self.scale != Scale::Units
            && cx.instance.unit_of(fact).is_some_and(|u| u.is_monetary())
        {
            parse_integral(&value.value)
                .map(|v| (v / self.scale.divisor()).to_string())
                .unwrap_or_else(|| value.value.clone())
        } else {
            value.value.clone()
        };
        match self.fact_footnotes.get(&fact) {
            Some(markers) => with_markers(text, markers),
            None => text,
        }
    }
}

fn absorb(line: &mut Line, placement: &FactPlacement) {
    line.facts.push(placement.fact);
    if let Some(unit) = &placement.unit {
        line.units.insert(unit.clone());
    }
    let mut members = Vec::new();
    for coordinate in &line.key {
        match &coordinate.value {
            Coord::Period(_) => line.period = placement.period,
            Coord::Primary(_) => {
                line.primary = Some(placement.primary.clone());
                line.preferred_label = placement.preferred_label.clone();
            }
            Coord::Member { member: Some(m), .. } => members.push(m.clone()),
            _ => {}
        }
    }
    for member in members {
        line.hiding_keys
            .insert(FlowKey::ConceptMember(placement.primary.clone(), member));
    }
}

fn cell_key(side: Placement, line: LineId, other: LineId) -> (LineId, LineId) {
    match side {
        Placement::Row => (line, other),
        Placement::Column => (other, line),
    }
}

fn values(key: &[Coordinate], keep: impl Fn(&Coord) -> bool) -> Vec<Coord> {
    key.iter()
        .map(|c| &c.value)
        .filter(|c| keep(c))
        .cloned()
        .collect()
}

fn on_axis(value: &Coord, axis: &AxisSelector) -> bool {
    match (value, axis) {
        (Coord::Primary(_), AxisSelector::Primary)
        | (Coord::Period(_), AxisSelector::Period)
        | (Coord::Unit(_), AxisSelector::Unit) => true,
        (Coord::Member { axis: a, .. }, AxisSelector::Axis(q)) => a == q,
        _ => false,
    }
}

fn strip_bars(text: &str) -> String {
    text.split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn with_markers(mut text: String, markers: &[usize]) -> String {
    for marker in markers {
        text.push_str(&format!(" [{}]", marker));
    }
    text
}

/// Parse a reported value as a whole number.
pub fn parse_integral(value: &str) -> Option<i128> {
    let cleaned = value.trim().replace(',', "");
    if let Ok(n) = cleaned.parse::<i128>() {
        return Some(n);
    }
    let f = cleaned.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 1e30).then_some(f as i128)
}
