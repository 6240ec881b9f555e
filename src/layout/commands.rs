//! Row/column commands: defaults, materialization and fact filtering.

use std::collections::{BTreeSet, HashSet};

use super::{LayoutContext, LayoutError, LayoutResult};
use crate::command::{AxisSelector, CommandGroup, MemberSelection, Placement};
use crate::cube::Cube;
use crate::embedding::{Coord, Coordinate, Embedding, FactPlacement, FlowKey};
use crate::model::QName;

/// Rank given to members that the tree does not list.
const UNLISTED_MEMBER: u64 = 1_000_000;

/// Fill in `embedding.commands` from the explicit groups or the cube's tree.
pub fn standard_commands(cx: &LayoutContext<'_>, cube: &Cube, embedding: &mut Embedding) {
    if !embedding.explicit.is_empty() {
        let mut commands = embedding.explicit.clone();
        let has = |commands: &[CommandGroup], axis: &AxisSelector| commands.iter().any(|c| &c.axis == axis);
        if !has(&commands, &AxisSelector::Primary) {
            commands.push(CommandGroup::new(Placement::Row, AxisSelector::Primary));
        }
        if !has(&commands, &AxisSelector::Period) {
            commands.push(CommandGroup::new(Placement::Column, AxisSelector::Period));
        }
        if !has(&commands, &AxisSelector::Unit) && !cube.units.is_empty() {
            commands.push(CommandGroup::new(Placement::Column, AxisSelector::Unit));
        }
        embedding.commands = commands;
        return;
    }

    let mut columns = vec![CommandGroup::new(Placement::Column, AxisSelector::Period)];
    if !cube.units.is_empty() {
        columns.push(CommandGroup::new(Placement::Column, AxisSelector::Unit));
    }

    let mut column_axes = HashSet::new();
    if cube.is_statement_of_equity {
        for axis in &cx.flags.equity_column_axes {
            if cube.axes.contains_key(axis) {
                columns.push(CommandGroup::new(
                    Placement::Column,
                    AxisSelector::Axis(axis.clone()),
                ));
                column_axes.insert(axis.clone());
            }
        }
    }

    let mut rows = Vec::new();
    let row_axes: Vec<QName> = if cube.is_elements {
        cube.axes.keys().cloned().collect()
    } else {
        cube.presentation
            .as_ref()
            .map(|pg| pg.axes.clone())
            .unwrap_or_default()
    };
    for axis in row_axes {
        if cube.axes.contains_key(&axis) && !column_axes.contains(&axis) {
            rows.push(CommandGroup::new(Placement::Row, AxisSelector::Axis(axis)));
        }
    }
    rows.push(CommandGroup::new(Placement::Row, AxisSelector::Primary));

    embedding.commands = rows.into_iter().chain(columns).collect();
}

/// Swap rows and columns.
pub fn transpose(embedding: &mut Embedding) {
    for command in &mut embedding.commands {
        command.placement = command.placement.flipped();
    }
}

/// Check the commands against the cube and split them by side.
pub fn materialize(
    cx: &LayoutContext<'_>,
    cube: &Cube,
    embedding: &mut Embedding,
) -> LayoutResult<()> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    let mut columns = Vec::new();

    for command in &embedding.commands {
        if let AxisSelector::Axis(axis) = &command.axis {
            let Some(&axis_id) = cube.axes.get(axis) else {
                return Err(LayoutError::UnknownAxis(axis.clone()));
            };
            if let MemberSelection::List(members) = &command.members {
                let known: BTreeSet<&QName> = cx
                    .entities
                    .axis(axis_id)
                    .members
                    .iter()
                    .map(|&m| &cx.entities.member(m).qname)
                    .collect();
                let default = cx.entities.default_of(axis);
                if let Some(unknown) = members
                    .iter()
                    .find(|m| !known.contains(m) && Some(*m) != default)
                {
                    return Err(LayoutError::UnknownMember {
                        axis: axis.clone(),
                        member: unknown.clone(),
                    });
                }
            }
        }
        if !seen.insert(command.axis.clone()) {
            return Err(LayoutError::DuplicateAxis(command.axis.to_string()));
        }
        match command.placement {
            Placement::Row => rows.push(command.clone()),
            Placement::Column => columns.push(command.clone()),
        }
    }

    embedding.row_commands = rows;
    embedding.column_commands = columns;
    Ok(())
}

/// Place every cube fact the commands accept.
pub fn filter_facts(
    cx: &LayoutContext<'_>,
    cube: &Cube,
    embedding: &mut Embedding,
) -> LayoutResult<()> {
    let Some(pg) = cube.presentation.as_ref() else {
        return Err(LayoutError::NoPresentation);
    };
    let commanded: HashSet<&QName> = embedding
        .commands
        .iter()
        .filter_map(|c| match &c.axis {
            AxisSelector::Axis(q) => Some(q),
            _ => None,
        })
        .collect();

    let mut placements = Vec::new();
    'facts: for membership in &cube.memberships {
        let coordinates = &membership.coordinates;

        for axis in &cube.default_missing_axes {
            if coordinates.member(axis).is_none() {
                continue 'facts;
            }
        }
        for (axis, member) in &coordinates.members {
            if !commanded.contains(axis) && cx.entities.default_of(axis) != Some(member) {
                continue 'facts;
            }
        }

        let fact = cx.instance.fact(membership.fact);
        let primary = fact.qname.clone();
        let Some(primary_rank) = pg.primary_rank(&primary, membership.period_label.as_deref())
        else {
            continue;
        };

        let mut keys = [Vec::new(), Vec::new()];
        for (side, commands) in [&embedding.row_commands, &embedding.column_commands]
            .into_iter()
            .enumerate()
        {
            for command in commands {
                let coordinate = match &command.axis {
                    AxisSelector::Primary => Coordinate {
                        rank: primary_rank as u64,
                        value: Coord::Primary(primary.clone()),
                    },
                    AxisSelector::Period => {
                        let Some(period) = coordinates.period else {
                            continue 'facts;
                        };
                        let rank = cube
                            .period_order
                            .iter()
                            .position(|p| *p == period)
                            .unwrap_or(cube.period_order.len());
                        Coordinate {
                            rank: rank as u64,
                            value: Coord::Period(period),
                        }
                    }
                    AxisSelector::Unit => {
                        let rank = match &coordinates.unit {
                            Some(unit) => cube
                                .unit_order
                                .iter()
                                .position(|u| u == unit)
                                .map_or(cube.unit_order.len() + 1, |i| i + 1),
                            None => 0,
                        };
                        Coordinate {
                            rank: rank as u64,
                            value: Coord::Unit(coordinates.unit.clone()),
                        }
                    }
                    AxisSelector::Axis(axis) => {
                        let default = cx.entities.default_of(axis);
                        let effective = coordinates.member(axis).or(default);
                        if let MemberSelection::List(_) = command.members {
                            match effective.and_then(|m| command.members.position(m)) {
                                Some(i) => Coordinate {
                                    rank: i as u64 + 1,
                                    value: Coord::Member {
                                        axis: axis.clone(),
                                        member: effective.cloned(),
                                    },
                                },
                                None => continue 'facts,
                            }
                        } else {
                            match effective {
                                Some(member) if Some(member) != default => Coordinate {
                                    rank: pg
                                        .member_rank(axis, member)
                                        .map_or(UNLISTED_MEMBER, |i| i as u64 + 1),
                                    value: Coord::Member {
                                        axis: axis.clone(),
                                        member: Some(member.clone()),
                                    },
                                },
                                _ => Coordinate {
                                    rank: 0,
                                    value: Coord::Member {
                                        axis: axis.clone(),
                                        member: None,
                                    },
                                },
                            }
                        }
                    }
                };
                keys[side].push(coordinate);
            }
        }

        let [row_key, column_key] = keys;
        placements.push(FactPlacement {
            fact: membership.fact,
            primary,
            period: coordinates.period,
            unit: coordinates.unit.clone(),
            preferred_label: membership.period_label.clone(),
            row_key,
            column_key,
            source_line: fact.source_line,
        });
    }

    if placements.is_empty() {
        return Err(LayoutError::NoFacts);
    }

    embedding.elements = placements.iter().map(|p| p.primary.clone()).collect();
    embedding.flow_keys = placements
        .iter()
        .flat_map(|p| flow_keys(p, cx))
        .collect();
    embedding.placements = placements;
    Ok(())
}

/// Concept and concept/member keys of one placement.
fn flow_keys(placement: &FactPlacement, cx: &LayoutContext<'_>) -> Vec<FlowKey> {
    let mut keys = vec![FlowKey::Concept(placement.primary.clone())];
    if let Some(context) = cx.instance.context_of(placement.fact) {
        for dim in &context.dimensions {
            if cx.entities.default_of(&dim.dimension) != Some(&dim.member) {
                keys.push(FlowKey::ConceptMember(
                    placement.primary.clone(),
                    dim.member.clone(),
                ));
            }
        }
    }
    keys
}

/// Rank units by the first primary concept (in tree order) reporting them.
pub fn reorder_units(embedding: &mut Embedding) {
    if embedding.side_of(&AxisSelector::Unit).is_none() {
        return;
    }
    let mut ordered: Vec<&FactPlacement> = embedding.placements.iter().collect();
    ordered.sort_by_key(|p| (primary_rank(p), p.source_line));
    let mut units: Vec<String> = Vec::new();
    for placement in ordered {
        if let Some(unit) = &placement.unit {
            if !units.contains(unit) {
                units.push(unit.clone());
            }
        }
    }

    for placement in &mut embedding.placements {
        for coordinate in placement
            .row_key
            .iter_mut()
            .chain(placement.column_key.iter_mut())
        {
            if let Coord::Unit(unit) = &coordinate.value {
                coordinate.rank = match unit {
                    Some(u) => units.iter().position(|x| x == u).map_or(0, |i| i as u64 + 1),
                    None => 0,
                };
            }
        }
    }
}

fn primary_rank(placement: &FactPlacement) -> u64 {
    placement
        .row_key
        .iter()
        .chain(placement.column_key.iter())
        .find(|c| matches!(c.value, Coord::Primary(_)))
        .map_or(u64::MAX, |c| c.rank)
}
