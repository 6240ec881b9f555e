//! Presentation-tree traversal for one cube.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{Instance, LinkroleTree, QName};

/// Role fragments that move an instant fact onto a duration.
pub const PERIOD_START_LABEL: &str = "periodStartLabel";
pub const PERIOD_END_LABEL: &str = "periodEndLabel";

pub fn is_period_start(role: &str) -> bool {
    role.rsplit('/').next().is_some_and(|r| r.contains("Start"))
}

pub fn is_period_end(role: &str) -> bool {
    role.rsplit('/').next().is_some_and(|r| r.contains("End"))
}

pub fn is_period_label(role: Option<&str>) -> bool {
    role.is_some_and(|r| is_period_start(r) || is_period_end(r))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Line items, abstracts and tables.
    Primary,
    Axis,
    /// Anything below an axis.
    Member,
}

#[derive(Debug, Clone)]
pub struct PresentationNode {
    pub concept: QName,
    pub depth: usize,
    pub parent: Option<usize>,
    pub preferred_label: Option<String>,
    pub is_abstract: bool,
    pub kind: NodeKind,
    /// Owning axis of a member node.
    pub axis: Option<QName>,
}

/// Pre-order listing of a cube's tree with the lookups layout needs.
#[derive(Debug, Clone, Default)]
pub struct PresentationGroup {
    pub nodes: Vec<PresentationNode>,
    /// Axes in tree order.
    pub axes: Vec<QName>,
    /// Members under each axis in tree order.
    pub axis_members: BTreeMap<QName, Vec<QName>>,
    first_index: HashMap<QName, usize>,
    labelled_index: HashMap<(QName, Option<String>), usize>,
}

impl PresentationGroup {
    /// Depth-first pre-order walk from every root, arcs in `order`.
    pub fn from_tree(tree: &LinkroleTree, instance: &Instance) -> Self {
        let mut group = Self::default();
        for root in tree.roots() {
            let mut path = HashSet::new();
            group.visit(tree, instance, root, None, None, 0, None, &mut path);
        }
        group
    }

    #[allow(clippy::too_many_arguments)]
    fn visit(
        &mut self,
        tree: &LinkroleTree,
        instance: &Instance,
        concept: &QName,
        parent: Option<usize>,
        preferred_label: Option<String>,
        depth: usize,
        axis: Option<QName>,
        path: &mut HashSet<QName>,
    ) {
        if !path.insert(concept.clone()) {
            return;
        }
        let declared = instance.concept(concept);
        let is_dimension = declared.is_some_and(|c| c.is_dimension);
        let kind = if is_dimension {
            NodeKind::Axis
        } else if axis.is_some() {
            NodeKind::Member
        } else {
            NodeKind::Primary
        };
        let index = self.push(PresentationNode {
            concept: concept.clone(),
            depth,
            parent,
            preferred_label,
            is_abstract: declared.is_some_and(|c| c.is_abstract),
            kind,
            axis: if kind == NodeKind::Member { axis.clone() } else { None },
        });

        let child_axis = match kind {
            NodeKind::Axis => {
                if !self.axes.contains(concept) {
                    self.axes.push(concept.clone());
                }
                Some(concept.clone())
            }
            NodeKind::Member => {
                if let Some(owner) = &axis {
                    let members = self.axis_members.entry(owner.clone()).or_default();
                    if !members.contains(concept) {
                        members.push(concept.clone());
                    }
                }
                axis
            }
            NodeKind::Primary => None,
        };

        for (child, arc) in tree.children(concept) {
            self.visit(
                tree,
                instance,
                child,
                Some(index),
                arc.preferred_label.clone(),
                depth + 1,
                child_axis.clone(),
                path,
            );
        }
        path.remove(concept);
    }

    fn push(&mut self, node: PresentationNode) -> usize {
        let index = self.nodes.len();
        if node.kind == NodeKind::Primary {
            self.first_index.entry(node.concept.clone()).or_insert(index);
            self.labelled_index
                .entry((node.concept.clone(), node.preferred_label.clone()))
                .or_insert(index);
        }
        self.nodes.push(node);
        index
    }

    /// A flat listing of concepts, used for the uncategorized cube.
    pub fn flat<'a>(concepts: impl IntoIterator<Item = &'a QName>, instance: &Instance) -> Self {
        let mut group = Self::default();
        for concept in concepts {
            if group.first_index.contains_key(concept) {
                continue;
            }
            group.push(PresentationNode {
                concept: concept.clone(),
                depth: 0,
                parent: None,
                preferred_label: None,
                is_abstract: instance.concept(concept).is_some_and(|c| c.is_abstract),
                kind: NodeKind::Primary,
                axis: None,
            });
        }
        group
    }

    pub fn contains_primary(&self, concept: &QName) -> bool {
        self.first_index.contains_key(concept)
    }

    /// Row order of a primary concept shown under `preferred_label`.
    pub fn primary_rank(&self, concept: &QName, preferred_label: Option<&str>) -> Option<usize> {
        if let Some(&i) = self
            .labelled_index
            .get(&(concept.clone(), preferred_label.map(str::to_string)))
        {
            return Some(i);
        }
        // Facts that were not moved by a period label prefer a plain occurrence.
        if preferred_label.is_none() {
            if let Some(node) = self.nodes.iter().position(|n| {
                n.kind == NodeKind::Primary
                    && &n.concept == concept
                    && !is_period_label(n.preferred_label.as_deref())
            }) {
                return Some(node);
            }
        }
        self.first_index.get(concept).copied()
    }

    pub fn member_rank(&self, axis: &QName, member: &QName) -> Option<usize> {
        self.axis_members
            .get(axis)
            .and_then(|members| members.iter().position(|m| m == member))
    }

    /// Preferred labels under which a primary concept appears.
    pub fn preferred_labels(&self, concept: &QName) -> Vec<Option<&str>> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Primary && &n.concept == concept)
            .map(|n| n.preferred_label.as_deref())
            .collect()
    }

    /// Concepts shown with a period start or end label.
    pub fn period_labelled_concepts(&self) -> Vec<&QName> {
        let mut out: Vec<&QName> = Vec::new();
        for node in &self.nodes {
            if node.kind == NodeKind::Primary
                && is_period_label(node.preferred_label.as_deref())
                && !out.contains(&&node.concept)
            {
                out.push(&node.concept);
            }
        }
        out
    }

    /// Abstract primary ancestors of the node at `rank`, outermost first.
    pub fn abstract_ancestors(&self, rank: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes.get(rank).and_then(|n| n.parent);
        while let Some(index) = cursor {
            let node = &self.nodes[index];
            if node.kind == NodeKind::Primary && node.is_abstract {
                chain.push(index);
            }
            cursor = node.parent;
        }
        chain.reverse();
        chain
    }

    pub fn node(&self, index: usize) -> Option<&PresentationNode> {
        self.nodes.get(index)
    }
}
