//! Parent-child (presentation) relationships, one tree per linkrole.
//!
//! Each linkrole's arcs are loaded into a `petgraph` `DiGraph` keyed by concept so
//! that children can be walked in arc order and descendants reached transitively.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::qname::QName;

/// A parent-child arc as exported by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationArc {
    pub linkrole: String,
    pub from: QName,
    pub to: QName,
    #[serde(default)]
    pub order: f64,
    #[serde(default)]
    pub preferred_label: Option<String>,
}

/// Arc payload kept on graph edges.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcInfo {
    pub order: f64,
    pub preferred_label: Option<String>,
}

/// The presentation tree of one linkrole.
#[derive(Debug, Clone)]
pub struct LinkroleTree {
    pub linkrole: String,
    graph: DiGraph<QName, ArcInfo>,
    nodes: HashMap<QName, NodeIndex>,
}

impl LinkroleTree {
    fn new(linkrole: String) -> Self {
        Self {
            linkrole,
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        }
    }

    fn node(&mut self, concept: &QName) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(concept) {
            return idx;
        }
        let idx = self.graph.add_node(concept.clone());
        self.nodes.insert(concept.clone(), idx);
        idx
    }

    fn add_arc(&mut self, arc: &PresentationArc) {
        let from = self.node(&arc.from);
        let to = self.node(&arc.to);
        self.graph.add_edge(
            from,
            to,
            ArcInfo {
                order: arc.order,
                preferred_label: arc.preferred_label.clone(),
            },
        );
    }

    pub fn contains(&self, concept: &QName) -> bool {
        self.nodes.contains_key(concept)
    }

    /// Concepts with no parent, in the order they were first seen.
    pub fn roots(&self) -> Vec<&QName> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// Direct children ordered by arc `order`, ties kept in load order.
    pub fn children(&self, concept: &QName) -> Vec<(&QName, &ArcInfo)> {
        let Some(&idx) = self.nodes.get(concept) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges(idx).collect();
        edges.sort_by(|a, b| {
            a.weight()
                .order
                .total_cmp(&b.weight().order)
                .then_with(|| a.id().index().cmp(&b.id().index()))
        });
        edges
            .into_iter()
            .map(|e| (&self.graph[e.target()], e.weight()))
            .collect()
    }

    pub fn has_children(&self, concept: &QName) -> bool {
        self.nodes.get(concept).is_some_and(|&idx| {
            self.graph
                .neighbors_directed(idx, Direction::Outgoing)
                .next()
                .is_some()
        })
    }

    /// Every concept reachable below `concept` (not including itself).
    pub fn descendants(&self, concept: &QName) -> Vec<&QName> {
        let Some(&start) = self.nodes.get(concept) else {
            return Vec::new();
        };
        let mut dfs = Dfs::new(&self.graph, start);
        let mut out = Vec::new();
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                out.push(&self.graph[idx]);
            }
        }
        out
    }

    /// Concepts that are the target of at least one arc.
    pub fn targets(&self) -> impl Iterator<Item = &QName> {
        self.graph.node_indices().filter_map(|idx| {
            self.graph
                .neighbors_directed(idx, Direction::Incoming)
                .next()
                .map(|_| &self.graph[idx])
        })
    }

    pub fn concepts(&self) -> impl Iterator<Item = &QName> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }
}

/// All presentation trees of an instance.
#[derive(Debug, Clone, Default)]
pub struct PresentationNetwork {
    trees: Vec<LinkroleTree>,
    by_role: HashMap<String, usize>,
}

impl PresentationNetwork {
    pub fn from_arcs(arcs: &[PresentationArc]) -> Self {
        let mut network = Self::default();
        for arc in arcs {
            let slot = match network.by_role.get(&arc.linkrole) {
                Some(&slot) => slot,
                None => {
                    network.trees.push(LinkroleTree::new(arc.linkrole.clone()));
                    let slot = network.trees.len() - 1;
                    network.by_role.insert(arc.linkrole.clone(), slot);
                    slot
                }
            };
            network.trees[slot].add_arc(arc);
        }
        network
    }

    /// Linkroles in order of first appearance.
    pub fn linkroles(&self) -> impl Iterator<Item = &str> {
        self.trees.iter().map(|t| t.linkrole.as_str())
    }

    pub fn tree(&self, linkrole: &str) -> Option<&LinkroleTree> {
        self.by_role.get(linkrole).map(|&slot| &self.trees[slot])
    }

    pub fn trees(&self) -> impl Iterator<Item = &LinkroleTree> {
        self.trees.iter()
    }
}
