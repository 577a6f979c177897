//! Lineage graph builder

use crate::diagnostics::{DropReason, DroppedEdge};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use um_core::{Edge, GlobalId, Node};

/// The unified, deduplicated lineage graph
///
/// Edges keep the position at which their pair was first seen; a later
/// edge for the same pair can only raise the origin's priority.
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    nodes: Vec<Node>,
    node_map: HashMap<GlobalId, NodeIndex>,
    graph: DiGraph<usize, usize>,
    edges: Vec<Edge>,
}

impl LineageGraph {
    /// Build a graph, dropping self-loops and edges to unknown nodes.
    pub fn build(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self::build_with_report(nodes, edges).0
    }

    /// Build a graph and report every edge that was refused.
    pub fn build_with_report(nodes: Vec<Node>, edges: Vec<Edge>) -> (Self, Vec<DroppedEdge>) {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::with_capacity(nodes.len());
        let mut kept_nodes = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node_map.contains_key(&node.global_id) {
                log::warn!("Dropping second node with id '{}'", node.global_id);
                continue;
            }
            let idx = graph.add_node(kept_nodes.len());
            node_map.insert(node.global_id.clone(), idx);
            kept_nodes.push(node);
        }

        let mut kept_edges: Vec<Edge> = Vec::new();
        let mut positions: HashMap<(GlobalId, GlobalId), usize> = HashMap::new();
        let mut dropped = Vec::new();

        for edge in edges {
            if edge.source == edge.target {
                log::debug!("Dropping self-loop on '{}'", edge.source);
                dropped.push(DroppedEdge {
                    edge,
                    reason: DropReason::SelfLoop,
                });
                continue;
            }
            let (Some(&from), Some(&to)) =
                (node_map.get(&edge.source), node_map.get(&edge.target))
            else {
                log::warn!(
                    "Dropping edge {} -> {} ({}): endpoint not in graph",
                    edge.source,
                    edge.target,
                    edge.origin
                );
                dropped.push(DroppedEdge {
                    edge,
                    reason: DropReason::UnknownEndpoint,
                });
                continue;
            };

            let key = (edge.source.clone(), edge.target.clone());
            if let Some(&pos) = positions.get(&key) {
                let existing = &mut kept_edges[pos];
                if edge.origin.priority() > existing.origin.priority() {
                    existing.origin = edge.origin;
                }
                continue;
            }
            positions.insert(key, kept_edges.len());
            graph.add_edge(from, to, kept_edges.len());
            kept_edges.push(edge);
        }

        (
            Self {
                nodes: kept_nodes,
                node_map,
                graph,
                edges: kept_edges,
            },
            dropped,
        )
    }

    /// All nodes in build order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in first-seen order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Look up a node by global id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_map.get(id).map(|&idx| &self.nodes[self.graph[idx]])
    }

    /// Mutable node lookup
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let pos = self.graph[*self.node_map.get(id)?];
        self.nodes.get_mut(pos)
    }

    fn neighbours(&self, id: &str, direction: Direction) -> Vec<&Node> {
        let Some(&idx) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut hits: Vec<(usize, usize)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                (*e.weight(), self.graph[other])
            })
            .collect();
        hits.sort_by_key(|&(edge_pos, _)| edge_pos);
        hits.into_iter().map(|(_, node)| &self.nodes[node]).collect()
    }

    /// Direct upstream nodes (what `id` is derived from), in edge order
    pub fn upstream(&self, id: &str) -> Vec<&Node> {
        self.neighbours(id, Direction::Incoming)
    }

    /// Direct downstream nodes (what is derived from `id`), in edge order
    pub fn downstream(&self, id: &str) -> Vec<&Node> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Strongly connected components with more than one node.
    ///
    /// Members of each cycle are sorted, and cycles are sorted by their
    /// first member.
    pub fn cycles(&self) -> Vec<Vec<GlobalId>> {
        let mut cycles: Vec<Vec<GlobalId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut ids: Vec<GlobalId> = component
                    .into_iter()
                    .map(|idx| self.nodes[self.graph[idx]].global_id.clone())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
