//! Program dependence graph storage and sphere queries.
//!
//! The directed multigraph (self-loops allowed) is the authoritative view;
//! the aligner consumes a derived undirected view without self-loops that
//! shares node indices with it.

use ahash::AHashMap;
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::types::PdgVertex;

/// A program dependence graph: statement vertices plus data/control edges.
pub struct PdGraph {
    graph: DiGraph<PdgVertex, ()>,
}

impl PdGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
        }
    }

    /// Add a vertex and return its stable index.
    pub fn add_vertex(&mut self, vertex: PdgVertex) -> usize {
        self.graph.add_node(vertex).index()
    }

    /// Add a directed dependence edge; self-loops and parallel edges are kept.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        self.graph
            .add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
    }

    pub fn vertex(&self, index: usize) -> Option<&PdgVertex> {
        self.graph.node_weight(NodeIndex::new(index))
    }

    pub fn vertices(&self) -> impl Iterator<Item = (usize, &PdgVertex)> + '_ {
        self.graph
            .node_indices()
            .map(move |n| (n.index(), &self.graph[n]))
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The directed multigraph view.
    pub fn directed(&self) -> &DiGraph<PdgVertex, ()> {
        &self.graph
    }

    /// The undirected view without self-loops, sharing node indices with
    /// the directed view. Parallel edges collapse to one.
    pub fn undirected_without_loops(&self) -> UnGraph<(), ()> {
        let mut undirected =
            UnGraph::with_capacity(self.graph.node_count(), self.graph.edge_count());
        for _ in self.graph.node_indices() {
            undirected.add_node(());
        }
        for edge in self.graph.edge_references() {
            let (a, b) = (edge.source(), edge.target());
            if a != b && undirected.find_edge(a, b).is_none() {
                undirected.add_edge(a, b, ());
            }
        }
        undirected
    }

    /// Structural summary over both views.
    pub fn stats(&self) -> PdgStats {
        let undirected = self.undirected_without_loops();
        let n = undirected.node_count();
        let m = undirected.edge_count();
        let avg_degree = if n > 0 {
            (2 * m) as f64 / n as f64
        } else {
            0.0
        };
        let density = if n > 1 {
            (2 * m) as f64 / (n * (n - 1)) as f64
        } else {
            0.0
        };

        PdgStats {
            vertex_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            undirected_edge_count: m,
            avg_degree,
            density,
        }
    }
}

impl Default for PdGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural summary of a PDG.
#[derive(Debug, Clone)]
pub struct PdgStats {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub undirected_edge_count: usize,
    pub avg_degree: f64,
    pub density: f64,
}

/// Unweighted shortest-path distances from `source` to every reachable vertex.
pub(crate) fn distance_map(graph: &UnGraph<(), ()>, source: usize) -> AHashMap<usize, usize> {
    dijkstra(graph, NodeIndex::new(source), None, |_| 1usize)
        .into_iter()
        .map(|(node, dist)| (node.index(), dist))
        .collect()
}

/// Vertices at shortest-path distance exactly `radius` from `center` in a
/// precomputed distance map, in ascending index order.
pub(crate) fn sphere_at(
    distances: &AHashMap<usize, usize>,
    center: usize,
    radius: usize,
) -> Vec<usize> {
    let mut shell: Vec<usize> = distances
        .iter()
        .filter(|&(&node, &dist)| dist == radius && node != center)
        .map(|(&node, _)| node)
        .collect();
    shell.sort_unstable();
    shell
}

/// The sphere of radius `radius` around `center`: every vertex whose
/// unweighted shortest-path distance from `center` is exactly `radius`.
/// Unreachable vertices never appear; the center itself is excluded.
pub fn sphere(graph: &UnGraph<(), ()>, center: usize, radius: usize) -> Vec<usize> {
    sphere_at(&distance_map(graph, center), center, radius)
}

/// Adjacency lists of the undirected view, indexed by vertex.
pub(crate) fn neighbor_lists(graph: &UnGraph<(), ()>) -> Vec<Vec<usize>> {
    graph
        .node_indices()
        .map(|node| {
            let mut neighbors: Vec<usize> = graph.neighbors(node).map(NodeIndex::index).collect();
            neighbors.sort_unstable();
            neighbors
        })
        .collect()
}
