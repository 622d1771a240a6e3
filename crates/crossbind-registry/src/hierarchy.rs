//! Supertype graph of bound native types.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: native type hashes
//! - Edges: `Superclass` and `Interface`, pointing from subtype to supertype
//!
//! Edges are recorded as proxy types are bound, so assignability queries only
//! see types the engine has actually touched.

use crossbind_core::{TypeHash, TypeHierarchy};
use parking_lot::RwLock;
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

/// Edge types in the hierarchy graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperEdge {
    Superclass,
    Interface,
}

#[derive(Debug, Default)]
struct Graph {
    graph: DiGraph<TypeHash, SuperEdge>,
    nodes: FxHashMap<TypeHash, NodeIndex>,
}

impl Graph {
    fn node(&mut self, hash: TypeHash) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&hash) {
            return idx;
        }
        let idx = self.graph.add_node(hash);
        self.nodes.insert(hash, idx);
        idx
    }
}

/// Thread-safe supertype graph.
#[derive(Debug, Default)]
pub struct TypeGraph {
    inner: RwLock<Graph>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `sub` directly extends or implements `sup`.
    pub fn add_edge(&self, sub: TypeHash, sup: TypeHash, kind: SuperEdge) {
        let mut inner = self.inner.write();
        let from = inner.node(sub);
        let to = inner.node(sup);
        if inner.graph.find_edge(from, to).is_none() {
            inner.graph.add_edge(from, to, kind);
        }
    }

    /// Make `hash` known even if it has no supertypes.
    pub fn add_type(&self, hash: TypeHash) {
        self.inner.write().node(hash);
    }
}

impl TypeHierarchy for TypeGraph {
    fn distance(&self, from: TypeHash, to: TypeHash) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let inner = self.inner.read();
        let start = *inner.nodes.get(&from)?;
        let goal = *inner.nodes.get(&to)?;
        dijkstra(&inner.graph, start, Some(goal), |_| 1u32)
            .get(&goal)
            .copied()
    }
}
