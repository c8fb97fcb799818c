//! Record dependency graph
//!
//! Builds a directed graph of "record A references record B" edges and runs
//! cycle detection over it. Every record on a cycle, and every record holding
//! a dynamic-typed field, is marked `may_recurse`: its generated codec must
//! carry a runtime identity-set guard. A false negative here is a latent
//! stack-overflow defect in generated code, so classification is
//! conservative.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{Location, ModuleSet};

use super::diagnostics::Diagnostics;
use super::resolve::{CanonicalKind, Resolver};

/// How one record references another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Plain field reference
    Plain,
    /// Through a pointer
    Pointer,
    /// Through a variable-length array (slice or slice-of-pointer)
    Slice,
    /// Through a fixed-length array
    FixedArray,
}

impl EdgeKind {
    fn from_shape(shape: crate::model::TypeShape) -> Self {
        use crate::model::TypeShape;
        match shape {
            TypeShape::Plain => EdgeKind::Plain,
            TypeShape::Pointer => EdgeKind::Pointer,
            TypeShape::Slice | TypeShape::SliceOfPointer => EdgeKind::Slice,
            TypeShape::Array(_) => EdgeKind::FixedArray,
        }
    }
}

/// The record reference graph with per-record recursion flags
pub struct DependencyGraph {
    graph: DiGraph<String, EdgeKind>,
    node_indices: HashMap<String, NodeIndex>,
    /// Owning module per record, for diagnostic locations
    record_modules: HashMap<String, String>,
    may_recurse: HashMap<String, bool>,
    cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph from every record in the module set.
    ///
    /// An edge is added whenever a non-excluded field resolves to
    /// `Record(target)` for a target declared in the set, through any shape
    /// wrapper. A record with a dynamic-typed field is flagged immediately:
    /// its runtime contents are unknown at analysis time, so it is treated
    /// as an implicit self-reference.
    pub fn build(
        modules: &ModuleSet,
        resolver: &mut Resolver<'_>,
        diags: &mut Diagnostics,
    ) -> Self {
        let mut record_names: Vec<&str> = modules.records().map(|(_, r)| r.name()).collect();
        record_names.sort_unstable();

        let mut graph = DiGraph::with_capacity(record_names.len(), record_names.len() * 2);
        let mut node_indices = HashMap::with_capacity(record_names.len());
        let mut may_recurse: HashMap<String, bool> = HashMap::with_capacity(record_names.len());

        for name in &record_names {
            let idx = graph.add_node(name.to_string());
            node_indices.insert(name.to_string(), idx);
            may_recurse.insert(name.to_string(), false);
        }

        let mut record_modules = HashMap::with_capacity(record_names.len());
        for (module, record) in modules.records() {
            record_modules.insert(record.name().to_string(), module.name.clone());
            let from = node_indices[record.name()];
            for field in record.fields() {
                if field.annotations.excluded {
                    continue;
                }
                let resolved = resolver.resolve_ref(&field.ty, &module.name, diags);
                match &resolved.kind {
                    CanonicalKind::Dynamic => {
                        may_recurse.insert(record.name().to_string(), true);
                    }
                    CanonicalKind::Record(target) => {
                        if let Some(&to) = node_indices.get(target.as_str()) {
                            graph.add_edge(from, to, EdgeKind::from_shape(field.ty.shape));
                        }
                    }
                    _ => {}
                }
            }
        }

        tracing::debug!(
            records = graph.node_count(),
            edges = graph.edge_count(),
            "dependency graph built"
        );

        Self {
            graph,
            node_indices,
            record_modules,
            may_recurse,
            cycles: Vec::new(),
        }
    }

    /// Find all reference cycles with a depth-first search over the graph.
    ///
    /// The search keeps an explicit recursion stack; a back-edge to a node
    /// still on the stack yields the cycle as the stack sub-path from that
    /// node to the current one plus the closing edge. Every node on a
    /// detected cycle is marked `may_recurse`.
    pub fn detect_cycles(&mut self, diags: &mut Diagnostics) -> Vec<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Grey,
            Black,
        }

        let mut colors = vec![Color::White; self.graph.node_count()];
        let mut cycles: Vec<Vec<String>> = Vec::new();

        // Roots in sorted name order so cycle reporting is stable.
        let mut roots: Vec<(&String, NodeIndex)> =
            self.node_indices.iter().map(|(n, &i)| (n, i)).collect();
        roots.sort_unstable_by_key(|(name, _)| name.as_str());

        for (_, root) in roots {
            if colors[root.index()] != Color::White {
                continue;
            }
            // stack entry: (node, iterator position over sorted successors)
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
            colors[root.index()] = Color::Grey;
            stack.push((root, self.sorted_successors(root), 0));

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                if frame.2 >= frame.1.len() {
                    colors[node.index()] = Color::Black;
                    stack.pop();
                    continue;
                }
                let next = frame.1[frame.2];
                frame.2 += 1;

                match colors[next.index()] {
                    Color::White => {
                        colors[next.index()] = Color::Grey;
                        let succs = self.sorted_successors(next);
                        stack.push((next, succs, 0));
                    }
                    Color::Grey => {
                        // Back-edge: extract the sub-path from `next` to the
                        // top of the stack, plus the closing edge.
                        let start = stack
                            .iter()
                            .position(|(n, _, _)| *n == next)
                            .unwrap_or(0);
                        let mut path: Vec<String> = stack[start..]
                            .iter()
                            .map(|(n, _, _)| self.graph[*n].clone())
                            .collect();
                        path.push(self.graph[next].clone());
                        for name in &path {
                            self.may_recurse.insert(name.clone(), true);
                        }
                        cycles.push(path);
                    }
                    Color::Black => {}
                }
            }
        }

        for cycle in &cycles {
            let head = cycle.first().cloned().unwrap_or_default();
            let module = self
                .record_modules
                .get(&head)
                .cloned()
                .unwrap_or_default();
            diags.reference_cycle(Location::new(module, head), cycle);
        }

        tracing::debug!(cycles = cycles.len(), "cycle detection finished");
        self.cycles = cycles.clone();
        cycles
    }

    fn sorted_successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut succs: Vec<NodeIndex> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        succs.sort_unstable_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        succs.dedup();
        succs
    }

    /// Whether the named record's codec needs a runtime recursion guard
    pub fn may_recurse(&self, record: &str) -> bool {
        self.may_recurse.get(record).copied().unwrap_or(false)
    }

    /// All detected cycles, in stable order
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    /// Immediate record dependencies of a record
    pub fn refs_out(&self, record: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(record) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| self.graph[e.target()].as_str())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
