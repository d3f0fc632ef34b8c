// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dependency analysis: topological ordering and cycle detection.
//!
//! The analyzer converts a [`Graph`] into an index-based traversal
//! structure, so cycles can be walked freely without back-references.
//! Ordering never fails on cycles; cyclic subgraphs are left to the
//! conditional processor.

use crate::graph::Graph;
use crate::node::{NodeId, SlotAccess};
use indexmap::IndexMap;

/// Visitation marker of a traversal node during one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Not reached yet
    Unvisited,
    /// On the current DFS path
    InProgress,
    /// Fully visited
    Done,
}

/// Engine-side view of a node with adjacency lists
#[derive(Debug, Clone)]
pub struct TraversalNode {
    /// Node this entry was derived from
    pub id: NodeId,
    /// Arena indices of nodes feeding this one
    pub inputs: Vec<usize>,
    /// Arena indices of nodes fed by this one
    pub outputs: Vec<usize>,
    /// Slot name when the node reads a shared slot
    reads_slot: Option<String>,
    mark: Visit,
}

/// Traversal structure for one graph snapshot
#[derive(Debug, Clone)]
pub struct GraphAnalysis {
    nodes: Vec<TraversalNode>,
    /// Writers of each shared slot, in insertion order
    slot_writers: IndexMap<String, Vec<usize>>,
}

impl GraphAnalysis {
    /// Build the traversal structure from a graph
    pub fn new(graph: &Graph) -> Self {
        let mut nodes: Vec<TraversalNode> = graph
            .nodes()
            .map(|node| TraversalNode {
                id: node.id,
                inputs: Vec::new(),
                outputs: Vec::new(),
                reads_slot: node
                    .slot
                    .as_ref()
                    .filter(|slot| slot.access == SlotAccess::Read)
                    .map(|slot| slot.name.clone()),
                mark: Visit::Unvisited,
            })
            .collect();

        for (index, node) in graph.nodes().enumerate() {
            for input in graph.input_nodes(node.id) {
                let Some(input_index) = graph.node_index(input) else {
                    continue;
                };
                nodes[index].inputs.push(input_index);
                nodes[input_index].outputs.push(index);
            }
        }

        let mut slot_writers: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (index, node) in graph.nodes().enumerate() {
            if let Some(slot) = node.slot.as_ref().filter(|slot| slot.access == SlotAccess::Write) {
                slot_writers.entry(slot.name.clone()).or_default().push(index);
            }
        }

        Self { nodes, slot_writers }
    }

    /// Number of traversal nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph was empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Traversal node at an arena index
    pub fn node(&self, index: usize) -> Option<&TraversalNode> {
        self.nodes.get(index)
    }

    /// Arena indices feeding `index`
    pub fn inputs_of(&self, index: usize) -> &[usize] {
        self.nodes.get(index).map_or(&[], |n| n.inputs.as_slice())
    }

    fn reset_marks(&mut self) {
        for node in &mut self.nodes {
            node.mark = Visit::Unvisited;
        }
    }

    /// Depth-first post-order over input adjacency.
    ///
    /// Roots are taken in insertion order. A slot reader also pulls in every
    /// writer of the same slot before it completes.
    pub fn topological_order(&mut self) -> Vec<NodeId> {
        self.reset_marks();
        let mut sorted = Vec::with_capacity(self.nodes.len());
        for index in 0..self.nodes.len() {
            if self.nodes[index].mark == Visit::Unvisited {
                self.visit(index, &mut sorted);
            }
        }
        sorted.into_iter().map(|index| self.nodes[index].id).collect()
    }

    fn visit(&mut self, index: usize, sorted: &mut Vec<usize>) {
        self.nodes[index].mark = Visit::InProgress;

        for k in 0..self.nodes[index].inputs.len() {
            let input = self.nodes[index].inputs[k];
            if self.nodes[input].mark == Visit::Unvisited {
                self.visit(input, sorted);
            }
        }

        if let Some(slot) = self.nodes[index].reads_slot.clone() {
            let writers = self.slot_writers.get(&slot).cloned().unwrap_or_default();
            for writer in writers {
                if self.nodes[writer].mark == Visit::Unvisited {
                    self.visit(writer, sorted);
                }
            }
        }

        self.nodes[index].mark = Visit::Done;
        sorted.push(index);
    }

    /// Nodes lying on some directed cycle, in insertion order.
    ///
    /// Runs the same DFS as the ordering pass with a path stack; reaching
    /// an in-progress neighbour closes a cycle, and every node whose
    /// strongly connected component holds more than one node is reported.
    pub fn find_cycles(&mut self) -> Vec<NodeId> {
        self.reset_marks();
        let count = self.nodes.len();
        let mut state = CycleSearch {
            discovery: vec![usize::MAX; count],
            low_link: vec![0; count],
            path: Vec::new(),
            next_discovery: 0,
            cyclic: vec![false; count],
        };

        for index in 0..count {
            if self.nodes[index].mark == Visit::Unvisited {
                self.strong_connect(index, &mut state);
            }
        }

        (0..count)
            .filter(|&index| state.cyclic[index])
            .map(|index| self.nodes[index].id)
            .collect()
    }

    fn strong_connect(&mut self, index: usize, state: &mut CycleSearch) {
        state.discovery[index] = state.next_discovery;
        state.low_link[index] = state.next_discovery;
        state.next_discovery += 1;
        state.path.push(index);
        self.nodes[index].mark = Visit::InProgress;

        for k in 0..self.nodes[index].outputs.len() {
            let next = self.nodes[index].outputs[k];
            match self.nodes[next].mark {
                Visit::Unvisited => {
                    self.strong_connect(next, state);
                    state.low_link[index] = state.low_link[index].min(state.low_link[next]);
                }
                Visit::InProgress => {
                    state.low_link[index] = state.low_link[index].min(state.discovery[next]);
                }
                Visit::Done => {}
            }
        }

        if state.low_link[index] == state.discovery[index] {
            let mut component = Vec::new();
            while let Some(member) = state.path.pop() {
                self.nodes[member].mark = Visit::Done;
                component.push(member);
                if member == index {
                    break;
                }
            }
            let self_loop = self.nodes[index].outputs.contains(&index);
            if component.len() > 1 || self_loop {
                for member in component {
                    state.cyclic[member] = true;
                }
            }
        }
    }
}

struct CycleSearch {
    discovery: Vec<usize>,
    low_link: Vec<usize>,
    path: Vec<usize>,
    next_discovery: usize,
    cyclic: Vec<bool>,
}
