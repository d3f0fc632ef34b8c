// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linear processor: one sweep over the nodes in compute order.

use super::{GraphProcessor, NodeRuntime, ProcessObserver, ProcessorEnv};
use crate::error::{EngineError, Result};
use crate::graph::Graph;
use crate::node::NodeId;

/// Executes every node exactly once, ordered by compute order.
///
/// Requires an acyclic graph; branching is ignored and node failures abort
/// the pass.
pub struct LinearProcessor {
    runtime: NodeRuntime,
    order: Vec<usize>,
    cyclic: Vec<usize>,
    cursor: Option<usize>,
}

impl LinearProcessor {
    /// Load a graph and compute its order
    pub fn new(graph: Graph, env: ProcessorEnv) -> Result<Self> {
        let mut processor = Self {
            runtime: NodeRuntime::new(graph, env)?,
            order: Vec::new(),
            cyclic: Vec::new(),
            cursor: None,
        };
        processor.update_compute_order();
        Ok(processor)
    }

    /// Nodes in execution order
    pub fn order(&self) -> Vec<NodeId> {
        self.order.iter().map(|&index| self.runtime.node_id(index)).collect()
    }

    /// Give the graph back, dropping the behaviors
    pub fn into_graph(self) -> Graph {
        self.runtime.graph
    }
}

impl GraphProcessor for LinearProcessor {
    fn update_compute_order(&mut self) {
        let (order, cyclic) = self.runtime.compute_order();
        self.order = order;
        self.cyclic = cyclic;
    }

    fn begin(&mut self) -> Result<()> {
        if !self.cyclic.is_empty() {
            let nodes: Vec<NodeId> = self.cyclic.iter().map(|&index| self.runtime.node_id(index)).collect();
            tracing::error!("Linear pass refused: {} node(s) lie on a cycle", nodes.len());
            return Err(EngineError::CycleDetected { nodes });
        }
        self.runtime.clear_edge_slots();
        self.cursor = Some(0);
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<NodeId>> {
        let Some(position) = self.cursor else {
            return Ok(None);
        };
        let Some(&index) = self.order.get(position) else {
            self.cursor = None;
            return Ok(None);
        };

        self.cursor = Some(position + 1);
        match self.runtime.execute(index) {
            Ok(node) => Ok(Some(node)),
            Err(e) => {
                self.cursor = None;
                Err(e)
            }
        }
    }

    fn graph(&self) -> &Graph {
        &self.runtime.graph
    }

    fn current_node(&self) -> Option<NodeId> {
        self.runtime.current()
    }

    fn add_observer(&mut self, observer: Box<dyn ProcessObserver>) {
        self.runtime.add_observer(observer);
    }
}
