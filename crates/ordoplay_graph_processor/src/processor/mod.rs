// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph processors.
//!
//! A processor owns a graph snapshot plus one behavior per node, and turns
//! the analyzer's ordering into an executable pass. Two variants exist:
//! - [`LinearProcessor`]: a single sweep in compute order
//! - [`ConditionalProcessor`]: a stack machine with branches, loops and waits
//!
//! Both expose the pass as `begin` + repeated `advance`, which is what
//! [`StepController`](crate::step::StepController) builds on.

mod conditional;
mod linear;
mod wait;

pub use conditional::ConditionalProcessor;
pub use linear::LinearProcessor;
pub use wait::{PendingWait, WaitId, WaitTrigger};

use crate::adapter::TypeAdapterRegistry;
use crate::analysis::GraphAnalysis;
use crate::behavior::{Capability, Flow, NodeBehavior, ProcessContext};
use crate::config::{ComputeOrderMode, EngineConfig};
use crate::edge::EdgeId;
use crate::error::{EngineError, Result};
use crate::graph::Graph;
use crate::library::NodeLibrary;
use crate::node::{Node, NodeId};
use crate::port::PortValue;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Registries and configuration shared by processors
#[derive(Debug, Clone)]
pub struct ProcessorEnv {
    /// Node types and behavior factories
    pub library: Arc<NodeLibrary>,
    /// Cross-type conversions
    pub adapters: Arc<TypeAdapterRegistry>,
    /// Engine configuration
    pub config: EngineConfig,
}

impl ProcessorEnv {
    /// Create an environment from explicit parts
    pub fn new(library: Arc<NodeLibrary>, adapters: Arc<TypeAdapterRegistry>, config: EngineConfig) -> Self {
        Self {
            library,
            adapters,
            config,
        }
    }

    /// Built-in node library, default adapters and default configuration
    pub fn with_builtins() -> Self {
        Self::new(
            Arc::new(NodeLibrary::with_builtins()),
            Arc::new(TypeAdapterRegistry::with_defaults()),
            EngineConfig::default(),
        )
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

/// Receives a notification after each node is processed
pub trait ProcessObserver: Send {
    /// Called with the node that just executed
    fn node_processed(&mut self, id: NodeId, node: &Node);
}

impl<F> ProcessObserver for F
where
    F: FnMut(NodeId, &Node) + Send,
{
    fn node_processed(&mut self, id: NodeId, node: &Node) {
        self(id, node);
    }
}

/// Summary of a completed pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Executed nodes, in execution order
    pub executed: Vec<NodeId>,
    /// Waits pending on the processor when the pass ended.
    ///
    /// Counted across the whole processor, so waits left over from earlier
    /// passes that were never fired are included.
    pub pending_waits: usize,
}

/// A pluggable strategy that executes a graph
pub trait GraphProcessor {
    /// Recompute the execution order from the graph
    fn update_compute_order(&mut self);

    /// Start a new pass
    fn begin(&mut self) -> Result<()>;

    /// Execute the next node of the current pass; `None` once it is finished
    fn advance(&mut self) -> Result<Option<NodeId>>;

    /// The graph being processed
    fn graph(&self) -> &Graph;

    /// Node executed most recently
    fn current_node(&self) -> Option<NodeId>;

    /// Register an observer notified after each executed node
    fn add_observer(&mut self, observer: Box<dyn ProcessObserver>);

    /// Waits registered on this processor and not yet continued, from any pass
    fn pending_wait_count(&self) -> usize {
        0
    }

    /// Run a full pass on the calling thread
    fn run(&mut self) -> Result<RunReport> {
        self.begin()?;
        let mut executed = Vec::new();
        while let Some(node) = self.advance()? {
            executed.push(node);
        }
        Ok(RunReport {
            executed,
            pending_waits: self.pending_wait_count(),
        })
    }
}

/// Graph, behaviors and transient edge values shared by both processors
pub(crate) struct NodeRuntime {
    pub(crate) graph: Graph,
    pub(crate) analysis: GraphAnalysis,
    pub(crate) behaviors: Vec<Box<dyn NodeBehavior>>,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) env: ProcessorEnv,
    edge_slots: HashMap<EdgeId, PortValue>,
    observers: Vec<Box<dyn ProcessObserver>>,
    current: Option<NodeId>,
}

impl NodeRuntime {
    pub(crate) fn new(graph: Graph, env: ProcessorEnv) -> Result<Self> {
        let mut behaviors = Vec::with_capacity(graph.node_count());
        for node in graph.nodes() {
            let behavior = env
                .library
                .instantiate(node)
                .ok_or_else(|| EngineError::UnknownNodeType(node.node_type.clone()))?;
            behaviors.push(behavior);
        }
        let capabilities = behaviors.iter().map(|b| b.capability()).collect();

        if env.config.validate_adapters {
            env.adapters.validate();
        }

        Ok(Self {
            analysis: GraphAnalysis::new(&graph),
            graph,
            behaviors,
            capabilities,
            env,
            edge_slots: HashMap::new(),
            observers: Vec::new(),
            current: None,
        })
    }

    pub(crate) fn node_id(&self, index: usize) -> NodeId {
        self.analysis.node(index).map(|n| n.id).unwrap_or_default()
    }

    pub(crate) fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub(crate) fn add_observer(&mut self, observer: Box<dyn ProcessObserver>) {
        self.observers.push(observer);
    }

    /// Recompute the execution order; returns `(order, cyclic nodes)` as arena indices
    pub(crate) fn compute_order(&mut self) -> (Vec<usize>, Vec<usize>) {
        let cyclic_ids = match self.env.config.compute_order {
            ComputeOrderMode::DepthFirst => self.graph.update_compute_order(),
            ComputeOrderMode::Manual => self.analysis.find_cycles(),
        };

        let mut order: Vec<usize> = (0..self.graph.node_count()).collect();
        // Stable: equal compute orders keep insertion order
        order.sort_by_key(|&index| self.graph.node_at(index).map_or(0, |n| n.compute_order));

        let cyclic = cyclic_ids
            .iter()
            .filter_map(|id| self.graph.node_index(*id))
            .collect();
        (order, cyclic)
    }

    pub(crate) fn clear_edge_slots(&mut self) {
        self.edge_slots.clear();
    }

    /// Pull, process, push and notify
    pub(crate) fn execute(&mut self, index: usize) -> Result<NodeId> {
        let node_id = self.node_id(index);
        let inputs = self.pull_inputs(index);
        let Some((node, parameters)) = self.graph.node_and_parameters_mut(index) else {
            return Err(EngineError::NodeNotFound(node_id));
        };

        tracing::trace!("Processing node '{}' ({})", node.name, node_id);
        let mut ctx = ProcessContext::new(node, inputs, parameters);
        if let Err(source) = self.behaviors[index].process(&mut ctx) {
            return Err(EngineError::Process {
                node: node_id,
                name: node.name.clone(),
                source,
            });
        }
        let outputs = ctx.into_outputs();

        self.push_outputs(index, outputs);
        self.current = Some(node_id);
        if let Some(node) = self.graph.node_at(index) {
            for observer in &mut self.observers {
                observer.node_processed(node_id, node);
            }
        }
        Ok(node_id)
    }

    fn pull_inputs(&self, index: usize) -> IndexMap<String, Vec<PortValue>> {
        let mut inputs = IndexMap::new();
        let Some(node) = self.graph.node_at(index) else {
            return inputs;
        };

        for port in node.inputs.iter().filter(|p| !p.is_flow()) {
            let mut values: Vec<PortValue> = self
                .graph
                .edges_to(port.id)
                .filter_map(|edge| self.edge_slots.get(&edge.id).cloned())
                .collect();

            if let Some(pull) = self.env.library.port_io().pull_for(&node.node_type, &port.name) {
                values = pull(values.as_slice()).into_iter().collect();
            }
            if values.is_empty() {
                if let Some(default) = &port.default_value {
                    values.push(default.clone());
                }
            }
            if !values.is_empty() {
                inputs.insert(port.name.clone(), values);
            }
        }
        inputs
    }

    fn push_outputs(&mut self, index: usize, outputs: IndexMap<String, PortValue>) {
        let Some(node) = self.graph.node_at(index) else {
            return;
        };

        for (port_name, value) in outputs {
            let Some(port) = node.output_named(&port_name) else {
                tracing::warn!("Node '{}' set unknown output '{}'", node.name, port_name);
                continue;
            };
            let push = self.env.library.port_io().push_for(&node.node_type, &port.name);

            for edge in self.graph.edges_from(port.id) {
                let Some(target) = self.graph.node(edge.to_node).and_then(|n| n.port(&edge.to_port)) else {
                    continue;
                };

                let delivered = match push {
                    Some(push) => push(&value, target),
                    None => match self.env.adapters.convert(&value, target.effective_type()) {
                        Ok(converted) => Some(converted),
                        Err(e) => {
                            tracing::warn!("Edge {}.{} -> {}: {}", node.name, port.name, target.name, e);
                            None
                        }
                    },
                };

                match delivered {
                    Some(value) => {
                        self.edge_slots.insert(edge.id, value);
                    }
                    None => {
                        self.edge_slots.remove(&edge.id);
                    }
                }
            }
        }
    }

    /// Arena indices of nodes connected to the flow outputs selected for `flow`
    pub(crate) fn successors(&self, index: usize, flow: Flow) -> Vec<usize> {
        let node_id = self.node_id(index);
        let mut result = Vec::new();
        for port_name in self.behaviors[index].next_outputs(flow) {
            for target in self.graph.nodes_from_output(node_id, &port_name) {
                if let Some(target_index) = self.graph.node_index(target) {
                    if !result.contains(&target_index) {
                        result.push(target_index);
                    }
                }
            }
        }
        result
    }
}
