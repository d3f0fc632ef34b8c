// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conditional processor: a resumable stack machine.
//!
//! The work stack is seeded with the start nodes, the conditional nodes
//! without a conditional predecessor. Popping a conditional node for the
//! first time pushes it back beneath its non-conditional ancestors, so plain
//! data nodes run before it without a global re-sort. On the second pop the
//! node executes and pushes the successors selected by its branching kind.
//! Graphs without any start node fall back to the linear compute order.

use super::wait::{PendingWait, WaitId, WaitRegistry};
use super::{GraphProcessor, NodeRuntime, ProcessObserver, ProcessorEnv};
use crate::behavior::{Branching, Capability, Flow};
use crate::error::{EngineError, Result};
use crate::graph::Graph;
use crate::node::NodeId;
use std::collections::HashSet;

/// Work stack plus per-pass bookkeeping
#[derive(Debug, Default)]
struct ExecutionFrame {
    stack: Vec<usize>,
    /// Conditional nodes whose non-conditional dependencies are on the stack
    gathered: HashSet<usize>,
    /// Nodes executed as plain nodes for the rest of the pass
    skip_conditional: HashSet<usize>,
    /// Stack pops so far, checked against the step budget
    steps: u64,
}

impl ExecutionFrame {
    /// Frame whose first node to run is `seeds[0]`
    fn seeded(seeds: &[usize]) -> Self {
        Self {
            stack: seeds.iter().rev().copied().collect(),
            ..Self::default()
        }
    }

    fn push_all(&mut self, nodes: &[usize]) {
        self.stack.extend(nodes.iter().rev().copied());
    }
}

/// Stack-machine processor supporting branches, bounded loops and waits
pub struct ConditionalProcessor {
    runtime: NodeRuntime,
    order: Vec<usize>,
    start_nodes: Vec<usize>,
    frame: Option<ExecutionFrame>,
    waits: WaitRegistry,
}

impl ConditionalProcessor {
    /// Load a graph and compute its order and start nodes
    pub fn new(graph: Graph, env: ProcessorEnv) -> Result<Self> {
        let mut processor = Self {
            runtime: NodeRuntime::new(graph, env)?,
            order: Vec::new(),
            start_nodes: Vec::new(),
            frame: None,
            waits: WaitRegistry::default(),
        };
        processor.update_compute_order();
        Ok(processor)
    }

    /// Start nodes, in compute order
    pub fn start_nodes(&self) -> Vec<NodeId> {
        self.start_nodes.iter().map(|&index| self.runtime.node_id(index)).collect()
    }

    /// Waits registered by waitable nodes and not yet completed.
    ///
    /// Waits outlive the pass that registered them, so this includes waits
    /// from every earlier pass that has not been continued.
    pub fn pending_waits(&self) -> Vec<PendingWait> {
        self.waits.pending().cloned().collect()
    }

    /// Drive the continuation of every wait whose trigger has fired.
    ///
    /// Each continuation runs its own pass to completion; returns the nodes
    /// executed across all of them. Waits are taken one at a time, so when a
    /// continuation fails the fired waits after it stay pending for the next
    /// poll.
    pub fn poll_waits(&mut self) -> Result<Vec<NodeId>> {
        let mut executed = Vec::new();
        for id in self.waits.fired() {
            let Some(wait) = self.waits.take(id) else {
                continue;
            };
            executed.extend(self.drive_wait(&wait)?);
        }
        Ok(executed)
    }

    /// Fire a pending wait and drive its continuation immediately
    pub fn complete_wait(&mut self, id: WaitId) -> Result<Vec<NodeId>> {
        let wait = self.waits.take(id).ok_or(EngineError::UnknownWait(id))?;
        wait.trigger.fire();
        self.drive_wait(&wait)
    }

    /// Give the graph back, dropping the behaviors
    pub fn into_graph(self) -> Graph {
        self.runtime.graph
    }

    fn drive_wait(&mut self, wait: &PendingWait) -> Result<Vec<NodeId>> {
        let after = self.runtime.successors(wait.index, Flow::AfterWait);
        tracing::debug!("Wait {:?} on {} completed, {} node(s) to run", wait.id, wait.node, after.len());

        let mut frame = ExecutionFrame::seeded(&after);
        let mut executed = Vec::new();
        while let Some(node) = step(&mut self.runtime, &mut self.waits, &mut frame)? {
            executed.push(node);
        }
        Ok(executed)
    }
}

impl GraphProcessor for ConditionalProcessor {
    fn update_compute_order(&mut self) {
        let (order, cyclic) = self.runtime.compute_order();
        for &index in &cyclic {
            if !self.runtime.capabilities[index].is_conditional() {
                tracing::warn!(
                    "Node {} lies on a cycle outside any conditional node",
                    self.runtime.node_id(index)
                );
            }
        }

        let capabilities = &self.runtime.capabilities;
        let analysis = &self.runtime.analysis;
        self.start_nodes = order
            .iter()
            .copied()
            .filter(|&index| {
                capabilities[index].is_conditional()
                    && !analysis.inputs_of(index).iter().any(|&input| capabilities[input].is_conditional())
            })
            .collect();
        self.order = order;
    }

    fn begin(&mut self) -> Result<()> {
        self.runtime.clear_edge_slots();
        let frame = if self.start_nodes.is_empty() {
            // Plain sweep: every node runs once, conditional handling off
            let mut frame = ExecutionFrame::seeded(&self.order);
            frame.skip_conditional = self.order.iter().copied().collect();
            frame
        } else {
            ExecutionFrame::seeded(&self.start_nodes)
        };
        self.frame = Some(frame);
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<NodeId>> {
        let Some(frame) = self.frame.as_mut() else {
            return Ok(None);
        };
        match step(&mut self.runtime, &mut self.waits, frame) {
            Ok(Some(node)) => Ok(Some(node)),
            Ok(None) => {
                self.frame = None;
                Ok(None)
            }
            Err(e) => {
                self.frame = None;
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

    fn pending_wait_count(&self) -> usize {
        self.waits.len()
    }
}

/// Pop until one node has executed; `None` once the stack is empty
fn step(runtime: &mut NodeRuntime, waits: &mut WaitRegistry, frame: &mut ExecutionFrame) -> Result<Option<NodeId>> {
    while let Some(index) = frame.stack.pop() {
        frame.steps += 1;
        if let Some(max) = runtime.env.config.max_steps {
            if frame.steps > max {
                tracing::error!("Step budget of {max} exhausted, aborting pass");
                return Err(EngineError::StepBudgetExceeded(max));
            }
        }

        let capability = runtime.capabilities[index];
        if !capability.is_conditional() || frame.skip_conditional.contains(&index) {
            return runtime.execute(index).map(Some);
        }

        if !frame.gathered.contains(&index) {
            frame.gathered.insert(index);
            frame.stack.push(index);
            let dependencies = non_conditional_dependencies(runtime, index);
            frame.push_all(&dependencies);
            continue;
        }

        if capability == Capability::Branching(Branching::Loop) {
            runtime.behaviors[index].reset_loop();
        }
        let node = runtime.execute(index)?;

        match capability {
            Capability::Branching(Branching::Plain) => {
                let next = runtime.successors(index, Flow::Next);
                frame.push_all(&next);
            }
            Capability::Branching(Branching::Loop) => schedule_loop(runtime, frame, index),
            Capability::Branching(Branching::Wait) => {
                let next = runtime.successors(index, Flow::Next);
                frame.push_all(&next);
                let wait = waits.register(index, node);
                runtime.behaviors[index].begin_wait(wait.trigger.clone());
                tracing::debug!("Node {node} is waiting ({:?})", wait.id);
            }
            Capability::Conditional | Capability::None => {
                tracing::error!("Conditional node {node} not handled");
            }
        }
        frame.gathered.remove(&index);
        return Ok(Some(node));
    }
    Ok(None)
}

/// Push the completion successors once, then one body pass per iteration.
///
/// The body sits above the loop node on the stack, so each iteration runs
/// the body first and then re-executes the loop node, which advances its
/// counter.
fn schedule_loop(runtime: &mut NodeRuntime, frame: &mut ExecutionFrame, index: usize) {
    let range = runtime.behaviors[index].loop_range();
    let mut iterations = u64::try_from(range.end.saturating_sub(range.start)).unwrap_or(0);
    if let Some(max) = runtime.env.config.max_loop_iterations {
        if iterations > max {
            tracing::warn!(
                "Loop {} asks for {iterations} iterations, clamping to {max}",
                runtime.node_id(index)
            );
            iterations = max;
        }
    }

    let completed = runtime.successors(index, Flow::LoopCompleted);
    frame.push_all(&completed);

    let body = runtime.successors(index, Flow::LoopBody);
    for _ in 0..iterations {
        frame.stack.push(index);
        frame.push_all(&body);
    }
    frame.skip_conditional.insert(index);
}

/// Non-conditional ancestors of `index`, dependencies first.
///
/// The walk stops at conditional ancestors; each ancestor appears once.
fn non_conditional_dependencies(runtime: &NodeRuntime, index: usize) -> Vec<usize> {
    fn visit(runtime: &NodeRuntime, index: usize, seen: &mut HashSet<usize>, sorted: &mut Vec<usize>) {
        for &input in runtime.analysis.inputs_of(index) {
            if runtime.capabilities[input].is_conditional() || !seen.insert(input) {
                continue;
            }
            visit(runtime, input, seen, sorted);
            sorted.push(input);
        }
    }

    let mut seen = HashSet::from([index]);
    let mut sorted = Vec::new();
    visit(runtime, index, &mut seen, &mut sorted);
    sorted
}
