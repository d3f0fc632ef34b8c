// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node behaviors: the executable side of a node.
//!
//! A behavior is instantiated once per node when a processor loads a graph.
//! Its [`Capability`] is read at that point and drives how the conditional
//! processor schedules the node for the rest of its life.

use crate::error::ProcessError;
use crate::node::Node;
use crate::port::{PortType, PortValue};
use crate::processor::WaitTrigger;
use indexmap::IndexMap;
use std::ops::Range;

/// How a branching node selects its successors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branching {
    /// Single successor set chosen at runtime (if, switch, sequence)
    Plain,
    /// Bounded loop with a body and a completion successor set
    Loop,
    /// Continuation deferred until an external event fires
    Wait,
}

/// Capability descriptor supplied by a behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Plain data node, executed when reached or gathered as a dependency
    None,
    /// Conditional node without a branching kind the engine knows
    Conditional,
    /// Conditional node with a known branching kind
    Branching(Branching),
}

impl Capability {
    /// Whether the node takes part in conditional scheduling
    pub fn is_conditional(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Successor set queried from a conditional node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Nodes to execute right after this one
    Next,
    /// Loop body, executed once per iteration
    LoopBody,
    /// Executed once after the last iteration
    LoopCompleted,
    /// Executed when a wait completes
    AfterWait,
}

/// Executable behavior of a node
pub trait NodeBehavior: Send {
    /// Capability descriptor, read once at load time
    fn capability(&self) -> Capability {
        Capability::None
    }

    /// Execute the node
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError>;

    /// Names of the flow output ports whose targets run for `flow`
    fn next_outputs(&self, _flow: Flow) -> Vec<String> {
        Vec::new()
    }

    /// Iteration range of a loop node, valid after it has been processed
    fn loop_range(&self) -> Range<i64> {
        0..0
    }

    /// Restart the loop counter; called before a loop node's first execution
    fn reset_loop(&mut self) {}

    /// Hand a waitable node the trigger that completes its wait
    fn begin_wait(&mut self, _trigger: WaitTrigger) {}
}

/// Values and state available to a node while it executes
pub struct ProcessContext<'a> {
    node: &'a Node,
    inputs: IndexMap<String, Vec<PortValue>>,
    outputs: IndexMap<String, PortValue>,
    parameters: &'a mut IndexMap<String, PortValue>,
}

impl<'a> ProcessContext<'a> {
    /// Create a context over pulled input values
    pub fn new(
        node: &'a Node,
        inputs: IndexMap<String, Vec<PortValue>>,
        parameters: &'a mut IndexMap<String, PortValue>,
    ) -> Self {
        Self {
            node,
            inputs,
            outputs: IndexMap::new(),
            parameters,
        }
    }

    /// The node being executed
    pub fn node(&self) -> &Node {
        self.node
    }

    /// First value delivered to an input port, or its default
    pub fn input(&self, port: &str) -> Option<&PortValue> {
        self.inputs.get(port).and_then(|values| values.first())
    }

    /// Every value delivered to a multi-connection input port
    pub fn inputs(&self, port: &str) -> &[PortValue] {
        self.inputs.get(port).map_or(&[], Vec::as_slice)
    }

    /// Input value that must be present
    pub fn require(&self, port: &str) -> Result<&PortValue, ProcessError> {
        self.input(port).ok_or_else(|| ProcessError::MissingInput(port.to_string()))
    }

    /// Boolean input, falling back to `default` when absent
    pub fn bool_input(&self, port: &str, default: bool) -> Result<bool, ProcessError> {
        match self.input(port) {
            None => Ok(default),
            Some(value) => value.as_bool().ok_or_else(|| mismatch(port, PortType::Bool, value)),
        }
    }

    /// Integer input, falling back to `default` when absent
    pub fn int_input(&self, port: &str, default: i64) -> Result<i64, ProcessError> {
        match self.input(port) {
            None => Ok(default),
            Some(value) => value.as_int().ok_or_else(|| mismatch(port, PortType::Int, value)),
        }
    }

    /// Numeric input, falling back to `default` when absent
    pub fn float_input(&self, port: &str, default: f64) -> Result<f64, ProcessError> {
        match self.input(port) {
            None => Ok(default),
            Some(value) => value.as_float().ok_or_else(|| mismatch(port, PortType::Float, value)),
        }
    }

    /// Set an output value, pushed along the port's edges after execution
    pub fn set_output(&mut self, port: impl Into<String>, value: PortValue) {
        self.outputs.insert(port.into(), value);
    }

    /// Per-instance setting of the node
    pub fn setting(&self, key: &str) -> Option<&PortValue> {
        self.node.setting(key)
    }

    /// Read an exposed parameter
    pub fn parameter(&self, name: &str) -> Option<&PortValue> {
        self.parameters.get(name)
    }

    /// Write an exposed parameter; returns `false` if it is not declared
    pub fn set_parameter(&mut self, name: &str, value: PortValue) -> bool {
        match self.parameters.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Output values set during execution
    pub fn into_outputs(self) -> IndexMap<String, PortValue> {
        self.outputs
    }
}

fn mismatch(port: &str, expected: PortType, found: &PortValue) -> ProcessError {
    ProcessError::TypeMismatch {
        port: port.to_string(),
        expected,
        found: found.port_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeCategory, NodeType};

    fn empty_node() -> Node {
        Node::new(&NodeType {
            id: "probe".to_string(),
            name: "Probe".to_string(),
            category: NodeCategory::Utility,
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        })
    }

    #[test]
    fn test_typed_inputs() {
        let node = empty_node();
        let mut parameters = IndexMap::new();
        let mut inputs = IndexMap::new();
        inputs.insert("Flag".to_string(), vec![PortValue::Bool(true)]);
        inputs.insert("Count".to_string(), vec![PortValue::String("x".into())]);
        let ctx = ProcessContext::new(&node, inputs, &mut parameters);

        assert!(ctx.bool_input("Flag", false).unwrap());
        assert_eq!(ctx.int_input("Missing", 7).unwrap(), 7);
        assert!(matches!(ctx.int_input("Count", 0), Err(ProcessError::TypeMismatch { .. })));
        assert!(matches!(ctx.require("Missing"), Err(ProcessError::MissingInput(_))));
    }

    #[test]
    fn test_parameters_must_be_declared() {
        let node = empty_node();
        let mut parameters = IndexMap::new();
        parameters.insert("score".to_string(), PortValue::Int(0));
        let mut ctx = ProcessContext::new(&node, IndexMap::new(), &mut parameters);

        assert!(ctx.set_parameter("score", PortValue::Int(5)));
        assert!(!ctx.set_parameter("health", PortValue::Int(5)));
        assert_eq!(ctx.parameter("score"), Some(&PortValue::Int(5)));
    }

    #[test]
    fn test_capability() {
        assert!(!Capability::None.is_conditional());
        assert!(Capability::Conditional.is_conditional());
        assert!(Capability::Branching(Branching::Loop).is_conditional());
    }
}
