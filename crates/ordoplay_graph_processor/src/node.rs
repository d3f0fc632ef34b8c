// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph snapshot.

use crate::port::{Port, PortId, PortValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Compute order assigned to nodes that sit on a cycle
pub const INVALID_COMPUTE_ORDER: i32 = -1;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Execution flow control (start, branch, loop, wait)
    Flow,
    /// Constants and data producers
    Data,
    /// Math operations
    Math,
    /// Comparisons and boolean logic
    Logic,
    /// Exposed parameter access
    Parameter,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    Custom,
}

/// Whether a parameter node reads or writes its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotAccess {
    /// Reads the slot value
    Read,
    /// Writes the slot value
    Write,
}

/// Reference from a node to a named shared slot (an exposed parameter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSlot {
    /// Parameter name
    pub name: String,
    /// Access kind
    pub access: SlotAccess,
}

impl SharedSlot {
    /// Read access to a named slot
    pub fn read(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: SlotAccess::Read,
        }
    }

    /// Write access to a named slot
    pub fn write(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: SlotAccess::Write,
        }
    }
}

/// Node type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Default input ports
    pub inputs: Vec<Port>,
    /// Default output ports
    pub outputs: Vec<Port>,
}

/// A node instance in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type ID, used to look up the behavior
    pub node_type: String,
    /// Display name
    pub name: String,
    /// Ordering hint; ties keep insertion order
    #[serde(default)]
    pub compute_order: i32,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Per-instance settings (constant values, default loop bounds, ...)
    #[serde(default)]
    pub settings: IndexMap<String, PortValue>,
    /// Shared slot accessed by parameter nodes
    #[serde(default)]
    pub slot: Option<SharedSlot>,
}

impl Node {
    /// Create a new node from a type definition
    pub fn new(node_type: &NodeType) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.id.clone(),
            name: node_type.name.clone(),
            compute_order: 0,
            inputs: node_type.inputs.iter().map(Port::instantiate).collect(),
            outputs: node_type.outputs.iter().map(Port::instantiate).collect(),
            settings: IndexMap::new(),
            slot: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the compute order
    pub fn with_compute_order(mut self, order: i32) -> Self {
        self.compute_order = order;
        self
    }

    /// Set a per-instance setting
    pub fn with_setting(mut self, key: impl Into<String>, value: PortValue) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Bind the node to a shared slot
    pub fn with_slot(mut self, slot: SharedSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Get an input port by name
    pub fn input_named(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port by name
    pub fn output_named(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.inputs
            .iter()
            .find(|p| p.id == *port_id)
            .or_else(|| self.outputs.iter().find(|p| p.id == *port_id))
    }

    /// Get a setting value
    pub fn setting(&self, key: &str) -> Option<&PortValue> {
        self.settings.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortType;

    fn sample_type() -> NodeType {
        NodeType {
            id: "add".to_string(),
            name: "Add".to_string(),
            category: NodeCategory::Math,
            description: "Add two values".to_string(),
            inputs: vec![Port::input("A", PortType::Float), Port::input("B", PortType::Float)],
            outputs: vec![Port::output("Result", PortType::Float)],
        }
    }

    #[test]
    fn test_instances_do_not_share_port_ids() {
        let node_type = sample_type();
        let a = Node::new(&node_type);
        let b = Node::new(&node_type);
        assert_ne!(a.id, b.id);
        assert_ne!(a.inputs[0].id, b.inputs[0].id);
        assert_eq!(a.node_type, "add");
    }

    #[test]
    fn test_port_lookup() {
        let node = Node::new(&sample_type());
        let result = node.output_named("Result").unwrap();
        assert_eq!(node.port(&result.id).unwrap().name, "Result");
        assert!(node.input_named("C").is_none());
    }
}
