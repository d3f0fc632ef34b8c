// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of node types and the behaviors that execute them.

use crate::behavior::NodeBehavior;
use crate::node::{Node, NodeCategory, NodeType};
use crate::port_io::CustomPortIo;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Creates the behavior for one node instance
pub type BehaviorFactory = Arc<dyn Fn(&Node) -> Box<dyn NodeBehavior> + Send + Sync>;

/// Registry of available node types
#[derive(Clone, Default)]
pub struct NodeLibrary {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
    /// Behavior factories by type ID
    factories: IndexMap<String, BehaviorFactory>,
    /// Custom port I/O, keyed by type ID and port name
    port_io: CustomPortIo,
}

impl NodeLibrary {
    /// Create a new empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library holding the built-in node types
    pub fn with_builtins() -> Self {
        let mut library = Self::new();
        crate::nodes::register_builtins(&mut library);
        library
    }

    /// Register a node type and its behavior factory
    pub fn register<F>(&mut self, node_type: NodeType, factory: F)
    where
        F: Fn(&Node) -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    {
        if self.types.contains_key(&node_type.id) {
            tracing::debug!("Replacing node type '{}'", node_type.id);
        }
        self.factories.insert(node_type.id.clone(), Arc::new(factory));
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(Node::new)
    }

    /// Instantiate the behavior for a node
    pub fn instantiate(&self, node: &Node) -> Option<Box<dyn NodeBehavior>> {
        self.factories.get(&node.node_type).map(|factory| factory(node))
    }

    /// Custom port I/O table
    pub fn port_io(&self) -> &CustomPortIo {
        &self.port_io
    }

    /// Mutable custom port I/O table, for registration at startup
    pub fn port_io_mut(&mut self) -> &mut CustomPortIo {
        &mut self.port_io
    }
}

impl fmt::Debug for NodeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeLibrary")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("port_io", &self.port_io)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let library = NodeLibrary::with_builtins();
        for id in ["start", "branch", "for_loop", "wait", "constant", "get_parameter", "set_parameter"] {
            assert!(library.get(id).is_some(), "missing {id}");
        }
        assert!(library.types_in_category(NodeCategory::Flow).count() >= 4);
    }

    #[test]
    fn test_create_and_instantiate() {
        let library = NodeLibrary::with_builtins();
        let node = library.create_node("branch").unwrap();
        assert!(library.instantiate(&node).is_some());

        let mut unknown = node.clone();
        unknown.node_type = "missing".to_string();
        assert!(library.instantiate(&unknown).is_none());
        assert!(library.create_node("missing").is_none());
    }
}
