// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph snapshot containing nodes, edges and exposed parameters.
//!
//! Nodes live in an insertion-ordered arena; the engine refers to them by
//! their arena index during a run and by [`NodeId`] everywhere else.

use crate::adapter::TypeAdapterRegistry;
use crate::analysis::GraphAnalysis;
use crate::edge::{Edge, EdgeId};
use crate::error::{EngineError, Result};
use crate::node::{Node, NodeId, INVALID_COMPUTE_ORDER};
use crate::port::{PortId, PortValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Current graph snapshot format version
pub const GRAPH_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    GRAPH_FORMAT_VERSION
}

/// A node graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Snapshot format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Edges between nodes
    edges: IndexMap<EdgeId, Edge>,
    /// Exposed parameters, the named slots shared by parameter nodes
    #[serde(default)]
    parameters: IndexMap<String, PortValue>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: GRAPH_FORMAT_VERSION,
            name: name.into(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            parameters: IndexMap::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and its edges
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.edges.retain(|_, e| !e.involves_node(node_id));
        // Keep insertion order of the remaining nodes
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Arena index of a node
    pub fn node_index(&self, node_id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&node_id)
    }

    /// Node at an arena index
    pub fn node_at(&self, index: usize) -> Option<&Node> {
        self.nodes.get_index(index).map(|(_, node)| node)
    }

    /// Node at an arena index together with the parameter table
    pub(crate) fn node_and_parameters_mut(
        &mut self,
        index: usize,
    ) -> Option<(&Node, &mut IndexMap<String, PortValue>)> {
        let (_, node) = self.nodes.get_index(index)?;
        Some((node, &mut self.parameters))
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add an edge between two ports.
    ///
    /// When `adapters` is given, the port types must be assignable through it.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
        adapters: Option<&TypeAdapterRegistry>,
    ) -> std::result::Result<EdgeId, ConnectionError> {
        let edge = Edge::new(from_node, from_port, to_node, to_port);
        let (source_port, target_port) = edge.resolve(self.nodes.get(&from_node), self.nodes.get(&to_node))?;

        let from_type = source_port.effective_type();
        let to_type = target_port.effective_type();
        let compatible = match adapters {
            Some(adapters) => adapters.are_assignable(from_type, to_type),
            None => from_type.is_flow() == to_type.is_flow(),
        };
        if !compatible {
            return Err(ConnectionError::IncompatiblePorts);
        }

        if !target_port.multi_connect && self.edges.values().any(|e| e.to_port == to_port) {
            return Err(ConnectionError::PortAlreadyConnected(to_port));
        }

        let id = edge.id;
        self.edges.insert(id, edge);
        Ok(id)
    }

    /// Add an edge between two ports identified by name
    pub fn connect_by_name(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
        adapters: Option<&TypeAdapterRegistry>,
    ) -> std::result::Result<EdgeId, ConnectionError> {
        let source = self.nodes.get(&from_node).ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target = self.nodes.get(&to_node).ok_or(ConnectionError::NodeNotFound(to_node))?;
        let from_port = source
            .output_named(from_port)
            .ok_or_else(|| ConnectionError::PortNameNotFound(from_port.to_string()))?
            .id;
        let to_port = target
            .input_named(to_port)
            .ok_or_else(|| ConnectionError::PortNameNotFound(to_port.to_string()))?
            .id;
        self.connect(from_node, from_port, to_node, to_port, adapters)
    }

    /// Remove an edge
    pub fn disconnect(&mut self, edge_id: EdgeId) -> Option<Edge> {
        self.edges.shift_remove(&edge_id)
    }

    /// Get an edge by ID
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Get edges leaving a specific port
    pub fn edges_from(&self, port_id: PortId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.from_port == port_id)
    }

    /// Get edges entering a specific port
    pub fn edges_to(&self, port_id: PortId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.to_port == port_id)
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes feeding `node_id`, ordered by input port then edge insertion
    pub fn input_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        let mut result = Vec::new();
        for port in &node.inputs {
            for edge in self.edges_to(port.id) {
                if !result.contains(&edge.from_node) {
                    result.push(edge.from_node);
                }
            }
        }
        result
    }

    /// Nodes fed by `node_id`, ordered by output port then edge insertion
    pub fn output_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        let mut result = Vec::new();
        for port in &node.outputs {
            for edge in self.edges_from(port.id) {
                if !result.contains(&edge.to_node) {
                    result.push(edge.to_node);
                }
            }
        }
        result
    }

    /// Nodes connected to a named output port
    pub fn nodes_from_output(&self, node_id: NodeId, port_name: &str) -> Vec<NodeId> {
        let Some(port) = self.nodes.get(&node_id).and_then(|n| n.output_named(port_name)) else {
            return Vec::new();
        };
        let mut result = Vec::new();
        for edge in self.edges_from(port.id) {
            if !result.contains(&edge.to_node) {
                result.push(edge.to_node);
            }
        }
        result
    }

    /// Exposed parameters
    pub fn parameters(&self) -> &IndexMap<String, PortValue> {
        &self.parameters
    }

    /// Get a parameter value
    pub fn parameter(&self, name: &str) -> Option<&PortValue> {
        self.parameters.get(name)
    }

    /// Declare or overwrite a parameter
    pub fn set_parameter(&mut self, name: impl Into<String>, value: PortValue) {
        self.parameters.insert(name.into(), value);
    }

    /// Rewrite every node's compute order from a depth-first topological sort.
    ///
    /// Nodes lying on a cycle get [`INVALID_COMPUTE_ORDER`]. Returns the
    /// cyclic nodes.
    pub fn update_compute_order(&mut self) -> Vec<NodeId> {
        let mut analysis = GraphAnalysis::new(self);
        let order = analysis.topological_order();
        let cyclic = analysis.find_cycles();

        for (position, node_id) in order.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(node_id) {
                node.compute_order = i32::try_from(position).unwrap_or(i32::MAX);
            }
        }
        for node_id in &cyclic {
            if let Some(node) = self.nodes.get_mut(node_id) {
                node.compute_order = INVALID_COMPUTE_ORDER;
            }
        }

        cyclic
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> std::result::Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format.
    ///
    /// Every edge is checked the way [`Graph::connect`] checks a new one,
    /// without an adapter registry, so a hand-edited snapshot cannot smuggle
    /// in edges the graph would have refused.
    pub fn from_ron(s: &str) -> Result<Self> {
        let graph: Graph = ron::from_str(s)?;
        if graph.version > GRAPH_FORMAT_VERSION {
            return Err(EngineError::UnsupportedVersion {
                found: graph.version,
                supported: GRAPH_FORMAT_VERSION,
            });
        }
        graph.validate_edges()?;
        Ok(graph)
    }

    /// Check every edge against the nodes and ports it names
    pub fn validate_edges(&self) -> Result<()> {
        let mut single_inputs = HashSet::new();
        for (&id, edge) in &self.edges {
            if let Err(source) = self.check_edge(id, edge, &mut single_inputs) {
                tracing::warn!("Rejecting edge {:?} of graph '{}': {source}", id, self.name);
                return Err(EngineError::InvalidEdge { edge: id, source });
            }
        }
        Ok(())
    }

    fn check_edge(
        &self,
        id: EdgeId,
        edge: &Edge,
        single_inputs: &mut HashSet<PortId>,
    ) -> std::result::Result<(), ConnectionError> {
        if edge.id != id {
            return Err(ConnectionError::IdMismatch(edge.id));
        }
        let (from, to) = edge.resolve(self.nodes.get(&edge.from_node), self.nodes.get(&edge.to_node))?;
        if from.is_flow() != to.is_flow() {
            return Err(ConnectionError::IncompatiblePorts);
        }
        if !to.multi_connect && !single_inputs.insert(edge.to_port) {
            return Err(ConnectionError::PortAlreadyConnected(edge.to_port));
        }
        Ok(())
    }

    /// Load a graph snapshot from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save a graph snapshot to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_ron()?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating an edge
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// No port with this name on the node
    #[error("Port not found: '{0}'")]
    PortNameNotFound(String),

    /// Edge must run from an output to an input
    #[error("Edges must connect an output port to an input port")]
    WrongDirection,

    /// Incompatible port types
    #[error("Incompatible port types")]
    IncompatiblePorts,

    /// Port is already connected
    #[error("Port already connected: {0:?}")]
    PortAlreadyConnected(PortId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// A stored edge is keyed under a different ID than its own
    #[error("Edge stored under the wrong key: {0:?}")]
    IdMismatch(EdgeId),
}
