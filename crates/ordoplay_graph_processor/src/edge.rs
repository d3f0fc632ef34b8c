// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edges: the channels values travel along during a pass.
//!
//! An edge joins one output port to one input port. While a processor runs,
//! each edge carries the last value its source pushed, already converted to
//! the target port's type. The processors keep those values keyed by
//! [`EdgeId`] and clear them when a pass begins, so a snapshot never stores
//! them.

use crate::graph::ConnectionError;
use crate::node::{Node, NodeId};
use crate::port::{Port, PortDirection, PortId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key of an edge, and of its value slot during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    /// Fresh random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Output port of `from_node` feeding input port of `to_node`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Edge ID
    pub id: EdgeId,
    /// Producing node
    pub from_node: NodeId,
    /// Output port values are pushed from
    pub from_port: PortId,
    /// Consuming node
    pub to_node: NodeId,
    /// Input port values are pulled into
    pub to_port: PortId,
}

impl Edge {
    /// Edge with a fresh ID
    pub fn new(from_node: NodeId, from_port: PortId, to_node: NodeId, to_port: PortId) -> Self {
        Self {
            id: EdgeId::new(),
            from_node,
            from_port,
            to_node,
            to_port,
        }
    }

    /// Whether either end belongs to `node_id`
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Whether the edge feeds a node back into itself
    pub fn is_self_loop(&self) -> bool {
        self.from_node == self.to_node
    }

    /// Look up both ends on the nodes they name.
    ///
    /// Fails unless the nodes exist, own the named ports, and the edge runs
    /// from an output to an input of a different node. Type compatibility and
    /// input multiplicity are left to the caller.
    pub(crate) fn resolve<'n>(
        &self,
        source: Option<&'n Node>,
        target: Option<&'n Node>,
    ) -> Result<(&'n Port, &'n Port), ConnectionError> {
        if self.is_self_loop() {
            return Err(ConnectionError::SelfLoop);
        }
        let source = source.ok_or(ConnectionError::NodeNotFound(self.from_node))?;
        let target = target.ok_or(ConnectionError::NodeNotFound(self.to_node))?;
        let from = source.port(&self.from_port).ok_or(ConnectionError::PortNotFound(self.from_port))?;
        let to = target.port(&self.to_port).ok_or(ConnectionError::PortNotFound(self.to_port))?;

        if from.direction != PortDirection::Output || to.direction != PortDirection::Input {
            return Err(ConnectionError::WrongDirection);
        }
        Ok((from, to))
    }
}
