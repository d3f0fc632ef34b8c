// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for graph processing.

use crate::edge::EdgeId;
use crate::graph::ConnectionError;
use crate::node::NodeId;
use crate::port::PortType;
use crate::processor::WaitId;

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error raised by the engine or surfaced from a node
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An acyclic-only pass was started on a cyclic graph
    #[error("Graph contains a cycle through {} node(s)", nodes.len())]
    CycleDetected {
        /// Nodes lying on a cycle
        nodes: Vec<NodeId>,
    },

    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// No behavior is registered for a node type
    #[error("No behavior registered for node type '{0}'")]
    UnknownNodeType(String),

    /// A node's `process` failed; the run was aborted
    #[error("Node '{name}' ({node}) failed: {source}")]
    Process {
        /// Failing node
        node: NodeId,
        /// Display name of the failing node
        name: String,
        /// Original error
        #[source]
        source: ProcessError,
    },

    /// The configured step budget ran out
    #[error("Step budget of {0} exceeded")]
    StepBudgetExceeded(u64),

    /// No pending wait has this ID
    #[error("Unknown wait: {0:?}")]
    UnknownWait(WaitId),

    /// I/O failure while loading or saving
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON input could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON output could not be produced
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),

    /// A loaded snapshot holds an edge the graph would not accept
    #[error("Invalid edge {edge:?}: {source}")]
    InvalidEdge {
        /// Offending edge
        edge: EdgeId,
        /// Why it was rejected
        #[source]
        source: ConnectionError,
    },

    /// A file was written by a newer format version
    #[error("Format version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },
}

/// Error returned by a node's `process`
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Required input has no value
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Input value has the wrong type
    #[error("Type mismatch on '{port}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Port name
        port: String,
        /// Expected type
        expected: PortType,
        /// Actual type
        found: PortType,
    },

    /// Custom failure
    #[error("{0}")]
    Failed(String),
}

/// Error returned by the type adapter registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// No conversion is registered for the exact pair
    #[error("No conversion registered from {from} to {to}")]
    MissingConversion {
        /// Source type
        from: PortType,
        /// Target type
        to: PortType,
    },

    /// The pair is on the incompatible list
    #[error("{from} and {to} are marked incompatible")]
    Incompatible {
        /// Source type
        from: PortType,
        /// Target type
        to: PortType,
    },

    /// The conversion function rejected the value
    #[error("Conversion from {from} to {to} rejected the value")]
    Rejected {
        /// Source type
        from: PortType,
        /// Target type
        to: PortType,
    },
}
