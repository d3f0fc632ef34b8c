// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph execution engine for `OrdoPlay` node graphs.
//!
//! Takes a snapshot of typed nodes and edges, orders it, and executes it:
//! - Dependency analysis: topological compute order and cycle detection
//! - Type adapters: conversions between port types along edges
//! - Processors: a linear sweep, or a resumable stack machine with
//!   branches, bounded loops and externally completed waits
//! - Step controller: one node at a time, for debugging
//!
//! ## Architecture
//!
//! A [`Graph`] is the editable snapshot. A processor loads it together with
//! a [`NodeLibrary`] that maps each node type to a [`NodeBehavior`], plus a
//! [`TypeAdapterRegistry`] used when values cross edges. Execution never
//! mutates the graph structure; only exposed parameters change.

pub mod adapter;
pub mod analysis;
pub mod behavior;
pub mod config;
pub mod edge;
pub mod error;
pub mod graph;
pub mod library;
pub mod node;
pub mod nodes;
pub mod port;
pub mod port_io;
pub mod processor;
pub mod step;

pub use adapter::TypeAdapterRegistry;
pub use analysis::GraphAnalysis;
pub use behavior::{Branching, Capability, Flow, NodeBehavior, ProcessContext};
pub use config::{ComputeOrderMode, EngineConfig};
pub use edge::{Edge, EdgeId};
pub use error::{AdapterError, EngineError, ProcessError, Result};
pub use graph::{ConnectionError, Graph};
pub use library::NodeLibrary;
pub use node::{Node, NodeCategory, NodeId, NodeType, SharedSlot, SlotAccess};
pub use port::{Port, PortDirection, PortId, PortType, PortValue};
pub use processor::{
    ConditionalProcessor, GraphProcessor, LinearProcessor, PendingWait, ProcessObserver, ProcessorEnv, RunReport,
    WaitId, WaitTrigger,
};
pub use step::StepController;
