// SPDX-License-Identifier: MIT OR Apache-2.0
//! Custom per-port pull/push functions.
//!
//! Entries are keyed by node type and port name and bypass the type
//! adapter registry for that port.

use crate::port::{Port, PortValue};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Combines the values of every edge feeding an input port into one value
pub type CustomPull = Arc<dyn Fn(&[PortValue]) -> Option<PortValue> + Send + Sync>;

/// Produces the value delivered to one target port from an output value
pub type CustomPush = Arc<dyn Fn(&PortValue, &Port) -> Option<PortValue> + Send + Sync>;

/// Custom port I/O entries
#[derive(Clone, Default)]
pub struct CustomPortIo {
    pulls: IndexMap<(String, String), CustomPull>,
    pushes: IndexMap<(String, String), CustomPush>,
}

impl CustomPortIo {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pull function for an input port
    pub fn register_pull<F>(&mut self, node_type: impl Into<String>, port: impl Into<String>, pull: F)
    where
        F: Fn(&[PortValue]) -> Option<PortValue> + Send + Sync + 'static,
    {
        self.pulls.insert((node_type.into(), port.into()), Arc::new(pull));
    }

    /// Register a push function for an output port
    pub fn register_push<F>(&mut self, node_type: impl Into<String>, port: impl Into<String>, push: F)
    where
        F: Fn(&PortValue, &Port) -> Option<PortValue> + Send + Sync + 'static,
    {
        self.pushes.insert((node_type.into(), port.into()), Arc::new(push));
    }

    /// Pull function for an input port, if any
    pub fn pull_for(&self, node_type: &str, port: &str) -> Option<&CustomPull> {
        self.pulls.get(&(node_type.to_string(), port.to_string()))
    }

    /// Push function for an output port, if any
    pub fn push_for(&self, node_type: &str, port: &str) -> Option<&CustomPush> {
        self.pushes.get(&(node_type.to_string(), port.to_string()))
    }
}

impl fmt::Debug for CustomPortIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPortIo")
            .field("pulls", &self.pulls.keys().collect::<Vec<_>>())
            .field("pushes", &self.pushes.keys().collect::<Vec<_>>())
            .finish()
    }
}
