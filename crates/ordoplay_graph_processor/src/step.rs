// SPDX-License-Identifier: MIT OR Apache-2.0
//! Single-stepping over a processor pass.
//!
//! Wait continuations are not steppable: they are driven to completion by
//! the processor when the wait fires.

use crate::error::Result;
use crate::node::NodeId;
use crate::processor::GraphProcessor;

/// Drives a processor one node at a time
pub struct StepController<P: GraphProcessor> {
    processor: P,
    active: bool,
}

impl<P: GraphProcessor> StepController<P> {
    /// Wrap a processor
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            active: false,
        }
    }

    /// Execute one node, starting a new pass when none is active.
    ///
    /// Returns the executed node, or `None` when the pass has just finished.
    /// A failed step also ends the pass.
    pub fn step(&mut self) -> Result<Option<NodeId>> {
        if !self.active {
            self.processor.begin()?;
            self.active = true;
            tracing::debug!("Stepping through '{}'", self.processor.graph().name);
        }

        match self.processor.advance() {
            Ok(Some(node)) => Ok(Some(node)),
            Ok(None) => {
                self.active = false;
                Ok(None)
            }
            Err(e) => {
                self.active = false;
                Err(e)
            }
        }
    }

    /// Node executed by the last step
    pub fn current_node(&self) -> Option<NodeId> {
        self.processor.current_node()
    }

    /// Whether a pass is in flight
    pub fn is_running(&self) -> bool {
        self.active
    }

    /// The wrapped processor
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// The wrapped processor, mutably
    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// Unwrap the processor
    pub fn into_inner(self) -> P {
        self.processor
    }
}
