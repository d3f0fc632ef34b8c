// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-shot completion of waitable nodes.
//!
//! A waitable node receives a [`WaitTrigger`] when it executes. An external
//! source (timer, event bus, test) fires the trigger from any thread; the
//! processor consumes the pending wait the next time it polls and drives the
//! node's after-wait successors. A pending wait is removed when consumed, so
//! its continuation runs at most once however often the trigger fires.

use crate::node::NodeId;
use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identifier of a pending wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaitId(pub u64);

#[derive(Debug, Default)]
struct WaitSignal {
    fired: Mutex<bool>,
    condvar: Condvar,
}

/// Cloneable handle that completes a wait
#[derive(Debug, Clone, Default)]
pub struct WaitTrigger {
    signal: Arc<WaitSignal>,
}

impl WaitTrigger {
    /// Create an unfired trigger
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the trigger; returns `false` if it had already fired
    pub fn fire(&self) -> bool {
        let mut fired = self.signal.fired.lock();
        if *fired {
            return false;
        }
        *fired = true;
        self.signal.condvar.notify_all();
        true
    }

    /// Fire the trigger from a timer thread after `delay`
    pub fn fire_after(&self, delay: Duration) {
        let trigger = self.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            trigger.fire();
        });
    }

    /// Whether the trigger has fired
    pub fn is_fired(&self) -> bool {
        *self.signal.fired.lock()
    }

    /// Block until the trigger fires or `timeout` elapses; returns whether it fired
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut fired = self.signal.fired.lock();
        while !*fired {
            if self.signal.condvar.wait_until(&mut fired, deadline).timed_out() {
                break;
            }
        }
        *fired
    }
}

/// A wait registered by a waitable node, not yet consumed
#[derive(Debug, Clone)]
pub struct PendingWait {
    /// Wait identifier
    pub id: WaitId,
    /// Node that started the wait
    pub node: NodeId,
    /// Trigger completing the wait
    pub trigger: WaitTrigger,
    pub(crate) index: usize,
}

/// Pending waits of one processor
#[derive(Debug, Default)]
pub(crate) struct WaitRegistry {
    pending: IndexMap<WaitId, PendingWait>,
    next_id: u64,
}

impl WaitRegistry {
    pub(crate) fn register(&mut self, index: usize, node: NodeId) -> PendingWait {
        let id = WaitId(self.next_id);
        self.next_id += 1;
        let wait = PendingWait {
            id,
            node,
            trigger: WaitTrigger::new(),
            index,
        };
        self.pending.insert(id, wait.clone());
        wait
    }

    /// IDs of the waits whose trigger has fired, oldest first
    pub(crate) fn fired(&self) -> Vec<WaitId> {
        self.pending
            .values()
            .filter(|w| w.trigger.is_fired())
            .map(|w| w.id)
            .collect()
    }

    pub(crate) fn take(&mut self, id: WaitId) -> Option<PendingWait> {
        self.pending.shift_remove(&id)
    }

    pub(crate) fn pending(&self) -> impl Iterator<Item = &PendingWait> {
        self.pending.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_fires_once() {
        let trigger = WaitTrigger::new();
        let copy = trigger.clone();
        assert!(!trigger.is_fired());
        assert!(copy.fire());
        assert!(!trigger.fire());
        assert!(trigger.is_fired());
    }

    #[test]
    fn test_fired_then_take() {
        let mut registry = WaitRegistry::default();
        let first = registry.register(0, NodeId::new());
        let second = registry.register(1, NodeId::new());
        assert_ne!(first.id, second.id);
        assert!(registry.fired().is_empty());

        second.trigger.fire();
        assert_eq!(registry.fired(), vec![second.id]);
        assert!(registry.take(second.id).is_some());
        assert!(registry.take(second.id).is_none());
        assert!(registry.fired().is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_timer_fires_trigger() {
        let trigger = WaitTrigger::new();
        trigger.fire_after(Duration::from_millis(5));
        assert!(trigger.wait_timeout(Duration::from_secs(5)));
    }
}
