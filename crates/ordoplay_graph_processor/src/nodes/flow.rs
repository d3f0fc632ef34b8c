// SPDX-License-Identifier: MIT OR Apache-2.0
//! Execution flow nodes: entry points, branches, loops and waits.
//!
//! Every node here is conditional, so the conditional processor schedules
//! it through its flow ports instead of its data dependencies.

use crate::behavior::{Branching, Capability, Flow, NodeBehavior, ProcessContext};
use crate::error::ProcessError;
use crate::library::NodeLibrary;
use crate::node::{Node, NodeCategory, NodeType};
use crate::port::{Port, PortType, PortValue};
use crate::processor::WaitTrigger;
use std::ops::Range;
use std::time::Duration;

/// Register the flow node types
pub fn register(library: &mut NodeLibrary) {
    library.register(
        NodeType {
            id: "start".to_string(),
            name: "Start".to_string(),
            category: NodeCategory::Flow,
            description: "Entry point of an execution flow".to_string(),
            inputs: vec![],
            outputs: vec![Port::output("Exec", PortType::Exec)],
        },
        |_| Box::new(PassThrough),
    );

    library.register(
        NodeType {
            id: "sequence".to_string(),
            name: "Sequence".to_string(),
            category: NodeCategory::Flow,
            description: "Continue execution with the next node".to_string(),
            inputs: vec![Port::input("Exec", PortType::Exec).multi()],
            outputs: vec![Port::output("Exec", PortType::Exec)],
        },
        |_| Box::new(PassThrough),
    );

    library.register(
        NodeType {
            id: "branch".to_string(),
            name: "Branch".to_string(),
            category: NodeCategory::Flow,
            description: "If/else branching".to_string(),
            inputs: vec![
                Port::input("Exec", PortType::Exec).multi(),
                Port::input("Condition", PortType::Bool).with_default(PortValue::Bool(false)),
            ],
            outputs: vec![
                Port::output("True", PortType::Exec),
                Port::output("False", PortType::Exec),
            ],
        },
        |_| Box::new(BranchNode::default()),
    );

    library.register(
        NodeType {
            id: "for_loop".to_string(),
            name: "For Loop".to_string(),
            category: NodeCategory::Flow,
            description: "Run the body once per index in [Start, End)".to_string(),
            inputs: vec![
                Port::input("Exec", PortType::Exec).multi(),
                Port::input("Start", PortType::Int),
                Port::input("End", PortType::Int),
            ],
            outputs: vec![
                Port::output("Loop Body", PortType::Exec),
                Port::output("Index", PortType::Int),
                Port::output("Loop Completed", PortType::Exec),
            ],
        },
        |node| Box::new(ForLoopNode::new(node)),
    );

    library.register(
        NodeType {
            id: "wait".to_string(),
            name: "Wait".to_string(),
            category: NodeCategory::Flow,
            description: "Continue immediately, then again once the wait completes".to_string(),
            inputs: vec![Port::input("Exec", PortType::Exec).multi()],
            outputs: vec![
                Port::output("Executes", PortType::Exec),
                Port::output("Execute After", PortType::Exec),
            ],
        },
        |node| Box::new(WaitNode::new(node)),
    );

    // Debug output
    library.register(
        NodeType {
            id: "log".to_string(),
            name: "Log".to_string(),
            category: NodeCategory::Utility,
            description: "Write a message to the log".to_string(),
            inputs: vec![
                Port::input("Exec", PortType::Exec).multi(),
                Port::input("Message", PortType::String).with_default(PortValue::String(String::new())),
            ],
            outputs: vec![Port::output("Exec", PortType::Exec)],
        },
        |_| Box::new(LogNode),
    );
}

/// Does nothing and continues through its "Exec" output
struct PassThrough;

impl NodeBehavior for PassThrough {
    fn capability(&self) -> Capability {
        Capability::Branching(Branching::Plain)
    }

    fn process(&mut self, _ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        Ok(())
    }

    fn next_outputs(&self, flow: Flow) -> Vec<String> {
        match flow {
            Flow::Next => vec!["Exec".to_string()],
            _ => Vec::new(),
        }
    }
}

#[derive(Default)]
struct BranchNode {
    condition: bool,
}

impl NodeBehavior for BranchNode {
    fn capability(&self) -> Capability {
        Capability::Branching(Branching::Plain)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        self.condition = ctx.bool_input("Condition", false)?;
        Ok(())
    }

    fn next_outputs(&self, flow: Flow) -> Vec<String> {
        match flow {
            Flow::Next if self.condition => vec!["True".to_string()],
            Flow::Next => vec!["False".to_string()],
            _ => Vec::new(),
        }
    }
}

/// Counts from Start to End.
///
/// The first execution after `reset_loop` emits Start; each later execution
/// emits the next index, so after the last body pass the index equals End.
struct ForLoopNode {
    default_start: i64,
    default_end: i64,
    range: Range<i64>,
    index: Option<i64>,
}

impl ForLoopNode {
    fn new(node: &Node) -> Self {
        let bound = |key: &str| node.setting(key).and_then(|v| v.as_int()).unwrap_or(0);
        Self {
            default_start: bound("Start"),
            default_end: bound("End"),
            range: 0..0,
            index: None,
        }
    }
}

impl NodeBehavior for ForLoopNode {
    fn capability(&self) -> Capability {
        Capability::Branching(Branching::Loop)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        let index = match self.index {
            None => {
                let start = ctx.int_input("Start", self.default_start)?;
                let end = ctx.int_input("End", self.default_end)?;
                self.range = start..end;
                start
            }
            Some(index) => index.saturating_add(1),
        };
        self.index = Some(index);
        ctx.set_output("Index", PortValue::Int(index));
        Ok(())
    }

    fn next_outputs(&self, flow: Flow) -> Vec<String> {
        match flow {
            Flow::LoopBody => vec!["Loop Body".to_string()],
            Flow::LoopCompleted => vec!["Loop Completed".to_string()],
            _ => Vec::new(),
        }
    }

    fn loop_range(&self) -> Range<i64> {
        self.range.clone()
    }

    fn reset_loop(&mut self) {
        self.index = None;
    }
}

/// Completes after "Seconds" when set, otherwise when fired externally
struct WaitNode {
    delay: Option<Duration>,
}

impl WaitNode {
    fn new(node: &Node) -> Self {
        let delay = node
            .setting("Seconds")
            .and_then(|v| v.as_float())
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64);
        Self { delay }
    }
}

impl NodeBehavior for WaitNode {
    fn capability(&self) -> Capability {
        Capability::Branching(Branching::Wait)
    }

    fn process(&mut self, _ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        Ok(())
    }

    fn next_outputs(&self, flow: Flow) -> Vec<String> {
        match flow {
            Flow::Next => vec!["Executes".to_string()],
            Flow::AfterWait => vec!["Execute After".to_string()],
            _ => Vec::new(),
        }
    }

    fn begin_wait(&mut self, trigger: WaitTrigger) {
        if let Some(delay) = self.delay {
            trigger.fire_after(delay);
        }
    }
}

struct LogNode;

impl NodeBehavior for LogNode {
    fn capability(&self) -> Capability {
        Capability::Branching(Branching::Plain)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        let message = ctx.input("Message").map(ToString::to_string).unwrap_or_default();
        tracing::info!("[{}] {}", ctx.node().name, message);
        Ok(())
    }

    fn next_outputs(&self, flow: Flow) -> Vec<String> {
        match flow {
            Flow::Next => vec!["Exec".to_string()],
            _ => Vec::new(),
        }
    }
}
