// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exposed parameter access.
//!
//! Both nodes name their parameter through the node's shared slot. The
//! analyzer orders writers of a slot before its readers.

use crate::behavior::{Branching, Capability, Flow, NodeBehavior, ProcessContext};
use crate::error::ProcessError;
use crate::library::NodeLibrary;
use crate::node::{NodeCategory, NodeType, SlotAccess};
use crate::port::{Port, PortType};

/// Register the parameter node types
pub fn register(library: &mut NodeLibrary) {
    library.register(
        NodeType {
            id: "get_parameter".to_string(),
            name: "Get Parameter".to_string(),
            category: NodeCategory::Parameter,
            description: "Read an exposed parameter".to_string(),
            inputs: vec![],
            outputs: vec![Port::output("Value", PortType::Any)],
        },
        |_| Box::new(GetParameter),
    );

    library.register(
        NodeType {
            id: "set_parameter".to_string(),
            name: "Set Parameter".to_string(),
            category: NodeCategory::Parameter,
            description: "Write an exposed parameter".to_string(),
            inputs: vec![
                Port::input("Exec", PortType::Exec).multi(),
                Port::input("Value", PortType::Any),
            ],
            outputs: vec![Port::output("Exec", PortType::Exec)],
        },
        |_| Box::new(SetParameter),
    );
}

fn slot_name<'c>(ctx: &'c ProcessContext<'_>, access: SlotAccess) -> Result<&'c str, ProcessError> {
    match &ctx.node().slot {
        Some(slot) if slot.access == access => Ok(&slot.name),
        Some(slot) => Err(ProcessError::Failed(format!(
            "slot '{}' bound with {:?} access, expected {access:?}",
            slot.name, slot.access
        ))),
        None => Err(ProcessError::Failed("no parameter slot bound".to_string())),
    }
}

struct GetParameter;

impl NodeBehavior for GetParameter {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        let name = slot_name(ctx, SlotAccess::Read)?;
        let value = ctx
            .parameter(name)
            .cloned()
            .ok_or_else(|| ProcessError::Failed(format!("unknown parameter '{name}'")))?;
        ctx.set_output("Value", value);
        Ok(())
    }
}

/// Writes its "Value" input into the slot, then continues through "Exec"
struct SetParameter;

impl NodeBehavior for SetParameter {
    fn capability(&self) -> Capability {
        Capability::Branching(Branching::Plain)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        let name = slot_name(ctx, SlotAccess::Write)?.to_string();
        let value = ctx.require("Value")?.clone();
        if !ctx.set_parameter(&name, value) {
            return Err(ProcessError::Failed(format!("unknown parameter '{name}'")));
        }
        Ok(())
    }

    fn next_outputs(&self, flow: Flow) -> Vec<String> {
        match flow {
            Flow::Next => vec!["Exec".to_string()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, SharedSlot};
    use crate::port::PortValue;
    use indexmap::IndexMap;

    fn node(type_id: &str, slot: SharedSlot) -> (NodeLibrary, Node) {
        let mut library = NodeLibrary::new();
        register(&mut library);
        let node = library.create_node(type_id).unwrap().with_slot(slot);
        (library, node)
    }

    #[test]
    fn test_get_parameter() {
        let (library, node) = node("get_parameter", SharedSlot::read("speed"));
        let mut behavior = library.instantiate(&node).unwrap();
        let mut parameters = IndexMap::new();
        parameters.insert("speed".to_string(), PortValue::Float(4.0));

        let mut ctx = ProcessContext::new(&node, IndexMap::new(), &mut parameters);
        behavior.process(&mut ctx).unwrap();
        assert_eq!(ctx.into_outputs().get("Value"), Some(&PortValue::Float(4.0)));
    }

    #[test]
    fn test_set_parameter_requires_declared_slot() {
        let (library, node) = node("set_parameter", SharedSlot::write("speed"));
        let mut behavior = library.instantiate(&node).unwrap();
        let mut inputs = IndexMap::new();
        inputs.insert("Value".to_string(), vec![PortValue::Int(9)]);

        let mut parameters = IndexMap::new();
        let mut ctx = ProcessContext::new(&node, inputs.clone(), &mut parameters);
        assert!(matches!(behavior.process(&mut ctx), Err(ProcessError::Failed(_))));

        parameters.insert("speed".to_string(), PortValue::Int(0));
        let mut ctx = ProcessContext::new(&node, inputs, &mut parameters);
        behavior.process(&mut ctx).unwrap();
        assert_eq!(parameters.get("speed"), Some(&PortValue::Int(9)));
    }

    #[test]
    fn test_wrong_access_is_rejected() {
        let (library, node) = node("get_parameter", SharedSlot::write("speed"));
        let mut behavior = library.instantiate(&node).unwrap();
        let mut parameters = IndexMap::new();
        parameters.insert("speed".to_string(), PortValue::Int(0));
        let mut ctx = ProcessContext::new(&node, IndexMap::new(), &mut parameters);
        assert!(matches!(behavior.process(&mut ctx), Err(ProcessError::Failed(_))));
    }
}
