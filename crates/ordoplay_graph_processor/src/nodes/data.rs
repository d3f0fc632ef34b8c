// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data nodes: constants, arithmetic and comparisons.

use crate::behavior::{NodeBehavior, ProcessContext};
use crate::error::ProcessError;
use crate::library::NodeLibrary;
use crate::node::{NodeCategory, NodeType};
use crate::port::{Port, PortType, PortValue};

/// Register the data node types
pub fn register(library: &mut NodeLibrary) {
    library.register(
        NodeType {
            id: "constant".to_string(),
            name: "Constant".to_string(),
            category: NodeCategory::Data,
            description: "Outputs the value stored in its \"Value\" setting".to_string(),
            inputs: vec![],
            outputs: vec![Port::output("Value", PortType::Any)],
        },
        |_| Box::new(Constant),
    );

    // Math
    library.register(
        NodeType {
            id: "add".to_string(),
            name: "Add".to_string(),
            category: NodeCategory::Math,
            description: "A + B".to_string(),
            inputs: vec![
                Port::input("A", PortType::Float).with_default(PortValue::Float(0.0)),
                Port::input("B", PortType::Float).with_default(PortValue::Float(0.0)),
            ],
            outputs: vec![Port::output("Result", PortType::Float)],
        },
        |_| Box::new(Add),
    );

    library.register(
        NodeType {
            id: "compare".to_string(),
            name: "Compare".to_string(),
            category: NodeCategory::Logic,
            description: "Compare A and B with the \"Operator\" setting".to_string(),
            inputs: vec![
                Port::input("A", PortType::Float).with_default(PortValue::Float(0.0)),
                Port::input("B", PortType::Float).with_default(PortValue::Float(0.0)),
            ],
            outputs: vec![Port::output("Result", PortType::Bool)],
        },
        |_| Box::new(Compare),
    );
}

struct Constant;

impl NodeBehavior for Constant {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        let value = ctx
            .setting("Value")
            .cloned()
            .ok_or_else(|| ProcessError::Failed("no \"Value\" setting".to_string()))?;
        ctx.set_output("Value", value);
        Ok(())
    }
}

struct Add;

impl NodeBehavior for Add {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        let sum = ctx.float_input("A", 0.0)? + ctx.float_input("B", 0.0)?;
        ctx.set_output("Result", PortValue::Float(sum));
        Ok(())
    }
}

struct Compare;

impl NodeBehavior for Compare {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessError> {
        let a = ctx.float_input("A", 0.0)?;
        let b = ctx.float_input("B", 0.0)?;
        let operator = ctx.setting("Operator").and_then(PortValue::as_str).unwrap_or("==");
        let result = match operator {
            "<" => a < b,
            "<=" => a <= b,
            "==" => a == b,
            "!=" => a != b,
            ">" => a > b,
            ">=" => a >= b,
            other => return Err(ProcessError::Failed(format!("unknown operator '{other}'"))),
        };
        ctx.set_output("Result", PortValue::Bool(result));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use indexmap::IndexMap;

    fn process(node: &Node, inputs: &[(&str, PortValue)]) -> Result<IndexMap<String, PortValue>, ProcessError> {
        let mut library = NodeLibrary::new();
        register(&mut library);
        let mut behavior = library.instantiate(node).unwrap();

        let inputs = inputs
            .iter()
            .map(|(name, value)| (name.to_string(), vec![value.clone()]))
            .collect();
        let mut parameters = IndexMap::new();
        let mut ctx = ProcessContext::new(node, inputs, &mut parameters);
        behavior.process(&mut ctx)?;
        Ok(ctx.into_outputs())
    }

    fn node(type_id: &str) -> Node {
        let mut library = NodeLibrary::new();
        register(&mut library);
        library.create_node(type_id).unwrap()
    }

    #[test]
    fn test_constant() {
        let constant = node("constant").with_setting("Value", PortValue::String("hi".into()));
        let outputs = process(&constant, &[]).unwrap();
        assert_eq!(outputs.get("Value"), Some(&PortValue::String("hi".into())));

        assert!(matches!(process(&node("constant"), &[]), Err(ProcessError::Failed(_))));
    }

    #[test]
    fn test_add_accepts_ints() {
        let outputs = process(&node("add"), &[("A", PortValue::Float(1.5)), ("B", PortValue::Int(2))]).unwrap();
        assert_eq!(outputs.get("Result"), Some(&PortValue::Float(3.5)));

        let err = process(&node("add"), &[("A", PortValue::Bool(true))]).unwrap_err();
        assert!(matches!(err, ProcessError::TypeMismatch { .. }));
    }

    #[test]
    fn test_compare_operators() {
        let cases = [("<", true), ("<=", true), ("==", false), ("!=", true), (">", false), (">=", false)];
        for (operator, expected) in cases {
            let compare = node("compare").with_setting("Operator", PortValue::String(operator.to_string()));
            let outputs = process(&compare, &[("A", PortValue::Float(1.0)), ("B", PortValue::Float(2.0))]).unwrap();
            assert_eq!(outputs.get("Result"), Some(&PortValue::Bool(expected)), "operator {operator}");
        }

        let bad = node("compare").with_setting("Operator", PortValue::String("~".to_string()));
        assert!(matches!(process(&bad, &[]), Err(ProcessError::Failed(_))));
    }
}
