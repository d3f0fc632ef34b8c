// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end execution of graphs built from the built-in node library.

use ordoplay_graph_processor::{
    ComputeOrderMode, ConditionalProcessor, EngineConfig, Graph, GraphAnalysis, GraphProcessor, LinearProcessor,
    Node, NodeId, PortValue, ProcessorEnv, SharedSlot, StepController,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

fn node(env: &ProcessorEnv, type_id: &str) -> Node {
    env.library.create_node(type_id).unwrap()
}

fn constant(env: &ProcessorEnv, value: PortValue) -> Node {
    node(env, "constant").with_setting("Value", value)
}

fn exec(graph: &mut Graph, from: NodeId, port: &str, to: NodeId) {
    graph.connect_by_name(from, port, to, "Exec", None).unwrap();
}

fn data(graph: &mut Graph, env: &ProcessorEnv, from: NodeId, from_port: &str, to: NodeId, to_port: &str) {
    graph
        .connect_by_name(from, from_port, to, to_port, Some(&*env.adapters))
        .unwrap();
}

/// Observer that records every processed node
fn recorder(processor: &mut impl GraphProcessor) -> Arc<Mutex<Vec<NodeId>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    processor.add_observer(Box::new(move |id: NodeId, _node: &Node| sink.lock().push(id)));
    seen
}

#[test]
fn test_if_runs_only_the_selected_branch() {
    let env = ProcessorEnv::with_builtins();
    let mut graph = Graph::new("Branching");
    let start = graph.add_node(node(&env, "start"));
    let check = graph.add_node(node(&env, "compare").with_setting("Operator", PortValue::String("<".into())));
    let two = graph.add_node(constant(&env, PortValue::Int(2)));
    let branch = graph.add_node(node(&env, "branch"));
    let taken = graph.add_node(node(&env, "log").with_name("Taken"));
    let skipped = graph.add_node(node(&env, "log").with_name("Skipped"));

    exec(&mut graph, start, "Exec", branch);
    exec(&mut graph, branch, "True", taken);
    exec(&mut graph, branch, "False", skipped);
    data(&mut graph, &env, two, "Value", check, "B");
    data(&mut graph, &env, check, "Result", branch, "Condition");

    let mut processor = ConditionalProcessor::new(graph, env).unwrap();
    let seen = recorder(&mut processor);
    let report = processor.run().unwrap();

    // 0 < 2: the data chain runs before the branch, then only the true side
    assert_eq!(report.executed, vec![start, two, check, branch, taken]);
    assert_eq!(*seen.lock(), report.executed);
    assert_eq!(processor.current_node(), Some(taken));
    assert!(!report.executed.contains(&skipped));
}

#[test]
fn test_processors_agree_on_acyclic_data_graph() {
    let env = ProcessorEnv::with_builtins();
    let mut graph = Graph::new("Data");
    let sum = graph.add_node(node(&env, "add"));
    let a = graph.add_node(constant(&env, PortValue::Float(1.0)));
    let b = graph.add_node(constant(&env, PortValue::Int(4)));
    let compare = graph.add_node(node(&env, "compare"));
    let total = graph.add_node(node(&env, "add"));
    data(&mut graph, &env, a, "Value", sum, "A");
    data(&mut graph, &env, b, "Value", sum, "B");
    data(&mut graph, &env, sum, "Result", total, "A");
    data(&mut graph, &env, a, "Value", compare, "A");

    let linear = LinearProcessor::new(graph.clone(), env.clone()).unwrap().run().unwrap();
    let conditional = ConditionalProcessor::new(graph, env).unwrap().run().unwrap();

    assert_eq!(linear.executed.len(), 5);
    assert_eq!(conditional.executed.len(), 5);
    let linear_set: HashSet<NodeId> = linear.executed.iter().copied().collect();
    let conditional_set: HashSet<NodeId> = conditional.executed.iter().copied().collect();
    assert_eq!(linear_set, conditional_set);

    let position = |id: NodeId| linear.executed.iter().position(|n| *n == id).unwrap();
    assert!(position(a) < position(sum));
    assert!(position(b) < position(sum));
    assert!(position(sum) < position(total));
    assert!(position(a) < position(compare));
}

#[test]
fn test_loop_body_sees_each_index() {
    let env = ProcessorEnv::with_builtins();
    let mut graph = Graph::new("Loop");
    graph.set_parameter("last", PortValue::Int(-1));
    graph.set_parameter("final", PortValue::Int(-1));

    let start = graph.add_node(node(&env, "start"));
    let for_loop = graph.add_node(
        node(&env, "for_loop")
            .with_setting("Start", PortValue::Int(0))
            .with_setting("End", PortValue::Int(5)),
    );
    let body = graph.add_node(node(&env, "set_parameter").with_slot(SharedSlot::write("last")));
    let done = graph.add_node(node(&env, "set_parameter").with_slot(SharedSlot::write("final")));
    exec(&mut graph, start, "Exec", for_loop);
    exec(&mut graph, for_loop, "Loop Body", body);
    exec(&mut graph, for_loop, "Loop Completed", done);
    data(&mut graph, &env, for_loop, "Index", body, "Value");
    data(&mut graph, &env, for_loop, "Index", done, "Value");

    let mut processor = ConditionalProcessor::new(graph, env).unwrap();
    for _ in 0..2 {
        let report = processor.run().unwrap();
        assert_eq!(report.executed.iter().filter(|n| **n == body).count(), 5);
        assert_eq!(report.executed.last(), Some(&done));
        assert_eq!(processor.graph().parameter("last"), Some(&PortValue::Int(4)));
        assert_eq!(processor.graph().parameter("final"), Some(&PortValue::Int(5)));
    }
}

#[test]
fn test_wait_continuation_runs_after_trigger() {
    let env = ProcessorEnv::with_builtins();
    let mut graph = Graph::new("Wait");
    graph.set_parameter("done", PortValue::Bool(false));
    let start = graph.add_node(node(&env, "start"));
    let wait = graph.add_node(node(&env, "wait"));
    let now = graph.add_node(node(&env, "log"));
    let flag = graph.add_node(constant(&env, PortValue::Bool(true)));
    let later = graph.add_node(node(&env, "set_parameter").with_slot(SharedSlot::write("done")));
    exec(&mut graph, start, "Exec", wait);
    exec(&mut graph, wait, "Executes", now);
    exec(&mut graph, wait, "Execute After", later);
    data(&mut graph, &env, flag, "Value", later, "Value");

    let mut processor = ConditionalProcessor::new(graph, env).unwrap();
    let report = processor.run().unwrap();
    assert_eq!(report.executed, vec![start, wait, now]);
    assert_eq!(report.pending_waits, 1);
    assert_eq!(processor.graph().parameter("done"), Some(&PortValue::Bool(false)));

    // Fired twice from another thread, continued once
    let trigger = processor.pending_waits()[0].trigger.clone();
    std::thread::spawn(move || {
        trigger.fire();
        trigger.fire();
    })
    .join()
    .unwrap();

    assert_eq!(processor.poll_waits().unwrap(), vec![flag, later]);
    assert!(processor.poll_waits().unwrap().is_empty());
    assert_eq!(processor.graph().parameter("done"), Some(&PortValue::Bool(true)));
}

#[test]
fn test_equal_compute_orders_keep_insertion_order() {
    let env = ProcessorEnv::with_builtins().with_config(EngineConfig {
        compute_order: ComputeOrderMode::Manual,
        ..EngineConfig::default()
    });
    let mut graph = Graph::new("Ties");
    let ids: Vec<NodeId> = (0..4)
        .map(|i| graph.add_node(constant(&env, PortValue::Int(i)).with_compute_order(3)))
        .collect();

    let processor = LinearProcessor::new(graph, env).unwrap();
    assert_eq!(processor.order(), ids);
}

#[test]
fn test_parameter_writer_runs_before_reader() {
    let env = ProcessorEnv::with_builtins();
    let mut graph = Graph::new("Slots");
    graph.set_parameter("x", PortValue::Float(0.0));
    graph.set_parameter("sum", PortValue::Float(0.0));

    let reader = graph.add_node(node(&env, "get_parameter").with_slot(SharedSlot::read("x")));
    let add = graph.add_node(node(&env, "add"));
    let seven = graph.add_node(constant(&env, PortValue::Float(7.0)));
    let writer = graph.add_node(node(&env, "set_parameter").with_slot(SharedSlot::write("x")));
    let result = graph.add_node(node(&env, "set_parameter").with_slot(SharedSlot::write("sum")));
    data(&mut graph, &env, reader, "Value", add, "A");
    data(&mut graph, &env, seven, "Value", writer, "Value");
    data(&mut graph, &env, add, "Result", result, "Value");

    let mut processor = LinearProcessor::new(graph, env).unwrap();
    assert_eq!(processor.order(), vec![seven, writer, reader, add, result]);
    processor.run().unwrap();
    assert_eq!(processor.graph().parameter("sum"), Some(&PortValue::Float(7.0)));
}

#[test]
fn test_stepping_matches_run() {
    let env = ProcessorEnv::with_builtins();
    let mut graph = Graph::new("Steps");
    let start = graph.add_node(node(&env, "start"));
    let flag = graph.add_node(constant(&env, PortValue::Bool(false)));
    let branch = graph.add_node(node(&env, "branch"));
    let other = graph.add_node(node(&env, "sequence"));
    exec(&mut graph, start, "Exec", branch);
    exec(&mut graph, branch, "False", other);
    data(&mut graph, &env, flag, "Value", branch, "Condition");

    let expected = ConditionalProcessor::new(graph.clone(), env.clone())
        .unwrap()
        .run()
        .unwrap()
        .executed;

    let mut stepper = StepController::new(ConditionalProcessor::new(graph, env).unwrap());
    let mut stepped = Vec::new();
    while let Some(node) = stepper.step().unwrap() {
        assert_eq!(stepper.current_node(), Some(node));
        stepped.push(node);
    }
    assert_eq!(stepped, expected);
    assert!(!stepper.is_running());
}

#[test]
fn test_cycles_are_reported() {
    let env = ProcessorEnv::with_builtins();
    let mut graph = Graph::new("Cycle");
    let free = graph.add_node(constant(&env, PortValue::Float(1.0)));
    let a = graph.add_node(node(&env, "add"));
    let b = graph.add_node(node(&env, "add"));
    data(&mut graph, &env, free, "Value", a, "B");
    data(&mut graph, &env, a, "Result", b, "A");
    data(&mut graph, &env, b, "Result", a, "A");

    assert_eq!(GraphAnalysis::new(&graph).find_cycles(), vec![a, b]);

    let cyclic = graph.update_compute_order();
    assert_eq!(cyclic, vec![a, b]);
    assert_eq!(graph.node(a).map(|n| n.compute_order), Some(-1));
    assert!(LinearProcessor::new(graph, env).unwrap().run().is_err());
}

#[test]
fn test_snapshot_runs_after_reload() {
    let env = ProcessorEnv::with_builtins();
    let mut graph = Graph::new("Snapshot");
    let start = graph.add_node(node(&env, "start"));
    let for_loop = graph.add_node(node(&env, "for_loop").with_setting("End", PortValue::Int(2)));
    let body = graph.add_node(node(&env, "log"));
    exec(&mut graph, start, "Exec", for_loop);
    exec(&mut graph, for_loop, "Loop Body", body);

    let reloaded = Graph::from_ron(&graph.to_ron().unwrap()).unwrap();
    let report = ConditionalProcessor::new(reloaded, env).unwrap().run().unwrap();
    assert_eq!(report.executed, vec![start, for_loop, body, for_loop, body, for_loop]);
}
