//! End-to-end propagation behaviour of the indicator graph.

use std::sync::{Arc, Mutex};
use std::thread;

use trading_core::error::{GraphError, IndicatorError};
use trading_core::types::NodeId;
use trading_indicators::{
    Graph, GraphSpec, IndicatorRegistry, Map, Ratio, Sma, Spread, StdDev, WindowBuffer,
};

type Log = Arc<Mutex<Vec<(String, f64)>>>;

fn record(graph: &mut Graph, id: NodeId, log: &Log) {
    let log = Arc::clone(log);
    let name = graph.name(id).unwrap().to_string();
    graph
        .sink(id, move |_, value| log.lock().unwrap().push((name.clone(), value)))
        .unwrap();
}

#[test]
fn test_std_dev_sees_each_sample() {
    let log: Log = Arc::default();
    let mut graph = Graph::new();
    let price = graph.add_source("price").unwrap();
    let std2 = graph.add_node("std2", StdDev::new(2).unwrap()).unwrap();
    graph.bind(price, std2).unwrap();
    record(&mut graph, std2, &log);

    graph.emit(price, 10.0).unwrap();
    graph.emit(price, 20.0).unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    // buffer [10]
    assert_eq!(log[0].1, 0.0);
    // buffer [10, 20]
    assert!((log[1].1 - 5.0).abs() < 1e-9);
}

#[test]
fn test_exactly_one_recompute_per_emission() {
    let mut graph = Graph::new();
    let price = graph.add_source("price").unwrap();
    let sma = graph.add_node("sma3", Sma::new(3).unwrap()).unwrap();
    graph.bind(price, sma).unwrap();

    for (i, x) in [4.0, 8.0, 6.0, 10.0, 2.0].into_iter().enumerate() {
        graph.emit(price, x).unwrap();
        assert_eq!(graph.emissions(price), i as u64 + 1);
        assert_eq!(graph.emissions(sma), i as u64 + 1);
        // The new sample is already in the window when the output is derived.
        assert_eq!(graph.last(price, 0), Some(x));
    }
    assert!((graph[sma] - 6.0).abs() < 1e-9);
}

#[test]
fn test_fan_out_completes_first_branch_before_second() {
    let log: Log = Arc::default();
    let mut graph = Graph::new();
    let a = graph.add_source("a").unwrap();
    let b1 = graph.add_node("b1", Map::new("double", |x| x * 2.0)).unwrap();
    let c1 = graph.add_node("c1", Map::new("inc", |x| x + 1.0)).unwrap();
    let b2 = graph.add_node("b2", Map::new("neg", |x| -x)).unwrap();

    graph.bind(a, b1).unwrap();
    graph.bind(a, b2).unwrap();
    graph.bind(b1, c1).unwrap();
    record(&mut graph, b1, &log);
    record(&mut graph, c1, &log);
    record(&mut graph, b2, &log);

    graph.emit(a, 3.0).unwrap();

    let names: Vec<String> = log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
    // b1 notifies c1 (its first subscriber) before its own sink
    assert_eq!(names, vec!["c1", "b1", "b2"]);
    assert_eq!(graph[c1], 7.0);
    assert_eq!(graph[b2], -3.0);
}

#[test]
fn test_diamond_recomputes_once_per_path() {
    let mut graph = Graph::new();
    let a = graph.add_source("a").unwrap();
    let left = graph.add_node("left", Map::new("id", |x| x)).unwrap();
    let right = graph.add_node("right", Map::new("half", |x| x / 2.0)).unwrap();
    let spread = graph.add_node("spread", Spread::new()).unwrap();

    graph.bind(a, left).unwrap();
    graph.bind(a, right).unwrap();
    assert_eq!(graph.bind(left, spread).unwrap(), 0);
    assert_eq!(graph.bind(right, spread).unwrap(), 1);

    // First pass: the left path arrives before the right has a value.
    graph.emit(a, 10.0).unwrap();
    assert_eq!(graph.emissions(spread), 1);
    assert_eq!(graph[spread], 5.0);

    // Second pass: both paths fire, the first against the stale right value.
    graph.emit(a, 20.0).unwrap();
    assert_eq!(graph.emissions(spread), 3);
    assert_eq!(graph.last(spread, 0), Some(10.0));
    assert_eq!(graph.terminals(), vec![spread]);
}

#[test]
fn test_failed_node_halts_only_its_branch() {
    let log: Log = Arc::default();
    let mut graph = Graph::new();
    let num = graph.add_source("num").unwrap();
    let den = graph.add_source("den").unwrap();
    let ratio = graph.add_node("ratio", Ratio::new()).unwrap();
    let scaled = graph.add_node("scaled", Map::new("pct", |x| x * 100.0)).unwrap();
    let den_sma = graph.add_node("den_sma", Sma::new(2).unwrap()).unwrap();

    graph.bind(num, ratio).unwrap();
    graph.bind(den, ratio).unwrap();
    graph.bind(ratio, scaled).unwrap();
    graph.bind(den, den_sma).unwrap();
    record(&mut graph, scaled, &log);

    graph.emit(num, 1.0).unwrap();
    graph.emit(den, 4.0).unwrap();
    assert_eq!(graph[scaled], 25.0);

    let err = graph.emit(den, 0.0).unwrap_err();
    match err {
        GraphError::Propagation { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].node, ratio);
            assert!(matches!(
                failures[0].error,
                IndicatorError::InvalidSample { .. }
            ));
        }
        other => panic!("unexpected error {other:?}"),
    }

    // No NaN or infinity reached downstream; the sibling branch still ran.
    assert_eq!(graph[ratio], 0.25);
    assert_eq!(graph[scaled], 25.0);
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(graph[den_sma], 2.0);

    graph.emit(den, 2.0).unwrap();
    assert_eq!(graph[scaled], 50.0);
}

#[test]
fn test_overflowing_deviation_is_reported_not_zeroed() {
    let mut graph = Graph::new();
    let price = graph.add_source("price").unwrap();
    let std2 = graph.add_node("std2", StdDev::new(2).unwrap()).unwrap();
    graph.bind(price, std2).unwrap();

    graph.emit(price, 1e200).unwrap();
    assert_eq!(graph[std2], 0.0);

    match graph.emit(price, -1e200) {
        Err(GraphError::Propagation { failures }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].node, std2);
        }
        other => panic!("unexpected result {other:?}"),
    }
    // The source took the sample; the stddev node kept its last good output.
    assert_eq!(graph[price], -1e200);
    assert_eq!(graph.emissions(std2), 1);

    graph.emit(price, 1e200).unwrap();
    assert_eq!(graph[std2], 0.0);
    assert_eq!(graph.emissions(std2), 2);
}

#[test]
fn test_composed_indicator_matches_direct_computation() {
    let mut graph = Graph::new();
    let price = graph.add_source("price").unwrap();
    let sma = graph.add_node("sma4", Sma::new(4).unwrap()).unwrap();
    let dev = graph.add_node("dev3", StdDev::new(3).unwrap()).unwrap();
    graph.bind(price, sma).unwrap();
    graph.bind(sma, dev).unwrap();

    let mut sma_ref = WindowBuffer::new(4).unwrap();
    let mut dev_ref = WindowBuffer::new(3).unwrap();

    for i in 0..200 {
        let x = 100.0 + (i as f64 * 0.21).cos() * 3.0;
        graph.emit(price, x).unwrap();

        sma_ref.push(x).unwrap();
        dev_ref.push(sma_ref.mean().unwrap()).unwrap();
    }

    assert!((graph[sma] - sma_ref.mean().unwrap()).abs() < 1e-9);
    assert!((graph[dev] - dev_ref.std_dev().unwrap()).abs() < 1e-9);
}

#[test]
fn test_graph_from_toml_spec() {
    let spec: GraphSpec = toml::from_str(
        r#"
        history = 4

        [[sources]]
        name = "close"

        [[sources]]
        name = "volume"
        field = "volume"

        [[indicators]]
        name = "std3"
        kind = "stddev"
        inputs = ["close"]
        params = { window = 3 }

        [[indicators]]
        name = "vol_sma"
        kind = "sma"
        inputs = ["volume"]
        "#,
    )
    .unwrap();

    let mut built = spec.build(&IndicatorRegistry::new()).unwrap();
    let close = built.source("close").unwrap();
    let std3 = built.graph.node_id("std3").unwrap();

    for x in [1.0, 2.0, 3.0, 4.0] {
        built.graph.emit(close, x).unwrap();
    }
    assert!((built.graph[std3] - (2.0f64 / 3.0).sqrt()).abs() < 1e-9);
    assert!((built.graph.last(std3, 3).unwrap() - 0.0).abs() < 1e-12);
    assert_eq!(built.outputs.len(), 2);
    assert_eq!(
        built.sources[1].1,
        trading_core::types::PriceField::Volume
    );
}

#[test]
fn test_host_serializes_concurrent_feeds() {
    let mut graph = Graph::new();
    let a = graph.add_source("a").unwrap();
    let b = graph.add_source("b").unwrap();
    let spread = graph.add_node("spread", Spread::new()).unwrap();
    graph.bind(a, spread).unwrap();
    graph.bind(b, spread).unwrap();
    graph.emit(a, 1.0).unwrap();
    graph.emit(b, 2.0).unwrap();

    let graph = Arc::new(Mutex::new(graph));
    let handles: Vec<_> = [(a, 1.0), (b, 2.0)]
        .into_iter()
        .map(|(source, value)| {
            let graph = Arc::clone(&graph);
            thread::spawn(move || {
                for _ in 0..100 {
                    graph.lock().unwrap().emit(source, value).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let graph = graph.lock().unwrap();
    assert_eq!(graph.emissions(a) + graph.emissions(b), 202);
    // Every emission after both sides are seeded recomputes the spread.
    assert_eq!(graph.emissions(spread), 201);
    assert_eq!(graph[spread], -1.0);
}
