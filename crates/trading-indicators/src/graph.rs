//! Push-based dataflow graph of streaming values.
//!
//! Nodes live in an arena and refer to each other through [`NodeId`]
//! handles. A node is either a *source* (fed from outside through
//! [`Graph::emit`]) or a *derived* node driven by a [`StreamingIndicator`].
//!
//! Emission is synchronous and depth-first: `emit` sets the node's value,
//! then notifies each subscriber in registration order, and a derived
//! subscriber that produces an output re-emits before the next sibling is
//! notified. `emit` returns only once the whole downstream fan-out has run.
//! Nothing is batched or deduplicated, so a node reached through two paths
//! (a diamond) recomputes once per path.
//!
//! The topology is meant to be wired before steady-state emission. Binding
//! is refused if it would close a cycle. The graph does no locking of its
//! own; hosts feeding it from several threads must serialize calls, e.g. by
//! owning it from a single task.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::Index;

use tracing::{debug, trace, warn};
use trading_core::error::{GraphError, IndicatorError, NodeFailure};
use trading_core::traits::StreamingIndicator;
use trading_core::types::{ensure_finite, NodeId};

/// Terminal consumer of a node's emissions.
pub type SinkFn = Box<dyn FnMut(NodeId, f64) + Send>;

/// Entry in a node's ordered subscriber list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscriber {
    /// Input `port` of a derived node.
    Node { id: NodeId, port: usize },
    /// A registered sink closure.
    Sink(usize),
}

struct Node {
    name: String,
    /// `None` for sources.
    indicator: Option<Box<dyn StreamingIndicator>>,
    /// Upstream bound to each input port (bookkeeping only).
    inputs: Vec<Option<NodeId>>,
    subscribers: Vec<Subscriber>,
    value: Option<f64>,
    history: VecDeque<f64>,
    history_len: usize,
    emissions: u64,
}

impl Node {
    fn new(
        name: String,
        indicator: Option<Box<dyn StreamingIndicator>>,
        history_len: usize,
    ) -> Self {
        let arity = indicator.as_ref().map_or(0, |i| i.arity());
        Self {
            name,
            indicator,
            inputs: vec![None; arity],
            subscribers: Vec::new(),
            value: None,
            history: VecDeque::with_capacity(history_len),
            history_len,
            emissions: 0,
        }
    }

    fn record(&mut self, value: f64) {
        self.value = Some(value);
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(value);
        self.emissions += 1;
    }
}

/// Arena-backed indicator graph.
pub struct Graph {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
    sinks: Vec<SinkFn>,
    history_len: usize,
}

impl Graph {
    /// Create an empty graph keeping only the current value per node.
    pub fn new() -> Self {
        Self::with_history(1)
    }

    /// Create an empty graph where each node remembers its last `len` outputs.
    pub fn with_history(len: usize) -> Self {
        Self {
            nodes: Vec::new(),
            names: HashMap::new(),
            sinks: Vec::new(),
            history_len: len.max(1),
        }
    }

    /// Add a source node fed through [`emit`](Self::emit).
    pub fn add_source(&mut self, name: impl Into<String>) -> Result<NodeId, GraphError> {
        self.insert(name.into(), None)
    }

    /// Add a derived node computed by `indicator`.
    pub fn add_node<I>(
        &mut self,
        name: impl Into<String>,
        indicator: I,
    ) -> Result<NodeId, GraphError>
    where
        I: StreamingIndicator + 'static,
    {
        self.add_boxed(name, Box::new(indicator))
    }

    /// Add a derived node from an already boxed indicator.
    pub fn add_boxed(
        &mut self,
        name: impl Into<String>,
        indicator: Box<dyn StreamingIndicator>,
    ) -> Result<NodeId, GraphError> {
        self.insert(name.into(), Some(indicator))
    }

    fn insert(
        &mut self,
        name: String,
        indicator: Option<Box<dyn StreamingIndicator>>,
    ) -> Result<NodeId, GraphError> {
        if self.names.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }
        let id = NodeId::new(self.nodes.len());
        debug!(
            node = %name,
            %id,
            kind = indicator.as_ref().map_or("source", |i| i.name()),
            "Adding node"
        );
        self.names.insert(name.clone(), id);
        self.nodes.push(Node::new(name, indicator, self.history_len));
        Ok(id)
    }

    /// Change how many past outputs `id` retains.
    pub fn set_history(&mut self, id: NodeId, len: usize) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        node.history_len = len.max(1);
        while node.history.len() > node.history_len {
            node.history.pop_front();
        }
        Ok(())
    }

    /// Look up a node by name.
    pub fn node_id(&self, name: &str) -> Result<NodeId, GraphError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownName(name.to_string()))
    }

    fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(id.index()).ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(id.index()).ok_or(GraphError::UnknownNode(id))
    }

    /// Register `subscriber` to receive future emissions of `upstream`.
    ///
    /// Registration order defines notification order.
    pub fn subscribe(
        &mut self,
        upstream: NodeId,
        subscriber: Subscriber,
    ) -> Result<(), GraphError> {
        self.node(upstream)?;

        match subscriber {
            Subscriber::Sink(index) => {
                if index >= self.sinks.len() {
                    return Err(GraphError::UnknownNode(upstream));
                }
            }
            Subscriber::Node { id, port } => {
                let downstream = self.node(id)?;
                if downstream.indicator.is_none() {
                    return Err(GraphError::NotDerived(downstream.name.clone()));
                }
                match downstream.inputs.get(port) {
                    None => {
                        return Err(GraphError::PortOutOfRange {
                            node: downstream.name.clone(),
                            port,
                            arity: downstream.inputs.len(),
                        })
                    }
                    Some(Some(_)) => {
                        return Err(GraphError::PortAlreadyBound {
                            node: downstream.name.clone(),
                            port,
                        })
                    }
                    Some(None) => {}
                }
                if self.reaches(id, upstream) {
                    return Err(GraphError::Cycle {
                        upstream: self.nodes[upstream.index()].name.clone(),
                        downstream: downstream.name.clone(),
                    });
                }
                self.nodes[id.index()].inputs[port] = Some(upstream);
            }
        }

        debug!(
            upstream = %self.nodes[upstream.index()].name,
            ?subscriber,
            "Subscribing"
        );
        self.nodes[upstream.index()].subscribers.push(subscriber);
        Ok(())
    }

    /// Whether emissions of `from` can reach `to`.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            for subscriber in &self.nodes[id.index()].subscribers {
                if let Subscriber::Node { id: next, .. } = subscriber {
                    stack.push(*next);
                }
            }
        }
        false
    }

    /// Bind `downstream`'s next free input port to `upstream`.
    ///
    /// # Returns
    /// The port that was bound.
    pub fn bind(&mut self, upstream: NodeId, downstream: NodeId) -> Result<usize, GraphError> {
        let node = self.node(downstream)?;
        if node.indicator.is_none() {
            return Err(GraphError::NotDerived(node.name.clone()));
        }
        let port = node
            .inputs
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| GraphError::PortOutOfRange {
                node: node.name.clone(),
                port: node.inputs.len(),
                arity: node.inputs.len(),
            })?;
        self.bind_port(upstream, downstream, port)?;
        Ok(port)
    }

    /// Bind a specific input port of `downstream` to `upstream`.
    pub fn bind_port(
        &mut self,
        upstream: NodeId,
        downstream: NodeId,
        port: usize,
    ) -> Result<(), GraphError> {
        self.subscribe(upstream, Subscriber::Node { id: downstream, port })
    }

    /// Register a terminal consumer of `upstream`'s emissions.
    pub fn sink<F>(&mut self, upstream: NodeId, sink: F) -> Result<(), GraphError>
    where
        F: FnMut(NodeId, f64) + Send + 'static,
    {
        self.node(upstream)?;
        self.sinks.push(Box::new(sink));
        self.subscribe(upstream, Subscriber::Sink(self.sinks.len() - 1))
    }

    /// Push a new value into `id` and propagate it through the graph.
    ///
    /// Non-finite values are rejected before anything is touched. A derived
    /// node whose recompute fails does not emit for this sample, but the
    /// rest of the pass still runs; every such failure is reported in
    /// [`GraphError::Propagation`] once the pass is complete.
    pub fn emit(&mut self, id: NodeId, value: f64) -> Result<(), GraphError> {
        self.node(id)?;
        let value = ensure_finite(value)?;

        let mut failures = Vec::new();
        self.publish(id, value, &mut failures);

        if failures.is_empty() {
            Ok(())
        } else {
            Err(GraphError::Propagation { failures })
        }
    }

    fn publish(&mut self, id: NodeId, value: f64, failures: &mut Vec<NodeFailure>) {
        let node = &mut self.nodes[id.index()];
        node.record(value);
        trace!(node = %node.name, value, "Emit");

        // Topology is fixed while a pass runs, so indexing stays valid.
        for i in 0..self.nodes[id.index()].subscribers.len() {
            let subscriber = self.nodes[id.index()].subscribers[i];
            match subscriber {
                Subscriber::Sink(sink) => {
                    let sink = &mut self.sinks[sink];
                    sink(id, value)
                }
                Subscriber::Node { id: child, port } => {
                    self.recompute(child, port, value, failures)
                }
            }
        }
    }

    fn recompute(&mut self, id: NodeId, port: usize, value: f64, failures: &mut Vec<NodeFailure>) {
        let node = &mut self.nodes[id.index()];
        let Some(indicator) = node.indicator.as_mut() else {
            return;
        };

        let result = indicator
            .update(port, value)
            .and_then(|output| output.map(ensure_finite).transpose());

        match result {
            Ok(Some(output)) => self.publish(id, output, failures),
            Ok(None) => trace!(node = %node.name, "Warming up"),
            Err(error) => {
                warn!(node = %node.name, %error, "Recompute failed, halting downstream emission");
                failures.push(NodeFailure {
                    node: id,
                    name: node.name.clone(),
                    error,
                });
            }
        }
    }

    /// Last emitted value, `None` before the first emission.
    pub fn value(&self, id: NodeId) -> Option<f64> {
        self.nodes.get(id.index()).and_then(|n| n.value)
    }

    /// Last emitted value, or `UninitializedValue` before the first emission.
    pub fn current_value(&self, id: NodeId) -> Result<f64, GraphError> {
        let node = self.node(id)?;
        node.value.ok_or_else(|| {
            IndicatorError::UninitializedValue {
                node: node.name.clone(),
            }
            .into()
        })
    }

    /// Output emitted `back` emissions ago (0 = current), within the
    /// node's retained history.
    pub fn last(&self, id: NodeId, back: usize) -> Option<f64> {
        let history = &self.nodes.get(id.index())?.history;
        history.len().checked_sub(back + 1).and_then(|i| history.get(i).copied())
    }

    /// Number of values `id` has emitted.
    pub fn emissions(&self, id: NodeId) -> u64 {
        self.nodes.get(id.index()).map_or(0, |n| n.emissions)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.index()).map(|n| n.name.as_str())
    }

    /// Indicator driving a derived node.
    pub fn indicator(&self, id: NodeId) -> Option<&dyn StreamingIndicator> {
        self.nodes.get(id.index())?.indicator.as_deref()
    }

    /// Subscribers of `id` in notification order.
    pub fn subscribers(&self, id: NodeId) -> &[Subscriber] {
        self.nodes
            .get(id.index())
            .map(|n| n.subscribers.as_slice())
            .unwrap_or_default()
    }

    /// Upstreams bound to `id`, by port. Unbound ports are `None`.
    pub fn upstreams(&self, id: NodeId) -> &[Option<NodeId>] {
        self.nodes
            .get(id.index())
            .map(|n| n.inputs.as_slice())
            .unwrap_or_default()
    }

    /// All node handles in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Nodes no other node subscribes to.
    pub fn terminals(&self) -> Vec<NodeId> {
        self.ids()
            .filter(|&id| {
                !self.nodes[id.index()]
                    .subscribers
                    .iter()
                    .any(|s| matches!(s, Subscriber::Node { .. }))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Clear values, history, counters and indicator state; keep the wiring.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.value = None;
            node.history.clear();
            node.emissions = 0;
            if let Some(indicator) = node.indicator.as_mut() {
                indicator.reset();
            }
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.iter().map(|n| &n.name).collect::<Vec<_>>())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Reads a node's value, panicking if it has never emitted.
impl Index<NodeId> for Graph {
    type Output = f64;

    fn index(&self, id: NodeId) -> &f64 {
        match self.nodes.get(id.index()) {
            Some(Node {
                value: Some(value), ..
            }) => value,
            Some(node) => panic!("node '{}' read before its first emission", node.name),
            None => panic!("unknown node {}", id),
        }
    }
}
