//! Declarative graph construction.
//!
//! A [`GraphSpec`] lists source nodes and indicator nodes by name. Every
//! reference is checked and every indicator's parameters are decoded before
//! the first node is created, so a bad description never yields a half-built graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::info;

use crate::graph::Graph;
use crate::registry::IndicatorRegistry;
use trading_core::error::{GraphError, IndicatorError};
use trading_core::types::{NodeId, PriceField};

/// A node fed by the market-data transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    /// Candle field the source emits
    #[serde(default)]
    pub field: PriceField,
}

/// A derived node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    /// Registered indicator kind
    pub kind: String,
    /// Upstream node names, one per input port
    pub inputs: Vec<String>,
    #[serde(default)]
    pub params: Value,
}

/// Whole-graph description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSpec {
    /// Past outputs retained per node
    #[serde(default = "default_history")]
    pub history: usize,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub indicators: Vec<NodeSpec>,
    /// Nodes the host reports; empty means every terminal node
    #[serde(default)]
    pub outputs: Vec<String>,
}

fn default_history() -> usize {
    1
}

impl Default for GraphSpec {
    fn default() -> Self {
        Self {
            history: default_history(),
            sources: Vec::new(),
            indicators: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

/// A wired graph plus the handles a host needs to drive it.
#[derive(Debug)]
pub struct BuiltGraph {
    pub graph: Graph,
    /// Source handles with the candle field each one emits
    pub sources: Vec<(NodeId, PriceField)>,
    pub outputs: Vec<NodeId>,
}

impl BuiltGraph {
    /// Handle of the source called `name`.
    pub fn source(&self, name: &str) -> Result<NodeId, GraphError> {
        let id = self.graph.node_id(name)?;
        if self.sources.iter().any(|(source, _)| *source == id) {
            Ok(id)
        } else {
            Err(GraphError::UnknownName(name.to_string()))
        }
    }
}

impl GraphSpec {
    /// Check names, references, kinds and arities.
    pub fn validate(&self, registry: &IndicatorRegistry) -> Result<(), GraphError> {
        let mut declared = HashSet::new();

        for source in &self.sources {
            if !declared.insert(source.name.as_str()) {
                return Err(GraphError::DuplicateName(source.name.clone()));
            }
        }

        for node in &self.indicators {
            let info = registry.get(&node.kind).ok_or_else(|| {
                IndicatorError::InvalidConfiguration(format!(
                    "{}: unknown indicator kind '{}'",
                    node.name, node.kind
                ))
            })?;
            if node.inputs.len() != info.arity {
                return Err(IndicatorError::InvalidConfiguration(format!(
                    "{}: '{}' takes {} input(s), {} given",
                    node.name,
                    node.kind,
                    info.arity,
                    node.inputs.len()
                ))
                .into());
            }
            // Inputs must be declared earlier, which also rules out cycles.
            for input in &node.inputs {
                if !declared.contains(input.as_str()) {
                    return Err(GraphError::UnknownName(input.clone()));
                }
            }
            if !declared.insert(node.name.as_str()) {
                return Err(GraphError::DuplicateName(node.name.clone()));
            }
        }

        for output in &self.outputs {
            if !declared.contains(output.as_str()) {
                return Err(GraphError::UnknownName(output.clone()));
            }
        }

        Ok(())
    }

    /// Validate, construct every indicator, and wire the graph.
    pub fn build(&self, registry: &IndicatorRegistry) -> Result<BuiltGraph, GraphError> {
        self.validate(registry)?;

        let indicators = self
            .indicators
            .iter()
            .map(|node| {
                registry.create(&node.kind, node.params.clone()).map_err(|e| match e {
                    IndicatorError::InvalidConfiguration(msg) => {
                        IndicatorError::InvalidConfiguration(format!("{}: {}", node.name, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut graph = Graph::with_history(self.history);
        let mut sources = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            sources.push((graph.add_source(source.name.as_str())?, source.field));
        }

        for (node, indicator) in self.indicators.iter().zip(indicators) {
            let id = graph.add_boxed(node.name.as_str(), indicator)?;
            for (port, input) in node.inputs.iter().enumerate() {
                let upstream = graph.node_id(input)?;
                graph.bind_port(upstream, id, port)?;
            }
        }

        let outputs = if self.outputs.is_empty() {
            graph.terminals()
        } else {
            self.outputs
                .iter()
                .map(|name| graph.node_id(name))
                .collect::<Result<Vec<_>, _>>()?
        };

        info!(
            sources = sources.len(),
            indicators = self.indicators.len(),
            outputs = outputs.len(),
            "Built indicator graph"
        );

        Ok(BuiltGraph {
            graph,
            sources,
            outputs,
        })
    }
}
