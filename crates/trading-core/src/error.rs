//! Error types for the indicator engine.

use thiserror::Error;

use crate::types::NodeId;

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    /// A window or period that cannot describe a real indicator (e.g. zero).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A statistic was requested before enough samples arrived.
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    /// NaN or infinite value, or one too large for running statistics.
    /// Rejected before any state is touched.
    #[error("Invalid sample: {value} cannot be used")]
    InvalidSample { value: f64 },

    /// A node's output was read before anything was emitted to it.
    #[error("Node '{node}' has not emitted a value yet")]
    UninitializedValue { node: String },
}

/// One node's failed recompute within a propagation pass.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{name} ({node}): {error}")]
pub struct NodeFailure {
    pub node: NodeId,
    pub name: String,
    pub error: IndicatorError,
}

/// Graph wiring and propagation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Unknown node name: {0}")]
    UnknownName(String),

    #[error("Duplicate node name: {0}")]
    DuplicateName(String),

    #[error("Node '{0}' is a source and cannot be bound to an upstream")]
    NotDerived(String),

    #[error("Node '{node}' has {arity} input(s), port {port} is out of range")]
    PortOutOfRange {
        node: String,
        port: usize,
        arity: usize,
    },

    #[error("Input port {port} of node '{node}' is already bound")]
    PortAlreadyBound { node: String, port: usize },

    #[error("Binding '{upstream}' into '{downstream}' would create a cycle")]
    Cycle {
        upstream: String,
        downstream: String,
    },

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("{} node(s) failed during propagation: {}", failures.len(), format_failures(failures))]
    Propagation { failures: Vec<NodeFailure> },
}

fn format_failures(failures: &[NodeFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No data available at {0}")]
    NoDataAvailable(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagation_message_lists_failures() {
        let err = GraphError::Propagation {
            failures: vec![NodeFailure {
                node: NodeId::new(3),
                name: "ratio".to_string(),
                error: IndicatorError::InvalidSample {
                    value: f64::INFINITY,
                },
            }],
        };

        let msg = err.to_string();
        assert!(msg.starts_with("1 node(s) failed"));
        assert!(msg.contains("ratio (#3)"));
    }

    #[test]
    fn test_indicator_error_converts() {
        let err: GraphError = IndicatorError::InsufficientData {
            required: 1,
            available: 0,
        }
        .into();
        assert!(matches!(err, GraphError::Indicator(_)));
        assert_eq!(err.to_string(), "Insufficient data: need 1 points, have 0");
    }
}
