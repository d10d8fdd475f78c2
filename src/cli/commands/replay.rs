//! Replay command implementation.
//!
//! Each feed is read on its own task and forwarded over a channel; the
//! consumer owns the graph and is the only writer.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trading_config::load_config;
use trading_core::error::GraphError;
use trading_core::types::{NodeId, PriceField};
use trading_data::load_csv;
use trading_indicators::{Graph, IndicatorRegistry};

use crate::cli::ReplayArgs;

/// A CSV file and the sources its bars feed.
struct Feed {
    path: PathBuf,
    targets: Vec<(NodeId, PriceField)>,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    source: NodeId,
    value: f64,
}

#[derive(Debug, Default, Serialize)]
struct ReplayReport {
    samples: u64,
    /// Samples refused at a source (non-finite values)
    rejected: u64,
    /// Node recomputes that failed
    failures: u64,
    outputs: Vec<OutputValue>,
}

#[derive(Debug, Serialize)]
struct OutputValue {
    name: String,
    value: Option<f64>,
    emissions: u64,
}

impl ReplayReport {
    fn record(&mut self, result: Result<(), GraphError>) {
        self.samples += 1;
        match result {
            Ok(()) => {}
            Err(GraphError::Propagation { failures }) => {
                for failure in &failures {
                    warn!(node = %failure.node, "Recompute failed: {}", failure);
                }
                self.failures += failures.len() as u64;
            }
            Err(e) => {
                warn!("Sample rejected: {}", e);
                self.rejected += 1;
            }
        }
    }

    fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("Replay Summary\n");
        out.push_str("═══════════════════════════════════════════════════════════\n");
        out.push_str(&format!("  Samples:   {}\n", self.samples));
        out.push_str(&format!("  Rejected:  {}\n", self.rejected));
        out.push_str(&format!("  Failures:  {}\n", self.failures));
        out.push('\n');
        for output in &self.outputs {
            let value = output
                .value
                .map_or_else(|| "-".to_string(), |v| format!("{:.6}", v));
            out.push_str(&format!(
                "  {:<20} {:>18}  ({} emissions)\n",
                output.name, value, output.emissions
            ));
        }
        out
    }
}

pub async fn run(args: ReplayArgs, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;

    let registry = IndicatorRegistry::new();
    let built = config
        .graph
        .build(&registry)
        .context("Failed to build indicator graph")?;

    let feeds = match &args.data {
        Some(path) => vec![Feed {
            path: path.clone(),
            targets: built.sources.clone(),
        }],
        None => args
            .feeds
            .iter()
            .map(|feed| -> Result<Feed, GraphError> {
                let id = built.source(&feed.source)?;
                let field = built
                    .sources
                    .iter()
                    .find(|(source, _)| *source == id)
                    .map(|(_, field)| *field)
                    .unwrap_or_default();
                Ok(Feed {
                    path: feed.path.clone(),
                    targets: vec![(id, field)],
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()
            .context("Unknown feed source")?,
    };

    for feed in &feeds {
        if !feed.path.exists() {
            anyhow::bail!("Feed file '{}' does not exist", feed.path.display());
        }
    }

    let mut graph = built.graph;
    let (tx, mut rx) = mpsc::channel(args.buffer.max(1));
    let readers: Vec<JoinHandle<Result<usize>>> = feeds
        .into_iter()
        .map(|feed| tokio::spawn(read_feed(feed, tx.clone())))
        .collect();
    // Channel closes once every reader is done
    drop(tx);

    info!(feeds = readers.len(), nodes = graph.len(), "Starting replay");

    let mut report = ReplayReport::default();
    while let Some(sample) = rx.recv().await {
        report.record(graph.emit(sample.source, sample.value));
    }

    for reader in readers {
        let bars = reader.await.context("Feed reader panicked")??;
        debug!(bars, "Feed finished");
    }

    report.outputs = collect_outputs(&graph, &built.outputs);
    info!(
        samples = report.samples,
        rejected = report.rejected,
        failures = report.failures,
        "Replay complete"
    );

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => println!("{}", report.summary()),
    }

    Ok(())
}

/// Load a feed and forward every bar's fields, in file order.
async fn read_feed(feed: Feed, tx: mpsc::Sender<Sample>) -> Result<usize> {
    let path = feed.path.clone();
    let bars = tokio::task::spawn_blocking(move || load_csv(path))
        .await?
        .with_context(|| format!("Failed to load {}", feed.path.display()))?;

    info!(path = %feed.path.display(), bars = bars.len(), "Loaded feed");

    for bar in &bars {
        for &(source, field) in &feed.targets {
            let sample = Sample {
                source,
                value: bar.field(field),
            };
            if tx.send(sample).await.is_err() {
                warn!(path = %feed.path.display(), "Graph consumer stopped; abandoning feed");
                return Ok(bars.len());
            }
        }
    }

    Ok(bars.len())
}

fn collect_outputs(graph: &Graph, outputs: &[NodeId]) -> Vec<OutputValue> {
    outputs
        .iter()
        .map(|&id| OutputValue {
            name: graph.name(id).unwrap_or_default().to_string(),
            value: graph.value(id),
            emissions: graph.emissions(id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::error::{IndicatorError, NodeFailure};

    #[test]
    fn test_report_counts_outcomes() {
        let mut report = ReplayReport::default();
        report.record(Ok(()));
        report.record(Err(GraphError::Indicator(IndicatorError::InvalidSample {
            value: f64::NAN,
        })));
        report.record(Err(GraphError::Propagation {
            failures: vec![NodeFailure {
                node: NodeId::new(2),
                name: "ratio".to_string(),
                error: IndicatorError::InvalidSample {
                    value: f64::INFINITY,
                },
            }],
        }));

        assert_eq!(report.samples, 3);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.failures, 1);
    }

    #[test]
    fn test_collect_outputs() {
        let mut graph = Graph::new();
        let price = graph.add_source("price").unwrap();
        let sma = graph
            .add_node("sma2", trading_indicators::Sma::new(2).unwrap())
            .unwrap();
        graph.bind(price, sma).unwrap();
        graph.emit(price, 1.0).unwrap();
        graph.emit(price, 3.0).unwrap();

        let outputs = collect_outputs(&graph, &[sma]);
        assert_eq!(outputs[0].name, "sma2");
        assert_eq!(outputs[0].value, Some(2.0));
        assert_eq!(outputs[0].emissions, 2);

        let report = ReplayReport {
            outputs,
            ..Default::default()
        };
        assert!(report.summary().contains("sma2"));
    }

    #[tokio::test]
    async fn test_non_finite_rows_counted_as_rejected() {
        let path = std::env::temp_dir().join(format!("replay-nan-{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "timestamp,close\n1705312800,1.0\n1705312860,NaN\n1705312920,3.0\n",
        )
        .unwrap();

        let mut graph = Graph::new();
        let close = graph.add_source("close").unwrap();
        let sma = graph
            .add_node("sma2", trading_indicators::Sma::new(2).unwrap())
            .unwrap();
        graph.bind(close, sma).unwrap();

        let feed = Feed {
            path: path.clone(),
            targets: vec![(close, PriceField::Close)],
        };
        let (tx, mut rx) = mpsc::channel(8);
        read_feed(feed, tx).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let mut report = ReplayReport::default();
        while let Some(sample) = rx.recv().await {
            report.record(graph.emit(sample.source, sample.value));
        }

        assert_eq!(report.samples, 3);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.failures, 0);
        assert_eq!(graph.value(sma), Some(2.0));
    }

    #[tokio::test]
    async fn test_read_feed_forwards_every_field() {
        let path = std::env::temp_dir().join(format!("replay-feed-{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "timestamp,open,high,low,close,volume\n\
             1705312800,1,2,0.5,1.5,10\n\
             1705312860,1.5,3,1,2.5,20\n",
        )
        .unwrap();

        let close = NodeId::new(0);
        let volume = NodeId::new(1);
        let feed = Feed {
            path: path.clone(),
            targets: vec![(close, PriceField::Close), (volume, PriceField::Volume)],
        };
        let (tx, mut rx) = mpsc::channel(8);
        let bars = read_feed(feed, tx).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let mut received = Vec::new();
        while let Some(sample) = rx.recv().await {
            received.push((sample.source, sample.value));
        }
        assert_eq!(bars, 2);
        assert_eq!(
            received,
            vec![(close, 1.5), (volume, 10.0), (close, 2.5), (volume, 20.0)]
        );
    }
}
