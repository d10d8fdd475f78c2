//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "streams")]
#[command(author, version, about = "Streaming technical-indicator engine")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level (defaults to the configured level)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay historical candles through the configured graph
    Replay(ReplayArgs),
    /// List available indicator kinds
    Indicators,
    /// Validate configuration and graph wiring
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct ReplayArgs {
    /// Candle CSV feeding every configured source
    #[arg(long, conflicts_with = "feeds", required_unless_present = "feeds")]
    pub data: Option<PathBuf>,

    /// Candle CSV for a single source, as SOURCE=FILE (repeatable)
    #[arg(long = "feed", value_parser = parse_feed)]
    pub feeds: Vec<FeedArg>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,

    /// Channel capacity between feed readers and the graph
    #[arg(long, default_value = "1024")]
    pub buffer: usize,
}

/// One `--feed SOURCE=FILE` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedArg {
    pub source: String,
    pub path: PathBuf,
}

fn parse_feed(s: &str) -> Result<FeedArg, String> {
    match s.split_once('=') {
        Some((source, path)) if !source.is_empty() && !path.is_empty() => Ok(FeedArg {
            source: source.to_string(),
            path: PathBuf::from(path),
        }),
        _ => Err(format!("expected SOURCE=FILE, got '{}'", s)),
    }
}
