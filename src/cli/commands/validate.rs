//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use trading_config::load_config;
use trading_indicators::IndicatorRegistry;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    let registry = IndicatorRegistry::new();
    let built = match config.graph.build(&registry) {
        Ok(built) => built,
        Err(e) => {
            println!("Graph error: {}", e);
            return Err(e.into());
        }
    };

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("History: {}", config.graph.history);
    println!("Indicators: {}", config.graph.indicators.len());

    println!();
    println!("Sources:");
    for source in &config.graph.sources {
        println!("  {:<20} {}", source.name, source.field);
    }

    println!();
    println!("Outputs:");
    for &id in &built.outputs {
        let kind = built.graph.indicator(id).map_or("source", |i| i.name());
        println!("  {:<20} {}", built.graph.name(id).unwrap_or_default(), kind);
    }

    Ok(())
}
