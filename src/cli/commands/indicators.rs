//! List indicators command.

use anyhow::Result;
use trading_indicators::IndicatorRegistry;

pub async fn run() -> Result<()> {
    let registry = IndicatorRegistry::new();

    println!("Available Indicators");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        let plural = if info.arity == 1 { "" } else { "s" };
        println!("  {} ({} input{})", info.kind, info.arity, plural);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  Defaults: {}", info.default_params);
        println!();
    }

    println!("Use `kind = \"<name>\"` under [[graph.indicators]] to add a node.");
    println!();
    println!("Indicator kinds: {}", registry.kinds().join(", "));

    Ok(())
}
