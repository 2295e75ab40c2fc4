//! List presets command.

use anyhow::{Context, Result};
use quant_signals::PresetRegistry;

pub fn run(show: Option<String>) -> Result<()> {
    let registry = PresetRegistry::new();

    if let Some(name) = show {
        let params = registry.create_default(&name)?;
        let rendered = toml::to_string_pretty(&params).context("Failed to render preset")?;
        println!("# preset: {name}");
        println!("{rendered}");
        return Ok(());
    }

    println!("Available Presets");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        let scorer = &info.params.scorer;
        println!("  {}", info.name);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!(
            "  min_score {}  min_confidence {}  min_categories {}",
            scorer.min_score, scorer.min_confidence, scorer.min_categories
        );
        println!();
    }

    println!("Use --preset <name> to select a preset, or --show <name> for every parameter.");
    Ok(())
}
