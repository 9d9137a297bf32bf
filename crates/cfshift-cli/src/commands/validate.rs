//! Validate command

use anyhow::{Context, Result};
use cfshift_core::{convert, Block};

/// Run the validate command
pub fn run(template_path: &str) -> Result<()> {
    tracing::info!("Validating {}", template_path);

    let source = std::fs::read_to_string(template_path)
        .with_context(|| format!("Failed to read {}", template_path))?;
    let blocks = convert::convert_template(&source).context("Failed to convert template")?;

    let resources = blocks.iter().filter(|b| matches!(b, Block::Resource(_))).count();
    let variables = blocks.iter().filter(|b| matches!(b, Block::Variable(_))).count();
    let outputs = blocks.iter().filter(|b| matches!(b, Block::Output(_))).count();
    let data_sources = blocks.iter().filter(|b| matches!(b, Block::Data(_))).count();

    tracing::info!("✓ {} resources", resources);
    tracing::info!("✓ {} variables", variables);
    tracing::info!("✓ {} outputs", outputs);
    tracing::info!("✓ {} data sources", data_sources);
    tracing::info!("✓ Template is convertible");

    Ok(())
}
