//! Convert command

use anyhow::{Context, Result};
use cfshift_core::{convert, Configuration, Dispatch};

/// Run the convert command
pub fn run(template_path: &str, output_path: &str) -> Result<()> {
    tracing::info!("Converting {}", template_path);

    let source = std::fs::read_to_string(template_path)
        .with_context(|| format!("Failed to read {}", template_path))?;
    let blocks = convert::convert_template(&source).context("Failed to convert template")?;

    let mut config = Configuration::new(output_path.into(), blocks, Dispatch::standard());
    config
        .save()
        .context("Failed to write terraform configuration")?;

    tracing::info!("Wrote {}", output_path);
    Ok(())
}
