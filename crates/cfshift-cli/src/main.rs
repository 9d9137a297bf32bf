//! cfshift CLI
//!
//! Converts CloudFormation templates into Terraform configurations.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

/// cfshift - CloudFormation to Terraform converter
#[derive(Parser)]
#[command(name = "cfshift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CloudFormation template to Terraform
    Convert {
        /// Path to the CloudFormation template
        template: String,

        /// Output file for the generated Terraform
        #[arg(short, long, default_value = "main.tf")]
        output: String,
    },

    /// Parse a template and report what would be converted
    Validate {
        /// Path to the CloudFormation template
        template: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Convert { template, output } => {
            commands::convert::run(&template, &output)?;
        }
        Commands::Validate { template } => {
            commands::validate::run(&template)?;
        }
    }

    Ok(())
}
