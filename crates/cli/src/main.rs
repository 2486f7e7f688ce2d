//! Used car price estimator CLI
//!
//! A command-line client for the price server: list the form choices,
//! price a single car, or price a whole CSV file.

mod client;
mod commands;
mod config;
mod output;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{batch, health, options, predict};
use std::path::PathBuf;

/// Saudi used car price estimator CLI
#[derive(Parser)]
#[command(name = "pricer")]
#[command(author, version, about = "CLI for the Saudi used car price estimator", long_about = None)]
pub struct Cli {
    /// Price server URL (falls back to ~/.config/pricer/config.json, then http://localhost:8080)
    #[arg(long, env = "PRICER_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List selection choices and numeric bounds
    Options,

    /// Estimate the price of a single car
    Predict {
        #[arg(long)]
        make: String,

        /// Model / trim, e.g. Camry
        #[arg(long)]
        model: String,

        #[arg(long)]
        year: i64,

        /// Engine size in liters
        #[arg(long, default_value_t = 2.0)]
        engine_size: f64,

        /// Mileage in kilometers
        #[arg(long, default_value_t = 80_000)]
        mileage: i64,

        #[arg(long)]
        region: String,

        /// Automatic or Manual
        #[arg(long)]
        gear_type: String,

        /// Saudi, Gulf Arabic, Other or Unknown
        #[arg(long)]
        origin: String,

        /// Standard, Semi Full or Full
        #[arg(long)]
        options: String,
    },

    /// Validate, preview and price a CSV file
    Batch {
        /// CSV file with at least the nine listing columns
        input: PathBuf,

        /// Where to write the priced CSV
        #[arg(long, short, default_value = batch::DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,

        /// Number of rows to preview
        #[arg(long, default_value_t = 5)]
        preview_rows: usize,
    },

    /// Show server health
    Health,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url);
    let format = config.resolve_format(cli.format)?;

    if cli.verbose {
        output::print_info(&format!("Using price server at {}", api_url));
    }

    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Options => {
            options::show_options(&client, format).await?;
        }
        Commands::Predict {
            make,
            model,
            year,
            engine_size,
            mileage,
            region,
            gear_type,
            origin,
            options,
        } => {
            let listing = client::CarListing {
                make,
                model,
                year,
                engine_size,
                mileage,
                region,
                gear_type,
                origin,
                options,
            };
            predict::predict_price(&client, &listing, format, cli.verbose).await?;
        }
        Commands::Batch {
            input,
            output,
            yes,
            preview_rows,
        } => {
            batch::run_batch(
                &client,
                batch::BatchOptions {
                    input: &input,
                    output: &output,
                    assume_yes: yes,
                    preview_rows,
                    format,
                    verbose: cli.verbose,
                },
            )
            .await?;
        }
        Commands::Health => {
            health::show_health(&client, format).await?;
        }
    }

    Ok(())
}
