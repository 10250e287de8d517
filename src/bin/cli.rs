//! stargraph CLI - stargate graph analysis.
//!
//! Usage:
//!   stargraph -d universe.json stats
//!   stargraph -d universe.json flow --edges
//!   stargraph -d universe.json route <from> <to> --min-security 0
//!   stargraph -d universe.json entries <origin>
//!   stargraph -d universe.json search <origin> -d 3 -r "Heavy Water"
//!
//! Results go to stdout as JSON; logs go to stderr (`RUST_LOG`).

use anyhow::{Context, Result};
use clap::Parser;

use stargraph::cli::{run, Cli};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let output = run(cli).with_context(|| format!("dataset {}", cli.dataset.display()))?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
