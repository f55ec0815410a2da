//! dare - Command-line client for DARE
//!
//! Commands:
//! - robot list|create|show|delete|execute|create-periodical
//! - execution show|delete
//! - periodical show|delete
//! - execute: run a minilanguage robot once

use anyhow::{Context, Result};
use clap::Parser;
use dare::cli::Cli;
use dare::{App, Store, Transport};
use dare_core::Config;
use std::io;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(store) = cli.store {
        config.store_path = Some(store);
    }

    let store_file = config.store_file();
    let store = Store::open(&store_file)
        .with_context(|| format!("Failed to open DARE store: {}", store_file.display()))?;
    let transport = Transport::from_config(&config).context("Failed to set up HTTP client")?;

    let mut app = App::new(store, transport, config.server.clone(), io::stdout().lock());
    app.run(cli.command)
}
