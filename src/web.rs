#![cfg(not(tarpaulin_include))]

use clap::Parser;
use invoice_ledger::app;
use invoice_ledger::config::Config;

/// Main entry point for the web application
///
/// Reads settings from flags and `LEDGER_*` environment variables, sets up
/// logging (`RUST_LOG`, default `info`) and serves until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    app::run(config).await
}
