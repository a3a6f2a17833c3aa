// server/src/main.rs

// Entry point for the medical records server. Argument parsing and wiring live in the cli module.

use anyhow::Result;
use medrec_server::cli::start_cli;

#[tokio::main]
async fn main() -> Result<()> {
    start_cli().await
}
