//! Scanferry CLI: scan file trees, hash contents, ship unique records to an
//! HTTP API.

use anyhow::Result;
use clap::Parser;
use scanferry::engine::arg_parser::Cli;
use scanferry::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
