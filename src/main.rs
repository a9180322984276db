use agclimate_processor::cli::{init_logging, run, Cli};
use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    run(cli).await.context("pipeline stage failed")
}
