mod bootstrap_helpers;
mod event_ingress;
mod ingress_signature;
mod startup;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use pipewatch_cli::Cli;

use crate::bootstrap_helpers::init_tracing;
use crate::startup::run_cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}
