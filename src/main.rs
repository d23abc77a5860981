mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::app::{Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bosswatch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}
