use clap::Parser;
use flowsim::cli::{self, Cli};
use flowsim::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;

    cli::run(cli).await
}
