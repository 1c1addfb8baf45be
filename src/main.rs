//! `strataloop` binary entry point: parses arguments, initializes
//! structured logging, and dispatches to the CLI subcommand handlers in
//! `strataloop::cli`.

use clap::Parser;
use strataloop::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strataloop=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = cli::dispatch(cli).await;
    std::process::exit(code);
}
