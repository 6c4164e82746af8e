mod cli {
    pub mod engine {
        pub mod args;
        pub mod run;
    }
    pub mod query {
        pub mod args;
        pub mod read;
        pub mod response;
        pub mod run;
    }
    pub mod cmd;
    pub mod read;
}

use clap::Parser;
use eyre::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::cmd::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli);

    match &cli.command {
        Command::Engine(args) => {
            tracing::info!("Engine Command: {:?}", args);
            cli::engine::run::start(args).await
        }
        Command::Select(query) => {
            tracing::info!("Engine Query: {:?}", query);
            cli::query::run::select(query).await
        }
    }
}

fn init_tracing(cli: &Cli) {
    // RUST_LOG, or `info` when unset.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match &cli.command {
        Command::Engine(_) => builder.init(),
        // Keep stdout for JSON.
        Command::Select(_) => builder.with_writer(std::io::stderr).init(),
    }
}
