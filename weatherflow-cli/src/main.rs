//! Binary crate for the `weatherflow` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and wiring config into the core components
//! - Interactive configuration
//! - Serving the dashboard

use clap::Parser;

mod cli;
mod configure;
mod dashboard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::from_filename("config.env").ok();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weatherflow=info,weatherflow_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
