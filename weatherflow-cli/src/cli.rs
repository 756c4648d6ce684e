use anyhow::{Context, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use weatherflow_core::{
    BlobStore, Config, Fetcher, Namespace, OutputFormat, RawWriter, TimestampSource, Transformer,
    WeatherProvider, latest_object, provider_from_config, store_from_config,
};

use crate::{configure, dashboard};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherflow", version, about = "Weather ETL pipeline and dashboard")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch current conditions for every location and write a raw batch.
    Fetch {
        /// Use the flat city list instead of the state-grouped one.
        #[arg(long)]
        flat: bool,
    },

    /// Transform the latest raw batch.
    Transform {
        /// Output format: "csv" or "json".
        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// Fetch, then transform.
    Run {
        #[arg(long)]
        flat: bool,

        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// Print the latest key in a namespace ("raw" or "transformed").
    Latest { namespace: String },

    /// Serve the dashboard over the latest transformed batch.
    Dashboard {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Interactively store the API key and store settings.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = self.config.as_deref();
        let load = || Config::load(path);

        match self.command {
            Command::Configure => configure::run(path)?,
            Command::Fetch { flat } => {
                let config = load()?;
                let store = store_from_config(&config.store).await?;
                fetch(&config, store, flat).await?;
            }
            Command::Transform { format } => {
                let format = OutputFormat::try_from(format.as_str())?;
                let store = store_from_config(&load()?.store).await?;
                transform(store, format).await?;
            }
            Command::Run { flat, format } => {
                let format = OutputFormat::try_from(format.as_str())?;
                let config = load()?;
                let store = store_from_config(&config.store).await?;
                fetch(&config, store.clone(), flat).await?;
                transform(store, format).await?;
            }
            Command::Latest { namespace } => {
                let namespace = Namespace::try_from(namespace.as_str())?;
                let store = store_from_config(&load()?.store).await?;
                match latest_object(store.as_ref(), namespace).await? {
                    Some(obj) => println!("{}\t{}", obj.key, obj.last_modified.to_rfc3339()),
                    None => println!("No objects found under {}", namespace.prefix()),
                }
            }
            Command::Dashboard { host, port } => {
                let config = load()?;
                let host = host.unwrap_or(config.dashboard.host);
                let port = port.unwrap_or(config.dashboard.port);
                let addr: SocketAddr = format!("{host}:{port}")
                    .parse()
                    .with_context(|| format!("Invalid dashboard address {host}:{port}"))?;

                let store = store_from_config(&config.store).await?;
                dashboard::serve(store, addr).await?;
            }
        }

        Ok(())
    }
}

async fn fetch(config: &Config, store: Arc<dyn BlobStore>, flat: bool) -> anyhow::Result<()> {
    let provider: Arc<dyn WeatherProvider> = provider_from_config(config)?.into();

    let (locations, timestamps) = if flat {
        (config.locations.flat(), TimestampSource::ApiLocalTime)
    } else {
        (config.locations.by_state(), TimestampSource::FetchTimeUtc)
    };
    if locations.is_empty() {
        return Err(anyhow!("No locations configured."));
    }

    let report = Fetcher::new(provider, timestamps).fetch_all(&locations).await;
    for (location, reason) in report.skipped() {
        println!("Skipped {location}: {reason}");
    }
    if report.fetched_count() == 0 {
        tracing::warn!("no location could be fetched; writing an empty batch");
    }

    let key = RawWriter::new(store)
        .write(&report.records(), Utc::now())
        .await
        .context("Failed to write raw batch")?;

    println!("{}", report.summary());
    println!("Uploaded raw weather data: {key}");
    Ok(())
}

async fn transform(store: Arc<dyn BlobStore>, format: OutputFormat) -> anyhow::Result<()> {
    match Transformer::new(store, format).run().await? {
        Some(summary) => {
            println!(
                "Transformed {} records from {} into {}",
                summary.records, summary.source_key, summary.output_key
            );
        }
        None => println!("No files found in the raw data folder."),
    }
    Ok(())
}
