//! mirror-client: keeps a local mirror of server collections and logs every
//! change, for watching a deployment's sync behavior from a terminal.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use mirror_client::{ClassroomStore, HttpRest, ItemListStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Domain {
    /// Classes + courses (`/data`, `data_updated`)
    Classroom,
    /// To-do items (`/items`, `items_updated`)
    Items,
}

#[derive(Parser, Debug)]
#[command(name = "mirror-client")]
#[command(about = "Mirror server collections over REST + push channel")]
struct Args {
    /// Base URL of the REST API
    #[arg(long, default_value = "http://localhost:8000")]
    api: String,

    /// URL of the push-channel endpoint
    #[arg(long, default_value = "ws://localhost:8000/ws")]
    ws: String,

    /// Which collection set to mirror
    #[arg(long, value_enum, default_value = "items")]
    domain: Domain,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,mirror_client=debug"
    } else {
        "info,mirror_client=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting mirror-client");
    info!("API base: {}", args.api);
    info!("Push channel: {}", args.ws);

    let transport = Arc::new(HttpRest::new(args.api));

    match args.domain {
        Domain::Classroom => {
            let mut store = ClassroomStore::new(transport, args.ws);
            let _sub = store.store().subscribe(|event| {
                info!("store event: {:?}", event);
            });
            store.fetch_data().await;
            if let Some(error) = store.store().error() {
                info!("initial fetch failed: {}", error);
            }
            store.connect();
            tokio::signal::ctrl_c().await?;
            store.disconnect();
        }
        Domain::Items => {
            let mut store = ItemListStore::new(transport, args.ws);
            let _sub = store.store().subscribe(|event| {
                info!("store event: {:?}", event);
            });
            store.fetch_items().await;
            if let Some(error) = store.store().error() {
                info!("initial fetch failed: {}", error);
            }
            store.connect();
            tokio::signal::ctrl_c().await?;
            store.disconnect();
        }
    }

    info!("Shutting down");
    Ok(())
}
