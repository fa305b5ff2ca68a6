//! Historical Data Service Binary
//!
//! Opens one tick store per configured symbol, starts the ingest pumps
//! (unless `--no-pump`) and serves DTC historical price queries.

use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use btrex_bridge::bittrex::BittrexClient;
use btrex_bridge::config::HistoryConfig;
use btrex_bridge::history::{pump, HistoryServer, TickStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = HistoryConfig::from_args(&args).map_err(|e| anyhow::anyhow!(e))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.env_filter())),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .init();

    tracing::info!("Starting btrex-history v{}", env!("CARGO_PKG_VERSION"));
    if config.symbols.is_empty() {
        anyhow::bail!("no symbols given; pass them as trailing arguments");
    }
    if config.daemon {
        tracing::info!(
            "daemon mode: process supervision and pidfile {} are handled by the service manager",
            config.pidfile.display()
        );
    }

    std::fs::create_dir_all(&config.datadir)
        .with_context(|| format!("create datadir {}", config.datadir.display()))?;

    let mut stores = HashMap::new();
    for symbol in &config.symbols {
        let store = TickStore::open(&config.datadir, symbol)
            .with_context(|| format!("open tick store for {}", symbol))?;
        stores.insert(symbol.clone(), Arc::new(store));
    }
    tracing::info!(
        "serving {} symbols from {}",
        stores.len(),
        config.datadir.display()
    );

    let config = Arc::new(config);
    if config.no_pump {
        tracing::info!("ingest disabled (--no-pump); serving stored data only");
    } else {
        let client = BittrexClient::with_base_url(&config.rest_url);
        pump::spawn_pumps(config.clone(), client, &stores);
    }

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!("listening for DTC clients on port {}", config.port);

    HistoryServer::new(Arc::new(stores)).run(listener).await;
    Ok(())
}
