//! Live Bridge Binary
//!
//! Boot order: flags, tracing, the startup REST fetches (fatal on failure),
//! then the background tasks (REST queue consumer, WebSocket supervisor,
//! ticker refresher) and finally the DTC accept loop.

use anyhow::Context;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use btrex_bridge::bittrex::{BittrexClient, WsSupervisor};
use btrex_bridge::config::BridgeConfig;
use btrex_bridge::market::Currency;
use btrex_bridge::rest_sync::DEFAULT_QUEUE_CAPACITY;
use btrex_bridge::server::connection::ConnectionRegistry;
use btrex_bridge::{refresher, DtcServer, MarketState, RestSync};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = BridgeConfig::from_args(&args).map_err(|e| anyhow::anyhow!(e))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.env_filter())),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .init();

    tracing::info!("Starting btrex-bridge v{}", env!("CARGO_PKG_VERSION"));
    if config.daemon {
        tracing::info!(
            "daemon mode: process supervision and pidfile {} are handled by the service manager",
            config.pidfile.display()
        );
    }
    if config.tls {
        tracing::warn!(
            "TLS requested: termination is expected from the fronting proxy ({} / {})",
            config.crt_file.display(),
            config.key_file.display()
        );
    }

    let config = Arc::new(config);
    let client = BittrexClient::with_base_url(&config.rest_url);
    let state = Arc::new(MarketState::new());

    // The bridge is useless without the symbol universe; these aborts are
    // the only fatal REST paths.
    let currencies = client
        .get_currencies()
        .await
        .context("initial currency fetch failed")?;
    state
        .set_currencies(
            currencies
                .into_iter()
                .map(|c| Currency {
                    code: c.currency,
                    name: c.currency_long,
                    tx_fee: c.tx_fee,
                    is_active: c.is_active,
                })
                .collect(),
        )
        .await;

    let markets = client
        .get_markets()
        .await
        .context("initial market fetch failed")?;
    let margin_symbols: HashSet<String> = markets
        .iter()
        .filter(|m| m.is_margin_enabled)
        .map(|m| m.market_name.clone())
        .collect();

    let tickers = client
        .get_tickers()
        .await
        .context("initial ticker fetch failed")?;
    let now = Utc::now();
    let symbol_count = tickers.len();
    for (symbol, ticker) in tickers {
        state.store_ticker(&symbol, now, ticker).await;
    }
    tracing::info!(
        "loaded {} currencies, {} symbols ({} margin-enabled)",
        state.currency_count().await,
        symbol_count,
        margin_symbols.len()
    );

    let (rest, consumer) = RestSync::new(DEFAULT_QUEUE_CAPACITY);
    tokio::spawn(consumer.run());

    let registry = Arc::new(ConnectionRegistry::new());
    tokio::spawn(
        WsSupervisor::new(
            state.clone(),
            registry.clone(),
            config.ws_url.clone(),
            config.timeout,
            config.heartbeat,
        )
        .run(),
    );
    tokio::spawn(refresher::run(
        state.clone(),
        registry.clone(),
        rest.clone(),
        client.clone(),
    ));

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!("listening for DTC clients on port {}", config.port);

    let server = DtcServer {
        state,
        registry,
        rest,
        client,
        config,
        margin_symbols: Arc::new(margin_symbols),
    };
    server.run(listener).await;
    Ok(())
}
