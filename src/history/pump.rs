//! Trade History Pump
//!
//! One ingest loop per symbol: walk the hourly windows the control file has
//! not seen, fetch each window's trades over REST, and append them to the
//! tick store. The current hour is refetched on every cycle. Failures log
//! and the loop restarts on the next cycle; nothing here is fatal.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::bittrex::BittrexClient;
use crate::config::HistoryConfig;
use crate::history::ctrl::{self, CtrlFile};
use crate::history::granulator::Tick;
use crate::history::store::TickStore;

/// Pause between full walks of the window list
const PUMP_CYCLE: Duration = Duration::from_secs(60);
/// Pause between per-window fetches, to stay under the REST rate limit
const FETCH_PAUSE: Duration = Duration::from_millis(200);

/// Spawns one pump task per configured symbol.
pub fn spawn_pumps(
    config: Arc<HistoryConfig>,
    client: BittrexClient,
    stores: &HashMap<String, Arc<TickStore>>,
) {
    for symbol in &config.symbols {
        let Some(store) = stores.get(symbol).cloned() else {
            continue;
        };
        tokio::spawn(pump_symbol_loop(
            config.clone(),
            client.clone(),
            store,
            symbol.clone(),
        ));
    }
}

async fn pump_symbol_loop(
    config: Arc<HistoryConfig>,
    client: BittrexClient,
    store: Arc<TickStore>,
    symbol: String,
) {
    let ctrl_path = config.datadir.join(format!("{}.ctrl", symbol));
    loop {
        if let Err(e) = pump_symbol_once(&config, &client, &store, &symbol, &ctrl_path).await {
            tracing::error!("pump cycle for {} failed: {:#}", symbol, e);
        }
        sleep(PUMP_CYCLE).await;
    }
}

/// One walk over all unfetched windows for a symbol.
async fn pump_symbol_once(
    config: &HistoryConfig,
    client: &BittrexClient,
    store: &TickStore,
    symbol: &str,
    ctrl_path: &std::path::Path,
) -> Result<()> {
    let mut ctrl = CtrlFile::open(ctrl_path).context("open control file")?;
    let now = Utc::now();
    let current_hour = ctrl::hour_index(now).context("clock is before genesis")?;
    let first_hour = config
        .start
        .and_then(|date| ctrl::hour_index(date.and_hms_opt(0, 0, 0)?.and_utc()))
        .unwrap_or(0);

    for hour in first_hour..=current_hour {
        if ctrl.is_fetched(hour, now) {
            continue;
        }
        let (start, end) = ctrl::hour_bounds(hour);
        let trades = client
            .get_market_history_range(symbol, start, end)
            .await
            .with_context(|| format!("fetch {} hour {}", symbol, hour))?;

        let mut ticks: Vec<Tick> = trades
            .iter()
            .map(|t| Tick {
                ts_ns: (t.time_stamp * 1e9).round() as u64,
                side: t.order_type.into(),
                price: t.price,
                quantity: t.quantity,
            })
            .collect();
        // The endpoint reports most recent first; the store wants time order
        ticks.sort_by_key(|t| t.ts_ns);

        if config.dry_run {
            tracing::info!(
                "dry run: {} ticks for {} hour {} not written",
                ticks.len(),
                symbol,
                hour
            );
        } else {
            if !ticks.is_empty() {
                let written = store.put_batch(&ticks)?;
                tracing::debug!("wrote {} ticks for {} hour {}", written, symbol, hour);
            }
            if hour < current_hour {
                ctrl.mark_fetched(hour);
                ctrl.save().context("save control file")?;
            }
        }
        sleep(FETCH_PAUSE).await;
    }
    Ok(())
}
