//! Configuration Management
//!
//! Flag parsing for both binaries. Flags mirror the deployed service:
//! daemonization, pidfile and TLS material are accepted and validated here
//! but acted on by the deployment environment, not by this process.

use std::path::PathBuf;
use std::time::Duration;

use crate::bittrex::client::DEFAULT_BASE_URL;
use crate::bittrex::websocket::DEFAULT_WS_URL;

/// Live bridge listen port
pub const DEFAULT_BRIDGE_PORT: u16 = 5573;
/// Historical service listen port
pub const DEFAULT_HISTORY_PORT: u16 = 5576;
/// Period of the per-connection account refresh
pub const DEFAULT_UPDATE_CLIENT_SPAN: Duration = Duration::from_secs(30);

/// Configuration for the live bridge binary.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub update_client_span: Duration,
    /// Outbound WebSocket ping period; None disables pings
    pub heartbeat: Option<Duration>,
    /// Upstream watchdog staleness bound
    pub timeout: Duration,
    pub tls: bool,
    pub port: u16,
    pub daemon: bool,
    pub pidfile: PathBuf,
    pub logfile: PathBuf,
    pub loglevel: u8,
    pub loglevel_dtc: u8,
    pub loglevel_btrex: u8,
    pub crt_file: PathBuf,
    pub key_file: PathBuf,
    /// Sierra Chart mode: suppress the unsolicited secdef stream at logon
    pub sierra_chart: bool,
    pub rest_url: String,
    pub ws_url: String,
}

impl Default for BridgeConfig {
    fn default() -> BridgeConfig {
        BridgeConfig {
            update_client_span: DEFAULT_UPDATE_CLIENT_SPAN,
            heartbeat: None,
            timeout: Duration::from_secs(60),
            tls: false,
            port: DEFAULT_BRIDGE_PORT,
            daemon: false,
            pidfile: PathBuf::from("run/btrex.pid"),
            logfile: PathBuf::from("log/btrex.log"),
            loglevel: 2,
            loglevel_dtc: 2,
            loglevel_btrex: 2,
            crt_file: PathBuf::from("ssl/bitsouk.com.crt"),
            key_file: PathBuf::from("ssl/bitsouk.com.key"),
            sierra_chart: false,
            rest_url: DEFAULT_BASE_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Parses command-line arguments (without the program name).
    pub fn from_args(args: &[String]) -> Result<BridgeConfig, String> {
        let mut config = BridgeConfig::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--update-client-span" => {
                    config.update_client_span = Duration::from_secs(parse_value(&mut iter, arg)?)
                }
                "--heartbeat" => {
                    config.heartbeat = Some(Duration::from_secs(parse_value(&mut iter, arg)?))
                }
                "--timeout" => config.timeout = Duration::from_secs(parse_value(&mut iter, arg)?),
                "--tls" => config.tls = true,
                "--port" => config.port = parse_value(&mut iter, arg)?,
                "--daemon" => config.daemon = true,
                "--pidfile" => config.pidfile = PathBuf::from(take_value(&mut iter, arg)?),
                "--logfile" => config.logfile = PathBuf::from(take_value(&mut iter, arg)?),
                "--loglevel" => config.loglevel = parse_value(&mut iter, arg)?,
                "--loglevel-dtc" => config.loglevel_dtc = parse_value(&mut iter, arg)?,
                "--loglevel-btrex" => config.loglevel_btrex = parse_value(&mut iter, arg)?,
                "--crt-file" => config.crt_file = PathBuf::from(take_value(&mut iter, arg)?),
                "--key-file" => config.key_file = PathBuf::from(take_value(&mut iter, arg)?),
                "--sc" => config.sierra_chart = true,
                "--rest-url" => config.rest_url = take_value(&mut iter, arg)?,
                "--ws-url" => config.ws_url = take_value(&mut iter, arg)?,
                unknown => return Err(format!("unknown flag '{}'", unknown)),
            }
        }
        Ok(config)
    }

    /// `EnvFilter` directives for the numeric log levels: global level plus
    /// per-subsystem overrides for the protocol and exchange targets.
    pub fn env_filter(&self) -> String {
        format!(
            "{},btrex_bridge::dtc={dtc},btrex_bridge::server={dtc},btrex_bridge::bittrex={btrex}",
            level_name(self.loglevel),
            dtc = level_name(self.loglevel_dtc),
            btrex = level_name(self.loglevel_btrex),
        )
    }
}

/// Configuration for the historical data service binary.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Log what would be fetched and written, touch nothing
    pub dry_run: bool,
    /// Serve queries only; no ingest
    pub no_pump: bool,
    /// Earliest hour to pump, YYYY-MM-DD (default: genesis)
    pub start: Option<chrono::NaiveDate>,
    pub port: u16,
    pub daemon: bool,
    pub datadir: PathBuf,
    pub pidfile: PathBuf,
    pub logfile: PathBuf,
    pub loglevel: u8,
    pub rest_url: String,
    /// Symbols to pump and serve
    pub symbols: Vec<String>,
}

impl Default for HistoryConfig {
    fn default() -> HistoryConfig {
        HistoryConfig {
            dry_run: false,
            no_pump: false,
            start: None,
            port: DEFAULT_HISTORY_PORT,
            daemon: false,
            datadir: PathBuf::from("data/bittrex"),
            pidfile: PathBuf::from("run/btrex-history.pid"),
            logfile: PathBuf::from("log/btrex-history.log"),
            loglevel: 2,
            rest_url: DEFAULT_BASE_URL.to_string(),
            symbols: Vec::new(),
        }
    }
}

impl HistoryConfig {
    /// Parses command-line arguments; non-flag trailing arguments are the
    /// symbol list.
    pub fn from_args(args: &[String]) -> Result<HistoryConfig, String> {
        let mut config = HistoryConfig::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--dry-run" => config.dry_run = true,
                "--no-pump" => config.no_pump = true,
                "--start" => {
                    let value = take_value(&mut iter, arg)?;
                    config.start = Some(
                        value
                            .parse()
                            .map_err(|e| format!("bad --start date '{}': {}", value, e))?,
                    );
                }
                "--port" => config.port = parse_value(&mut iter, arg)?,
                "--daemon" => config.daemon = true,
                "--datadir" => config.datadir = PathBuf::from(take_value(&mut iter, arg)?),
                "--pidfile" => config.pidfile = PathBuf::from(take_value(&mut iter, arg)?),
                "--logfile" => config.logfile = PathBuf::from(take_value(&mut iter, arg)?),
                "--loglevel" => config.loglevel = parse_value(&mut iter, arg)?,
                "--rest-url" => config.rest_url = take_value(&mut iter, arg)?,
                flag if flag.starts_with("--") => {
                    return Err(format!("unknown flag '{}'", flag))
                }
                symbol => config.symbols.push(symbol.to_string()),
            }
        }
        Ok(config)
    }

    pub fn env_filter(&self) -> String {
        level_name(self.loglevel).to_string()
    }
}

fn level_name(level: u8) -> &'static str {
    match level {
        0 | 1 => "error",
        2 => "info",
        _ => "debug",
    }
}

fn take_value<'a>(
    iter: &mut std::slice::Iter<'a, String>,
    flag: &str,
) -> Result<String, String> {
    iter.next()
        .cloned()
        .ok_or_else(|| format!("flag '{}' needs a value", flag))
}

fn parse_value<T: std::str::FromStr>(
    iter: &mut std::slice::Iter<'_, String>,
    flag: &str,
) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    let value = take_value(iter, flag)?;
    value
        .parse()
        .map_err(|e| format!("bad value '{}' for '{}': {}", value, flag, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bridge_defaults() {
        let config = BridgeConfig::from_args(&[]).unwrap();
        assert_eq!(config.port, 5573);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.update_client_span, Duration::from_secs(30));
        assert!(config.heartbeat.is_none());
        assert!(!config.sierra_chart);
    }

    #[test]
    fn test_bridge_flags() {
        let config = BridgeConfig::from_args(&args(&[
            "--port", "6000", "--timeout", "10", "--heartbeat", "5", "--sc", "--tls",
        ]))
        .unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.heartbeat, Some(Duration::from_secs(5)));
        assert!(config.sierra_chart);
        assert!(config.tls);
    }

    #[test]
    fn test_bridge_unknown_flag() {
        assert!(BridgeConfig::from_args(&args(&["--nope"])).is_err());
    }

    #[test]
    fn test_env_filter_levels() {
        let config = BridgeConfig::from_args(&args(&["--loglevel", "3", "--loglevel-btrex", "1"]))
            .unwrap();
        let filter = config.env_filter();
        assert!(filter.starts_with("debug"));
        assert!(filter.contains("btrex_bridge::bittrex=error"));
    }

    #[test]
    fn test_history_symbols_trailing() {
        let config = HistoryConfig::from_args(&args(&[
            "--datadir", "/tmp/ticks", "--no-pump", "BTC-ETH", "BTC-LTC",
        ]))
        .unwrap();
        assert!(config.no_pump);
        assert_eq!(config.datadir, PathBuf::from("/tmp/ticks"));
        assert_eq!(config.symbols, vec!["BTC-ETH", "BTC-LTC"]);
    }

    #[test]
    fn test_history_start_date() {
        let config = HistoryConfig::from_args(&args(&["--start", "2018-06-01"])).unwrap();
        assert_eq!(
            config.start,
            Some(chrono::NaiveDate::from_ymd_opt(2018, 6, 1).unwrap())
        );
    }
}
