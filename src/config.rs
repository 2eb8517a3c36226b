use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use thiserror::Error;

use crate::core::{RateTables, TablesError};

#[derive(Parser, Debug)]
#[command(
    name = "entrada",
    about = "Down-payment optimizer: bank entry vs rent-advance entry, plus lead intake"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP JSON API.
    Serve(ServeArgs),
    /// Print a single quote.
    Quote(QuoteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "ENTRADA_PORT", default_value_t = 8080)]
    pub port: u16,
    #[arg(long, env = "ENTRADA_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,
    #[arg(
        long,
        env = "ENTRADA_WEBHOOK_URL",
        help = "Lead-processing webhook; lead submission is disabled when unset"
    )]
    pub webhook_url: Option<String>,
    #[arg(long, env = "ENTRADA_WEBHOOK_TIMEOUT_SECS", default_value_t = 10)]
    pub webhook_timeout_secs: u64,
    #[arg(
        long,
        env = "ENTRADA_TABLES",
        help = "JSON file overriding the built-in rate tables"
    )]
    pub tables: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct QuoteArgs {
    #[arg(long, help = "Property price in whole currency units")]
    pub price: f64,
    #[arg(long, default_value = "Madrid", help = "Region name, e.g. \"Cataluña\"")]
    pub region: String,
    #[arg(long, default_value_t = 30)]
    pub age: u32,
    #[arg(long, help = "Show per-person figures for two co-buyers")]
    pub partner: bool,
    #[arg(long, env = "ENTRADA_TABLES")]
    pub tables: Option<PathBuf>,
    #[arg(long, help = "Print JSON instead of text")]
    pub json: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Tables(#[from] TablesError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub addr: SocketAddr,
    pub webhook_url: Option<String>,
    pub webhook_timeout: Duration,
    pub tables: RateTables,
}

impl ServeConfig {
    pub fn from_args(args: ServeArgs) -> Result<Self, ConfigError> {
        if args.webhook_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "--webhook-timeout-secs must be > 0".to_string(),
            ));
        }

        let webhook_url = match args.webhook_url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let url = Url::parse(raw).map_err(|e| {
                    ConfigError::Invalid(format!("--webhook-url is not a valid URL: {e}"))
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ConfigError::Invalid(
                        "--webhook-url must use http or https".to_string(),
                    ));
                }
                Some(raw.to_string())
            }
        };

        Ok(Self {
            addr: SocketAddr::new(args.bind, args.port),
            webhook_url,
            webhook_timeout: Duration::from_secs(args.webhook_timeout_secs),
            tables: load_tables(args.tables.as_deref())?,
        })
    }
}

pub fn load_tables(path: Option<&Path>) -> Result<RateTables, TablesError> {
    match path {
        Some(path) => RateTables::from_path(path),
        None => Ok(RateTables::spanish()),
    }
}
