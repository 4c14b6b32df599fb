//! Configuration management for the portfolio worker

use std::str::FromStr;

use crate::error::{PortfolioError, Result};
use crate::logging::{self, Level};
use worker::Env;

/// Flat tax rate on a positive yearly result
pub const DEFAULT_TAX_RATE: f64 = 0.30;

/// Longest convert history window Binance can be asked for, in days
pub const MAX_CONVERT_LOOKBACK_DAYS: i64 = 3650;

/// Portfolio worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment (production, staging, development)
    pub environment: String,

    /// Lowest severity written to the console
    pub log_level: Level,

    /// Binance REST base URL
    pub binance_base_url: String,

    /// Quote asset every tracked pair is priced in (e.g. BTCUSDC)
    pub quote_asset: String,

    /// Fiat balances counted as cash at a price of 1
    pub fiat_assets: Vec<String>,

    /// Flat tax rate applied to a positive yearly result
    pub tax_rate: f64,

    /// How far back convert trades are fetched
    pub convert_lookback_days: i64,

    /// Remote backend for the dashboard. `None` serves it in-process.
    pub dashboard_api_base: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            log_level: Level::Info,
            binance_base_url: "https://api.binance.com".to_string(),
            quote_asset: "USDC".to_string(),
            fiat_assets: vec!["USD".to_string(), "EUR".to_string()],
            tax_rate: DEFAULT_TAX_RATE,
            convert_lookback_days: 30,
            dashboard_api_base: None,
        }
    }
}

impl Config {
    /// Load configuration from Cloudflare environment variables
    pub fn from_env(env: &Env) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| env.var(key).ok().map(|v| v.to_string());

        let config = Self {
            environment: var("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: match var("LOG_LEVEL") {
                Some(v) => Level::parse(&v)
                    .ok_or_else(|| PortfolioError::Config(format!("unknown LOG_LEVEL: {v}")))?,
                None => defaults.log_level,
            },
            binance_base_url: var("BINANCE_BASE_URL").unwrap_or(defaults.binance_base_url),
            quote_asset: var("QUOTE_ASSET")
                .map(|v| v.trim().to_uppercase())
                .unwrap_or(defaults.quote_asset),
            fiat_assets: var("FIAT_ASSETS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.fiat_assets),
            tax_rate: parse_or(var("TAX_RATE"), defaults.tax_rate),
            convert_lookback_days: parse_or(
                var("CONVERT_LOOKBACK_DAYS"),
                defaults.convert_lookback_days,
            ),
            dashboard_api_base: var("DASHBOARD_API_BASE").filter(|v| !v.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.tax_rate) {
            return Err(PortfolioError::Config("tax_rate must be between 0 and 1".into()));
        }
        if self.quote_asset.is_empty() {
            return Err(PortfolioError::Config("quote_asset must not be empty".into()));
        }
        if !(1..=MAX_CONVERT_LOOKBACK_DAYS).contains(&self.convert_lookback_days) {
            return Err(PortfolioError::Config(format!(
                "convert_lookback_days must be between 1 and {MAX_CONVERT_LOOKBACK_DAYS}"
            )));
        }
        if !self.binance_base_url.starts_with("http") {
            return Err(PortfolioError::Config(
                "binance_base_url must be an http(s) URL".into(),
            ));
        }
        Ok(())
    }

    /// Route the logging macros through this configuration's level
    pub fn apply_log_level(&self) {
        logging::set_max_level(self.log_level);
    }

    /// Assets never tracked as positions: the quote asset and fiat cash
    pub fn is_cash_asset(&self, asset: &str) -> bool {
        asset == self.quote_asset || self.fiat_assets.iter().any(|f| f == asset)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
