//! Application configuration.
//!
//! Loaded from environment variables with fallback to defaults.
//!
//! | Variable                   | Default     | Meaning                          |
//! |----------------------------|-------------|----------------------------------|
//! | `BODEGA_DB_PATH`           | `bodega.db` | SQLite file                      |
//! | `BODEGA_MAX_CONNECTIONS`   | `5`         | Pool size                        |
//! | `BODEGA_PURCHASE_TAX_RATE` | `15`        | Default purchase tax, in percent |
//! | `BODEGA_CREDIT_TERM_DAYS`  | `30`        | Days until a credit sale is due  |
//! | `BODEGA_CURRENCY_SYMBOL`   | `L`         | Symbol used by `format_currency` |

use bodega_core::settings::DEFAULT_CREDIT_TERM_DAYS;
use bodega_core::{LedgerSettings, TaxRate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::pool::DbConfig;

const DEFAULT_DB_PATH: &str = "bodega.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Purchase tax default and credit term
    pub ledger: LedgerSettings,

    /// Currency symbol for display (Honduran lempira by default)
    pub currency_symbol: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            ledger: LedgerSettings::default(),
            currency_symbol: "L".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an explicit set of variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let database_path = lookup("BODEGA_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let max_connections = match lookup("BODEGA_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue("BODEGA_MAX_CONNECTIONS".to_string()))?,
            None => defaults.max_connections,
        };

        let purchase_tax_rate = match lookup("BODEGA_PURCHASE_TAX_RATE") {
            Some(raw) => raw
                .parse::<TaxRate>()
                .ok()
                .filter(|rate| rate.bps() <= 10000)
                .ok_or_else(|| ConfigError::InvalidValue("BODEGA_PURCHASE_TAX_RATE".to_string()))?,
            None => defaults.ledger.purchase_tax_rate,
        };

        let credit_term_days = match lookup("BODEGA_CREDIT_TERM_DAYS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue("BODEGA_CREDIT_TERM_DAYS".to_string()))?,
            None => DEFAULT_CREDIT_TERM_DAYS,
        };

        let currency_symbol = lookup("BODEGA_CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol);

        Ok(AppConfig {
            database_path,
            max_connections,
            ledger: LedgerSettings {
                purchase_tax_rate,
                credit_term_days,
            },
            currency_symbol,
        })
    }

    /// Pool configuration for this application.
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .ledger_settings(self.ledger)
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = AppConfig::default();
    /// assert_eq!(config.format_currency(12650), "L126.50");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let whole = cents / 100;
        let frac = (cents % 100).abs();

        format!(
            "{}{}{}.{:02}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            whole.abs(),
            frac
        )
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
