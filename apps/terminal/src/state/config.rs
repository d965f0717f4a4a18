//! # Configuration State
//!
//! Stores terminal configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`BARPOS_*`)
//! 2. Platform data directory (via `directories`)
//! 3. Defaults (this file)
//!
//! Service charge and tax rates are not here; they live in the database
//! and are edited with `set-rates`.
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::PathBuf;
use std::time::Duration;

use barpos_core::{Money, LOW_STOCK_THRESHOLD, SESSION_TIMEOUT_SECS};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const DB_FILE_NAME: &str = "barpos.db";

/// Terminal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Store name (printed on receipts)
    pub store_name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// SQLite database file
    pub db_path: PathBuf,

    /// Where cart recovery snapshots are kept
    pub data_dir: PathBuf,

    /// Inactivity timeout before the cashier is signed out
    pub session_timeout_secs: u64,

    /// Cashier signed in at startup, if any
    pub cashier_id: Option<String>,

    /// Stock level below which `low-stock` lists a product
    pub low_stock_threshold: i64,
}

impl Default for ConfigState {
    /// Returns default configuration suitable for development.
    ///
    /// ## Default Values
    /// - Store: "BarPOS Dev Bar"
    /// - Currency: LKR
    /// - Timeout: 10 minutes
    /// - Database and snapshots in the platform data directory
    fn default() -> Self {
        let data_dir = default_data_dir();
        ConfigState {
            store_name: "BarPOS Dev Bar".to_string(),
            currency_symbol: "LKR".to_string(),
            db_path: data_dir.join(DB_FILE_NAME),
            data_dir,
            session_timeout_secs: SESSION_TIMEOUT_SECS,
            cashier_id: None,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
        }
    }
}

impl ConfigState {
    /// Creates a new ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `BARPOS_DB_PATH`: Database file
    /// - `BARPOS_DATA_DIR`: Snapshot directory (and database, unless
    ///   `BARPOS_DB_PATH` is set)
    /// - `BARPOS_STORE_NAME`: Store name on receipts
    /// - `BARPOS_CURRENCY_SYMBOL`: e.g. "LKR", "Rs."
    /// - `BARPOS_SESSION_TIMEOUT_SECS`: Inactivity timeout (ignored if not a
    ///   positive integer)
    /// - `BARPOS_CASHIER_ID`: Sign this cashier in at startup
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ConfigState::default();

        if let Some(dir) = lookup("BARPOS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
            config.db_path = config.data_dir.join(DB_FILE_NAME);
        }

        if let Some(path) = lookup("BARPOS_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Some(store_name) = lookup("BARPOS_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(symbol) = lookup("BARPOS_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(secs) = lookup("BARPOS_SESSION_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.session_timeout_secs = secs,
                _ => tracing::warn!(value = %secs, "Ignoring invalid BARPOS_SESSION_TIMEOUT_SECS"),
            }
        }

        config.cashier_id = lookup("BARPOS_CASHIER_ID")
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        config
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Formats an amount with the currency symbol, two decimals.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(Money::from_minor(123450)), "LKR 1234.50");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        if amount.is_negative() {
            format!("-{} {}", self.currency_symbol, Money::ZERO - amount)
        } else {
            format!("{} {}", self.currency_symbol, amount)
        }
    }
}

/// Platform data directory, falling back to the working directory.
///
/// - **macOS**: `~/Library/Application Support/com.barpos.terminal`
/// - **Windows**: `%APPDATA%\barpos\terminal\data`
/// - **Linux**: `~/.local/share/terminal`
fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "barpos", "terminal")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> ConfigState {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigState::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_format_currency() {
        let config = ConfigState::default();
        assert_eq!(config.format_currency(Money::from_major(2124)), "LKR 2124.00");
        assert_eq!(config.format_currency(Money::from_minor(1)), "LKR 0.01");
        assert_eq!(config.format_currency(Money::ZERO), "LKR 0.00");
        assert_eq!(config.format_currency(Money::from_major(-5)), "-LKR 5.00");
    }

    #[test]
    fn test_env_overrides() {
        let config = config_with(&[
            ("BARPOS_DATA_DIR", "/tmp/bar"),
            ("BARPOS_STORE_NAME", "Harbour Tavern"),
            ("BARPOS_CURRENCY_SYMBOL", "Rs."),
            ("BARPOS_SESSION_TIMEOUT_SECS", "120"),
            ("BARPOS_CASHIER_ID", " nimal "),
        ]);

        assert_eq!(config.data_dir, PathBuf::from("/tmp/bar"));
        assert_eq!(config.db_path, PathBuf::from("/tmp/bar/barpos.db"));
        assert_eq!(config.store_name, "Harbour Tavern");
        assert_eq!(config.format_currency(Money::from_major(1)), "Rs. 1.00");
        assert_eq!(config.session_timeout(), Duration::from_secs(120));
        assert_eq!(config.cashier_id.as_deref(), Some("nimal"));
    }

    #[test]
    fn test_db_path_wins_over_data_dir() {
        let config = config_with(&[
            ("BARPOS_DATA_DIR", "/tmp/bar"),
            ("BARPOS_DB_PATH", "/srv/pos.db"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/srv/pos.db"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/bar"));
    }

    #[test]
    fn test_bad_timeout_keeps_default() {
        let config = config_with(&[("BARPOS_SESSION_TIMEOUT_SECS", "soon")]);
        assert_eq!(config.session_timeout_secs, SESSION_TIMEOUT_SECS);
        assert!(config.cashier_id.is_none());
    }
}
