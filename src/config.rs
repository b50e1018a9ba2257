use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, Context, Result};

/// Where and how the watchlist is read. Rows and the symbol column are
/// 1-based, matching how the range is described in the workbook template.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchlistConfig {
    pub path: String,
    pub sheet: String,
    pub symbol_column: usize,
    pub first_row: usize,
    pub last_row: usize,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            path: "watchlist.csv".to_string(),
            sheet: "Main".to_string(),
            symbol_column: 3,
            first_row: 2,
            last_row: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    pub base_url: String,
    /// Name of the environment variable holding the provider API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tdameritrade.com/v1/marketdata".to_string(),
            api_key_env: "QUOTE_BOARD_API_KEY".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshConfig {
    /// Upper bound on a single fetch task, network call included.
    pub task_timeout_secs: u64,
    /// Cycle period used by the watch subcommand.
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            task_timeout_secs: crate::fetch::DEFAULT_TASK_TIMEOUT_SECS,
            interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub watchlist: WatchlistConfig,
    pub provider: ProviderConfig,
    pub refresh: RefreshConfig,
}

impl Config {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.watchlist.first_row == 0 || self.watchlist.symbol_column == 0 {
            return Err(AppError::config(
                "watchlist rows and columns are 1-based; zero is not a valid index",
            ));
        }
        if self.watchlist.last_row < self.watchlist.first_row {
            return Err(AppError::config(format!(
                "watchlist lastRow {} precedes firstRow {}",
                self.watchlist.last_row, self.watchlist.first_row
            )));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(AppError::config("provider baseUrl must not be empty"));
        }
        Ok(())
    }
}
