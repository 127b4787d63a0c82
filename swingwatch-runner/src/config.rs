//! Application configuration, loaded from `swingwatch.toml`.
//!
//! Every section has defaults, so a file only needs the parts it changes.
//! `AppConfig::default()` is the Tokyo-market setup: 20/50 daily trend filter,
//! 5/20 trigger on 30-minute bars, RSI 14 with a 40/60 band.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use swingwatch_core::data::Timeframe;
use swingwatch_core::{ParamsError, StrategyParams};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid strategy parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("watchlist is empty")]
    EmptyWatchlist,

    #[error("duplicate watchlist symbol '{0}'")]
    DuplicateSymbol(String),

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("{field} must be > 0")]
    NonPositive { field: &'static str },
}

/// One watched ticker and the name used in alert text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub symbol: String,
    pub name: String,
}

impl WatchEntry {
    pub fn new(symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
        }
    }
}

/// Which bar source the driver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub provider: ProviderKind,
    pub trend_timeframe: Timeframe,
    pub trigger_timeframe: Timeframe,
    /// Lookback span requested for the trend series (`1y`).
    pub trend_range: String,
    /// Lookback span requested for the trigger series (`30d`).
    pub trigger_range: String,
    /// Directory read by the CSV provider.
    pub csv_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Yahoo,
            trend_timeframe: Timeframe::Daily,
            trigger_timeframe: Timeframe::Intraday(30),
            trend_range: "1y".into(),
            trigger_range: "30d".into(),
            csv_dir: PathBuf::from("data"),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Broadcast endpoint of the messaging API.
    pub endpoint: String,
    /// Environment variable holding the channel access token.
    pub token_env: String,
    pub timeout_secs: u64,
    /// IANA zone for times shown in alert text.
    pub timezone: String,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.line.me/v2/bot/message/broadcast".into(),
            token_env: "CHANNEL_ACCESS_TOKEN".into(),
            timeout_secs: 15,
            timezone: "Asia/Tokyo".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub state_file: PathBuf,
    pub reset_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("trade_state.json"),
            reset_file: PathBuf::from("reset_requests.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Pause between tickers, to stay under the bar source's rate limit.
    pub throttle_ms: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self { throttle_ms: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub watchlist: Vec<WatchEntry>,
    pub strategy: StrategyParams,
    pub data: DataConfig,
    pub alerts: AlertsConfig,
    pub paths: PathsConfig,
    pub run: RunSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watchlist: default_watchlist(),
            strategy: StrategyParams::default(),
            data: DataConfig::default(),
            alerts: AlertsConfig::default(),
            paths: PathsConfig::default(),
            run: RunSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;

        if self.watchlist.is_empty() {
            return Err(ConfigError::EmptyWatchlist);
        }
        let mut seen = HashSet::new();
        for entry in &self.watchlist {
            if !seen.insert(entry.symbol.as_str()) {
                return Err(ConfigError::DuplicateSymbol(entry.symbol.clone()));
            }
        }

        self.timezone()?;

        if self.data.timeout_secs == 0 {
            return Err(ConfigError::NonPositive {
                field: "data.timeout_secs",
            });
        }
        if self.alerts.timeout_secs == 0 {
            return Err(ConfigError::NonPositive {
                field: "alerts.timeout_secs",
            });
        }
        Ok(())
    }

    /// Display zone for alert text.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.alerts
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.alerts.timezone.clone()))
    }

    /// Display name for `symbol`, falling back to the symbol itself.
    pub fn display_name<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.watchlist
            .iter()
            .find(|e| e.symbol == symbol)
            .map_or(symbol, |e| e.name.as_str())
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.watchlist.iter().map(|e| e.symbol.as_str()).collect()
    }
}

/// Large-cap Tokyo Stock Exchange names.
pub fn default_watchlist() -> Vec<WatchEntry> {
    [
        ("4503.T", "Astellas Pharma"),
        ("4568.T", "Daiichi Sankyo"),
        ("5401.T", "Nippon Steel"),
        ("6178.T", "Japan Post Holdings"),
        ("1605.T", "INPEX"),
        ("1928.T", "Sekisui House"),
        ("3659.T", "Nexon"),
        ("6326.T", "Kubota"),
        ("6503.T", "Mitsubishi Electric"),
        ("6752.T", "Panasonic"),
        ("7182.T", "Japan Post Bank"),
        ("7203.T", "Toyota Motor"),
        ("7270.T", "Subaru"),
        ("7733.T", "Olympus"),
        ("7751.T", "Canon"),
        ("8053.T", "Sumitomo Corp"),
        ("8267.T", "Aeon"),
        ("8306.T", "Mitsubishi UFJ FG"),
        ("8411.T", "Mizuho FG"),
        ("8591.T", "ORIX"),
        ("8750.T", "Dai-ichi Life HD"),
        ("8766.T", "Tokio Marine HD"),
        ("8801.T", "Mitsui Fudosan"),
        ("8802.T", "Mitsubishi Estate"),
        ("9434.T", "SoftBank Corp"),
        ("9503.T", "Kansai Electric Power"),
        ("9613.T", "NTT Data"),
    ]
    .into_iter()
    .map(|(symbol, name)| WatchEntry::new(symbol, name))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use swingwatch_core::MaPair;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.watchlist.len(), 27);
        assert_eq!(config.timezone().unwrap(), chrono_tz::Asia::Tokyo);
        assert_eq!(config.data.trigger_timeframe, Timeframe::Intraday(30));
    }

    #[test]
    fn default_config_roundtrips_through_toml() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        let back = AppConfig::from_toml(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [[watchlist]]
            symbol = "7203.T"
            name = "Toyota"

            [strategy]
            tp1 = 0.02
            tp2 = 0.04

            [strategy.trigger]
            short = 3
            long = 10

            [data]
            provider = "csv"
            trigger_timeframe = "60m"

            [run]
            throttle_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.symbols(), vec!["7203.T"]);
        assert_eq!(config.strategy.tp1, 0.02);
        assert_eq!(config.strategy.trigger, MaPair { short: 3, long: 10 });
        assert_eq!(config.strategy.trend, MaPair { short: 20, long: 50 });
        assert_eq!(config.data.provider, ProviderKind::Csv);
        assert_eq!(config.data.trigger_timeframe, Timeframe::Intraday(60));
        assert_eq!(config.data.trend_range, "1y");
        assert_eq!(config.alerts.token_env, "CHANNEL_ACCESS_TOKEN");
        assert_eq!(config.run.throttle_ms, 0);
    }

    #[test]
    fn rejects_duplicate_symbols() {
        let mut config = AppConfig::default();
        config.watchlist.push(WatchEntry::new("7203.T", "again"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSymbol(s)) if s == "7203.T"
        ));
    }

    #[test]
    fn rejects_empty_watchlist_and_bad_zone() {
        let mut config = AppConfig::default();
        config.alerts.timezone = "Mars/Olympus".into();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownTimezone(_))));
        config.watchlist.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyWatchlist)));
    }

    #[test]
    fn rejects_bad_strategy() {
        let err = AppConfig::from_toml("[strategy]\nrsi_buy_max = 70.0\nrsi_sell_min = 30.0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Params(ParamsError::RsiBounds { .. })));
    }

    #[test]
    fn rejects_unknown_timeframe() {
        assert!(matches!(
            AppConfig::from_toml("[data]\ntrigger_timeframe = \"1w\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn display_name_falls_back_to_symbol() {
        let config = AppConfig::default();
        assert_eq!(config.display_name("7203.T"), "Toyota Motor");
        assert_eq!(config.display_name("AAPL"), "AAPL");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/swingwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
