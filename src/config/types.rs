//! Configuration types for bot settings
//!
//! This module defines the structs loaded from YAML and the runtime-mutable
//! alert settings shared across async tasks via `Arc<RwLock<AlertConfig>>`.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::constants;
use crate::error::AppError;

// ============================================================================
// Type Aliases
// ============================================================================

/// Type alias for shared runtime-mutable alert settings.
///
/// The command listener is the only writer; the polling loop and the touch
/// detector read a snapshot at the start of each evaluation.
pub type SharedConfig = Arc<RwLock<AlertConfig>>;

// ============================================================================
// Enums
// ============================================================================

/// Supported sampling intervals for price series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Interval {
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Interval {
    /// Every supported interval, in the order shown to operators.
    pub const ALL: [Interval; 4] = [Interval::H1, Interval::H4, Interval::D1, Interval::W1];

    /// The wire token for this interval ("1h", "4h", "1d", "1w").
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
            Interval::W1 => "1w",
        }
    }

    /// Number of calendar days needed to span `window` samples at this
    /// interval. Used to size history requests to the provider.
    pub fn days_spanning(&self, window: usize) -> u64 {
        let window = window as u64;
        match self {
            Interval::H1 => window.div_ceil(24).max(1),
            Interval::H4 => window.div_ceil(6).max(1),
            Interval::D1 => window.max(1),
            Interval::W1 => (window * 7).max(1),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Interval {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Interval::H1),
            "4h" => Ok(Interval::H4),
            "1d" => Ok(Interval::D1),
            "1w" => Ok(Interval::W1),
            other => Err(AppError::Config(format!(
                "Unsupported interval '{}' (expected one of 1h, 4h, 1d, 1w)",
                other
            ))),
        }
    }
}

/// Ranking criterion for the symbol universe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    MarketCap,
    Price,
}

/// Market-data providers selectable at configuration time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Coingecko,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Coingecko => write!(f, "coingecko"),
        }
    }
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Runtime-mutable alert settings
///
/// Initialized from `config.yaml` defaults at startup, then mutated only by
/// validated operator commands. Not persisted across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Fractional tolerance for a touch (0.01 = price within 1% of the MA)
    #[serde(default = "default_touch_precision")]
    pub touch_precision: f64,
    /// Sampling interval for price series
    #[serde(default = "default_interval")]
    pub interval: Interval,
    /// Seconds to sleep between watch-list cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_touch_precision() -> f64 {
    0.01
}

fn default_interval() -> Interval {
    Interval::H4
}

fn default_poll_interval_secs() -> u64 {
    1800
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            touch_precision: default_touch_precision(),
            interval: default_interval(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl AlertConfig {
    /// Validate alert settings against the configured threshold bounds
    pub fn validate(&self) -> Result<(), AppError> {
        let (lower, upper) = constants::threshold_bounds();
        if !(self.touch_precision > lower && self.touch_precision < upper) {
            return Err(AppError::Config(format!(
                "touch_precision must be > {} and < {} (got {})",
                lower, upper, self.touch_precision
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::Config(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert to shared state wrapper for async access
    pub fn into_shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}

/// Symbol-universe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Quote currency for the market listing
    #[serde(default = "default_quote")]
    pub quote: String,
    /// Maximum watch-list size
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Ranking criterion before truncation
    #[serde(default = "default_rank_by")]
    pub rank_by: RankBy,
    /// Substring patterns excluding stable-value assets from the watch list.
    /// Matching is substring-based against the provider symbol id.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// Hours between universe refreshes. Zero resolves once at startup only.
    #[serde(default = "default_refresh_hours")]
    pub refresh_hours: u64,
}

fn default_quote() -> String {
    "usd".to_string()
}

fn default_top_n() -> usize {
    200
}

fn default_rank_by() -> RankBy {
    RankBy::MarketCap
}

fn default_exclude() -> Vec<String> {
    vec!["usd".to_string()]
}

fn default_refresh_hours() -> u64 {
    24
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            quote: default_quote(),
            top_n: default_top_n(),
            rank_by: default_rank_by(),
            exclude: default_exclude(),
            refresh_hours: default_refresh_hours(),
        }
    }
}

impl UniverseConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.top_n == 0 {
            return Err(AppError::Config("universe.top_n must be > 0".to_string()));
        }
        if self.quote.trim().is_empty() {
            return Err(AppError::Config(
                "universe.quote cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Root bot configuration, loaded from `config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Market-data provider backing the gateway
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    /// Moving-average windows checked for every symbol
    #[serde(default = "default_windows")]
    pub windows: Vec<usize>,
    /// Symbol-universe settings
    #[serde(default)]
    pub universe: UniverseConfig,
    /// Startup defaults for the runtime-mutable alert settings
    #[serde(default)]
    pub alerts: AlertConfig,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Coingecko
}

fn default_windows() -> Vec<usize> {
    vec![99, 200]
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            windows: default_windows(),
            universe: UniverseConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl BotConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        if self.windows.is_empty() {
            return Err(AppError::Config(
                "windows must contain at least one moving-average window".to_string(),
            ));
        }
        for &window in &self.windows {
            if window == 0 {
                return Err(AppError::Config(
                    "moving-average windows must be > 0".to_string(),
                ));
            }
        }
        self.universe.validate()?;
        self.alerts.validate()?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
