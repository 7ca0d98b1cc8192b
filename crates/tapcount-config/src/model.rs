// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level tapcount configuration.
///
/// All sections are optional and default to the values the scheduler was
/// calibrated with (about 150 concurrent MEDIUM sessions at 30 edits/s).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TapcountConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Render-data API settings.
    #[serde(default)]
    pub stats_api: StatsApiConfig,

    /// Session store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Priority tier delays and activity windows.
    #[serde(default)]
    pub tiers: TierConfig,

    /// Worker pool limits and retry policy.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Load shedding thresholds.
    #[serde(default)]
    pub backpressure: BackpressureConfig,

    /// Periodic session resync.
    #[serde(default)]
    pub resync: ResyncConfig,

    /// Metrics reporting.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Inbound HTTP gateway.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "tapcount".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `tapcount serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Mini app URL for the "Play Game" button. `None` omits the button.
    #[serde(default)]
    pub mini_app_url: Option<String>,

    /// Attach the "Change Username" callback button.
    #[serde(default = "default_true")]
    pub change_username_button: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            mini_app_url: None,
            change_username_button: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Render-data API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StatsApiConfig {
    /// Base URL of the stats API, without trailing slash.
    #[serde(default = "default_stats_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_stats_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StatsApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_stats_base_url(),
            timeout_secs: default_stats_timeout_secs(),
        }
    }
}

fn default_stats_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_stats_timeout_secs() -> u64 {
    10
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Session time-to-live in seconds, refreshed on every write.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tapcount").join("sessions.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "sessions.db".to_string())
}

fn default_session_ttl_secs() -> u64 {
    600
}

/// Priority tier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    /// Delay before a HIGH job becomes eligible, in milliseconds.
    #[serde(default = "default_high_delay_ms")]
    pub high_delay_ms: u64,

    /// Delay before a MEDIUM job becomes eligible, in milliseconds.
    #[serde(default = "default_medium_delay_ms")]
    pub medium_delay_ms: u64,

    /// Delay before a LOW job becomes eligible, in milliseconds.
    #[serde(default = "default_low_delay_ms")]
    pub low_delay_ms: u64,

    /// A click within this many seconds classifies the session HIGH.
    #[serde(default = "default_high_click_window_secs")]
    pub high_click_window_secs: u64,

    /// A heartbeat within this many seconds classifies the session MEDIUM.
    #[serde(default = "default_medium_heartbeat_window_secs")]
    pub medium_heartbeat_window_secs: u64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            high_delay_ms: default_high_delay_ms(),
            medium_delay_ms: default_medium_delay_ms(),
            low_delay_ms: default_low_delay_ms(),
            high_click_window_secs: default_high_click_window_secs(),
            medium_heartbeat_window_secs: default_medium_heartbeat_window_secs(),
        }
    }
}

fn default_high_delay_ms() -> u64 {
    2_000
}

fn default_medium_delay_ms() -> u64 {
    10_000
}

fn default_low_delay_ms() -> u64 {
    60_000
}

fn default_high_click_window_secs() -> u64 {
    30
}

fn default_medium_heartbeat_window_secs() -> u64 {
    120
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Maximum number of jobs executing at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum aggregate job starts per second across all workers.
    #[serde(default = "default_rate_limit_per_second")]
    pub rate_limit_per_second: u32,

    /// Total executions allowed per job, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base of the exponential retry backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            rate_limit_per_second: default_rate_limit_per_second(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_concurrency() -> usize {
    30
}

fn default_rate_limit_per_second() -> u32 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    2_000
}

/// Backpressure configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackpressureConfig {
    /// How often queue depth is sampled, in seconds.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Pending jobs above which MEDIUM is paused.
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: usize,

    /// Pending jobs above which LOW is paused.
    #[serde(default = "default_high_threshold")]
    pub high_threshold: usize,

    /// How long a MEDIUM pause lasts, in seconds.
    #[serde(default = "default_medium_pause_secs")]
    pub medium_pause_secs: u64,

    /// How long a LOW pause lasts, in seconds.
    #[serde(default = "default_low_pause_secs")]
    pub low_pause_secs: u64,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            medium_threshold: default_medium_threshold(),
            high_threshold: default_high_threshold(),
            medium_pause_secs: default_medium_pause_secs(),
            low_pause_secs: default_low_pause_secs(),
        }
    }
}

fn default_check_interval_secs() -> u64 {
    30
}

fn default_medium_threshold() -> usize {
    500
}

fn default_high_threshold() -> usize {
    1_000
}

fn default_medium_pause_secs() -> u64 {
    60
}

fn default_low_pause_secs() -> u64 {
    120
}

/// Session resync configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResyncConfig {
    /// How often every session is re-classified and re-enqueued, in seconds.
    #[serde(default = "default_resync_interval_secs")]
    pub interval_secs: u64,

    /// Sessions without a heartbeat for longer than this are evicted, in seconds.
    #[serde(default = "default_eviction_secs")]
    pub eviction_secs: u64,
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_resync_interval_secs(),
            eviction_secs: default_eviction_secs(),
        }
    }
}

fn default_resync_interval_secs() -> u64 {
    60
}

fn default_eviction_secs() -> u64 {
    300
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// How often the metrics reporter samples, in seconds.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval_secs(),
            prometheus_enabled: true,
        }
    }
}

fn default_report_interval_secs() -> u64 {
    30
}

/// Inbound HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serve the inbound HTTP API.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/v1/*` routes. `None` leaves them open.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3100
}

impl TierConfig {
    pub fn high_delay(&self) -> Duration {
        Duration::from_millis(self.high_delay_ms)
    }

    pub fn medium_delay(&self) -> Duration {
        Duration::from_millis(self.medium_delay_ms)
    }

    pub fn low_delay(&self) -> Duration {
        Duration::from_millis(self.low_delay_ms)
    }
}
