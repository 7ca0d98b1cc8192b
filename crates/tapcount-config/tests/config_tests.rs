// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the tapcount configuration system.

use tapcount_config::diagnostic::ConfigError;
use tapcount_config::{load_and_validate_str, load_config_from_str, TapcountConfig};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[app]
name = "clicker"
log_level = "debug"

[telegram]
bot_token = "123:ABC"
mini_app_url = "https://t.me/clicker/app"
change_username_button = false

[stats_api]
base_url = "http://stats.internal:3000"
timeout_secs = 5

[storage]
database_path = "/tmp/sessions.db"
wal_mode = false
session_ttl_secs = 900

[tiers]
high_delay_ms = 1000
medium_delay_ms = 5000
low_delay_ms = 30000
high_click_window_secs = 20
medium_heartbeat_window_secs = 90

[worker]
concurrency = 8
rate_limit_per_second = 20
max_attempts = 5
backoff_base_ms = 500

[backpressure]
check_interval_secs = 10
medium_threshold = 100
high_threshold = 200
medium_pause_secs = 30
low_pause_secs = 60

[resync]
interval_secs = 15
eviction_secs = 180

[metrics]
report_interval_secs = 5
prometheus_enabled = false

[gateway]
enabled = true
host = "0.0.0.0"
port = 8080
bearer_token = "s3cret"
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.app.name, "clicker");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert!(!config.telegram.change_username_button);
    assert_eq!(config.stats_api.base_url, "http://stats.internal:3000");
    assert_eq!(config.storage.session_ttl_secs, 900);
    assert_eq!(config.tiers.medium_delay_ms, 5000);
    assert_eq!(config.worker.max_attempts, 5);
    assert_eq!(config.backpressure.high_threshold, 200);
    assert_eq!(config.resync.eviction_secs, 180);
    assert!(!config.metrics.prometheus_enabled);
    assert_eq!(config.gateway.port, 8080);
}

#[test]
fn empty_toml_yields_calibrated_defaults() {
    let config: TapcountConfig = load_config_from_str("").expect("defaults");
    assert_eq!(config.tiers.high_delay_ms, 2_000);
    assert_eq!(config.tiers.medium_delay_ms, 10_000);
    assert_eq!(config.tiers.low_delay_ms, 60_000);
    assert_eq!(config.tiers.high_click_window_secs, 30);
    assert_eq!(config.tiers.medium_heartbeat_window_secs, 120);
    assert_eq!(config.worker.concurrency, 30);
    assert_eq!(config.worker.rate_limit_per_second, 30);
    assert_eq!(config.worker.max_attempts, 3);
    assert_eq!(config.worker.backoff_base_ms, 2_000);
    assert_eq!(config.backpressure.medium_threshold, 500);
    assert_eq!(config.backpressure.high_threshold, 1_000);
    assert_eq!(config.backpressure.medium_pause_secs, 60);
    assert_eq!(config.backpressure.low_pause_secs, 120);
    assert_eq!(config.resync.interval_secs, 60);
    assert_eq!(config.resync.eviction_secs, 300);
    assert_eq!(config.metrics.report_interval_secs, 30);
    assert_eq!(config.storage.session_ttl_secs, 600);
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 3100);
}

#[test]
fn unknown_key_gets_suggestion_and_span() {
    let toml = "[worker]\nconcurency = 4\n";
    let errors = load_and_validate_str(toml).expect_err("unknown key");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "concurency");
            assert_eq!(suggestion.as_deref(), Some("concurrency"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[redis]\nurl = \"redis://\"\n").expect_err("unknown");
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[worker]\nconcurrency = \"many\"\n").expect_err("type");
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

#[test]
fn semantic_errors_surface_through_loader() {
    let toml = "[backpressure]\nmedium_threshold = 800\nhigh_threshold = 400\n";
    let errors = load_and_validate_str(toml).expect_err("inverted thresholds");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}
