// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks run after deserialization.
//!
//! Every rule is evaluated; the caller gets the full list of violations
//! rather than the first one.

use std::net::IpAddr;

use crate::diagnostic::ConfigError;
use crate::model::TapcountConfig;

/// Validate a deserialized configuration.
pub fn validate_config(config: &TapcountConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    check_tiers(config, &mut errors);
    check_worker(config, &mut errors);
    check_backpressure(config, &mut errors);
    check_intervals(config, &mut errors);

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path must not be empty"));
    }
    if config.storage.session_ttl_secs == 0 {
        errors.push(ConfigError::invalid("storage.session_ttl_secs must be positive"));
    }
    if config.stats_api.base_url.trim().is_empty() {
        errors.push(ConfigError::invalid("stats_api.base_url must not be empty"));
    }
    if config.stats_api.timeout_secs == 0 {
        errors.push(ConfigError::invalid("stats_api.timeout_secs must be positive"));
    }
    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::invalid(
            "telegram.bot_token must not be empty when set",
        ));
    }

    check_gateway(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_tiers(config: &TapcountConfig, errors: &mut Vec<ConfigError>) {
    let t = &config.tiers;
    if !(t.high_delay_ms < t.medium_delay_ms && t.medium_delay_ms < t.low_delay_ms) {
        errors.push(ConfigError::invalid(format!(
            "tier delays must be strictly increasing (high < medium < low), got {} / {} / {}",
            t.high_delay_ms, t.medium_delay_ms, t.low_delay_ms
        )));
    }
    if t.high_click_window_secs == 0 {
        errors.push(ConfigError::invalid("tiers.high_click_window_secs must be positive"));
    }
    if t.medium_heartbeat_window_secs == 0 {
        errors.push(ConfigError::invalid(
            "tiers.medium_heartbeat_window_secs must be positive",
        ));
    }
}

fn check_worker(config: &TapcountConfig, errors: &mut Vec<ConfigError>) {
    let w = &config.worker;
    if w.concurrency == 0 {
        errors.push(ConfigError::invalid("worker.concurrency must be at least 1"));
    }
    if w.rate_limit_per_second == 0 {
        errors.push(ConfigError::invalid(
            "worker.rate_limit_per_second must be at least 1",
        ));
    }
    if w.max_attempts == 0 {
        errors.push(ConfigError::invalid("worker.max_attempts must be at least 1"));
    }
    if w.backoff_base_ms == 0 {
        errors.push(ConfigError::invalid("worker.backoff_base_ms must be positive"));
    }
}

fn check_backpressure(config: &TapcountConfig, errors: &mut Vec<ConfigError>) {
    let b = &config.backpressure;
    if b.high_threshold <= b.medium_threshold {
        errors.push(ConfigError::invalid(format!(
            "backpressure.high_threshold ({}) must be greater than backpressure.medium_threshold ({})",
            b.high_threshold, b.medium_threshold
        )));
    }
    if b.medium_pause_secs == 0 || b.low_pause_secs == 0 {
        errors.push(ConfigError::invalid(
            "backpressure pause durations must be positive",
        ));
    }
}

fn check_intervals(config: &TapcountConfig, errors: &mut Vec<ConfigError>) {
    let periodic = [
        ("backpressure.check_interval_secs", config.backpressure.check_interval_secs),
        ("resync.interval_secs", config.resync.interval_secs),
        ("metrics.report_interval_secs", config.metrics.report_interval_secs),
    ];
    for (key, value) in periodic {
        if value == 0 {
            errors.push(ConfigError::invalid(format!("{key} must be positive")));
        }
    }

    // A session still inside the MEDIUM window must never be evicted.
    if config.resync.eviction_secs < config.tiers.medium_heartbeat_window_secs {
        errors.push(ConfigError::invalid(format!(
            "resync.eviction_secs ({}) must be at least tiers.medium_heartbeat_window_secs ({})",
            config.resync.eviction_secs, config.tiers.medium_heartbeat_window_secs
        )));
    }
}

fn check_gateway(config: &TapcountConfig, errors: &mut Vec<ConfigError>) {
    let g = &config.gateway;
    if !g.enabled {
        return;
    }
    let host = g.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::invalid("gateway.host must not be empty"));
        return;
    }
    let loopback = host == "localhost" || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback());
    if !loopback && g.bearer_token.as_deref().is_none_or(|t| t.trim().is_empty()) {
        errors.push(ConfigError::invalid(format!(
            "gateway.bearer_token is required when binding to non-loopback host `{host}`"
        )));
    }
}
