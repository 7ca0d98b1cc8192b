// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tapcount.toml` > `~/.config/tapcount/tapcount.toml` >
//! `/etc/tapcount/tapcount.toml`, with environment variable overrides via `TAPCOUNT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TapcountConfig;

/// Sections recognised by the env provider, in mapping order.
const SECTIONS: &[&str] = &[
    "app",
    "telegram",
    "stats_api",
    "storage",
    "tiers",
    "worker",
    "backpressure",
    "resync",
    "metrics",
    "gateway",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tapcount/tapcount.toml`
/// 3. `~/.config/tapcount/tapcount.toml`
/// 4. `./tapcount.toml`
/// 5. `TAPCOUNT_*` environment variables
pub fn load_config() -> Result<TapcountConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<TapcountConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TapcountConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TapcountConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TapcountConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TapcountConfig::default()))
        .merge(Toml::file("/etc/tapcount/tapcount.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tapcount/tapcount.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tapcount.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `TAPCOUNT_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because both section
/// names (`stats_api`) and keys (`bot_token`) contain underscores.
fn env_provider() -> Env {
    Env::prefixed("TAPCOUNT_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Maps a lowercased, prefix-stripped env key onto its dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_underscored_section_names() {
        assert_eq!(map_env_key("stats_api_base_url"), "stats_api.base_url");
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(
            map_env_key("worker_rate_limit_per_second"),
            "worker.rate_limit_per_second"
        );
    }

    #[test]
    fn leaves_unknown_keys_untouched() {
        assert_eq!(map_env_key("bogus"), "bogus");
    }
}
