// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tapcount serve` command implementation.
//!
//! Opens the SQLite session store, builds the stats client and the Telegram
//! transport, starts the update scheduler and (optionally) the HTTP gateway,
//! then waits for SIGINT/SIGTERM and shuts everything down in order.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use tapcount_config::model::TapcountConfig;
use tapcount_core::{PluginAdapter, TapcountError};
use tapcount_scheduler::UpdateScheduler;
use tapcount_stats::StatsClient;
use tapcount_storage::SqliteSessionStore;
use tapcount_telegram::TelegramTransport;

#[cfg(feature = "gateway")]
use tapcount_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig};

use crate::shutdown;

/// Runs the `tapcount serve` command until a shutdown signal arrives.
pub async fn run_serve(config: TapcountConfig) -> Result<(), TapcountError> {
    init_tracing(&config.app.log_level);
    info!(name = config.app.name.as_str(), "tapcount starting");

    #[cfg(feature = "prometheus")]
    let _prometheus_adapter = if config.metrics.prometheus_enabled {
        match tapcount_prometheus::PrometheusAdapter::new() {
            Ok(adapter) => {
                info!("prometheus metrics enabled");
                Some(adapter)
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        debug!("prometheus metrics disabled by configuration");
        None
    };

    let store = Arc::new(SqliteSessionStore::open(&config.storage).await?);
    info!(path = config.storage.database_path.as_str(), "session store opened");
    let stats = Arc::new(StatsClient::new(&config.stats_api)?);
    let transport = Arc::new(TelegramTransport::new(&config.telegram)?);

    let scheduler = Arc::new(UpdateScheduler::new(
        &config,
        store.clone(),
        stats,
        transport,
    ));
    scheduler.start()?;

    let cancel = shutdown::install_signal_handler();
    let tracker = TaskTracker::new();

    tracker.spawn(purge_expired_sessions(
        store.clone(),
        Duration::from_secs(config.resync.interval_secs),
        cancel.clone(),
    ));

    #[cfg(feature = "gateway")]
    if config.gateway.enabled {
        #[cfg(feature = "prometheus")]
        let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
            _prometheus_adapter.as_ref().map(|adapter| {
                let handle = adapter.handle().clone();
                Arc::new(move || handle.render()) as Arc<dyn Fn() -> String + Send + Sync>
            });
        #[cfg(not(feature = "prometheus"))]
        let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = None;

        let state = GatewayState {
            scheduler: scheduler.clone(),
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render,
            },
        };
        let server_config = ServerConfig::from(&config.gateway);
        let gateway_cancel = cancel.clone();
        tracker.spawn(async move {
            if let Err(e) =
                tapcount_gateway::start_server(&server_config, state, gateway_cancel.clone()).await
            {
                error!(error = %e, "gateway failed, shutting down");
                gateway_cancel.cancel();
            }
        });
    } else {
        debug!("gateway disabled by configuration");
    }

    info!("tapcount ready");
    cancel.cancelled().await;

    scheduler.shutdown().await;
    tracker.close();
    tracker.wait().await;

    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "session store shutdown failed");
    }
    info!("tapcount serve shutdown complete");
    Ok(())
}

/// Reclaims rows whose TTL has lapsed. Reads already hide them.
async fn purge_expired_sessions(
    store: Arc<SqliteSessionStore>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = store.purge_expired().await {
                    warn!(error = %e, "failed to purge expired sessions");
                }
            }
            _ = cancel.cancelled() => {
                debug!("session purge shutting down");
                break;
            }
        }
    }
}

/// Tracing targets that follow `app.log_level`; everything else logs at warn.
const CRATE_TARGETS: &[&str] = &[
    "tapcount",
    "tapcount_config",
    "tapcount_gateway",
    "tapcount_prometheus",
    "tapcount_scheduler",
    "tapcount_stats",
    "tapcount_storage",
    "tapcount_telegram",
];

fn default_filter(log_level: &str) -> String {
    let mut directives: Vec<String> = CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
