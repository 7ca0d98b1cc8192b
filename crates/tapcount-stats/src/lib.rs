// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the render-data API.
//!
//! Fetches `GET {base_url}/api/stats/{user_id}` and classifies failures:
//! a 404 means the user is unknown and the update should be dropped, while
//! everything else is reported as unavailable so the job can be retried.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use tapcount_config::model::StatsApiConfig;
use tapcount_core::{
    AdapterType, HealthStatus, PluginAdapter, RenderStats, StatsError, StatsSource,
    TapcountError,
};

/// Client for the stats API.
#[derive(Debug, Clone)]
pub struct StatsClient {
    client: reqwest::Client,
    base_url: String,
}

impl StatsClient {
    pub fn new(config: &StatsApiConfig) -> Result<Self, TapcountError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TapcountError::Stats {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn stats_url(&self, user_id: i64) -> String {
        format!("{}/api/stats/{user_id}", self.base_url)
    }
}

#[async_trait]
impl PluginAdapter for StatsClient {
    fn name(&self) -> &str {
        "stats-http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Stats
    }

    async fn health_check(&self) -> Result<HealthStatus, TapcountError> {
        match self.client.get(&self.base_url).send().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("stats API unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), TapcountError> {
        Ok(())
    }
}

#[async_trait]
impl StatsSource for StatsClient {
    async fn fetch(&self, user_id: i64) -> Result<RenderStats, StatsError> {
        let response = self
            .client
            .get(self.stats_url(user_id))
            .send()
            .await
            .map_err(|e| StatsError::Unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        debug!(user_id, status = %status, "stats response received");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StatsError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StatsError::Unavailable(format!(
                "API returned {status}: {body}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StatsError::Unavailable(format!("failed to read body: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| StatsError::Unavailable(format!("malformed stats payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> StatsClient {
        StatsClient::new(&StatsApiConfig {
            base_url: format!("{base_url}/"),
            timeout_secs: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_parses_stats_payload() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "userStats": {"username": "alice", "clicks": 1234},
            "globalStats": {"totalClicks": 98765},
            "leaderboard": [
                {"username": "bob", "clicks": 5000},
                {"username": "alice", "clicks": 1234}
            ]
        });
        Mock::given(method("GET"))
            .and(path("/api/stats/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let stats = client(&server.uri()).fetch(42).await.unwrap();
        assert_eq!(stats.user_stats.username, "alice");
        assert_eq!(stats.user_stats.clicks, 1234);
        assert_eq!(stats.global_stats.total_clicks, 98765);
        assert_eq!(stats.leaderboard.len(), 2);
        assert_eq!(stats.leaderboard[0].username, "bob");
    }

    #[tokio::test]
    async fn not_found_is_distinguished() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats/7"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "User not found"})),
            )
            .mount(&server)
            .await;

        assert_eq!(client(&server.uri()).fetch(7).await, Err(StatsError::NotFound));
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server.uri()).fetch(1).await.unwrap_err();
        assert!(matches!(err, StatsError::Unavailable(ref m) if m.contains("500")), "got: {err}");
    }

    #[tokio::test]
    async fn malformed_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server.uri()).fetch(1).await.unwrap_err();
        assert!(matches!(err, StatsError::Unavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let err = client("http://127.0.0.1:9").fetch(1).await.unwrap_err();
        assert!(matches!(err, StatsError::Unavailable(_)));
    }
}
