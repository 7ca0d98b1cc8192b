// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `MessageTransport`, recording every edit it is
//! asked to make and failing the next calls with scripted failures.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tapcount_core::{
    AdapterType, DispatchFailure, DispatchRequest, HealthStatus, MessageTransport, PluginAdapter,
    TapcountError,
};

/// A mock edit-in-place transport.
///
/// Every call to `edit()` is recorded in `attempts`. A call succeeds unless a
/// scripted failure is queued; successful calls are also recorded in `sent`.
#[derive(Default)]
pub struct MockTransport {
    failures: Mutex<VecDeque<DispatchFailure>>,
    attempts: Mutex<Vec<DispatchRequest>>,
    sent: Mutex<Vec<DispatchRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `edit()` call with `failure`. Queued failures are used
    /// in order.
    pub async fn fail_next(&self, failure: DispatchFailure) {
        self.failures.lock().await.push_back(failure);
    }

    /// Requests that were edited successfully.
    pub async fn sent(&self) -> Vec<DispatchRequest> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Every call, successful or not.
    pub async fn attempt_count(&self) -> usize {
        self.attempts.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, TapcountError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TapcountError> {
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn edit(&self, request: DispatchRequest) -> Result<(), DispatchFailure> {
        self.attempts.lock().await.push(request.clone());
        if let Some(failure) = self.failures.lock().await.pop_front() {
            return Err(failure);
        }
        self.sent.lock().await.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DispatchRequest {
        DispatchRequest {
            chat_id: 1,
            message_id: 2,
            content: "hi".into(),
        }
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let transport = MockTransport::new();
        transport.fail_next(DispatchFailure::Unmodified).await;
        transport
            .fail_next(DispatchFailure::Other("boom".into()))
            .await;

        assert_eq!(transport.edit(request()).await, Err(DispatchFailure::Unmodified));
        assert_eq!(
            transport.edit(request()).await,
            Err(DispatchFailure::Other("boom".into()))
        );
        assert_eq!(transport.edit(request()).await, Ok(()));
        assert_eq!(transport.attempt_count().await, 3);
        assert_eq!(transport.sent().await, vec![request()]);
    }
}
