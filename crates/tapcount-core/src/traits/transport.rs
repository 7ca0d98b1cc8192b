// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging transport trait for edit-in-place delivery.

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;
use crate::types::{DispatchFailure, DispatchRequest};

/// Edits a previously sent chat message in place.
#[async_trait]
pub trait MessageTransport: PluginAdapter {
    /// Replaces the target message's content.
    ///
    /// Failures are already classified; callers never inspect error strings.
    async fn edit(&self, request: DispatchRequest) -> Result<(), DispatchFailure>;
}
