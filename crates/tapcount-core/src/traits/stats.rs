// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Render-data source trait.

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;
use crate::types::{RenderStats, StatsError};

/// Supplies the statistics a session's message is rendered from.
#[async_trait]
pub trait StatsSource: PluginAdapter {
    /// Fetches current render inputs for a user.
    ///
    /// Returns [`StatsError::NotFound`] when the user does not exist.
    async fn fetch(&self, user_id: i64) -> Result<RenderStats, StatsError>;
}
