// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the tapcount update scheduler.
//!
//! Implements [`MessageTransport`] by editing the counter message in place
//! with `editMessageText` (HTML parse mode), re-attaching the inline
//! keyboard on every edit, and mapping Bot API errors onto
//! [`DispatchFailure`].

pub mod keyboard;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use tapcount_config::model::TelegramConfig;
use tapcount_core::{
    AdapterType, DispatchFailure, DispatchRequest, HealthStatus, MessageTransport,
    PluginAdapter, TapcountError,
};

/// Edits counter messages through the Telegram Bot API.
pub struct TelegramTransport {
    bot: Bot,
    keyboard: InlineKeyboardMarkup,
}

impl TelegramTransport {
    /// Creates a transport. Requires `config.bot_token`.
    pub fn new(config: &TelegramConfig) -> Result<Self, TapcountError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                TapcountError::Config("telegram.bot_token is required for the Telegram transport".into())
            })?;

        Ok(Self {
            bot: Bot::new(token),
            keyboard: keyboard::counter_keyboard(config)?,
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

/// Maps a Bot API failure onto the scheduler's failure classes.
pub fn classify_request_error(err: &RequestError) -> DispatchFailure {
    match err {
        RequestError::RetryAfter(secs) => DispatchFailure::RateLimited {
            retry_after: Some(secs.duration()),
        },
        RequestError::Api(ApiError::MessageNotModified) => DispatchFailure::Unmodified,
        RequestError::Api(ApiError::MessageToEditNotFound) => DispatchFailure::TargetGone,
        other => DispatchFailure::Other(other.to_string()),
    }
}

#[async_trait]
impl PluginAdapter for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, TapcountError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Telegram bot unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), TapcountError> {
        debug!("telegram transport shutting down");
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for TelegramTransport {
    async fn edit(&self, request: DispatchRequest) -> Result<(), DispatchFailure> {
        self.bot
            .edit_message_text(
                ChatId(request.chat_id),
                MessageId(request.message_id),
                request.content,
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(self.keyboard.clone())
            .await
            .map(|_| ())
            .map_err(|e| classify_request_error(&e))
    }
}
