// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline keyboard attached to the counter message.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};

use tapcount_config::model::TelegramConfig;
use tapcount_core::TapcountError;

pub const PLAY_BUTTON: &str = "🎮 Play Game";
pub const CHANGE_USERNAME_BUTTON: &str = "📝 Change Username";
pub const CHANGE_USERNAME_CALLBACK: &str = "change_username";

/// One button per row: the mini app launcher, then the rename callback.
pub fn counter_keyboard(config: &TelegramConfig) -> Result<InlineKeyboardMarkup, TapcountError> {
    let mut rows = Vec::new();

    if let Some(raw) = config.mini_app_url.as_deref() {
        let url = raw.parse::<reqwest::Url>().map_err(|e| {
            TapcountError::Config(format!("telegram.mini_app_url `{raw}` is not a valid URL: {e}"))
        })?;
        rows.push(vec![InlineKeyboardButton::web_app(
            PLAY_BUTTON,
            WebAppInfo { url },
        )]);
    }

    if config.change_username_button {
        rows.push(vec![InlineKeyboardButton::callback(
            CHANGE_USERNAME_BUTTON,
            CHANGE_USERNAME_CALLBACK,
        )]);
    }

    Ok(InlineKeyboardMarkup::new(rows))
}
