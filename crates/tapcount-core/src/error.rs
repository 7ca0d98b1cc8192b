// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the tapcount workspace.

use thiserror::Error;

/// The primary error type used across adapter traits and core operations.
#[derive(Debug, Error)]
pub enum TapcountError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Session store errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging transport errors (bot client construction, malformed identifiers).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Render-data API errors.
    #[error("stats error: {message}")]
    Stats {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A requested entity does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
