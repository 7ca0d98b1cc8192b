// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite session store for the tapcount update scheduler.
//!
//! Sessions live in a single WAL-mode table with a per-row expiry that is
//! pushed forward on every write. All access goes through the single
//! `tokio-rusqlite` background thread.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteSessionStore;
pub use database::Database;
