// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.

use tapcount_core::TapcountError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies pending migrations. Refinery records progress in
/// `refinery_schema_history`, so this is safe on every open.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), TapcountError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| TapcountError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
