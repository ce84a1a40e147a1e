// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary with
//! `embed_migrations!` and applied whenever the database is opened.

use larder_core::LarderError;
use tracing::info;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery records applied versions in `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), LarderError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(LarderError::storage)?;
    for migration in report.applied_migrations() {
        info!(version = migration.version(), name = %migration.name(), "applied migration");
    }
    Ok(())
}
