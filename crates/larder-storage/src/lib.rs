// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborators for Larder.
//!
//! [`SqliteCatalog`] is the relational catalog store: WAL-mode SQLite with
//! embedded migrations and a single-writer model via `tokio-rusqlite`.
//! [`FsBlobStore`] keeps image assets as files under a media root.

pub mod adapter;
pub mod blobs;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteCatalog;
pub use blobs::FsBlobStore;
pub use database::Database;
