// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Larder integration tests.
//!
//! Provides deterministic stand-ins for every collaborator so tests run
//! without DNS, network access or shared state.
//!
//! # Components
//!
//! - [`MockDns`] - fixed-table DNS lookup with a lookup counter
//! - [`ScriptedFetcher`] - image fetcher returning pre-configured results
//! - [`MemoryBlobStore`] - blob store that records every save and delete
//! - [`MemoryCatalog`] - catalog store with SQLite's uniqueness rules
//! - [`TestHarness`] - pipeline wired to temp SQLite and filesystem storage

pub mod harness;
pub mod memory_blobs;
pub mod memory_catalog;
pub mod mock_dns;
pub mod mock_fetcher;

pub use harness::TestHarness;
pub use memory_blobs::{BlobOp, MemoryBlobStore};
pub use memory_catalog::MemoryCatalog;
pub use mock_dns::MockDns;
pub use mock_fetcher::ScriptedFetcher;
