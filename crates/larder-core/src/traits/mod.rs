// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits for catalog and asset persistence.
//!
//! All collaborators use `#[async_trait]` for dynamic dispatch compatibility
//! and are shared as `Arc<dyn Trait>` between services.

pub mod blob;
pub mod catalog;

pub use blob::BlobStore;
pub use catalog::CatalogStore;
