// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog store trait for the relational persistence collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::LarderError;
use crate::types::{FoodRecord, FoodSource, HealthStatus, ImageStatus};

/// Persistence backend for [`FoodRecord`]s.
///
/// Each method is atomic on its own. Two concurrent writers to the same
/// record resolve last-writer-wins; the store makes no stronger promise.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Reports whether the backend is reachable.
    async fn health_check(&self) -> Result<HealthStatus, LarderError>;

    /// Fetches a record by row identifier.
    async fn get(&self, id: i64) -> Result<Option<FoodRecord>, LarderError>;

    /// Fetches a record by its globally unique barcode.
    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<FoodRecord>, LarderError>;

    /// Fetches a record by its `(source, external_id)` identity.
    async fn find_by_external_id(
        &self,
        source: FoodSource,
        external_id: &str,
    ) -> Result<Option<FoodRecord>, LarderError>;

    /// Inserts a new record and returns its row identifier. `record.id` is ignored.
    async fn insert(&self, record: &FoodRecord) -> Result<i64, LarderError>;

    /// Overwrites the catalog fields of an existing record: identity, nutrition,
    /// provenance, content hash, image signature and image source URLs.
    async fn update_catalog(&self, record: &FoodRecord) -> Result<(), LarderError>;

    /// Overwrites every image field of an existing record in one write.
    async fn save_image_state(&self, record: &FoodRecord) -> Result<(), LarderError>;

    /// Updates only the image status and download timestamp.
    async fn mark_image_status(
        &self,
        id: i64,
        status: ImageStatus,
        downloaded_at: DateTime<Utc>,
    ) -> Result<(), LarderError>;
}
