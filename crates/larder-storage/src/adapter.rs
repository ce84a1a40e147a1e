// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`CatalogStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use larder_config::model::StorageConfig;
use larder_core::{CatalogStore, FoodRecord, FoodSource, HealthStatus, ImageStatus, LarderError};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed catalog store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
#[derive(Clone)]
pub struct SqliteCatalog {
    db: Database,
}

impl SqliteCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the database described by `config`, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, LarderError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite catalog initialized");
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoint the WAL before the process exits.
    pub async fn close(&self) -> Result<(), LarderError> {
        self.db.checkpoint().await
    }

    /// Number of records per image status.
    pub async fn image_status_counts(&self) -> Result<Vec<(String, i64)>, LarderError> {
        queries::foods::count_by_image_status(&self.db).await
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn health_check(&self) -> Result<HealthStatus, LarderError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn get(&self, id: i64) -> Result<Option<FoodRecord>, LarderError> {
        queries::foods::get_food(&self.db, id).await
    }

    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<FoodRecord>, LarderError> {
        queries::foods::find_by_barcode(&self.db, barcode).await
    }

    async fn find_by_external_id(
        &self,
        source: FoodSource,
        external_id: &str,
    ) -> Result<Option<FoodRecord>, LarderError> {
        queries::foods::find_by_external_id(&self.db, source, external_id).await
    }

    async fn insert(&self, record: &FoodRecord) -> Result<i64, LarderError> {
        queries::foods::insert_food(&self.db, record).await
    }

    async fn update_catalog(&self, record: &FoodRecord) -> Result<(), LarderError> {
        queries::foods::update_catalog(&self.db, record).await
    }

    async fn save_image_state(&self, record: &FoodRecord) -> Result<(), LarderError> {
        queries::foods::save_image_state(&self.db, record).await
    }

    async fn mark_image_status(
        &self,
        id: i64,
        status: ImageStatus,
        downloaded_at: DateTime<Utc>,
    ) -> Result<(), LarderError> {
        queries::foods::mark_image_status(&self.db, id, status, downloaded_at).await
    }
}
