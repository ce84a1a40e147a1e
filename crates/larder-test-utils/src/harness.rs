// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring the image pipeline to real storage.
//!
//! `TestHarness` assembles a temp SQLite catalog, a filesystem blob store in
//! the same temp directory and a [`ScriptedFetcher`], so pipeline and catalog
//! tests exercise real persistence without touching the network.

use std::sync::Arc;

use larder_config::LarderConfig;
use larder_config::model::{MediaConfig, StorageConfig};
use larder_core::{BlobStore, CatalogStore, FoodRecord, LarderError};
use larder_images::ImagePipeline;
use larder_storage::{FsBlobStore, SqliteCatalog};

use crate::mock_fetcher::ScriptedFetcher;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    namespace: String,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            namespace: "foods".to_string(),
        }
    }

    /// Set the blob namespace used by the pipeline.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Create the temp directory, open storage and wire the pipeline.
    pub async fn build(self) -> Result<TestHarness, LarderError> {
        let temp_dir = tempfile::TempDir::new().map_err(LarderError::storage)?;

        let storage = StorageConfig {
            database_path: temp_dir.path().join("test.db").display().to_string(),
            wal_mode: true,
        };
        let media = MediaConfig {
            root: temp_dir.path().join("media").display().to_string(),
            namespace: self.namespace.clone(),
        };

        let sqlite = SqliteCatalog::open(&storage).await?;
        let catalog: Arc<dyn CatalogStore> = Arc::new(sqlite.clone());
        let fs_blobs = FsBlobStore::from_config(&media);
        let blobs: Arc<dyn BlobStore> = Arc::new(fs_blobs.clone());
        let fetcher = ScriptedFetcher::new();
        let pipeline = ImagePipeline::new(
            Arc::new(fetcher.clone()),
            blobs.clone(),
            catalog.clone(),
            self.namespace.clone(),
        );

        let config = LarderConfig {
            storage,
            media,
            ..LarderConfig::default()
        };

        Ok(TestHarness {
            fetcher,
            sqlite,
            fs_blobs,
            catalog,
            blobs,
            pipeline,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete pipeline environment backed by temp storage.
pub struct TestHarness {
    /// Scripted fetcher feeding the pipeline.
    pub fetcher: ScriptedFetcher,
    /// Concrete SQLite store, for store-specific assertions.
    pub sqlite: SqliteCatalog,
    /// Concrete filesystem blob store.
    pub fs_blobs: FsBlobStore,
    pub catalog: Arc<dyn CatalogStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub pipeline: ImagePipeline,
    /// Configuration pointing at the temp paths.
    pub config: LarderConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Insert `record` and return it as stored, with its id.
    pub async fn seed(&self, record: &FoodRecord) -> Result<FoodRecord, LarderError> {
        let id = self.catalog.insert(record).await?;
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| LarderError::NotFound(format!("food record {id}")))
    }

    /// Reload a record from the catalog.
    pub async fn reload(&self, id: i64) -> Result<FoodRecord, LarderError> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| LarderError::NotFound(format!("food record {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::{FoodSource, ImageStatus};

    #[tokio::test]
    async fn harness_refreshes_into_real_storage() {
        let harness = TestHarness::builder().build().await.unwrap();
        let mut record = harness
            .seed(&FoodRecord::new(FoodSource::OpenFoodFacts, "9", "9", "Tea"))
            .await
            .unwrap();

        harness.fetcher.respond("https://img.example/l.jpg", b"L".to_vec()).await;
        harness.fetcher.respond("https://img.example/s.jpg", b"S".to_vec()).await;
        let outcome = harness
            .pipeline
            .refresh(
                &mut record,
                "https://img.example/l.jpg",
                "https://img.example/s.jpg",
                Some("v1"),
            )
            .await
            .unwrap();
        assert!(outcome.success);

        let stored = harness.reload(record.id).await.unwrap();
        assert_eq!(stored.image_status, ImageStatus::Ok);
        assert_eq!(stored.image_large.as_deref(), Some("foods/9/v1_large.jpg"));
        assert!(harness.blobs.exists("foods/9/v1_small.jpg").await.unwrap());
    }
}
