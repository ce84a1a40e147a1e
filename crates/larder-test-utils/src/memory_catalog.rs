// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory catalog store with the same uniqueness rules as SQLite.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use larder_core::{CatalogStore, FoodRecord, FoodSource, HealthStatus, ImageStatus, LarderError};
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    rows: BTreeMap<i64, FoodRecord>,
    next_id: i64,
    image_writes: usize,
}

/// A [`CatalogStore`] backed by a `BTreeMap`.
///
/// Enforces unique barcodes and unique `(source, external_id)` pairs. Writes
/// can be made to fail to exercise persistence error paths.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    state: Arc<Mutex<State>>,
    fail_writes: Arc<AtomicBool>,
    failing_image_saves: Arc<AtomicUsize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `save_image_state` fail. Other writes
    /// are unaffected.
    pub fn fail_next_image_saves(&self, count: usize) {
        self.failing_image_saves.store(count, Ordering::SeqCst);
    }

    /// Number of `save_image_state` + `mark_image_status` calls so far.
    pub async fn image_writes(&self) -> usize {
        self.state.lock().await.image_writes
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_writable(&self) -> Result<(), LarderError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LarderError::Storage {
                source: "injected write failure".into(),
            });
        }
        Ok(())
    }
}

fn check_unique(state: &State, record: &FoodRecord, ignore_id: i64) -> Result<(), LarderError> {
    let clash = state.rows.values().any(|r| {
        r.id != ignore_id
            && (r.barcode == record.barcode
                || (r.source == record.source && r.external_id == record.external_id))
    });
    if clash {
        return Err(LarderError::Conflict(
            "UNIQUE constraint failed: foods".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn health_check(&self) -> Result<HealthStatus, LarderError> {
        Ok(HealthStatus::Healthy)
    }

    async fn get(&self, id: i64) -> Result<Option<FoodRecord>, LarderError> {
        Ok(self.state.lock().await.rows.get(&id).cloned())
    }

    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<FoodRecord>, LarderError> {
        Ok(self
            .state
            .lock()
            .await
            .rows
            .values()
            .find(|r| r.barcode == barcode)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        source: FoodSource,
        external_id: &str,
    ) -> Result<Option<FoodRecord>, LarderError> {
        Ok(self
            .state
            .lock()
            .await
            .rows
            .values()
            .find(|r| r.source == source && r.external_id == external_id)
            .cloned())
    }

    async fn insert(&self, record: &FoodRecord) -> Result<i64, LarderError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        check_unique(&state, record, 0)?;
        state.next_id += 1;
        let id = state.next_id;
        let mut stored = record.clone();
        stored.id = id;
        state.rows.insert(id, stored);
        Ok(id)
    }

    async fn update_catalog(&self, record: &FoodRecord) -> Result<(), LarderError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        check_unique(&state, record, record.id)?;
        let row = state
            .rows
            .get_mut(&record.id)
            .ok_or_else(|| LarderError::NotFound(format!("food record {}", record.id)))?;
        let mut updated = record.clone();
        updated.image_large = row.image_large.take();
        updated.image_small = row.image_small.take();
        updated.image_downloaded_at = row.image_downloaded_at;
        updated.image_status = row.image_status;
        *row = updated;
        Ok(())
    }

    async fn save_image_state(&self, record: &FoodRecord) -> Result<(), LarderError> {
        self.check_writable()?;
        let injected = self
            .failing_image_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(LarderError::Storage {
                source: "injected image state failure".into(),
            });
        }
        let mut state = self.state.lock().await;
        state.image_writes += 1;
        let row = state
            .rows
            .get_mut(&record.id)
            .ok_or_else(|| LarderError::NotFound(format!("food record {}", record.id)))?;
        row.image_signature = record.image_signature.clone();
        row.image_large_source_url = record.image_large_source_url.clone();
        row.image_small_source_url = record.image_small_source_url.clone();
        row.image_large = record.image_large.clone();
        row.image_small = record.image_small.clone();
        row.image_downloaded_at = record.image_downloaded_at;
        row.image_status = record.image_status;
        Ok(())
    }

    async fn mark_image_status(
        &self,
        id: i64,
        status: ImageStatus,
        downloaded_at: DateTime<Utc>,
    ) -> Result<(), LarderError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        state.image_writes += 1;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| LarderError::NotFound(format!("food record {id}")))?;
        row.image_status = status;
        row.image_downloaded_at = Some(downloaded_at);
        Ok(())
    }
}
