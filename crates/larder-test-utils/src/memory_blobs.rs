// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory blob store that records every operation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use larder_core::{BlobStore, HealthStatus, LarderError};
use tokio::sync::Mutex;

/// One call made against a [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOp {
    Save(String),
    Delete(String),
}

#[derive(Default)]
struct State {
    blobs: HashMap<String, Vec<u8>>,
    ops: Vec<BlobOp>,
    failing_saves: Vec<String>,
}

/// A [`BlobStore`] backed by a `HashMap`.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    state: Arc<Mutex<State>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every save whose name contains `fragment` fail.
    pub async fn fail_saves_containing(&self, fragment: &str) {
        self.state.lock().await.failing_saves.push(fragment.to_string());
    }

    /// Seed a blob without recording an operation.
    pub async fn insert(&self, name: &str, bytes: &[u8]) {
        self.state
            .lock()
            .await
            .blobs
            .insert(name.to_string(), bytes.to_vec());
    }

    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().await.blobs.get(name).cloned()
    }

    /// Stored names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().await.blobs.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn ops(&self) -> Vec<BlobOp> {
        self.state.lock().await.ops.clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn health_check(&self) -> Result<HealthStatus, LarderError> {
        Ok(HealthStatus::Healthy)
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> Result<String, LarderError> {
        let mut state = self.state.lock().await;
        if state.failing_saves.iter().any(|f| name.contains(f.as_str())) {
            return Err(LarderError::Blob {
                message: format!("injected save failure for {name}"),
                source: None,
            });
        }
        state.ops.push(BlobOp::Save(name.to_string()));
        state.blobs.insert(name.to_string(), bytes.to_vec());
        Ok(name.to_string())
    }

    async fn delete(&self, name: &str) -> Result<(), LarderError> {
        let mut state = self.state.lock().await;
        state.ops.push(BlobOp::Delete(name.to_string()));
        state.blobs.remove(name);
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, LarderError> {
        Ok(self.state.lock().await.blobs.contains_key(name))
    }
}
