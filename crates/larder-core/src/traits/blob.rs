// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob store trait for image asset persistence.

use async_trait::async_trait;

use crate::error::LarderError;
use crate::types::HealthStatus;

/// Save/delete-by-name storage for asset bytes.
///
/// Names are slash-separated relative paths such as
/// `foods/3017620422003/front_en.1_large.jpg`. The medium (filesystem,
/// object store) is up to the implementation.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reports whether the backend is writable.
    async fn health_check(&self) -> Result<HealthStatus, LarderError>;

    /// Stores `bytes` under `name`, replacing any existing blob, and returns
    /// the name the blob was stored under.
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<String, LarderError>;

    /// Deletes the blob stored under `name`. Deleting a missing blob is not an error.
    async fn delete(&self, name: &str) -> Result<(), LarderError>;

    /// Returns whether a blob is stored under `name`.
    async fn exists(&self, name: &str) -> Result<bool, LarderError>;
}
