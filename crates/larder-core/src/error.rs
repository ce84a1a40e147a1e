// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Larder catalog backend.

use thiserror::Error;

/// The primary error type used across collaborator traits and catalog operations.
///
/// Fetch-level failures (SSRF blocks, oversized payloads, transport errors) are
/// not represented here: the image pipeline folds them into a
/// [`FetchOutcome`](crate::types::FetchOutcome) instead of raising them.
#[derive(Debug, Error)]
pub enum LarderError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Catalog storage errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Blob storage errors (asset write or delete failure).
    #[error("blob storage error: {message}")]
    Blob {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Incoming data failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The request conflicts with existing catalog state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LarderError {
    /// Wrap any error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }
}
