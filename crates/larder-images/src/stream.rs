// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded response body consumption.
//!
//! [`StreamGuard`] gates a response on its content type, then drains the body
//! chunk by chunk against a hard byte ceiling. A chunk that would push the
//! total past the ceiling is rejected before it is buffered, so no more than
//! `max_bytes` bytes are ever held.

use std::fmt::Display;

use futures::{Stream, StreamExt};
use thiserror::Error;

/// Default byte ceiling for one image (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Why a response body was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("unexpected content type: {0}")]
    UnexpectedContentType(String),

    #[error("payload too large: more than {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("empty response body")]
    EmptyResponse,

    #[error("error reading response body: {0}")]
    Read(String),
}

/// Content-type gate and byte budget for one response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGuard {
    max_bytes: usize,
}

impl Default for StreamGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl StreamGuard {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Rejects anything whose media type is not `image/*`. A missing header
    /// is rejected too.
    pub fn check_content_type(&self, content_type: Option<&str>) -> Result<(), StreamError> {
        let raw = content_type.unwrap_or_default();
        let media_type = raw.split(';').next().unwrap_or_default().trim();
        if media_type.to_ascii_lowercase().starts_with("image/") {
            Ok(())
        } else if media_type.is_empty() {
            Err(StreamError::UnexpectedContentType("<missing>".to_string()))
        } else {
            Err(StreamError::UnexpectedContentType(media_type.to_string()))
        }
    }

    /// Rejects a declared `Content-Length` above the ceiling.
    pub fn check_declared_length(&self, declared: Option<u64>) -> Result<(), StreamError> {
        match declared {
            Some(len) if len > self.max_bytes as u64 => Err(StreamError::PayloadTooLarge {
                limit: self.max_bytes,
            }),
            _ => Ok(()),
        }
    }

    /// Check the headers, then drain `body` into memory.
    ///
    /// Stops reading at the first violation; bytes already read are dropped.
    pub async fn consume<S, B, E>(
        &self,
        content_type: Option<&str>,
        declared_len: Option<u64>,
        body: S,
    ) -> Result<Vec<u8>, StreamError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        self.check_content_type(content_type)?;
        self.check_declared_length(declared_len)?;

        let mut body = std::pin::pin!(body);
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| StreamError::Read(e.to_string()))?;
            let chunk = chunk.as_ref();
            if buf.len() + chunk.len() > self.max_bytes {
                return Err(StreamError::PayloadTooLarge {
                    limit: self.max_bytes,
                });
            }
            buf.extend_from_slice(chunk);
        }

        if buf.is_empty() {
            return Err(StreamError::EmptyResponse);
        }
        Ok(buf)
    }
}
