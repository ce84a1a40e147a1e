// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted image fetcher for pipeline tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use larder_images::{FetchError, ImageFetcher};
use tokio::sync::Mutex;

/// An [`ImageFetcher`] that returns pre-configured results per URL.
///
/// URLs without a scripted result fail with a transport error. Every call is
/// recorded in order.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    responses: Arc<Mutex<HashMap<String, Result<Vec<u8>, FetchError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` for `url`.
    pub async fn respond(&self, url: &str, bytes: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .await
            .insert(url.to_string(), Ok(bytes.into()));
    }

    /// Fail `url` with `err`.
    pub async fn fail(&self, url: &str, err: FetchError) {
        self.responses
            .lock()
            .await
            .insert(url.to_string(), Err(err));
    }

    /// URLs fetched so far, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ImageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().await.push(url.to_string());
        self.responses
            .lock()
            .await
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Transport(format!("no scripted response for {url}"))))
    }
}
