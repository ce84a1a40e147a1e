// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `larder fetch` command implementation.
//!
//! Runs a single URL through the same guarded fetcher the pipeline uses,
//! which makes it handy for checking whether an upstream image URL would be
//! accepted.

use std::path::Path;

use larder_config::LarderConfig;
use larder_core::LarderError;
use larder_images::{FetchError, ImageFetcher, PinnedFetcher};
use larder_security::{HostResolver, redact_url};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct FetchSummary {
    url: String,
    bytes: usize,
    output: Option<String>,
}

fn to_larder_error(err: FetchError) -> LarderError {
    match err {
        FetchError::Validation(e) => LarderError::Validation(e.to_string()),
        other => LarderError::Internal(format!("fetch failed: {other}")),
    }
}

pub async fn run_fetch(
    config: &LarderConfig,
    url: &str,
    output: Option<&Path>,
) -> Result<(), LarderError> {
    let fetcher = PinnedFetcher::from_config(&config.fetch, HostResolver::system());
    let bytes = fetcher.fetch(url).await.map_err(to_larder_error)?;

    if let Some(path) = output {
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| LarderError::Blob {
                message: format!("cannot write {}", path.display()),
                source: Some(Box::new(e)),
            })?;
    }

    let shown = url::Url::parse(url)
        .map(|u| redact_url(&u))
        .unwrap_or_else(|_| url.to_string());
    crate::input::print_json(&FetchSummary {
        url: shown,
        bytes: bytes.len(),
        output: output.map(|p| p.display().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_security::ValidationError;

    #[test]
    fn blocked_targets_map_to_validation_errors() {
        let err = to_larder_error(FetchError::Validation(ValidationError::UnsupportedScheme(
            "file".into(),
        )));
        assert!(matches!(err, LarderError::Validation(_)));

        let err = to_larder_error(FetchError::TooManyRedirects { max: 5 });
        assert!(matches!(err, LarderError::Internal(_)));
    }

    #[tokio::test]
    async fn private_literal_is_refused_without_connecting() {
        let config = LarderConfig::default();
        let err = run_fetch(&config, "http://10.0.0.1/admin.jpg", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LarderError::Validation(_)), "{err:?}");
    }
}
