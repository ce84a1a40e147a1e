// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Food image refresh: fetch a large/small pair and swap the stored assets.
//!
//! The pipeline is the only writer of a record's image fields. Fetch failures
//! never escape as errors: they become `image_status = failed` on the record
//! and a failed [`FetchOutcome`]. Only collaborator persistence failures are
//! returned as `Err`.

use std::sync::Arc;

use chrono::Utc;
use larder_core::{BlobStore, CatalogStore, FetchOutcome, FoodRecord, ImageStatus, LarderError};
use tracing::{info, warn};

use crate::fetcher::{FetchError, ImageFetcher};

/// Failure reason recorded when a refresh is asked for without both URLs.
pub const MISSING_URLS: &str = "missing_urls";

/// Token used when the signature is absent or sanitizes to nothing.
pub const FALLBACK_TOKEN: &str = "image";

/// Which of the two assets a blob holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSize {
    Large,
    Small,
}

impl AssetSize {
    fn suffix(self) -> &'static str {
        match self {
            AssetSize::Large => "large",
            AssetSize::Small => "small",
        }
    }
}

/// True iff both assets are stored and the last refresh succeeded.
pub fn is_healthy(record: &FoodRecord) -> bool {
    let present = |asset: &Option<String>| asset.as_deref().is_some_and(|a| !a.is_empty());
    present(&record.image_large)
        && present(&record.image_small)
        && record.image_status == ImageStatus::Ok
}

/// True if the upstream signature changed or the stored images are not healthy.
pub fn needs_refresh(record: &FoodRecord, signature_changed: bool) -> bool {
    signature_changed || !is_healthy(record)
}

/// Reduce `signature` to characters safe in a file name.
///
/// Keeps alphanumerics, `-`, `_` and `.`; anything else is dropped.
pub fn safe_signature_token(signature: Option<&str>) -> String {
    let token: String = signature
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if token.is_empty() {
        FALLBACK_TOKEN.to_string()
    } else {
        token
    }
}

/// `{namespace}/{barcode}` with the barcode reduced to ASCII alphanumerics,
/// `-` and `_`. Falls back to the record id.
pub fn asset_dir(namespace: &str, record: &FoodRecord) -> String {
    let barcode: String = record
        .barcode
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if barcode.is_empty() {
        format!("{namespace}/{}", record.id)
    } else {
        format!("{namespace}/{barcode}")
    }
}

/// Deterministic blob name for one asset, e.g.
/// `foods/3017620422003/front_en.1_large.jpg`.
pub fn asset_name(namespace: &str, record: &FoodRecord, token: &str, size: AssetSize) -> String {
    format!(
        "{}/{token}_{}.jpg",
        asset_dir(namespace, record),
        size.suffix()
    )
}

/// Orchestrates image refreshes for catalog records.
#[derive(Clone)]
pub struct ImagePipeline {
    fetcher: Arc<dyn ImageFetcher>,
    blobs: Arc<dyn BlobStore>,
    catalog: Arc<dyn CatalogStore>,
    namespace: String,
}

impl ImagePipeline {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        blobs: Arc<dyn BlobStore>,
        catalog: Arc<dyn CatalogStore>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            blobs,
            catalog,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fetch both images and, on success, replace the record's stored assets.
    ///
    /// `record` must already be persisted. It is updated in place to match
    /// what was written to the catalog.
    pub async fn refresh(
        &self,
        record: &mut FoodRecord,
        large_url: &str,
        small_url: &str,
        signature: Option<&str>,
    ) -> Result<FetchOutcome, LarderError> {
        let large_url = large_url.trim();
        let small_url = small_url.trim();

        if large_url.is_empty() || small_url.is_empty() {
            let now = Utc::now();
            record.image_status = ImageStatus::None;
            record.image_downloaded_at = Some(now);
            self.catalog
                .mark_image_status(record.id, ImageStatus::None, now)
                .await?;
            info!(barcode = %record.barcode, "food image refresh skipped: missing source URLs");
            return Ok(FetchOutcome::failed(MISSING_URLS));
        }

        let (large, small) = match self.fetch_pair(large_url, small_url).await {
            Ok(pair) => pair,
            Err(e) => return self.record_fetch_failure(record, &e).await,
        };

        let token = safe_signature_token(signature);
        let large_name = asset_name(&self.namespace, record, &token, AssetSize::Large);
        let small_name = asset_name(&self.namespace, record, &token, AssetSize::Small);

        for old in [record.image_large.take(), record.image_small.take()]
            .into_iter()
            .flatten()
            .filter(|name| !name.is_empty())
        {
            if let Err(e) = self.blobs.delete(&old).await {
                warn!(barcode = %record.barcode, asset = %old, error = %e, "failed to delete previous food image");
            }
        }

        let large_stored = match self.blobs.save(&large_name, &large).await {
            Ok(name) => name,
            Err(e) => return self.record_store_failure(record, &e).await,
        };
        let small_stored = match self.blobs.save(&small_name, &small).await {
            Ok(name) => name,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&large_stored).await {
                    warn!(asset = %large_stored, error = %cleanup, "failed to remove orphaned food image");
                }
                return self.record_store_failure(record, &e).await;
            }
        };

        record.image_large = Some(large_stored);
        record.image_small = Some(small_stored);
        record.image_large_source_url = large_url.to_string();
        record.image_small_source_url = small_url.to_string();
        if let Some(sig) = signature.filter(|s| !s.is_empty()) {
            record.image_signature = Some(sig.to_string());
        }
        record.image_status = ImageStatus::Ok;
        record.image_downloaded_at = Some(Utc::now());
        if let Err(e) = self.catalog.save_image_state(record).await {
            self.abandon_new_assets(record).await;
            return Err(e);
        }

        info!(
            barcode = %record.barcode,
            large_bytes = large.len(),
            small_bytes = small.len(),
            token = %token,
            "food images refreshed"
        );
        Ok(FetchOutcome::succeeded())
    }

    /// Large first; small is not attempted if large fails.
    async fn fetch_pair(
        &self,
        large_url: &str,
        small_url: &str,
    ) -> Result<(Vec<u8>, Vec<u8>), FetchError> {
        let large = self.fetcher.fetch(large_url).await?;
        let small = self.fetcher.fetch(small_url).await?;
        Ok((large, small))
    }

    /// Previous assets stay in place; only status and timestamp change.
    async fn record_fetch_failure(
        &self,
        record: &mut FoodRecord,
        err: &FetchError,
    ) -> Result<FetchOutcome, LarderError> {
        let now = Utc::now();
        record.image_status = ImageStatus::Failed;
        record.image_downloaded_at = Some(now);
        self.catalog
            .mark_image_status(record.id, ImageStatus::Failed, now)
            .await?;
        warn!(barcode = %record.barcode, reason = %err, "food image refresh failed");
        Ok(FetchOutcome::failed(err.to_string()))
    }

    /// The new assets were written but never recorded. They are removed and
    /// the record is marked failed so it is retried; any error here is only
    /// logged because the caller already gets the original one.
    async fn abandon_new_assets(&self, record: &mut FoodRecord) {
        for name in [record.image_large.take(), record.image_small.take()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = self.blobs.delete(&name).await {
                warn!(asset = %name, error = %e, "failed to remove unrecorded food image");
            }
        }
        let now = Utc::now();
        record.image_status = ImageStatus::Failed;
        record.image_downloaded_at = Some(now);

        if let Err(e) = self.catalog.save_image_state(record).await {
            warn!(barcode = %record.barcode, error = %e, "failed to clear food image references");
            if let Err(e) = self
                .catalog
                .mark_image_status(record.id, ImageStatus::Failed, now)
                .await
            {
                warn!(barcode = %record.barcode, error = %e, "failed to mark food images failed");
            }
        }
    }

    /// The old assets are already gone, so both references are cleared.
    async fn record_store_failure(
        &self,
        record: &mut FoodRecord,
        err: &LarderError,
    ) -> Result<FetchOutcome, LarderError> {
        record.image_large = None;
        record.image_small = None;
        record.image_status = ImageStatus::Failed;
        record.image_downloaded_at = Some(Utc::now());
        self.catalog.save_image_state(record).await?;
        warn!(barcode = %record.barcode, reason = %err, "failed to store food images");
        Ok(FetchOutcome::failed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::FoodSource;
    use proptest::prelude::*;

    fn record() -> FoodRecord {
        let mut r = FoodRecord::new(FoodSource::OpenFoodFacts, "3017620422003", "3017620422003", "Spread");
        r.id = 7;
        r
    }

    fn healthy() -> FoodRecord {
        let mut r = record();
        r.image_large = Some("foods/3017620422003/a_large.jpg".into());
        r.image_small = Some("foods/3017620422003/a_small.jpg".into());
        r.image_status = ImageStatus::Ok;
        r
    }

    #[test]
    fn healthy_requires_both_assets_and_ok_status() {
        assert!(is_healthy(&healthy()));

        let mut r = healthy();
        r.image_small = None;
        assert!(!is_healthy(&r));

        let mut r = healthy();
        r.image_large = Some(String::new());
        assert!(!is_healthy(&r));

        let mut r = healthy();
        r.image_status = ImageStatus::Failed;
        assert!(!is_healthy(&r));

        assert!(!is_healthy(&record()));
    }

    #[test]
    fn needs_refresh_truth_table() {
        assert!(needs_refresh(&record(), false));
        assert!(needs_refresh(&record(), true));
        assert!(needs_refresh(&healthy(), true));
        assert!(!needs_refresh(&healthy(), false));
    }

    #[test]
    fn signature_token_strips_unsafe_characters() {
        assert_eq!(safe_signature_token(Some("front_en.1")), "front_en.1");
        assert_eq!(safe_signature_token(Some("../../etc/passwd")), "....etcpasswd");
        assert_eq!(safe_signature_token(Some("a b/c?d")), "abcd");
    }

    #[test]
    fn signature_token_falls_back_to_image() {
        assert_eq!(safe_signature_token(None), "image");
        assert_eq!(safe_signature_token(Some("")), "image");
        assert_eq!(safe_signature_token(Some("/?%")), "image");
    }

    #[test]
    fn asset_names_follow_layout() {
        let r = record();
        assert_eq!(
            asset_name("foods", &r, "front_en.1", AssetSize::Large),
            "foods/3017620422003/front_en.1_large.jpg"
        );
        assert_eq!(
            asset_name("foods", &r, "image", AssetSize::Small),
            "foods/3017620422003/image_small.jpg"
        );
    }

    #[test]
    fn asset_dir_sanitizes_barcode_and_falls_back_to_id() {
        let mut r = record();
        r.barcode = "30/17 ..62".into();
        assert_eq!(asset_dir("foods", &r), "foods/301762");
        r.barcode = "../..".into();
        assert_eq!(asset_dir("foods", &r), "foods/7");
    }

    proptest! {
        #[test]
        fn token_never_contains_path_separators(sig in ".*") {
            let token = safe_signature_token(Some(&sig));
            prop_assert!(!token.is_empty());
            prop_assert!(!token.contains('/'));
            prop_assert!(!token.contains('\\'));
        }
    }
}
