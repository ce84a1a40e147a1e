// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog operations that sit on top of the image pipeline.

use std::sync::Arc;

use larder_core::{CatalogStore, FetchOutcome, FoodRecord, LarderError};
use larder_images::{ImagePipeline, is_healthy, needs_refresh};
use serde::Serialize;
use tracing::{debug, info};

use crate::check::{CheckReport, CheckRequest};
use crate::request::IngestRequest;

const BARCODE_CONFLICT: &str = "barcode already belongs to another food item";

/// Result of an ingest: the stored record and, when images were refreshed,
/// the refresh outcome.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub created: bool,
    pub record: FoodRecord,
    pub images: Option<FetchOutcome>,
}

/// Result of a manual refresh. `images` is `None` when the record was
/// already healthy and no refresh was forced.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub record: FoodRecord,
    pub images: Option<FetchOutcome>,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    pipeline: ImagePipeline,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>, pipeline: ImagePipeline) -> Self {
        Self { catalog, pipeline }
    }

    pub fn pipeline(&self) -> &ImagePipeline {
        &self.pipeline
    }

    /// Upsert a catalog entry and refresh its images when they are stale.
    ///
    /// The ingest succeeds whatever the image outcome; only validation,
    /// identity conflicts and persistence failures are errors.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport, LarderError> {
        let request = request.normalized();
        request.validate()?;

        let by_barcode = self.catalog.find_by_barcode(&request.barcode).await?;
        let by_external = self
            .catalog
            .find_by_external_id(request.source, &request.external_id)
            .await?;

        let existing = match (by_barcode, by_external) {
            (Some(a), Some(b)) if a.id != b.id => {
                return Err(LarderError::Conflict(BARCODE_CONFLICT.to_string()));
            }
            (Some(a), _) => Some(a),
            (None, b) => b,
        };

        let created = existing.is_none();
        let (mut record, signature_changed) = match existing {
            Some(mut record) => {
                let signature_changed = request
                    .image_signature
                    .as_deref()
                    .is_some_and(|incoming| record.image_signature.as_deref() != Some(incoming));
                request.apply_to(&mut record);
                self.catalog.update_catalog(&record).await?;
                (record, signature_changed)
            }
            None => {
                let mut record = request.to_new_record();
                record.id = self.catalog.insert(&record).await?;
                (record, request.image_signature.is_some())
            }
        };
        debug!(
            id = record.id,
            barcode = %record.barcode,
            created,
            signature_changed,
            "food item saved"
        );

        let images = if needs_refresh(&record, signature_changed) {
            let large = record.image_large_source_url.clone();
            let small = record.image_small_source_url.clone();
            let signature = record.image_signature.clone();
            let outcome = self
                .pipeline
                .refresh(&mut record, &large, &small, signature.as_deref())
                .await?;
            Some(outcome)
        } else {
            None
        };

        info!(
            id = record.id,
            barcode = %record.barcode,
            created,
            refreshed = images.is_some(),
            "food item ingested"
        );
        Ok(IngestReport {
            created,
            record,
            images,
        })
    }

    /// Compare the stored record with upstream's current hashes.
    pub async fn check(&self, request: &CheckRequest) -> Result<CheckReport, LarderError> {
        let record = self
            .catalog
            .find_by_external_id(request.source, &request.external_id)
            .await?;
        Ok(match record {
            Some(record) => CheckReport::for_record(&record, request),
            None => CheckReport::unknown(),
        })
    }

    /// Re-run the pipeline for a stored record using its recorded source
    /// URLs and signature.
    pub async fn refresh_by_barcode(
        &self,
        barcode: &str,
        force: bool,
    ) -> Result<RefreshReport, LarderError> {
        let mut record = self
            .catalog
            .find_by_barcode(barcode.trim())
            .await?
            .ok_or_else(|| LarderError::NotFound(format!("no food item with barcode {barcode}")))?;

        if !force && is_healthy(&record) {
            debug!(barcode = %record.barcode, "images healthy, nothing to do");
            return Ok(RefreshReport {
                record,
                images: None,
            });
        }

        let large = record.image_large_source_url.clone();
        let small = record.image_small_source_url.clone();
        let signature = record.image_signature.clone();
        let outcome = self
            .pipeline
            .refresh(&mut record, &large, &small, signature.as_deref())
            .await?;
        Ok(RefreshReport {
            record,
            images: Some(outcome),
        })
    }
}
