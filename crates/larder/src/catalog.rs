// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `larder ingest`, `larder check` and `larder refresh`.

use std::sync::Arc;

use larder_catalog::{CatalogService, CheckRequest, IngestRequest};
use larder_config::LarderConfig;
use larder_core::{BlobStore, CatalogStore, LarderError};
use larder_images::{ImageFetcher, ImagePipeline, PinnedFetcher};
use larder_security::HostResolver;
use larder_storage::{FsBlobStore, SqliteCatalog};
use tracing::info;

use crate::input::{parse_many, print_json, read_source};

/// Open storage and wire the pipeline for the configured environment.
///
/// The SQLite handle is returned alongside the service so the caller can
/// checkpoint it on exit.
pub async fn open_service(
    config: &LarderConfig,
) -> Result<(CatalogService, SqliteCatalog), LarderError> {
    let sqlite = SqliteCatalog::open(&config.storage).await?;
    let catalog: Arc<dyn CatalogStore> = Arc::new(sqlite.clone());
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::from_config(&config.media));
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(PinnedFetcher::from_config(
        &config.fetch,
        HostResolver::system(),
    ));
    let pipeline = ImagePipeline::new(fetcher, blobs, catalog.clone(), &config.media.namespace);
    Ok((CatalogService::new(catalog, pipeline), sqlite))
}

pub async fn run_ingest(config: &LarderConfig, source: &str) -> Result<(), LarderError> {
    let requests: Vec<IngestRequest> = parse_many(&read_source(source).await?)?;
    let (service, sqlite) = open_service(config).await?;

    let mut reports = Vec::with_capacity(requests.len());
    for request in requests {
        reports.push(service.ingest(request).await?);
    }
    sqlite.close().await?;

    info!(count = reports.len(), "ingest complete");
    print_json(&reports)
}

pub async fn run_check(config: &LarderConfig, source: &str) -> Result<(), LarderError> {
    let requests: Vec<CheckRequest> = parse_many(&read_source(source).await?)?;
    let (service, sqlite) = open_service(config).await?;

    let mut reports = Vec::with_capacity(requests.len());
    for request in &requests {
        reports.push(service.check(request).await?);
    }
    sqlite.close().await?;
    print_json(&reports)
}

pub async fn run_refresh(
    config: &LarderConfig,
    barcode: &str,
    force: bool,
) -> Result<(), LarderError> {
    let (service, sqlite) = open_service(config).await?;
    let report = service.refresh_by_barcode(barcode, force).await?;
    sqlite.close().await?;
    print_json(&report)
}
