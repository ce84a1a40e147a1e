// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CatalogService scenarios against in-memory collaborators and, for the
//! end-to-end case, SQLite plus the filesystem.

use std::sync::Arc;

use larder_catalog::{CatalogService, CheckRequest, IngestRequest};
use larder_core::{CatalogStore, FoodSource, ImageStatus, LarderError};
use larder_images::{FetchError, ImagePipeline, MISSING_URLS};
use larder_test_utils::{MemoryBlobStore, MemoryCatalog, ScriptedFetcher, TestHarness};
use serde_json::json;

const LARGE_V1: &str = "https://images.example/5449000000996/front_en.1.400.jpg";
const SMALL_V1: &str = "https://images.example/5449000000996/front_en.1.200.jpg";
const LARGE_V2: &str = "https://images.example/5449000000996/front_en.2.400.jpg";
const SMALL_V2: &str = "https://images.example/5449000000996/front_en.2.200.jpg";

struct Fixture {
    fetcher: ScriptedFetcher,
    blobs: MemoryBlobStore,
    catalog: MemoryCatalog,
    service: CatalogService,
}

fn fixture() -> Fixture {
    let fetcher = ScriptedFetcher::new();
    let blobs = MemoryBlobStore::new();
    let catalog = MemoryCatalog::new();
    let pipeline = ImagePipeline::new(
        Arc::new(fetcher.clone()),
        Arc::new(blobs.clone()),
        Arc::new(catalog.clone()),
        "foods",
    );
    let service = CatalogService::new(Arc::new(catalog.clone()), pipeline);
    Fixture {
        fetcher,
        blobs,
        catalog,
        service,
    }
}

fn request(value: serde_json::Value) -> IngestRequest {
    serde_json::from_value(value).unwrap()
}

fn cola(signature: &str, large: &str, small: &str) -> IngestRequest {
    request(json!({
        "external_id": "5449000000996",
        "barcode": "5449000000996",
        "name": "Cola",
        "brands": "Fizz Co",
        "kcal_100g": 42,
        "sugars_g_100g": 10.6,
        "content_hash": format!("hash-{signature}"),
        "image_signature": signature,
        "image_large_url": large,
        "image_small_url": small,
        "raw_source_json": {"code": "5449000000996"}
    }))
}

async fn script_v1(fx: &Fixture) {
    fx.fetcher.respond(LARGE_V1, b"L1".to_vec()).await;
    fx.fetcher.respond(SMALL_V1, b"S1".to_vec()).await;
}

#[tokio::test]
async fn first_ingest_inserts_and_fetches_images() {
    let fx = fixture();
    script_v1(&fx).await;

    let report = fx
        .service
        .ingest(cola("front_en.1", LARGE_V1, SMALL_V1))
        .await
        .unwrap();

    assert!(report.created);
    assert_eq!(report.images.as_ref().map(|o| o.success), Some(true));
    assert_eq!(report.record.nutrition.kcal_100g, Some(42.0));

    let stored = fx.catalog.get(report.record.id).await.unwrap().unwrap();
    assert_eq!(stored.image_status, ImageStatus::Ok);
    assert_eq!(
        stored.image_large.as_deref(),
        Some("foods/5449000000996/front_en.1_large.jpg")
    );
    assert_eq!(fx.blobs.names().await.len(), 2);
}

#[tokio::test]
async fn unchanged_signature_with_healthy_images_skips_refresh() {
    let fx = fixture();
    script_v1(&fx).await;
    fx.service
        .ingest(cola("front_en.1", LARGE_V1, SMALL_V1))
        .await
        .unwrap();

    let report = fx
        .service
        .ingest(cola("front_en.1", LARGE_V1, SMALL_V1))
        .await
        .unwrap();

    assert!(!report.created);
    assert!(report.images.is_none());
    assert_eq!(fx.fetcher.calls().await.len(), 2);
    assert_eq!(fx.catalog.len().await, 1);
}

#[tokio::test]
async fn changed_signature_replaces_assets() {
    let fx = fixture();
    script_v1(&fx).await;
    fx.fetcher.respond(LARGE_V2, b"L2".to_vec()).await;
    fx.fetcher.respond(SMALL_V2, b"S2".to_vec()).await;
    let first = fx
        .service
        .ingest(cola("front_en.1", LARGE_V1, SMALL_V1))
        .await
        .unwrap();

    let second = fx
        .service
        .ingest(cola("front_en.2", LARGE_V2, SMALL_V2))
        .await
        .unwrap();

    assert_eq!(first.record.id, second.record.id);
    assert_eq!(second.images.map(|o| o.success), Some(true));
    assert_eq!(
        fx.blobs.names().await,
        vec![
            "foods/5449000000996/front_en.2_large.jpg".to_string(),
            "foods/5449000000996/front_en.2_small.jpg".to_string(),
        ]
    );
    let stored = fx.catalog.get(first.record.id).await.unwrap().unwrap();
    assert_eq!(stored.image_signature.as_deref(), Some("front_en.2"));
    assert_eq!(stored.content_hash.as_deref(), Some("hash-front_en.2"));
}

#[tokio::test]
async fn failed_images_are_retried_on_next_ingest_with_stored_urls() {
    let fx = fixture();
    fx.fetcher
        .fail(LARGE_V1, FetchError::Transport("connection reset".into()))
        .await;
    let first = fx
        .service
        .ingest(cola("front_en.1", LARGE_V1, SMALL_V1))
        .await
        .unwrap();
    assert_eq!(first.images.as_ref().map(|o| o.success), Some(false));
    assert_eq!(first.record.image_status, ImageStatus::Failed);

    // Upstream now omits the URLs; the stored ones are reused.
    script_v1(&fx).await;
    let second = fx
        .service
        .ingest(request(json!({
            "external_id": "5449000000996",
            "barcode": "5449000000996",
            "name": "Cola",
            "raw_source_json": {}
        })))
        .await
        .unwrap();

    assert_eq!(second.images.map(|o| o.success), Some(true));
    assert_eq!(second.record.image_status, ImageStatus::Ok);
    assert_eq!(second.record.brands, "Fizz Co");
}

#[tokio::test]
async fn ingest_without_urls_records_missing_urls() {
    let fx = fixture();
    let report = fx
        .service
        .ingest(request(json!({
            "external_id": "1",
            "barcode": "1",
            "name": "Plain rice",
            "raw_source_json": {}
        })))
        .await
        .unwrap();

    let outcome = report.images.unwrap();
    assert_eq!(outcome.error.as_deref(), Some(MISSING_URLS));
    assert_eq!(report.record.image_status, ImageStatus::None);
    assert!(fx.fetcher.calls().await.is_empty());
}

#[tokio::test]
async fn barcode_owned_by_another_item_is_a_conflict() {
    let fx = fixture();
    for (external_id, barcode) in [("a", "111"), ("b", "222")] {
        fx.service
            .ingest(request(json!({
                "external_id": external_id,
                "barcode": barcode,
                "name": "Item",
                "raw_source_json": {}
            })))
            .await
            .unwrap();
    }

    let err = fx
        .service
        .ingest(request(json!({
            "external_id": "b",
            "barcode": "111",
            "name": "Item",
            "raw_source_json": {}
        })))
        .await
        .unwrap_err();
    match err {
        LarderError::Conflict(msg) => {
            assert_eq!(msg, "barcode already belongs to another food item")
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_request_is_rejected_before_any_write() {
    let fx = fixture();
    let err = fx
        .service
        .ingest(request(json!({
            "external_id": "",
            "barcode": "9".repeat(65),
            "name": "Item",
            "raw_source_json": {}
        })))
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::Validation(_)));
    assert!(fx.catalog.is_empty().await);
}

#[tokio::test]
async fn check_reports_freshness() {
    let fx = fixture();
    script_v1(&fx).await;
    let unknown = fx
        .service
        .check(&CheckRequest {
            source: FoodSource::OpenFoodFacts,
            external_id: "5449000000996".into(),
            content_hash: "hash-front_en.1".into(),
            image_signature: Some("front_en.1".into()),
        })
        .await
        .unwrap();
    assert!(!unknown.exists);

    let ingested = fx
        .service
        .ingest(cola("front_en.1", LARGE_V1, SMALL_V1))
        .await
        .unwrap();
    let report = fx
        .service
        .check(&CheckRequest {
            source: FoodSource::OpenFoodFacts,
            external_id: "5449000000996".into(),
            content_hash: "hash-front_en.1".into(),
            image_signature: Some("front_en.1".into()),
        })
        .await
        .unwrap();
    assert!(report.exists && report.up_to_date && report.images_ok);
    assert_eq!(report.food_item_id, Some(ingested.record.id));

    let stale = fx
        .service
        .check(&CheckRequest {
            source: FoodSource::OpenFoodFacts,
            external_id: "5449000000996".into(),
            content_hash: "hash-newer".into(),
            image_signature: Some("front_en.1".into()),
        })
        .await
        .unwrap();
    assert!(stale.exists && !stale.up_to_date && stale.images_ok);
}

#[tokio::test]
async fn refresh_by_barcode_respects_force() {
    let fx = fixture();
    script_v1(&fx).await;
    fx.service
        .ingest(cola("front_en.1", LARGE_V1, SMALL_V1))
        .await
        .unwrap();

    let skipped = fx
        .service
        .refresh_by_barcode("5449000000996", false)
        .await
        .unwrap();
    assert!(skipped.images.is_none());
    assert_eq!(fx.fetcher.calls().await.len(), 2);

    let forced = fx
        .service
        .refresh_by_barcode("5449000000996", true)
        .await
        .unwrap();
    assert_eq!(forced.images.map(|o| o.success), Some(true));
    assert_eq!(fx.fetcher.calls().await.len(), 4);
}

#[tokio::test]
async fn refresh_by_unknown_barcode_is_not_found() {
    let fx = fixture();
    let err = fx
        .service
        .refresh_by_barcode("000", true)
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::NotFound(_)));
}

#[tokio::test]
async fn ingest_round_trips_through_sqlite_and_disk() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.fetcher.respond(LARGE_V1, b"large-jpeg".to_vec()).await;
    harness.fetcher.respond(SMALL_V1, b"small-jpeg".to_vec()).await;
    let service = CatalogService::new(harness.catalog.clone(), harness.pipeline.clone());

    let report = service
        .ingest(cola("front_en.1", LARGE_V1, SMALL_V1))
        .await
        .unwrap();
    let stored = harness.reload(report.record.id).await.unwrap();

    assert_eq!(stored.image_status, ImageStatus::Ok);
    assert_eq!(stored.nutrition.sugars_g_100g, Some(10.6));
    let large = stored.image_large.unwrap();
    let on_disk = std::fs::read(harness.fs_blobs.root().join(&large)).unwrap();
    assert_eq!(on_disk, b"large-jpeg");
}
