// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Freshness check: does the cached record match what upstream has now?

use larder_core::{FoodRecord, FoodSource};
use larder_images::is_healthy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub source: FoodSource,
    pub external_id: String,
    pub content_hash: String,
    #[serde(default)]
    pub image_signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub exists: bool,
    pub up_to_date: bool,
    pub food_item_id: Option<i64>,
    pub images_ok: bool,
}

impl CheckReport {
    pub fn unknown() -> Self {
        Self {
            exists: false,
            up_to_date: false,
            food_item_id: None,
            images_ok: false,
        }
    }

    /// Compare a stored record with the upstream hashes. An absent signature
    /// on either side compares as the empty string.
    pub fn for_record(record: &FoodRecord, request: &CheckRequest) -> Self {
        let images_ok = is_healthy(record);
        let signature_matches = record.image_signature.as_deref().unwrap_or_default()
            == request.image_signature.as_deref().unwrap_or_default();
        let hash_matches =
            record.content_hash.as_deref().unwrap_or_default() == request.content_hash;
        Self {
            exists: true,
            up_to_date: hash_matches && signature_matches && images_ok,
            food_item_id: Some(record.id),
            images_ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::ImageStatus;

    fn stored() -> FoodRecord {
        let mut record = FoodRecord::new(FoodSource::OpenFoodFacts, "42", "42", "Oat drink");
        record.id = 7;
        record.content_hash = Some("h1".into());
        record.image_signature = Some("front_en.3".into());
        record.image_large = Some("foods/42/front_en.3_large.jpg".into());
        record.image_small = Some("foods/42/front_en.3_small.jpg".into());
        record.image_status = ImageStatus::Ok;
        record
    }

    fn request(hash: &str, signature: Option<&str>) -> CheckRequest {
        CheckRequest {
            source: FoodSource::OpenFoodFacts,
            external_id: "42".into(),
            content_hash: hash.into(),
            image_signature: signature.map(str::to_string),
        }
    }

    #[test]
    fn unknown_record_reports_nothing() {
        let report = CheckReport::unknown();
        assert!(!report.exists && !report.up_to_date && !report.images_ok);
        assert_eq!(report.food_item_id, None);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "exists": false,
                "up_to_date": false,
                "food_item_id": null,
                "images_ok": false
            })
        );
    }

    #[test]
    fn matching_record_is_up_to_date() {
        let report = CheckReport::for_record(&stored(), &request("h1", Some("front_en.3")));
        assert_eq!(
            report,
            CheckReport {
                exists: true,
                up_to_date: true,
                food_item_id: Some(7),
                images_ok: true,
            }
        );
    }

    #[test]
    fn hash_or_signature_mismatch_is_stale() {
        let record = stored();
        assert!(!CheckReport::for_record(&record, &request("h2", Some("front_en.3"))).up_to_date);
        assert!(!CheckReport::for_record(&record, &request("h1", Some("front_en.4"))).up_to_date);
        assert!(!CheckReport::for_record(&record, &request("h1", None)).up_to_date);
    }

    #[test]
    fn absent_signatures_compare_equal() {
        let mut record = stored();
        record.image_signature = None;
        assert!(CheckReport::for_record(&record, &request("h1", None)).up_to_date);
        assert!(CheckReport::for_record(&record, &request("h1", Some(""))).up_to_date);
    }

    #[test]
    fn unhealthy_images_are_never_up_to_date() {
        let mut record = stored();
        record.image_status = ImageStatus::Failed;
        let report = CheckReport::for_record(&record, &request("h1", Some("front_en.3")));
        assert!(report.exists);
        assert!(!report.images_ok);
        assert!(!report.up_to_date);
    }
}
