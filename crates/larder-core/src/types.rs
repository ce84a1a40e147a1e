// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Larder workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by collaborator health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Collaborator is fully operational.
    Healthy,
    /// Collaborator is operational but experiencing issues.
    Degraded(String),
    /// Collaborator is not operational.
    Unhealthy(String),
}

/// Upstream database a catalog entry was sourced from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum FoodSource {
    #[default]
    #[strum(serialize = "openfoodfacts")]
    #[serde(rename = "openfoodfacts")]
    OpenFoodFacts,
}

/// Terminal state of the most recent image refresh for a record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// Both assets were stored by the last refresh.
    Ok,
    /// The last refresh attempt failed; previous assets (if any) are kept.
    Failed,
    /// No refresh has produced assets (never attempted, or no source URLs).
    #[default]
    None,
}

/// Per-100g nutrition facts. Values carry two decimal places.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub kcal_100g: Option<f64>,
    pub protein_g_100g: Option<f64>,
    pub carbs_g_100g: Option<f64>,
    pub fat_g_100g: Option<f64>,
    pub sugars_g_100g: Option<f64>,
    pub fiber_g_100g: Option<f64>,
    pub salt_g_100g: Option<f64>,
    pub serving_size_g: Option<f64>,
}

impl NutritionFacts {
    /// Returns a copy with every present value rounded to two decimal places.
    pub fn normalized(&self) -> Self {
        let round = |v: Option<f64>| v.map(|x| (x * 100.0).round() / 100.0);
        Self {
            kcal_100g: round(self.kcal_100g),
            protein_g_100g: round(self.protein_g_100g),
            carbs_g_100g: round(self.carbs_g_100g),
            fat_g_100g: round(self.fat_g_100g),
            sugars_g_100g: round(self.sugars_g_100g),
            fiber_g_100g: round(self.fiber_g_100g),
            salt_g_100g: round(self.salt_g_100g),
            serving_size_g: round(self.serving_size_g),
        }
    }
}

/// One cached catalog entry.
///
/// Identity is `barcode` (globally unique) and `(source, external_id)`
/// (jointly unique). The `image_*` fields are written only by the image
/// pipeline, except for the signature and source URLs which ingest records
/// when the upstream supplies them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    /// Row identifier. Zero until the record has been inserted.
    pub id: i64,
    pub source: FoodSource,
    pub external_id: String,
    pub barcode: String,
    pub name: String,
    pub brands: String,
    pub image_url: String,
    #[serde(flatten)]
    pub nutrition: NutritionFacts,
    /// Raw upstream payload, kept for provenance.
    pub raw_source_json: serde_json::Value,
    pub nutriments_json: Option<serde_json::Value>,
    pub content_hash: Option<String>,
    /// Upstream image version token.
    pub image_signature: Option<String>,
    pub image_large_source_url: String,
    pub image_small_source_url: String,
    /// Blob name of the stored large asset.
    pub image_large: Option<String>,
    /// Blob name of the stored small asset.
    pub image_small: Option<String>,
    pub image_downloaded_at: Option<DateTime<Utc>>,
    pub image_status: ImageStatus,
}

impl FoodRecord {
    /// A fresh, not-yet-persisted record with empty image state.
    pub fn new(
        source: FoodSource,
        external_id: impl Into<String>,
        barcode: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            source,
            external_id: external_id.into(),
            barcode: barcode.into(),
            name: name.into(),
            brands: String::new(),
            image_url: String::new(),
            nutrition: NutritionFacts::default(),
            raw_source_json: serde_json::Value::Object(Default::default()),
            nutriments_json: None,
            content_hash: None,
            image_signature: None,
            image_large_source_url: String::new(),
            image_small_source_url: String::new(),
            image_large: None,
            image_small: None,
            image_downloaded_at: None,
            image_status: ImageStatus::None,
        }
    }
}

/// Result of one image refresh attempt (a large + small fetch pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub success: bool,
    /// Human-readable failure reason; `None` on success.
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}
