// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingest payload and its validation.

use larder_core::{FoodRecord, FoodSource, LarderError, NutritionFacts};
use serde::Deserialize;
use url::Url;

const MAX_EXTERNAL_ID: usize = 128;
const MAX_BARCODE: usize = 64;
const MAX_NAME: usize = 255;
const MAX_BRANDS: usize = 255;
const MAX_TOKEN: usize = 128;

/// Largest magnitude storable with eight digits and two decimal places.
const MAX_NUTRIENT: f64 = 1_000_000.0;

/// One catalog entry as delivered by the upstream ingest caller.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub source: FoodSource,
    pub external_id: String,
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub nutrition: NutritionFacts,
    pub raw_source_json: serde_json::Value,
    #[serde(default)]
    pub nutriments_json: Option<serde_json::Value>,
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub image_signature: Option<String>,
    #[serde(default)]
    pub image_large_url: Option<String>,
    #[serde(default)]
    pub image_small_url: Option<String>,
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Option<String> {
    let len = value.chars().count();
    if len < min {
        Some(format!("{field} must not be empty"))
    } else if len > max {
        Some(format!("{field} must be at most {max} characters"))
    } else {
        None
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl IngestRequest {
    /// Trim identifiers, drop blank optional strings and round nutrition to
    /// two decimal places.
    pub fn normalized(mut self) -> Self {
        self.external_id = self.external_id.trim().to_string();
        self.barcode = self.barcode.trim().to_string();
        self.name = self.name.trim().to_string();
        self.content_hash = blank_to_none(self.content_hash);
        self.image_signature = blank_to_none(self.image_signature);
        self.image_large_url = blank_to_none(self.image_large_url);
        self.image_small_url = blank_to_none(self.image_small_url);
        self.nutrition = self.nutrition.normalized();
        self
    }

    /// Check field lengths, URLs and nutrition ranges. Every problem is
    /// reported, joined with `; `.
    pub fn validate(&self) -> Result<(), LarderError> {
        let mut problems: Vec<String> = [
            check_len("external_id", &self.external_id, 1, MAX_EXTERNAL_ID),
            check_len("barcode", &self.barcode, 1, MAX_BARCODE),
            check_len("name", &self.name, 1, MAX_NAME),
            self.brands
                .as_deref()
                .and_then(|b| check_len("brands", b, 0, MAX_BRANDS)),
            self.content_hash
                .as_deref()
                .and_then(|h| check_len("content_hash", h, 0, MAX_TOKEN)),
            self.image_signature
                .as_deref()
                .and_then(|s| check_len("image_signature", s, 0, MAX_TOKEN)),
        ]
        .into_iter()
        .flatten()
        .collect();

        if let Some(url) = self.image_url.as_deref().filter(|u| !u.is_empty()) {
            if Url::parse(url).is_err() {
                problems.push("image_url must be a valid URL".to_string());
            }
        }

        let nutrients = [
            ("kcal_100g", self.nutrition.kcal_100g),
            ("protein_g_100g", self.nutrition.protein_g_100g),
            ("carbs_g_100g", self.nutrition.carbs_g_100g),
            ("fat_g_100g", self.nutrition.fat_g_100g),
            ("sugars_g_100g", self.nutrition.sugars_g_100g),
            ("fiber_g_100g", self.nutrition.fiber_g_100g),
            ("salt_g_100g", self.nutrition.salt_g_100g),
            ("serving_size_g", self.nutrition.serving_size_g),
        ];
        for (field, value) in nutrients {
            if let Some(v) = value {
                if !v.is_finite() || v.abs() >= MAX_NUTRIENT {
                    problems.push(format!("{field} is out of range"));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(LarderError::Validation(problems.join("; ")))
        }
    }

    /// A new, unsaved record carrying this payload.
    pub fn to_new_record(&self) -> FoodRecord {
        let mut record = FoodRecord::new(
            self.source,
            self.external_id.clone(),
            self.barcode.clone(),
            self.name.clone(),
        );
        self.apply_to(&mut record);
        record
    }

    /// Overwrite the catalog fields of `record`. Optional fields only
    /// overwrite when supplied; nutrition is replaced as a whole.
    pub fn apply_to(&self, record: &mut FoodRecord) {
        record.source = self.source;
        record.external_id = self.external_id.clone();
        record.barcode = self.barcode.clone();
        record.name = self.name.clone();
        if let Some(brands) = &self.brands {
            record.brands = brands.clone();
        }
        if let Some(image_url) = &self.image_url {
            record.image_url = image_url.clone();
        }
        record.nutrition = self.nutrition.clone();
        record.raw_source_json = self.raw_source_json.clone();
        if self.nutriments_json.is_some() {
            record.nutriments_json = self.nutriments_json.clone();
        }
        if self.content_hash.is_some() {
            record.content_hash = self.content_hash.clone();
        }
        if self.image_signature.is_some() {
            record.image_signature = self.image_signature.clone();
        }
        if let Some(url) = &self.image_large_url {
            record.image_large_source_url = url.clone();
        }
        if let Some(url) = &self.image_small_url {
            record.image_small_source_url = url.clone();
        }
    }
}
