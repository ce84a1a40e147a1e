// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Larder nutrition catalog backend.
//!
//! This crate provides the domain types, error types, and collaborator traits
//! shared by every other Larder crate. Storage backends implement the traits
//! defined here; the image pipeline and catalog services consume them.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LarderError;
pub use types::{FetchOutcome, FoodRecord, FoodSource, HealthStatus, ImageStatus, NutritionFacts};

pub use traits::{BlobStore, CatalogStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn larder_error_variants_render() {
        let storage = LarderError::Storage {
            source: Box::new(std::io::Error::other("disk gone")),
        };
        assert_eq!(storage.to_string(), "storage error: disk gone");

        let blob = LarderError::Blob {
            message: "cannot write foods/1/image_large.jpg".into(),
            source: None,
        };
        assert!(blob.to_string().contains("foods/1/image_large.jpg"));

        let conflict = LarderError::Conflict("barcode taken".into());
        assert_eq!(conflict.to_string(), "conflict: barcode taken");
    }

    #[test]
    fn storage_helper_boxes_source() {
        let err = LarderError::storage(std::io::Error::other("boom"));
        assert!(matches!(err, LarderError::Storage { .. }));
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_catalog_store<T: CatalogStore>() {}
        fn _assert_blob_store<T: BlobStore>() {}
    }
}
