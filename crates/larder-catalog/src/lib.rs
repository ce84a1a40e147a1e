// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog ingest, freshness checks and manual image refresh.
//!
//! [`CatalogService`] is the entry point. It upserts upstream entries by
//! barcode and `(source, external_id)` and hands stale records to the
//! [`ImagePipeline`](larder_images::ImagePipeline).

pub mod check;
pub mod request;
pub mod service;

pub use check::{CheckReport, CheckRequest};
pub use request::IngestRequest;
pub use service::{CatalogService, IngestReport, RefreshReport};
