// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Food image retrieval for Larder.
//!
//! - [`StreamGuard`] bounds a response body by content type and size.
//! - [`PinnedFetcher`] fetches over HTTP(S) against addresses vetted by
//!   `larder-security`, re-validating every redirect hop.
//! - [`ImagePipeline`] decides when a record's images are stale, fetches the
//!   large/small pair and swaps the stored assets.

pub mod fetcher;
pub mod pipeline;
pub mod stream;

pub use fetcher::{FetchError, FetchSettings, ImageFetcher, PinnedFetcher};
pub use pipeline::{
    AssetSize, FALLBACK_TOKEN, ImagePipeline, MISSING_URLS, asset_dir, asset_name, is_healthy,
    needs_refresh, safe_signature_token,
};
pub use stream::{DEFAULT_MAX_IMAGE_BYTES, StreamError, StreamGuard};
