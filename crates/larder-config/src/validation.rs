// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as bounded timeouts, parseable IP allowlists, and non-empty paths.

use std::net::IpAddr;

use crate::diagnostic::ConfigError;
use crate::model::LarderConfig;

/// Upper bound for `fetch.timeout_secs`.
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Upper bound for `fetch.max_image_bytes` (64 MiB).
pub const MAX_IMAGE_BYTES_CEILING: usize = 64 * 1024 * 1024;

/// Upper bound for `fetch.max_redirects`.
pub const MAX_REDIRECTS_CEILING: usize = 20;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected validation errors rather than failing fast.
pub fn validate_config(config: &LarderConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.log.level.to_lowercase().as_str()) {
        fail(format!(
            "log.level `{}` must be one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.media.root.trim().is_empty() {
        fail("media.root must not be empty".to_string());
    }

    let namespace = config.media.namespace.trim();
    if namespace.is_empty()
        || namespace == "."
        || namespace == ".."
        || namespace.contains(['/', '\\'])
    {
        fail(format!(
            "media.namespace `{}` must be a single non-empty path segment",
            config.media.namespace
        ));
    }

    if config.fetch.user_agent.trim().is_empty() {
        fail("fetch.user_agent must not be empty".to_string());
    }

    if config.fetch.timeout_secs == 0 || config.fetch.timeout_secs > MAX_TIMEOUT_SECS {
        fail(format!(
            "fetch.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}, got {}",
            config.fetch.timeout_secs
        ));
    }

    if config.fetch.max_image_bytes == 0
        || config.fetch.max_image_bytes > MAX_IMAGE_BYTES_CEILING
    {
        fail(format!(
            "fetch.max_image_bytes must be between 1 and {MAX_IMAGE_BYTES_CEILING}, got {}",
            config.fetch.max_image_bytes
        ));
    }

    if config.fetch.max_redirects > MAX_REDIRECTS_CEILING {
        fail(format!(
            "fetch.max_redirects must be at most {MAX_REDIRECTS_CEILING}, got {}",
            config.fetch.max_redirects
        ));
    }

    for entry in &config.fetch.allowed_private_ips {
        if entry.trim().parse::<IpAddr>().is_err() {
            fail(format!(
                "fetch.allowed_private_ips entry `{entry}` is not a valid IP address"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
