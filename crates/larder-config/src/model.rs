// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Larder.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Larder configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LarderConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Catalog database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Image asset storage settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Outbound image fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Catalog database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("larder").join("larder.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("larder.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Image asset storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Directory under which image assets are written.
    #[serde(default = "default_media_root")]
    pub root: String,

    /// First path segment of every stored asset name.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            namespace: default_namespace(),
        }
    }
}

fn default_media_root() -> String {
    dirs::data_dir()
        .map(|p| p.join("larder").join("media"))
        .unwrap_or_else(|| std::path::PathBuf::from("media"))
        .display()
        .to_string()
}

fn default_namespace() -> String {
    "foods".to_string()
}

/// Outbound image fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// `User-Agent` header sent with every image request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Connect and total request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest image body accepted, in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Maximum number of redirects followed for one fetch.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Non-global IP addresses that are nevertheless allowed as fetch targets.
    #[serde(default)]
    pub allowed_private_ips: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_image_bytes: default_max_image_bytes(),
            max_redirects: default_max_redirects(),
            allowed_private_ips: Vec::new(),
        }
    }
}

fn default_user_agent() -> String {
    "Larder/0.1 (images)".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_max_redirects() -> usize {
    5
}
