// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./larder.toml` > `~/.config/larder/larder.toml` > `/etc/larder/larder.toml`
//! with environment variable overrides via `LARDER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LarderConfig;

/// System-wide config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/larder/larder.toml";

/// Local config file name, looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "larder.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/larder/larder.toml` (system-wide)
/// 3. `~/.config/larder/larder.toml` (user XDG config)
/// 4. `./larder.toml` (local directory)
/// 5. `LARDER_*` environment variables
pub fn load_config() -> Result<LarderConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<LarderConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LarderConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LarderConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LarderConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LarderConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/larder/larder.toml`, if a config dir exists for this platform.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("larder").join(LOCAL_CONFIG_FILE))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `LARDER_FETCH_USER_AGENT` must map to `fetch.user_agent`,
/// not `fetch.user.agent`.
fn env_provider() -> Env {
    Env::prefixed("LARDER_").map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = ["log", "storage", "media", "fetch"]
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(&format!("{section}_"))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or(key_str);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_map_to_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LARDER_FETCH_USER_AGENT", "TestAgent/1.0");
            jail.set_env("LARDER_FETCH_MAX_REDIRECTS", "3");
            jail.set_env("LARDER_MEDIA_NAMESPACE", "products");
            let config = load_config()?;
            assert_eq!(config.fetch.user_agent, "TestAgent/1.0");
            assert_eq!(config.fetch.max_redirects, 3);
            assert_eq!(config.media.namespace, "products");
            Ok(())
        });
    }

    #[test]
    fn local_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_CONFIG_FILE,
                r#"
[storage]
database_path = "/tmp/jail.db"

[fetch]
timeout_secs = 20
"#,
            )?;
            let config = load_config()?;
            assert_eq!(config.storage.database_path, "/tmp/jail.db");
            assert_eq!(config.fetch.timeout_secs, 20);
            assert_eq!(config.fetch.max_redirects, 5);
            Ok(())
        });
    }

    #[test]
    fn env_beats_local_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(LOCAL_CONFIG_FILE, "[log]\nlevel = \"warn\"\n")?;
            jail.set_env("LARDER_LOG_LEVEL", "debug");
            let config = load_config()?;
            assert_eq!(config.log.level, "debug");
            Ok(())
        });
    }

    #[test]
    fn env_overrides_explicit_path_with_underscored_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[storage]\ndatabase_path = \"/tmp/file.db\"\n")?;
            jail.set_env("LARDER_STORAGE_DATABASE_PATH", "/tmp/env.db");
            jail.set_env("LARDER_FETCH_MAX_IMAGE_BYTES", "1024");
            let config = load_config_from_path(Path::new("custom.toml"))?;
            assert_eq!(config.storage.database_path, "/tmp/env.db");
            assert_eq!(config.fetch.max_image_bytes, 1024);
            Ok(())
        });
    }
}
