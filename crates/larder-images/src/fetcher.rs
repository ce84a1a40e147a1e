// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image fetching pinned to vetted addresses.
//!
//! Every hop of a fetch goes through [`UrlGuard`] first and gets its own
//! single-use client whose DNS for the hop's hostname is overridden to the
//! pinned address. The hostname still drives `Host`, SNI and certificate
//! verification. Redirects are never followed by the client itself: each
//! `Location` is re-validated and re-pinned as a fresh hop.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use larder_config::model::FetchConfig;
use larder_security::{HostResolver, PinnedTarget, UrlGuard, ValidationError, redact_url};
use reqwest::header::{CONTENT_TYPE, HeaderMap, LOCATION};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::stream::{DEFAULT_MAX_IMAGE_BYTES, StreamError, StreamGuard};

/// Why an image fetch failed. `Display` is the reason recorded on the record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("bad redirect: {0}")]
    Redirect(String),

    #[error("too many redirects (limit {max})")]
    TooManyRedirects { max: usize },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Fetches raw image bytes for a URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Transport settings threaded into [`PinnedFetcher`] at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub user_agent: String,
    /// Applies to both connect and the whole request, per hop.
    pub timeout: Duration,
    pub max_bytes: usize,
    pub max_redirects: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl FetchSettings {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_bytes: if config.max_image_bytes == 0 {
                DEFAULT_MAX_IMAGE_BYTES
            } else {
                config.max_image_bytes
            },
            max_redirects: config.max_redirects,
        }
    }
}

/// HTTP(S) fetcher that connects only to addresses vetted by [`UrlGuard`].
#[derive(Debug, Clone)]
pub struct PinnedFetcher {
    guard: UrlGuard,
    settings: FetchSettings,
    stream_guard: StreamGuard,
}

impl PinnedFetcher {
    pub fn new(guard: UrlGuard, settings: FetchSettings) -> Self {
        let stream_guard = StreamGuard::new(settings.max_bytes);
        Self {
            guard,
            settings,
            stream_guard,
        }
    }

    /// Build a fetcher from the `[fetch]` config section.
    ///
    /// Allowlist entries that do not parse are skipped; config validation
    /// reports them before this point.
    pub fn from_config(config: &FetchConfig, resolver: HostResolver) -> Self {
        let allowed: Vec<IpAddr> = config
            .allowed_private_ips
            .iter()
            .filter_map(|s| s.parse::<IpAddr>().ok())
            .collect();
        let guard = UrlGuard::new(resolver).with_allowed_private_ips(allowed);
        Self::new(guard, FetchSettings::from_config(config))
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    pub fn guard(&self) -> &UrlGuard {
        &self.guard
    }

    /// Fetch `url` with extra request headers.
    pub async fn fetch_with_headers(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<Vec<u8>, FetchError> {
        let mut current =
            Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;
        let mut hops = 0usize;

        loop {
            let target = self.guard.validate_and_pin_url(current).await?;
            let client = self.client_for(&target)?;
            debug!(
                url = %redact_url(&target.url),
                ip = %target.ip,
                hop = hops,
                "fetching image"
            );

            let response = client
                .get(target.url.clone())
                .headers(headers.clone())
                .send()
                .await
                .map_err(transport_error)?;

            let status = response.status();
            if status.is_redirection() {
                if hops >= self.settings.max_redirects {
                    warn!(
                        url = %redact_url(&target.url),
                        max = self.settings.max_redirects,
                        "redirect limit reached"
                    );
                    return Err(FetchError::TooManyRedirects {
                        max: self.settings.max_redirects,
                    });
                }
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        FetchError::Redirect(format!("{status} without a usable Location header"))
                    })?;
                current = target.url.join(location).map_err(|e| {
                    FetchError::Redirect(format!("invalid Location {location:?}: {e}"))
                })?;
                debug!(from = %redact_url(&target.url), to = %redact_url(&current), "following redirect");
                hops += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url: redact_url(&target.url),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let declared = response.content_length();
            let bytes = self
                .stream_guard
                .consume(content_type.as_deref(), declared, response.bytes_stream())
                .await?;
            debug!(url = %redact_url(&target.url), bytes = bytes.len(), "image fetched");
            return Ok(bytes);
        }
    }

    /// A client good for exactly one hop to `target`.
    fn client_for(&self, target: &PinnedTarget) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .user_agent(&self.settings.user_agent)
            .connect_timeout(self.settings.timeout)
            .timeout(self.settings.timeout);

        if !target.is_ip_literal() {
            builder = builder.resolve(&target.host, target.socket_addr());
        }

        builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))
    }
}

#[async_trait]
impl ImageFetcher for PinnedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_with_headers(url, HeaderMap::new()).await
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::Transport("request timed out".to_string());
    }
    let err = err.without_url();
    let mut reason = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(inner) = source {
        reason.push_str(": ");
        reason.push_str(&inner.to_string());
        source = inner.source();
    }
    FetchError::Transport(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_fetch_config() {
        let config = FetchConfig {
            user_agent: "Test/1.0".into(),
            timeout_secs: 3,
            max_image_bytes: 1024,
            max_redirects: 2,
            allowed_private_ips: vec![],
        };
        let settings = FetchSettings::from_config(&config);
        assert_eq!(settings.user_agent, "Test/1.0");
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.max_bytes, 1024);
        assert_eq!(settings.max_redirects, 2);
    }

    #[test]
    fn default_settings_use_five_mib_ceiling() {
        let settings = FetchSettings::default();
        assert_eq!(settings.max_bytes, DEFAULT_MAX_IMAGE_BYTES);
        assert_eq!(settings.max_redirects, 5);
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }

    #[test]
    fn from_config_skips_unparseable_allowlist_entries() {
        let config = FetchConfig {
            allowed_private_ips: vec!["10.0.0.7".into(), "not-an-ip".into()],
            ..FetchConfig::default()
        };
        let fetcher = PinnedFetcher::from_config(&config, HostResolver::system());
        assert_eq!(
            fetcher.guard().allowed_private_ips(),
            &["10.0.0.7".parse::<IpAddr>().unwrap()]
        );
    }

    #[test]
    fn fetch_error_reasons_are_readable() {
        let err = FetchError::from(StreamError::PayloadTooLarge { limit: 10 });
        assert_eq!(err.to_string(), "payload too large: more than 10 bytes");
        let err = FetchError::from(ValidationError::UnsupportedScheme("ftp".into()));
        assert_eq!(err.to_string(), "unsupported URL scheme: ftp");
        assert_eq!(
            FetchError::TooManyRedirects { max: 5 }.to_string(),
            "too many redirects (limit 5)"
        );
    }

    #[tokio::test]
    async fn blocked_initial_url_never_connects() {
        let fetcher = PinnedFetcher::new(
            UrlGuard::new(HostResolver::system()),
            FetchSettings::default(),
        );
        let err = fetcher.fetch("http://127.0.0.1:9/a.jpg").await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Validation(ValidationError::BlockedHost { .. })
        ));
    }
}
