// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URL validation and resolve-once host pinning.
//!
//! [`UrlGuard::validate_and_pin`] checks the scheme, resolves the host exactly
//! once, refuses the URL if *any* candidate address is non-global, and binds
//! the rest of the attempt to the first vetted address. Callers connect to
//! [`PinnedTarget::socket_addr`] and never re-resolve the hostname.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::redact::redact_url;
use crate::resolve::HostResolver;

/// Why a URL was refused before any connection was opened.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("blocked host {host}: {reason}")]
    BlockedHost { host: String, reason: String },
}

/// A validated URL bound to exactly one vetted address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedTarget {
    /// The URL as validated.
    pub url: Url,
    /// Original hostname, used for `Host`, SNI and certificate verification.
    pub host: String,
    /// `http` or `https`.
    pub scheme: String,
    /// The single address every connection for this hop goes to.
    pub ip: IpAddr,
    pub port: u16,
}

impl PinnedTarget {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// True when the URL's host was already an IP literal.
    pub fn is_ip_literal(&self) -> bool {
        self.host.parse::<IpAddr>().is_ok()
    }
}

/// Validates outbound URLs and pins them to a vetted address.
#[derive(Debug, Clone)]
pub struct UrlGuard {
    resolver: HostResolver,
    allowed_private_ips: Vec<IpAddr>,
}

impl UrlGuard {
    pub fn new(resolver: HostResolver) -> Self {
        Self {
            resolver,
            allowed_private_ips: Vec::new(),
        }
    }

    /// Addresses the operator trusts even though they are non-global.
    pub fn with_allowed_private_ips(mut self, allowed: Vec<IpAddr>) -> Self {
        self.allowed_private_ips = allowed;
        self
    }

    pub fn allowed_private_ips(&self) -> &[IpAddr] {
        &self.allowed_private_ips
    }

    /// Parse `raw` and pin it. See [`UrlGuard::validate_and_pin_url`].
    pub async fn validate_and_pin(&self, raw: &str) -> Result<PinnedTarget, ValidationError> {
        let url = Url::parse(raw).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;
        self.validate_and_pin_url(url).await
    }

    /// Validate an already-parsed URL and pin it to one address.
    ///
    /// Checks run in order and the first violation wins: scheme, host
    /// presence, resolution, then deny-on-any-non-global-hit.
    pub async fn validate_and_pin_url(&self, url: Url) -> Result<PinnedTarget, ValidationError> {
        let scheme = url.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(ValidationError::UnsupportedScheme(scheme));
        }

        let raw_host = url.host_str().unwrap_or_default();
        let host = strip_zone_id(raw_host.trim_start_matches('[').trim_end_matches(']'));
        if host.is_empty() {
            return Err(ValidationError::InvalidUrl(format!(
                "missing host in {}",
                redact_url(&url)
            )));
        }
        let port = url.port_or_known_default().ok_or_else(|| {
            ValidationError::InvalidUrl(format!("no port for {}", redact_url(&url)))
        })?;

        let candidates = self.resolver.resolve(host).await.map_err(|e| {
            error!(host = %host, error = %e, "blocked URL: host did not resolve");
            ValidationError::BlockedHost {
                host: host.to_string(),
                reason: e.to_string(),
            }
        })?;

        if let Some(bad) = candidates
            .iter()
            .find(|c| !c.global && !self.allowed_private_ips.contains(&c.ip))
        {
            error!(
                url = %redact_url(&url),
                host = %host,
                ip = %bad.ip,
                "blocked SSRF attempt: host resolves to non-global address"
            );
            return Err(ValidationError::BlockedHost {
                host: host.to_string(),
                reason: format!("resolves to non-global address {}", bad.ip),
            });
        }

        // resolve() never returns an empty list
        let ip = candidates
            .first()
            .map(|c| c.ip)
            .ok_or_else(|| ValidationError::BlockedHost {
                host: host.to_string(),
                reason: "no candidate addresses".to_string(),
            })?;

        debug!(host = %host, ip = %ip, port, "pinned URL host");
        Ok(PinnedTarget {
            host: host.to_string(),
            scheme,
            ip,
            port,
            url,
        })
    }
}

fn strip_zone_id(host: &str) -> &str {
    match host.split_once('%') {
        Some((bare, _zone)) => bare,
        None => host,
    }
}
