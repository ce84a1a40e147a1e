// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hostname resolution with per-address classification.
//!
//! [`HostResolver`] turns a hostname into its candidate addresses, each tagged
//! global or non-global. The raw lookup is behind the [`DnsLookup`] trait so
//! tests can substitute a fixed table for the system resolver.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::ip::is_global;

/// Host lookup failed or produced nothing usable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// The underlying lookup errored.
    #[error("DNS lookup for {host} failed: {reason}")]
    Lookup { host: String, reason: String },

    /// The lookup succeeded but returned zero addresses.
    #[error("{host} did not resolve to any address")]
    NoAddresses { host: String },
}

/// Raw hostname-to-address lookup.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Returns the addresses `host` resolves to, in resolver order.
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolutionError>;
}

/// Lookup through the operating system resolver (`getaddrinfo`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDns;

#[async_trait]
impl DnsLookup for SystemDns {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolutionError> {
        let addrs = tokio::net::lookup_host((host, 0u16))
            .await
            .map_err(|e| ResolutionError::Lookup {
                host: host.to_string(),
                reason: e.to_string(),
            })?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// One candidate address for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddr {
    pub ip: IpAddr,
    /// Whether `ip` is publicly routable.
    pub global: bool,
}

impl ResolvedAddr {
    fn classify(ip: IpAddr) -> Self {
        Self {
            ip,
            global: is_global(&ip),
        }
    }
}

/// Resolves hostnames to classified candidate addresses.
#[derive(Clone)]
pub struct HostResolver {
    dns: Arc<dyn DnsLookup>,
}

impl std::fmt::Debug for HostResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostResolver").finish_non_exhaustive()
    }
}

impl Default for HostResolver {
    fn default() -> Self {
        Self::system()
    }
}

impl HostResolver {
    /// Create a resolver backed by the given lookup.
    pub fn new(dns: Arc<dyn DnsLookup>) -> Self {
        Self { dns }
    }

    /// Create a resolver backed by the operating system resolver.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemDns))
    }

    /// Resolve `host` to its classified candidate addresses.
    ///
    /// A literal IP address (bracketed or not) resolves to itself without a
    /// lookup. Duplicate addresses are collapsed, keeping resolver order.
    pub async fn resolve(&self, host: &str) -> Result<Vec<ResolvedAddr>, ResolutionError> {
        let bare = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Ok(vec![ResolvedAddr::classify(ip)]);
        }

        let ips = self.dns.lookup(bare).await?;
        let mut resolved: Vec<ResolvedAddr> = Vec::with_capacity(ips.len());
        for ip in ips {
            if !resolved.iter().any(|r| r.ip == ip) {
                resolved.push(ResolvedAddr::classify(ip));
            }
        }

        if resolved.is_empty() {
            return Err(ResolutionError::NoAddresses {
                host: bare.to_string(),
            });
        }

        debug!(host = %bare, addresses = resolved.len(), "host resolved");
        Ok(resolved)
    }
}
