// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-table DNS lookup for deterministic resolver and fetch tests.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use larder_security::{DnsLookup, ResolutionError};

/// A [`DnsLookup`] that answers from an in-memory table.
///
/// Unknown hosts fail like NXDOMAIN. Every lookup is counted, so tests can
/// assert that IP literals never reach DNS.
#[derive(Debug, Default)]
pub struct MockDns {
    table: HashMap<String, Vec<IpAddr>>,
    lookups: AtomicUsize,
}

impl MockDns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `host` with `ips`, in order.
    ///
    /// # Panics
    /// If any entry is not a valid IP address.
    pub fn with_host(mut self, host: &str, ips: &[&str]) -> Self {
        let ips = ips
            .iter()
            .map(|s| s.parse().unwrap_or_else(|_| panic!("bad IP in mock table: {s}")))
            .collect();
        self.table.insert(host.to_string(), ips);
        self
    }

    /// Number of lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsLookup for MockDns {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolutionError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(host)
            .cloned()
            .ok_or_else(|| ResolutionError::Lookup {
                host: host.to_string(),
                reason: "NXDOMAIN".to_string(),
            })
    }
}
