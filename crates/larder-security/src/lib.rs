// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network security enforcement for Larder's outbound image fetches.
//!
//! Provides IP classification (global vs. non-global), a host resolver that
//! classifies every candidate address, and a URL guard that resolves a host
//! once and pins the connection to a single vetted address so DNS cannot be
//! rebound between the check and the connect.

pub mod guard;
pub mod ip;
pub mod redact;
pub mod resolve;

pub use guard::{PinnedTarget, UrlGuard, ValidationError};
pub use ip::is_global;
pub use redact::redact_url;
pub use resolve::{DnsLookup, HostResolver, ResolutionError, ResolvedAddr, SystemDns};
