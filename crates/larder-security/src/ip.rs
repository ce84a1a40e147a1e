// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Global vs. non-global IP address classification.
//!
//! An address is global only if it is publicly routable. Everything reserved
//! for private, loopback, link-local, multicast, documentation, benchmarking,
//! shared (CGNAT) or future use is non-global, as is any IPv6 address outside
//! 2000::/3. IPv6 addresses that embed an IPv4 address (mapped, compatible,
//! translated, NAT64, 6to4) are classified by the embedded address so
//! `::ffff:10.0.0.1` is as blocked as `10.0.0.1`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Returns `true` if `ip` is a publicly routable address.
pub fn is_global(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_global_v4(v4),
        IpAddr::V6(v6) => is_global_v6(v6),
    }
}

fn is_global_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    let reserved = a == 0 // 0.0.0.0/8 "this network", includes unspecified
        || ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local() // includes 169.254.169.254 cloud metadata
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        || (a == 100 && (b & 0xc0) == 64) // 100.64.0.0/10 shared address space
        || (a == 192 && b == 0 && c == 0) // 192.0.0.0/24 IETF protocol assignments
        || (a == 198 && (b & 0xfe) == 18) // 198.18.0.0/15 benchmarking
        || a >= 240; // 240.0.0.0/4 reserved
    !reserved
}

fn is_global_v6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = embedded_ipv4(ip) {
        return is_global_v4(&v4);
    }

    let s = ip.segments();
    // Only 2000::/3 is allocated for global unicast.
    if (s[0] & 0xe000) != 0x2000 {
        return false;
    }
    let reserved = (s[0] == 0x2001 && s[1] < 0x0200) // 2001::/23 IETF protocol assignments
        || (s[0] == 0x2001 && s[1] == 0x0db8) // 2001:db8::/32 documentation
        || (s[0] == 0x3fff && s[1] < 0x1000); // 3fff::/20 documentation
    !reserved
}

/// Extracts the IPv4 address carried inside an IPv6 address, if any.
///
/// Covers `::ffff:0:0/96` (mapped), `::/96` (compatible), `::ffff:0:0:0/96`
/// (translated), `64:ff9b::/96` (NAT64), `64:ff9b:1::/48` (local-use NAT64)
/// and `2002::/16` (6to4).
fn embedded_ipv4(ip: &Ipv6Addr) -> Option<Ipv4Addr> {
    let s = ip.segments();
    let from_segments = |hi: u16, lo: u16| {
        Ipv4Addr::new((hi >> 8) as u8, hi as u8, (lo >> 8) as u8, lo as u8)
    };

    if let Some(v4) = ip.to_ipv4() {
        // to_ipv4 covers both mapped and compatible forms, including `::` and `::1`.
        return Some(v4);
    }
    if s[..4].iter().all(|&x| x == 0) && s[4] == 0xffff && s[5] == 0 {
        return Some(from_segments(s[6], s[7]));
    }
    if s[0] == 0x0064 && s[1] == 0xff9b && s[2..6].iter().all(|&x| x == 0) {
        return Some(from_segments(s[6], s[7]));
    }
    if s[0] == 0x0064 && s[1] == 0xff9b && s[2] == 0x0001 {
        // /48 prefix layout: two octets, the reserved u octet, then two more.
        let [a, b] = s[3].to_be_bytes();
        let [_, c] = s[4].to_be_bytes();
        let [d, _] = s[5].to_be_bytes();
        return Some(Ipv4Addr::new(a, b, c, d));
    }
    if s[0] == 0x2002 {
        return Some(from_segments(s[1], s[2]));
    }
    None
}
