// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log-safe rendering of URLs.

use url::Url;

/// Render `url` with any username and password removed.
pub fn redact_url(url: &Url) -> String {
    if url.username().is_empty() && url.password().is_none() {
        return url.to_string();
    }
    let mut clean = url.clone();
    // Only fails for cannot-be-a-base URLs, which carry no userinfo.
    let _ = clean.set_username("");
    let _ = clean.set_password(None);
    clean.to_string()
}
