// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `larder doctor` command implementation.
//!
//! Runs diagnostic checks against the configured database, media root and
//! fetch policy. Nothing is created or migrated; a missing database only
//! warns.

use std::io::IsTerminal;
use std::net::IpAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use larder_config::LarderConfig;
use larder_config::model::{FetchConfig, MediaConfig};
use larder_core::{BlobStore, HealthStatus, LarderError};
use larder_security::{HostResolver, is_global};
use larder_storage::FsBlobStore;

/// Host resolved by the deep DNS check.
const DNS_PROBE_HOST: &str = "images.openfoodfacts.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(
        name: &'static str,
        status: CheckStatus,
        message: impl Into<String>,
        start: Instant,
    ) -> Self {
        Self {
            name,
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `larder doctor` command.
///
/// Fails when any check fails so the exit status can gate deployments.
pub async fn run_doctor(
    config: &LarderConfig,
    config_path: Option<&Path>,
    deep: bool,
    plain: bool,
) -> Result<(), LarderError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![
        check_config(config_path).await,
        check_database(&config.storage.database_path).await,
        check_media(&config.media).await,
        check_fetch_policy(&config.fetch),
    ];
    if deep {
        results.push(check_db_integrity(&config.storage.database_path).await);
        results.push(check_image_status(&config.storage.database_path).await);
        results.push(check_dns(DNS_PROBE_HOST).await);
        results.push(check_memory_baseline());
    }

    println!();
    println!("  larder doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();

    let failures = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    let warnings = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warn)
        .count();
    if failures + warnings == 0 {
        println!("  All checks passed.");
    } else {
        let issues = failures + warnings;
        let word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {word} found.");
        if !deep {
            println!("  Run with --deep for detailed diagnostics.");
        }
    }
    println!();

    if failures > 0 {
        return Err(LarderError::Internal(format!(
            "{failures} doctor check(s) failed"
        )));
    }
    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

async fn check_config(path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match path {
        Some(path) => larder_config::load_and_validate_path(path),
        None => larder_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

async fn open_existing(db_path: &str) -> Result<tokio_rusqlite::Connection, String> {
    tokio_rusqlite::Connection::open(db_path)
        .await
        .map_err(|e| format!("open failed: {e}"))
}

async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first ingest)"),
            start,
        );
    }

    let conn = match open_existing(db_path).await {
        Ok(conn) => conn,
        Err(msg) => return CheckResult::new("Database", CheckStatus::Fail, msg, start),
    };
    let count = conn
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))
        })
        .await;
    match count {
        Ok(n) => CheckResult::new(
            "Database",
            CheckStatus::Pass,
            format!("connected ({n} food items)"),
            start,
        ),
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }
}

async fn check_media(media: &MediaConfig) -> CheckResult {
    let start = Instant::now();
    match FsBlobStore::from_config(media).health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Media root",
            CheckStatus::Pass,
            format!("writable: {}", media.root),
            start,
        ),
        Ok(HealthStatus::Degraded(msg)) => {
            CheckResult::new("Media root", CheckStatus::Warn, msg, start)
        }
        Ok(HealthStatus::Unhealthy(msg)) => {
            CheckResult::new("Media root", CheckStatus::Fail, msg, start)
        }
        Err(e) => CheckResult::new("Media root", CheckStatus::Fail, e.to_string(), start),
    }
}

fn check_fetch_policy(fetch: &FetchConfig) -> CheckResult {
    let start = Instant::now();
    let mut unparsed = Vec::new();
    let mut global = Vec::new();
    for entry in &fetch.allowed_private_ips {
        match entry.trim().parse::<IpAddr>() {
            Ok(ip) if is_global(&ip) => global.push(entry.as_str()),
            Ok(_) => {}
            Err(_) => unparsed.push(entry.as_str()),
        }
    }

    if !unparsed.is_empty() {
        return CheckResult::new(
            "Fetch policy",
            CheckStatus::Fail,
            format!("unparseable allowlist entries: {}", unparsed.join(", ")),
            start,
        );
    }
    if !global.is_empty() {
        return CheckResult::new(
            "Fetch policy",
            CheckStatus::Warn,
            format!("allowlist holds public addresses: {}", global.join(", ")),
            start,
        );
    }
    let message = match fetch.allowed_private_ips.len() {
        0 => "public addresses only".to_string(),
        n => format!("{n} private address(es) allowlisted"),
    };
    CheckResult::new(
        "Fetch policy",
        CheckStatus::Pass,
        format!(
            "{message}, {} redirects max, {} bytes max",
            fetch.max_redirects, fetch.max_image_bytes
        ),
        start,
    )
}

async fn check_db_integrity(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "DB integrity",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }
    let conn = match open_existing(db_path).await {
        Ok(conn) => conn,
        Err(msg) => return CheckResult::new("DB integrity", CheckStatus::Fail, msg, start),
    };
    let rows = conn
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare("PRAGMA integrity_check")?;
            let rows: Result<Vec<String>, _> = stmt.query_map([], |row| row.get(0))?.collect();
            rows
        })
        .await;
    match rows {
        Ok(rows) if rows.len() == 1 && rows[0] == "ok" => {
            CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start)
        }
        Ok(rows) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("{} issue(s) found", rows.len()),
            start,
        ),
        Err(e) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("check failed: {e}"),
            start,
        ),
    }
}

async fn check_image_status(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Image status",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }
    let conn = match open_existing(db_path).await {
        Ok(conn) => conn,
        Err(msg) => return CheckResult::new("Image status", CheckStatus::Fail, msg, start),
    };
    let counts = conn
        .call(|conn| -> Result<(i64, i64), rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(image_status = 'failed'), 0) FROM foods",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
        })
        .await;
    match counts {
        Ok((_, 0)) => CheckResult::new(
            "Image status",
            CheckStatus::Pass,
            "no failed refreshes",
            start,
        ),
        Ok((total, failed)) => CheckResult::new(
            "Image status",
            CheckStatus::Warn,
            format!("{failed} of {total} food items have failed images"),
            start,
        ),
        Err(e) => CheckResult::new(
            "Image status",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }
}

async fn check_dns(host: &str) -> CheckResult {
    let start = Instant::now();
    match HostResolver::system().resolve(host).await {
        Ok(addrs) if addrs.iter().all(|a| a.global) => CheckResult::new(
            "DNS",
            CheckStatus::Pass,
            format!("{host} resolves to {} public address(es)", addrs.len()),
            start,
        ),
        Ok(_) => CheckResult::new(
            "DNS",
            CheckStatus::Warn,
            format!("{host} resolves to a non-public address; fetches will be blocked"),
            start,
        ),
        Err(e) => CheckResult::new("DNS", CheckStatus::Warn, e.to_string(), start),
    }
}

fn check_memory_baseline() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let mb = |bytes: usize| bytes as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Pass,
            format!(
                "heap: {:.1} MB, resident: {:.1} MB",
                mb(allocated),
                mb(resident)
            ),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Warn,
            "jemalloc not available on MSVC",
            start,
        )
    }
}
