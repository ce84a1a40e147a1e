// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON input and output for the catalog commands.

use larder_core::LarderError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncReadExt;

/// Read `source` as text: a file path, or `-` for stdin.
pub async fn read_source(source: &str) -> Result<String, LarderError> {
    if source == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .map_err(|e| LarderError::Validation(format!("cannot read stdin: {e}")))?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| LarderError::Validation(format!("cannot read {source}: {e}")))
    }
}

/// Parse either a single JSON object or an array of them.
pub fn parse_many<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, LarderError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| LarderError::Validation(format!("invalid JSON: {e}")))?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|e| LarderError::Validation(format!("item {index}: {e}")))
        })
        .collect()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), LarderError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| LarderError::Internal(format!("cannot encode report: {e}")))?;
    println!("{text}");
    Ok(())
}
