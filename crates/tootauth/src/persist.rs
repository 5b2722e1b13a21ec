// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential persistence: load/save to JSON file with atomic writes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::register::ClientRegistration;
use crate::token::TokenBundle;
use crate::verify::VerifiedAccount;

/// Everything a later session needs to act as the account, written once at
/// the end of a successful flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub instance_url: String,
    pub app_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    /// Token creation time, epoch seconds.
    #[serde(default)]
    pub created_at: u64,
    pub account: VerifiedAccount,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub app_data: serde_json::Value,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub token_data: serde_json::Value,
}

fn default_token_type() -> String {
    "Bearer".to_owned()
}

impl CredentialRecord {
    /// Assemble a record. Requires a [`VerifiedAccount`], so a token that
    /// never passed verification cannot end up in one.
    pub fn new(
        instance_url: &str,
        app_name: &str,
        app: ClientRegistration,
        token: TokenBundle,
        account: VerifiedAccount,
    ) -> Self {
        Self {
            instance_url: instance_url.to_owned(),
            app_name: app_name.to_owned(),
            client_id: app.client_id,
            client_secret: app.client_secret,
            access_token: token.access_token,
            token_type: token.token_type,
            scope: token.scope,
            created_at: token.created_at,
            account,
            app_data: app.app_data,
            token_data: token.token_data,
        }
    }
}

/// Load a credential record from a JSON file.
pub fn load(path: &Path) -> anyhow::Result<CredentialRecord> {
    let contents = std::fs::read_to_string(path)?;
    let record: CredentialRecord = serde_json::from_str(&contents)?;
    Ok(record)
}

/// Save a credential record to a JSON file atomically (write tmp + rename).
///
/// The temp file sits next to the target so the rename never crosses a
/// filesystem, and carries the PID plus a counter so two writers never share
/// one. On unix the temp file is created owner-only, before any byte of the
/// record is written.
pub fn save(path: &Path, record: &CredentialRecord) -> std::io::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(record)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);

    // Clear a leftover from a crashed writer; create_new refuses to reuse it.
    let _ = std::fs::remove_file(&tmp_path);
    let written = create_private(&tmp_path)
        .and_then(|mut file| file.write_all(json.as_bytes()).and_then(|()| file.sync_all()))
        .and_then(|()| std::fs::rename(&tmp_path, path));
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    written
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new().write(true).create_new(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Default output file name for an instance/app pair, e.g.
/// `credentials_social.example.com_Weather_Bot.json`.
pub fn default_file_name(instance_url: &str, app_name: &str) -> String {
    let instance = instance_url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .replace('/', "_");
    let app: String = app_name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    format!("credentials_{instance}_{}.json", app.trim_end().replace(' ', "_"))
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
