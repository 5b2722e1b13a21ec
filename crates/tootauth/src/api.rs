// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated client for posting and interacting once a token exists.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::persist::CredentialRecord;
use crate::session::{normalize_instance_url, USER_AGENT};

/// Server-side cap on timeline page size.
pub const MAX_TIMELINE_LIMIT: u32 = 40;

/// Server-side cap on notification page size.
pub const MAX_NOTIFICATION_LIMIT: u32 = 30;

/// Who can see a status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
    Direct,
}

/// Body of `POST /api/v1/statuses`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewStatus {
    pub status: String,
    pub visibility: Visibility,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoiler_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media_ids: Vec<String>,
}

impl NewStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into(), ..Self::default() }
    }
}

/// The two fields a credential file must carry to drive the API.
#[derive(Deserialize)]
struct ClientCredentials {
    instance_url: String,
    access_token: String,
}

/// HTTP client for the Mastodon REST API, authenticated as one account.
#[derive(Debug)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(instance_url: &str, access_token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {access_token}"))
            .context("access token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { base_url: normalize_instance_url(instance_url), client })
    }

    pub fn from_record(record: &CredentialRecord, timeout: Duration) -> anyhow::Result<Self> {
        Self::new(&record.instance_url, &record.access_token, timeout)
    }

    /// Build a client from a credential file. Only `instance_url` and
    /// `access_token` are read.
    pub fn from_credentials_file(path: &Path, timeout: Duration) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let creds: ClientCredentials = serde_json::from_str(&contents)
            .with_context(|| format!("invalid credential file {}", path.display()))?;
        Self::new(&creds.instance_url, &creds.access_token, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn call(&self, what: &str, req: RequestBuilder) -> anyhow::Result<Value> {
        let resp = req.send().await.with_context(|| format!("{what}: request failed"))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("{what} failed ({status}): {}", crate::error::truncate_body(&text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).with_context(|| format!("{what}: invalid JSON response"))
    }

    async fn call_list(&self, what: &str, req: RequestBuilder) -> anyhow::Result<Vec<Value>> {
        match self.call(what, req).await? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => anyhow::bail!("{what}: expected a JSON array, got {other}"),
        }
    }

    /// Fetch the authenticated account.
    pub async fn verify_credentials(&self) -> anyhow::Result<Value> {
        let req = self.client.get(self.url("/api/v1/accounts/verify_credentials"));
        self.call("verify credentials", req).await
    }

    /// Publish a status and return the created status object.
    pub async fn post_status(&self, status: &NewStatus) -> anyhow::Result<Value> {
        let req = self.client.post(self.url("/api/v1/statuses")).json(status);
        self.call("post status", req).await
    }

    /// Upload a media file; the returned object's `id` goes into
    /// [`NewStatus::media_ids`].
    pub async fn upload_media(&self, path: &Path, description: Option<&str>) -> anyhow::Result<Value> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read media file {}", path.display()))?;
        let file_name =
            path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

        let mut form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(data).file_name(file_name));
        if let Some(text) = description.filter(|d| !d.is_empty()) {
            form = form.text("description", text.to_owned());
        }

        let req = self.client.post(self.url("/api/v1/media")).multipart(form);
        self.call("upload media", req).await
    }

    /// Read a timeline: `home`, `public`, `local`, or `tag/<hashtag>`.
    pub async fn timeline(&self, kind: &str, limit: u32) -> anyhow::Result<Vec<Value>> {
        let kind = kind.trim_matches('/');
        anyhow::ensure!(!kind.is_empty() && !kind.contains(['?', '#']), "invalid timeline: {kind}");
        let req = self
            .client
            .get(self.url(&format!("/api/v1/timelines/{kind}")))
            .query(&[("limit", limit.min(MAX_TIMELINE_LIMIT))]);
        self.call_list("timeline", req).await
    }

    pub async fn notifications(&self, limit: u32) -> anyhow::Result<Vec<Value>> {
        let req = self
            .client
            .get(self.url("/api/v1/notifications"))
            .query(&[("limit", limit.min(MAX_NOTIFICATION_LIMIT))]);
        self.call_list("notifications", req).await
    }

    pub async fn follow(&self, account_id: &str) -> anyhow::Result<Value> {
        let id = path_segment(account_id)?;
        let req = self.client.post(self.url(&format!("/api/v1/accounts/{id}/follow")));
        self.call("follow", req).await
    }

    /// Search for accounts; returns the `accounts` array of the result.
    pub async fn search_accounts(&self, query: &str, limit: u32) -> anyhow::Result<Vec<Value>> {
        let limit = limit.to_string();
        let req = self
            .client
            .get(self.url("/api/v2/search"))
            .query(&[("q", query), ("type", "accounts"), ("limit", limit.as_str())]);
        match self.call("search", req).await? {
            Value::Object(mut map) => match map.remove("accounts") {
                Some(Value::Array(accounts)) => Ok(accounts),
                _ => Ok(Vec::new()),
            },
            _ => Ok(Vec::new()),
        }
    }

    pub async fn favourite(&self, status_id: &str) -> anyhow::Result<Value> {
        let id = path_segment(status_id)?;
        let req = self.client.post(self.url(&format!("/api/v1/statuses/{id}/favourite")));
        self.call("favourite", req).await
    }

    pub async fn reblog(&self, status_id: &str) -> anyhow::Result<Value> {
        let id = path_segment(status_id)?;
        let req = self.client.post(self.url(&format!("/api/v1/statuses/{id}/reblog")));
        self.call("reblog", req).await
    }

    pub async fn delete_status(&self, status_id: &str) -> anyhow::Result<Value> {
        let id = path_segment(status_id)?;
        let req = self.client.delete(self.url(&format!("/api/v1/statuses/{id}")));
        self.call("delete status", req).await
    }
}

/// Reject IDs that would escape their path segment.
fn path_segment(id: &str) -> anyhow::Result<&str> {
    let id = id.trim();
    anyhow::ensure!(!id.is_empty() && !id.contains(['/', '?', '#']), "invalid id: {id:?}");
    Ok(id)
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
