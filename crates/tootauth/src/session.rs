// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HTTP session owned by one flow invocation.
//!
//! Redirects are never followed so the scrape strategy can read the grant out
//! of a `Location` header. Cookies persist for the lifetime of the session
//! only, which keeps the login state of one flow out of every other flow.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};

use crate::error::{FlowError, StageFailure};

/// Out-of-band redirect sentinel for non-interactive clients.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const USER_AGENT: &str = concat!("tootauth/", env!("CARGO_PKG_VERSION"));

/// Constructor for the [`FlowError`] variant of the stage issuing a request.
pub type Stage = fn(StageFailure) -> FlowError;

/// HTTP session bound to a single instance.
pub struct HttpSession {
    base_url: String,
    client: Client,
}

impl HttpSession {
    pub fn new(instance_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { base_url: normalize_instance_url(instance_url), client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request and read the whole response, mapping transport failures
    /// onto `stage`.
    ///
    /// Non-2xx statuses are not errors here; callers decide what a redirect or
    /// a rejection means for their stage.
    pub async fn send(&self, req: RequestBuilder, stage: Stage) -> Result<Page, FlowError> {
        let resp = req
            .send()
            .await
            .map_err(|e| stage(StageFailure::new(format!("request failed: {e}"))))?;

        let status = resp.status();
        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp
            .text()
            .await
            .map_err(|e| stage(StageFailure::new(format!("failed to read response: {e}"))))?;

        Ok(Page { status, location, body })
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Build a failure carrying this response's status and body.
    pub fn failure(&self, message: impl Into<String>) -> StageFailure {
        StageFailure::new(message).with_response(self.status.as_u16(), &self.body)
    }

    /// Require a 2xx JSON object body.
    pub fn json_object(
        &self,
        what: &str,
        stage: Stage,
    ) -> Result<serde_json::Map<String, serde_json::Value>, FlowError> {
        if !self.is_success() {
            return Err(stage(self.failure(format!("{what} rejected"))));
        }
        match serde_json::from_str::<serde_json::Value>(&self.body) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(stage(self.failure(format!("{what} response is not a JSON object")))),
            Err(e) => Err(stage(self.failure(format!("{what} response is not valid JSON: {e}")))),
        }
    }
}

/// Trim whitespace and trailing slashes from an instance URL.
pub fn normalize_instance_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_owned()
}

/// Read a non-empty string field from a JSON object.
pub(crate) fn str_field<'a>(
    map: &'a serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<&'a str> {
    map.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
