// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token verification against `GET /api/v1/accounts/verify_credentials`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::FlowError;
use crate::session::HttpSession;
use crate::token::TokenBundle;

/// Identity payload for the account a token belongs to.
///
/// The typed fields are the ones tootauth reads; everything else the server
/// sends is kept verbatim in `extra` and written back out on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedAccount {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    username: String,
    #[serde(default, deserialize_with = "lenient_string")]
    acct: String,
    #[serde(default, deserialize_with = "lenient_string")]
    display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

/// Strings as-is, numbers stringified, `null` and anything else empty.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

impl VerifiedAccount {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `acct` handle, falling back to the bare username.
    pub fn acct(&self) -> &str {
        if self.acct.is_empty() {
            &self.username
        } else {
            &self.acct
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Any other field of the identity payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Confirm the server accepts `token` and return the account it belongs to.
pub async fn verify_token(
    http: &HttpSession,
    token: &TokenBundle,
) -> Result<VerifiedAccount, FlowError> {
    let req = http
        .client()
        .get(http.url("/api/v1/accounts/verify_credentials"))
        .bearer_auth(&token.access_token);
    let page = http.send(req, FlowError::Verification).await?;

    if !page.is_success() {
        return Err(FlowError::Verification(page.failure("identity endpoint rejected token")));
    }
    let account: VerifiedAccount = serde_json::from_str(&page.body).map_err(|e| {
        FlowError::Verification(page.failure(format!("unrecognized identity payload: {e}")))
    })?;

    info!(account = %account.acct(), "token verified");
    Ok(account)
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
