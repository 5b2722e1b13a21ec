// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grant exchange at `POST /oauth/token`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::error::FlowError;
use crate::grant::{code_hint, AuthorizationGrant};
use crate::register::ClientRegistration;
use crate::session::{str_field, HttpSession};

/// Bearer credential returned by the token endpoint. No expiry is tracked;
/// the server revoking it is the only way it goes stale.
#[derive(Clone)]
pub struct TokenBundle {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
    /// Epoch seconds, as reported by the server or stamped locally.
    pub created_at: u64,
    /// Raw token response.
    pub token_data: serde_json::Value,
}

impl fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &code_hint(&self.access_token))
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Exchange `grant` for an access token.
///
/// The grant is consumed: codes are single-use on the server side too.
pub async fn exchange_grant(
    http: &HttpSession,
    app: &ClientRegistration,
    grant: AuthorizationGrant,
) -> Result<TokenBundle, FlowError> {
    let scope = app.scopes.to_string();
    let mut form = vec![
        ("client_id", app.client_id.as_str()),
        ("client_secret", app.client_secret.as_str()),
        ("redirect_uri", app.redirect_uri.as_str()),
        ("grant_type", grant.grant_type()),
        ("scope", scope.as_str()),
    ];
    form.extend(grant.form_fields());

    let req = http.client().post(http.url("/oauth/token")).form(&form);
    let page = http.send(req, FlowError::TokenExchange).await?;
    let map = page.json_object("token request", FlowError::TokenExchange)?;

    let Some(access_token) = str_field(&map, "access_token").map(str::to_owned) else {
        return Err(FlowError::TokenExchange(page.failure("response missing access_token")));
    };
    let token_type = str_field(&map, "token_type").unwrap_or("Bearer").to_owned();
    let granted_scope = str_field(&map, "scope").unwrap_or(scope.as_str()).to_owned();
    let created_at = map.get("created_at").and_then(|v| v.as_u64()).unwrap_or_else(epoch_secs);

    info!(grant_type = grant.grant_type(), scope = %granted_scope, "access token obtained");
    Ok(TokenBundle {
        access_token,
        token_type,
        scope: granted_scope,
        created_at,
        token_data: serde_json::Value::Object(map),
    })
}

pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
