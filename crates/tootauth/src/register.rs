// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client application registration (`POST /api/v1/apps`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::FlowError;
use crate::session::{str_field, HttpSession, OOB_REDIRECT_URI};

pub const DEFAULT_SCOPES: &str = "read write";

/// Space-delimited set of OAuth scopes, deduplicated in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scopes(Vec<String>);

impl Scopes {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self(DEFAULT_SCOPES.split_whitespace().map(str::to_owned).collect())
    }
}

impl FromStr for Scopes {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scopes: Vec<String> = Vec::new();
        for scope in s.split_whitespace() {
            if !scopes.iter().any(|seen| seen == scope) {
                scopes.push(scope.to_owned());
            }
        }
        if scopes.is_empty() {
            anyhow::bail!("scopes must not be empty");
        }
        Ok(Self(scopes))
    }
}

impl TryFrom<String> for Scopes {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Scopes> for String {
    fn from(scopes: Scopes) -> Self {
        scopes.to_string()
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Credentials issued to this client by the server.
#[derive(Debug, Clone)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Scopes,
    /// Raw registration response.
    pub app_data: serde_json::Value,
}

/// Register a client application on the instance.
///
/// Fails with [`FlowError::Registration`] if the server rejects the request or
/// the response lacks `client_id` or `client_secret`.
pub async fn register_app(
    http: &HttpSession,
    app_name: &str,
    scopes: &Scopes,
    website: Option<&str>,
) -> Result<ClientRegistration, FlowError> {
    info!(instance = http.base_url(), app = app_name, "registering application");

    let scope_str = scopes.to_string();
    let mut form = vec![
        ("client_name", app_name),
        ("redirect_uris", OOB_REDIRECT_URI),
        ("scopes", scope_str.as_str()),
    ];
    if let Some(site) = website {
        form.push(("website", site));
    }

    let req = http.client().post(http.url("/api/v1/apps")).form(&form);
    let page = http.send(req, FlowError::Registration).await?;
    let map = page.json_object("registration", FlowError::Registration)?;

    let client_id = str_field(&map, "client_id").map(str::to_owned);
    let client_secret = str_field(&map, "client_secret").map(str::to_owned);
    let (client_id, client_secret) = match (client_id, client_secret) {
        (Some(id), Some(secret)) => (id, secret),
        (None, _) => {
            return Err(FlowError::Registration(page.failure("response missing client_id")))
        }
        (_, None) => {
            return Err(FlowError::Registration(page.failure("response missing client_secret")))
        }
    };

    info!(client_id = %client_id, "application registered");
    Ok(ClientRegistration {
        client_id,
        client_secret,
        redirect_uri: OOB_REDIRECT_URI.to_owned(),
        scopes: scopes.clone(),
        app_data: serde_json::Value::Object(map),
    })
}

#[cfg(test)]
#[path = "register_tests.rs"]
mod tests;
