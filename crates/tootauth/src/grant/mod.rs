// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authorization grant producers.
//!
//! Each strategy turns a [`ClientRegistration`] into an [`AuthorizationGrant`]
//! that the token endpoint will accept. The caller picks one up front; there
//! is no fallback from one strategy to another.

pub mod interactive;
pub mod password;
pub mod scrape;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::FlowError;
use crate::register::ClientRegistration;
use crate::session::HttpSession;

pub use interactive::{CodePrompt, InteractiveGrant, SuppliedCode, TerminalPrompt};
pub use password::PasswordGrant;
pub use scrape::ScrapedConsent;

/// Something the token endpoint will exchange for an access token.
///
/// Consumed by value on exchange.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthorizationGrant {
    /// Authorization code from the consent step.
    Code(String),
    /// Resource-owner credentials for the password grant type.
    Password { username: String, password: String },
}

impl AuthorizationGrant {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::Code(_) => "authorization_code",
            Self::Password { .. } => "password",
        }
    }

    /// Grant-specific fields of the token request body.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Code(code) => vec![("code", code.as_str())],
            Self::Password { username, password } => {
                vec![("username", username.as_str()), ("password", password.as_str())]
            }
        }
    }
}

impl fmt::Debug for AuthorizationGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => f.debug_tuple("Code").field(&code_hint(code)).finish(),
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// First few characters of a code, for logs.
pub fn code_hint(code: &str) -> String {
    let prefix: String = code.chars().take(6).collect();
    if prefix.len() < code.len() {
        format!("{prefix}...")
    } else {
        prefix
    }
}

/// Boxed future returned by [`GrantProducer::produce`].
pub type GrantFuture<'a> =
    Pin<Box<dyn Future<Output = Result<AuthorizationGrant, FlowError>> + Send + 'a>>;

/// Produces an authorization grant for a registered client.
///
/// Object-safe for use as `Box<dyn GrantProducer>`.
pub trait GrantProducer: Send + Sync {
    fn produce<'a>(&'a self, http: &'a HttpSession, app: &'a ClientRegistration)
        -> GrantFuture<'a>;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Build the `/oauth/authorize` URL for the out-of-band code flow.
pub fn authorize_url(http: &HttpSession, app: &ClientRegistration) -> Result<String, FlowError> {
    let scope = app.scopes.to_string();
    let url = reqwest::Url::parse_with_params(
        &http.url("/oauth/authorize"),
        &[
            ("client_id", app.client_id.as_str()),
            ("redirect_uri", app.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
        ],
    )
    .map_err(|e| FlowError::grant(format!("invalid authorization URL: {e}")))?;
    Ok(url.into())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
