// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automated strategy: drive the server's own login and consent pages.
//!
//! Best effort only. The HTML shape of those pages belongs to the server and
//! changes between releases; the patterns below cover GoToSocial and Mastodon
//! as they render today and nothing more.

use regex::Regex;
use tracing::debug;

use crate::error::FlowError;
use crate::grant::{authorize_url, code_hint, AuthorizationGrant, GrantFuture, GrantProducer};
use crate::register::ClientRegistration;
use crate::session::{HttpSession, Page};

/// Hidden input names that carry an anti-forgery token, in lookup order.
const CSRF_FIELDS: &[&str] = &["authenticity_token", "csrf_token", "_token", "gorilla.csrf.Token"];

/// Field name used when the token only appears in a `<meta name="csrf-token">`.
const META_CSRF_FIELD: &str = "authenticity_token";

/// Anti-forgery token lifted from a form page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    /// Form field the token is submitted under.
    pub field: &'static str,
    pub value: String,
}

/// Compiled patterns for picking apart login and consent pages.
pub struct FormScraper {
    inputs: Vec<(&'static str, Regex, Regex)>,
    meta: [Regex; 2],
    code: Regex,
    password_input: Regex,
}

impl FormScraper {
    pub fn new() -> Result<Self, regex::Error> {
        let inputs = CSRF_FIELDS
            .iter()
            .map(|&field| {
                let name = regex::escape(field);
                let name_first =
                    Regex::new(&format!(r#"name=["']{name}["'][^>]*?value=["']([^"']*)["']"#))?;
                let value_first =
                    Regex::new(&format!(r#"value=["']([^"']*)["'][^>]*?name=["']{name}["']"#))?;
                Ok((field, name_first, value_first))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            inputs,
            meta: [
                Regex::new(r#"<meta[^>]*?name=["']csrf-token["'][^>]*?content=["']([^"']*)["']"#)?,
                Regex::new(r#"<meta[^>]*?content=["']([^"']*)["'][^>]*?name=["']csrf-token["']"#)?,
            ],
            code: Regex::new(r#"(?:^|[^A-Za-z0-9_])code=([^&\s"'<>]+)"#)?,
            password_input: Regex::new(r#"(?i)type=["']password["']"#)?,
        })
    }

    /// Find an anti-forgery token in `html`.
    ///
    /// Hidden inputs win over the meta tag. Returns `None` when nothing
    /// matches; the form is then submitted without a token.
    pub fn extract_csrf_token(&self, html: &str) -> Option<CsrfToken> {
        for (field, name_first, value_first) in &self.inputs {
            let found = name_first.captures(html).or_else(|| value_first.captures(html));
            if let Some(value) = found.and_then(|c| c.get(1)) {
                return Some(CsrfToken { field: *field, value: value.as_str().to_owned() });
            }
        }
        self.meta
            .iter()
            .find_map(|re| re.captures(html))
            .and_then(|c| c.get(1))
            .map(|value| CsrfToken { field: META_CSRF_FIELD, value: value.as_str().to_owned() })
    }

    /// Find a `code=<value>` occurrence in free text.
    pub fn extract_code(&self, text: &str) -> Option<String> {
        self.code.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_owned())
    }

    /// Read the `code` query parameter from a redirect target.
    ///
    /// `location` may be absolute (including the `urn:` out-of-band sentinel)
    /// or relative to `base_url`.
    pub fn code_from_location(&self, base_url: &str, location: &str) -> Option<String> {
        let parsed = reqwest::Url::parse(location).or_else(|_| {
            reqwest::Url::parse(base_url).and_then(|base| base.join(location))
        });
        if let Ok(url) = parsed {
            let code = url
                .query_pairs()
                .find(|(k, v)| k == "code" && !v.is_empty())
                .map(|(_, v)| v.into_owned());
            if code.is_some() {
                return code;
            }
        }
        self.extract_code(location)
    }

    /// Whether a page body is a sign-in form.
    pub fn looks_like_login(&self, body: &str) -> bool {
        body.to_lowercase().contains("sign in") || self.password_input.is_match(body)
    }

    /// Whether a response means the session has to sign in first.
    pub fn needs_login(&self, page: &Page) -> bool {
        if page.is_redirect() {
            return page
                .location
                .as_deref()
                .is_some_and(|loc| loc.contains("sign_in") || loc.contains("login"));
        }
        page.is_success() && self.looks_like_login(&page.body)
    }

    /// Whether a page body offers an authorize/allow form.
    pub fn looks_like_consent(&self, body: &str) -> bool {
        let lower = body.to_lowercase();
        lower.contains("authorize") || lower.contains("allow")
    }
}

/// Scripted login + consent strategy.
pub struct ScrapedConsent {
    username: String,
    password: String,
    scraper: FormScraper,
}

impl ScrapedConsent {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            username: username.into(),
            password: password.into(),
            scraper: FormScraper::new()?,
        })
    }

    async fn sign_in(&self, http: &HttpSession) -> Result<(), FlowError> {
        let login_url = http.url("/auth/sign_in");
        let page = http.send(http.client().get(&login_url), FlowError::Grant).await?;
        if !page.is_success() {
            return Err(FlowError::Grant(page.failure("login page unavailable")));
        }

        let csrf = self.scraper.extract_csrf_token(&page.body);
        debug!(csrf = csrf.is_some(), "submitting login form");
        let mut form =
            vec![("username", self.username.as_str()), ("password", self.password.as_str())];
        if let Some(ref token) = csrf {
            form.push((token.field, token.value.as_str()));
        }

        let resp = http.send(http.client().post(&login_url).form(&form), FlowError::Grant).await?;
        let rejected = resp.status.is_client_error()
            || resp.status.is_server_error()
            || self.scraper.needs_login(&resp);
        if rejected {
            return Err(FlowError::Grant(resp.failure("login rejected")));
        }
        Ok(())
    }

    async fn submit_consent(
        &self,
        http: &HttpSession,
        app: &ClientRegistration,
        consent_page: &Page,
    ) -> Result<AuthorizationGrant, FlowError> {
        let csrf = self.scraper.extract_csrf_token(&consent_page.body);
        debug!(csrf = csrf.is_some(), "submitting consent form");

        let scope = app.scopes.to_string();
        let mut form = vec![
            ("client_id", app.client_id.as_str()),
            ("redirect_uri", app.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
        ];
        if let Some(ref token) = csrf {
            form.push((token.field, token.value.as_str()));
        }

        let req = http.client().post(http.url("/oauth/authorize")).form(&form);
        let resp = http.send(req, FlowError::Grant).await?;

        if resp.is_redirect() {
            if let Some(code) = resp
                .location
                .as_deref()
                .and_then(|loc| self.scraper.code_from_location(http.base_url(), loc))
            {
                return Ok(AuthorizationGrant::Code(code));
            }
        }
        if resp.is_success() {
            if let Some(code) = self.scraper.extract_code(&resp.body) {
                return Ok(AuthorizationGrant::Code(code));
            }
        }
        Err(FlowError::Grant(resp.failure("no authorization code in consent response")))
    }
}

impl GrantProducer for ScrapedConsent {
    fn produce<'a>(
        &'a self,
        http: &'a HttpSession,
        app: &'a ClientRegistration,
    ) -> GrantFuture<'a> {
        Box::pin(async move {
            let url = authorize_url(http, app)?;
            let mut page = http.send(http.client().get(&url), FlowError::Grant).await?;

            if self.scraper.needs_login(&page) {
                debug!("session not signed in");
                self.sign_in(http).await?;
                page = http.send(http.client().get(&url), FlowError::Grant).await?;
                if self.scraper.needs_login(&page) {
                    return Err(FlowError::Grant(page.failure("login rejected: still signed out")));
                }
            }
            let approved = page
                .location
                .as_deref()
                .filter(|_| page.is_redirect())
                .and_then(|loc| self.scraper.code_from_location(http.base_url(), loc));
            if approved.is_none() && !page.is_success() {
                return Err(FlowError::Grant(page.failure("authorization page unavailable")));
            }

            let grant = match approved.or_else(|| self.scraper.extract_code(&page.body)) {
                Some(code) => {
                    debug!("authorization page already carries a code");
                    AuthorizationGrant::Code(code)
                }
                None if self.scraper.looks_like_consent(&page.body) => {
                    self.submit_consent(http, app, &page).await?
                }
                None => return Err(FlowError::Grant(page.failure("consent form not found"))),
            };

            if let AuthorizationGrant::Code(ref code) = grant {
                debug!(code = %code_hint(code), "scraped authorization code");
            }
            Ok(grant)
        })
    }

    fn name(&self) -> &'static str {
        "scrape"
    }
}

#[cfg(test)]
#[path = "scrape_tests.rs"]
mod tests;
