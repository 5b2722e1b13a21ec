// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token acquisition: register, authorize, exchange, verify, persist.
//!
//! Every stage runs once, in order, on the caller's [`HttpSession`]. The first
//! failure ends the flow; nothing is retried and no partial record is saved.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::FlowError;
use crate::grant::GrantProducer;
use crate::persist::{self, CredentialRecord};
use crate::register::{register_app, Scopes};
use crate::session::HttpSession;
use crate::token::exchange_grant;
use crate::verify::verify_token;

/// What to register and where to save the result.
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub app_name: String,
    pub scopes: Scopes,
    pub website: Option<String>,
    /// Destination for the credential record. `None` keeps it in memory only.
    pub output: Option<PathBuf>,
}

impl AcquireRequest {
    pub fn new(app_name: impl Into<String>, scopes: Scopes) -> Self {
        Self { app_name: app_name.into(), scopes, website: None, output: None }
    }
}

/// Run the full flow against the instance `http` is bound to.
///
/// On [`FlowError::Persistence`] the verified record is carried inside the
/// error; every other failure means no token was verified.
pub async fn acquire(
    http: &HttpSession,
    request: &AcquireRequest,
    producer: &dyn GrantProducer,
) -> Result<CredentialRecord, FlowError> {
    let app =
        register_app(http, &request.app_name, &request.scopes, request.website.as_deref()).await?;

    info!(strategy = producer.name(), "requesting authorization grant");
    let grant = producer.produce(http, &app).await?;

    let token = exchange_grant(http, &app, grant).await?;
    let account = verify_token(http, &token).await?;
    let record = CredentialRecord::new(http.base_url(), &request.app_name, app, token, account);

    if let Some(ref path) = request.output {
        if let Err(source) = persist::save(path, &record) {
            warn!(path = %path.display(), err = %source, "failed to save credentials");
            return Err(FlowError::Persistence {
                path: path.clone(),
                record: Box::new(record),
                source,
            });
        }
        info!(path = %path.display(), "credentials saved");
    }

    Ok(record)
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
