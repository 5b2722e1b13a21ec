// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::persist::CredentialRecord;

/// Upper bound on how much of an upstream response body is echoed into errors.
const MAX_BODY_BYTES: usize = 512;

/// Coarse classification of a flow failure, one per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Registration,
    Grant,
    TokenExchange,
    Verification,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "REGISTRATION",
            Self::Grant => "GRANT",
            Self::TokenExchange => "TOKEN_EXCHANGE",
            Self::Verification => "VERIFICATION",
            Self::Persistence => "PERSISTENCE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic context for a failed network stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub message: String,
    /// Upstream HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Upstream response body (truncated), if one was received.
    pub body: Option<String>,
}

impl StageFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status: None, body: None }
    }

    pub fn with_response(mut self, status: u16, body: &str) -> Self {
        self.status = Some(status);
        self.body = if body.trim().is_empty() { None } else { Some(truncate_body(body)) };
        self
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(status) = self.status {
            write!(f, " ({status})")?;
        }
        if let Some(ref body) = self.body {
            write!(f, ": {body}")?;
        }
        Ok(())
    }
}

/// Terminal failure of a token acquisition flow.
///
/// No variant is retried. A [`FlowError::Persistence`] still hands back the
/// verified record so the token is not lost.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("application registration failed: {0}")]
    Registration(StageFailure),

    #[error("authorization grant failed: {0}")]
    Grant(StageFailure),

    #[error("token exchange failed: {0}")]
    TokenExchange(StageFailure),

    #[error("token verification failed: {0}")]
    Verification(StageFailure),

    #[error("failed to save credentials to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        record: Box<CredentialRecord>,
        #[source]
        source: std::io::Error,
    },
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Registration(_) => ErrorKind::Registration,
            Self::Grant(_) => ErrorKind::Grant,
            Self::TokenExchange(_) => ErrorKind::TokenExchange,
            Self::Verification(_) => ErrorKind::Verification,
            Self::Persistence { .. } => ErrorKind::Persistence,
        }
    }

    /// Upstream HTTP status attached to this failure, if any.
    pub fn status(&self) -> Option<u16> {
        self.stage_failure().and_then(|f| f.status)
    }

    pub fn stage_failure(&self) -> Option<&StageFailure> {
        match self {
            Self::Registration(f)
            | Self::Grant(f)
            | Self::TokenExchange(f)
            | Self::Verification(f) => Some(f),
            Self::Persistence { .. } => None,
        }
    }

    pub(crate) fn grant(message: impl Into<String>) -> Self {
        Self::Grant(StageFailure::new(message))
    }
}

/// Truncate a response body on a char boundary.
pub fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_BODY_BYTES {
        return body.to_owned();
    }
    let mut end = MAX_BODY_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
