// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-in-the-loop strategy: show the authorize URL, wait for the code.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::error::FlowError;
use crate::grant::{authorize_url, code_hint, AuthorizationGrant, GrantFuture, GrantProducer};
use crate::register::ClientRegistration;
use crate::session::HttpSession;

/// Boxed future returned by [`CodePrompt::prompt`].
pub type PromptFuture<'a> = Pin<Box<dyn Future<Output = io::Result<String>> + Send + 'a>>;

/// Source of the authorization code a human copies out of the browser.
pub trait CodePrompt: Send + Sync {
    fn prompt<'a>(&'a self, authorize_url: &'a str) -> PromptFuture<'a>;
}

/// Prints the URL to stderr and reads one line from stdin.
///
/// Blocks until a line arrives or stdin closes; there is no timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl CodePrompt for TerminalPrompt {
    fn prompt<'a>(&'a self, authorize_url: &'a str) -> PromptFuture<'a> {
        Box::pin(async move {
            let mut stderr = tokio::io::stderr();
            let banner = format!(
                "\nVisit this URL to authorize the application:\n\n  {authorize_url}\n\n\
                 Paste the authorization code: "
            );
            stderr.write_all(banner.as_bytes()).await?;
            stderr.flush().await?;

            let mut line = String::new();
            let n = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
            }
            Ok(line)
        })
    }
}

/// A code the human already obtained (e.g. passed via `--code`).
#[derive(Clone)]
pub struct SuppliedCode(pub String);

impl CodePrompt for SuppliedCode {
    fn prompt<'a>(&'a self, authorize_url: &'a str) -> PromptFuture<'a> {
        Box::pin(async move {
            info!(url = authorize_url, "using supplied authorization code");
            Ok(self.0.clone())
        })
    }
}

/// Interactive authorization-code strategy.
pub struct InteractiveGrant<P> {
    prompt: P,
}

impl<P: CodePrompt> InteractiveGrant<P> {
    pub fn new(prompt: P) -> Self {
        Self { prompt }
    }
}

impl<P: CodePrompt> GrantProducer for InteractiveGrant<P> {
    fn produce<'a>(
        &'a self,
        http: &'a HttpSession,
        app: &'a ClientRegistration,
    ) -> GrantFuture<'a> {
        Box::pin(async move {
            let url = authorize_url(http, app)?;
            let input = self
                .prompt
                .prompt(&url)
                .await
                .map_err(|e| FlowError::grant(format!("failed to read authorization code: {e}")))?;

            let code = input.trim();
            if code.is_empty() {
                return Err(FlowError::grant("no authorization code provided"));
            }
            info!(code = %code_hint(code), "authorization code received");
            Ok(AuthorizationGrant::Code(code.to_owned()))
        })
    }

    fn name(&self) -> &'static str {
        "interactive"
    }
}

#[cfg(test)]
#[path = "interactive_tests.rs"]
mod tests;
