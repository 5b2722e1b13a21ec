// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::api::Visibility;
use crate::register::{Scopes, DEFAULT_SCOPES};

/// How the authorization grant is obtained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GrantMethod {
    /// Print the consent URL and read the code from the terminal.
    #[default]
    Interactive,
    /// Resource-owner password grant.
    Password,
    /// Sign in and approve the consent form automatically.
    Scrape,
}

impl std::fmt::Display for GrantMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interactive => f.write_str("interactive"),
            Self::Password => f.write_str("password"),
            Self::Scrape => f.write_str("scrape"),
        }
    }
}

/// OAuth token acquisition and posting for Mastodon-compatible servers.
#[derive(Debug, Parser)]
#[command(name = "tootauth", version, about)]
pub struct Config {
    /// Log filter directive (trace, debug, info, warn, error, or an EnvFilter).
    #[arg(long, global = true, env = "TOOTAUTH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, global = true, env = "TOOTAUTH_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "TOOTAUTH_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register an app, obtain and verify a token, and save the credentials
    Acquire(AcquireArgs),
    /// Show the account a credential file belongs to
    Whoami(CredentialsArgs),
    /// Publish a status
    Post(PostArgs),
    /// Print a page of a timeline
    Timeline(TimelineArgs),
}

#[derive(Debug, Args)]
pub struct AcquireArgs {
    /// Instance base URL (e.g. https://social.example.com).
    #[arg(long, env = "TOOTAUTH_INSTANCE")]
    pub instance: String,

    /// Client application name shown to the user.
    #[arg(long, env = "TOOTAUTH_APP_NAME")]
    pub app_name: String,

    /// Space-delimited OAuth scopes.
    #[arg(long, env = "TOOTAUTH_SCOPES", default_value = DEFAULT_SCOPES)]
    pub scopes: String,

    /// Website advertised for the application.
    #[arg(long)]
    pub website: Option<String>,

    /// Credential file to write. Defaults to credentials_<instance>_<app>.json.
    #[arg(long, env = "TOOTAUTH_OUTPUT")]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = GrantMethod::Interactive)]
    pub method: GrantMethod,

    /// Account login (password and scrape methods).
    #[arg(long, env = "TOOTAUTH_USERNAME")]
    pub username: Option<String>,

    /// Account password (password and scrape methods).
    #[arg(long, env = "TOOTAUTH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Authorization code, skipping the terminal prompt (interactive method).
    #[arg(long)]
    pub code: Option<String>,
}

#[derive(Debug, Args)]
pub struct CredentialsArgs {
    /// Credential file written by `acquire`.
    #[arg(long, env = "TOOTAUTH_CREDENTIALS")]
    pub credentials: PathBuf,
}

#[derive(Debug, Args)]
pub struct PostArgs {
    #[command(flatten)]
    pub creds: CredentialsArgs,

    #[arg(long, value_enum, default_value = "public")]
    pub visibility: Visibility,

    /// Content warning.
    #[arg(long)]
    pub spoiler: Option<String>,

    #[arg(long)]
    pub sensitive: bool,

    /// Status ID to reply to.
    #[arg(long)]
    pub reply_to: Option<String>,

    /// Media file to attach.
    #[arg(long)]
    pub media: Option<PathBuf>,

    /// Alt text for the attached media.
    #[arg(long, requires = "media")]
    pub media_description: Option<String>,

    /// Status text.
    pub text: String,
}

#[derive(Debug, Args)]
pub struct TimelineArgs {
    #[command(flatten)]
    pub creds: CredentialsArgs,

    /// home, public, local, or tag/<hashtag>.
    #[arg(long, default_value = "home")]
    pub kind: String,

    #[arg(long, default_value = "20")]
    pub limit: u32,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other} (expected json or text)"),
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }

        match self.command {
            Command::Acquire(ref args) => args.validate(),
            Command::Post(ref args) => {
                if args.text.trim().is_empty() {
                    anyhow::bail!("status text must not be empty");
                }
                Ok(())
            }
            Command::Whoami(_) | Command::Timeline(_) => Ok(()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AcquireArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        let instance = self.instance.trim();
        if !instance.starts_with("http://") && !instance.starts_with("https://") {
            anyhow::bail!("--instance must start with http:// or https://");
        }
        if self.app_name.trim().is_empty() {
            anyhow::bail!("--app-name must not be empty");
        }
        self.scopes()?;

        match self.method {
            GrantMethod::Password | GrantMethod::Scrape => {
                if is_blank(&self.username) || is_blank(&self.password) {
                    anyhow::bail!("--method {} requires --username and --password", self.method);
                }
                if self.code.is_some() {
                    anyhow::bail!("--code is only valid with --method interactive");
                }
            }
            GrantMethod::Interactive => {}
        }
        Ok(())
    }

    pub fn scopes(&self) -> anyhow::Result<Scopes> {
        self.scopes.parse()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().unwrap_or_default().trim().is_empty()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
