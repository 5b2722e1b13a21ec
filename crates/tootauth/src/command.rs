// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand dispatch for the `tootauth` binary.
//!
//! Command results go to stdout; diagnostics go through tracing to stderr.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::api::{ApiClient, NewStatus};
use crate::config::{AcquireArgs, Command, Config, GrantMethod, PostArgs, TimelineArgs};
use crate::error::FlowError;
use crate::flow::{self, AcquireRequest};
use crate::grant::{
    GrantProducer, InteractiveGrant, PasswordGrant, ScrapedConsent, SuppliedCode, TerminalPrompt,
};
use crate::persist::{self, CredentialRecord};
use crate::session::HttpSession;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let timeout = config.timeout();
    match config.command {
        Command::Acquire(args) => acquire(args, timeout).await,
        Command::Whoami(args) => {
            let api = ApiClient::from_credentials_file(&args.credentials, timeout)?;
            let account = api.verify_credentials().await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
            Ok(())
        }
        Command::Post(args) => post(args, timeout).await,
        Command::Timeline(args) => timeline(args, timeout).await,
    }
}

/// Build the grant strategy selected on the command line.
pub fn build_producer(args: &AcquireArgs) -> anyhow::Result<Box<dyn GrantProducer>> {
    let username = args.username.clone().unwrap_or_default();
    let password = args.password.clone().unwrap_or_default();
    let producer: Box<dyn GrantProducer> = match (args.method, args.code.clone()) {
        (GrantMethod::Interactive, Some(code)) => {
            Box::new(InteractiveGrant::new(SuppliedCode(code)))
        }
        (GrantMethod::Interactive, None) => Box::new(InteractiveGrant::new(TerminalPrompt)),
        (GrantMethod::Password, _) => Box::new(PasswordGrant::new(username, password)),
        (GrantMethod::Scrape, _) => Box::new(ScrapedConsent::new(username, password)?),
    };
    Ok(producer)
}

async fn acquire(args: AcquireArgs, timeout: Duration) -> anyhow::Result<()> {
    let http = HttpSession::new(&args.instance, timeout)?;
    let producer = build_producer(&args)?;

    let output = match args.output {
        Some(ref path) => path.clone(),
        None => PathBuf::from(persist::default_file_name(&args.instance, &args.app_name)),
    };
    let mut request = AcquireRequest::new(args.app_name.trim(), args.scopes()?);
    request.website = args.website.clone();
    request.output = Some(output.clone());

    match flow::acquire(&http, &request, producer.as_ref()).await {
        Ok(record) => {
            print_summary(&record, &output);
            Ok(())
        }
        Err(FlowError::Persistence { path, record, source }) => {
            // Verified token: print it so it is not lost.
            println!("{}", serde_json::to_string_pretty(&record)?);
            Err(anyhow::anyhow!("failed to save credentials to {}: {source}", path.display()))
        }
        Err(e) => Err(anyhow::anyhow!("{} ({})", e, e.kind())),
    }
}

fn print_summary(record: &CredentialRecord, path: &std::path::Path) {
    println!(
        "authorized @{} on {} (scopes: {})",
        record.account.acct(),
        record.instance_url,
        record.scope
    );
    println!("credentials saved to {}", path.display());
}

async fn post(args: PostArgs, timeout: Duration) -> anyhow::Result<()> {
    let api = ApiClient::from_credentials_file(&args.creds.credentials, timeout)?;

    let mut status = NewStatus::new(args.text);
    status.visibility = args.visibility;
    status.sensitive = args.sensitive;
    status.spoiler_text = args.spoiler;
    status.in_reply_to_id = args.reply_to;

    if let Some(ref media) = args.media {
        let uploaded = api.upload_media(media, args.media_description.as_deref()).await?;
        let id = uploaded
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("media upload response missing id"))?;
        status.media_ids.push(id.to_owned());
    }

    let created = api.post_status(&status).await?;
    let field = |key: &str| created.get(key).and_then(Value::as_str).unwrap_or_default().to_owned();
    let url = field("url");
    if url.is_empty() {
        println!("{}", field("id"));
    } else {
        println!("{url}");
    }
    Ok(())
}

async fn timeline(args: TimelineArgs, timeout: Duration) -> anyhow::Result<()> {
    let api = ApiClient::from_credentials_file(&args.creds.credentials, timeout)?;
    for status in api.timeline(&args.kind, args.limit).await? {
        let id = status.get("id").and_then(Value::as_str).unwrap_or_default();
        let acct = status
            .pointer("/account/acct")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let content = status.get("content").and_then(Value::as_str).unwrap_or_default();
        println!("{id}\t@{acct}\t{content}");
    }
    Ok(())
}
