// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for unit tests.

use std::time::Duration;

use tootauth_specs::{ensure_crypto, MockBehavior, MockInstance};

use crate::session::HttpSession;

/// Assert that an expression is `Err` and its message contains a substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// Start a mock instance and open a session against it.
pub async fn mock_session(behavior: MockBehavior) -> anyhow::Result<(MockInstance, HttpSession)> {
    ensure_crypto();
    let mock = MockInstance::start(behavior).await?;
    let http = HttpSession::new(mock.url(), Duration::from_secs(5))?;
    Ok((mock, http))
}

/// A fully populated record, as `acquire` would produce it.
pub fn sample_record(instance_url: &str) -> anyhow::Result<crate::persist::CredentialRecord> {
    Ok(serde_json::from_value(serde_json::json!({
        "instance_url": instance_url,
        "app_name": "Weather Bot",
        "client_id": "cid",
        "client_secret": "csecret",
        "access_token": "tok_sample",
        "token_type": "Bearer",
        "scope": "read write",
        "created_at": 1_700_000_000u64,
        "account": {
            "id": "01HMOCKACCOUNT",
            "username": "bot",
            "acct": "bot",
            "display_name": "Mock Bot",
            "bot": true,
        },
        "app_data": { "id": "01HMOCKAPP" },
        "token_data": { "access_token": "tok_sample" },
    }))?)
}
