// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource-owner password grant: skips the authorize and consent pages.
//!
//! Only works on servers that still enable `grant_type=password`.

use crate::grant::{AuthorizationGrant, GrantFuture, GrantProducer};
use crate::register::ClientRegistration;
use crate::session::HttpSession;

pub struct PasswordGrant {
    username: String,
    password: String,
}

impl PasswordGrant {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl GrantProducer for PasswordGrant {
    fn produce<'a>(
        &'a self,
        _http: &'a HttpSession,
        _app: &'a ClientRegistration,
    ) -> GrantFuture<'a> {
        let grant = AuthorizationGrant::Password {
            username: self.username.clone(),
            password: self.password.clone(),
        };
        Box::pin(async move { Ok(grant) })
    }

    fn name(&self) -> &'static str {
        "password"
    }
}
