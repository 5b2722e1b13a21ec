// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth token acquisition and a small API client for Mastodon-compatible
//! servers.

pub mod api;
pub mod command;
pub mod config;
pub mod error;
pub mod flow;
pub mod grant;
pub mod persist;
pub mod register;
pub mod session;
pub mod token;
pub mod verify;

#[cfg(test)]
pub mod test_support;
