// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Credential directory shared by the central and edge services.
//!
//! Plain username/password pairs. The central copy is authoritative and
//! is pushed to edges as a full snapshot; edges answer logins offline from
//! their own copy.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// One row of the `/auth/sync` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
struct Account {
    password: String,
    token: Option<String>,
}

#[derive(Debug, Default)]
pub struct CredentialStore {
    accounts: RwLock<BTreeMap<String, Account>>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<'a>(users: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        store.apply(users.into_iter().map(|(username, password)| UserRecord {
            username: username.to_string(),
            password: password.to_string(),
        }));
        store
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<(), AuthError> {
        match self.accounts.read().get(username) {
            Some(account) if account.password == password => Ok(()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    /// Verify and hand out a fresh session token, remembered for the user.
    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(username)
            .filter(|account| account.password == password)
            .ok_or(AuthError::InvalidCredentials)?;
        let token = uuid::Uuid::new_v4().to_string();
        account.token = Some(token.clone());
        debug!(user = %username, "Issued session token");
        Ok(token)
    }

    /// Last token issued to `username`, if any.
    #[must_use]
    pub fn token(&self, username: &str) -> Option<String> {
        self.accounts.read().get(username).and_then(|a| a.token.clone())
    }

    /// Full listing, ordered by username.
    #[must_use]
    pub fn snapshot(&self) -> Vec<UserRecord> {
        self.accounts
            .read()
            .iter()
            .map(|(username, account)| UserRecord {
                username: username.clone(),
                password: account.password.clone(),
            })
            .collect()
    }

    /// Upsert every record. Existing tokens survive unless the password changed.
    pub fn apply(&self, users: impl IntoIterator<Item = UserRecord>) -> usize {
        let mut accounts = self.accounts.write();
        let mut applied = 0;
        for user in users {
            let account = accounts.entry(user.username).or_default();
            if account.password != user.password {
                account.password = user.password;
                account.token = None;
            }
            applied += 1;
        }
        info!(applied, total = accounts.len(), "Applied user update");
        applied
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}
