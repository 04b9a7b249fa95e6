//! Credential storage and management
//!
//! In-memory credential table loaded from configuration.

use std::collections::HashMap;

use crate::auth::validator::Authorization;

/// Fixed username/password table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    enabled: bool,
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new(enabled: bool, users: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            enabled,
            users: users.into_iter().collect(),
        }
    }

    /// Policy that lets every session in without USER/PASS.
    pub fn disabled() -> Self {
        Self::default()
    }
}

impl Authorization for StaticCredentials {
    fn use_authorization(&self) -> bool {
        self.enabled
    }

    fn user_exists(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|stored| stored == password)
    }
}
