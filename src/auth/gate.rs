//! Load gate
//!
//! Loads may start when the auth subsystem has confirmed the user, or when a
//! credential from an earlier session is on hand and confirmation is still
//! pending. This is a startup-race accommodation, not an access check: the
//! remote API remains the authority.

use serde::{Deserialize, Serialize};

/// Auth state as reported by the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// Validity of any stored credential is still being checked
    #[default]
    Checking,
    Authenticated,
    LoggedOut,
}

impl AuthStatus {
    pub fn is_ready(self) -> bool {
        self == AuthStatus::Authenticated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthGate {
    pub external_auth_ready: bool,
    pub has_stored_credential: bool,
}

impl AuthGate {
    pub fn new(external_auth_ready: bool, has_stored_credential: bool) -> Self {
        Self {
            external_auth_ready,
            has_stored_credential,
        }
    }

    /// Either signal is enough.
    pub fn allows(&self) -> bool {
        self.external_auth_ready || self.has_stored_credential
    }
}
