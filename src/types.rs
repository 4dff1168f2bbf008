use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

use crate::utils::mask_secret;

/// Upload request as it arrives on the bus, before validation.
///
/// Every field is optional at this stage so that a missing field can be
/// reported by name instead of failing deserialization.
#[derive(Clone, Default, Deserialize)]
pub struct TransferRequest {
    #[serde(rename = "known-hosts", default)]
    pub known_hosts: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    /// Kept raw: an unusable port is dropped with a warning, never rejected.
    #[serde(default)]
    pub port: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "sshkey", default)]
    pub ssh_key: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(rename = "local-file", default)]
    pub local_file: Option<String>,
    #[serde(rename = "dist-file", default)]
    pub dist_file: Option<String>,
}

impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("known_hosts", &self.known_hosts)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &mask_secret(self.password.as_deref()))
            .field("ssh_key", &self.ssh_key)
            .field("passphrase", &mask_secret(self.passphrase.as_deref()))
            .field("local_file", &self.local_file)
            .field("dist_file", &self.dist_file)
            .finish()
    }
}

/// One way of proving identity to the server, tried in list order
#[derive(Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    PublicKey {
        key_path: PathBuf,
        passphrase: Option<String>,
    },
    Password {
        password: String,
    },
}

impl AuthStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            AuthStrategy::PublicKey { .. } => "publickey",
            AuthStrategy::Password { .. } => "password",
        }
    }
}

impl fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStrategy::PublicKey {
                key_path,
                passphrase,
            } => f
                .debug_struct("PublicKey")
                .field("key_path", key_path)
                .field("passphrase", &mask_secret(passphrase.as_deref()))
                .finish(),
            AuthStrategy::Password { password } => f
                .debug_struct("Password")
                .field("password", &mask_secret(Some(password)))
                .finish(),
        }
    }
}

/// A request that passed validation. Immutable for the whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRequest {
    pub known_hosts: PathBuf,
    pub hostname: String,
    /// `None` means the transport's default port
    pub port: Option<u16>,
    pub username: String,
    /// Ordered by priority: public key first, then password
    pub auth: Vec<AuthStrategy>,
    pub local_file: PathBuf,
    pub dist_file: String,
}

/// Result of handling one message, serialized as the bus reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum SessionOutcome {
    #[serde(rename = "ok")]
    Success,
    #[serde(rename = "error")]
    Failure { message: String },
}

impl SessionOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        SessionOutcome::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Success)
    }
}

/// Per-request session progression, reported to the observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    KnownHostsLoaded,
    Connected,
    Authenticated,
    Transferred,
    Failed,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::KnownHostsLoaded => "known-hosts-loaded",
            SessionState::Connected => "connected",
            SessionState::Authenticated => "authenticated",
            SessionState::Transferred => "transferred",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
