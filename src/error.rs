use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A request that cannot be attempted at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("params is required")]
    MissingParams,

    #[error("{0} absent")]
    MissingField(&'static str),

    #[error("password and sshkey absent")]
    MissingCredentials,

    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Why a single authentication strategy did not get us in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// Key material could not be read or decrypted
    KeyLoad(String),
    /// The auth exchange itself errored
    Error { method: &'static str, reason: String },
    /// The server answered, and the answer was no
    Rejected { method: &'static str },
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::KeyLoad(reason) => write!(f, "failed to load ssh key: {}", reason),
            AuthFailure::Error { method, reason } => {
                write!(f, "{} authentication error: {}", method, reason)
            }
            AuthFailure::Rejected { method } => {
                write!(f, "{} authentication rejected by server", method)
            }
        }
    }
}

/// Classified failure of one orchestrated session.
///
/// The `Display` output is exactly what goes back to the caller.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Error when connecting to sftp server {0}")]
    TrustStore(String),

    #[error("Error when connecting to sftp server {0}")]
    Connect(String),

    #[error("Could not connect to SFTP")]
    Auth { attempts: Vec<AuthFailure> },

    #[error("Error when connecting to sftp server {0}")]
    Transfer(String),
}

/// Startup configuration problems
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
