// Module declarations
mod bus;
mod client;
mod config;
mod error;
mod handler;
mod known_hosts;
mod observer;
mod operations;
mod orchestrator;
mod session;
mod transport;
mod types;
mod utils;
mod validate;

// Public API exports
pub use bus::{MAX_LINE_LENGTH, serve};
pub use client::RusshSftp;
pub use config::{AdapterConfig, CONFIG_ENV};
pub use error::{AuthFailure, ConfigError, TransferError, ValidationError};
pub use handler::{Action, INVALID_ACTION, INVALID_ADDRESS, MessageHandler};
pub use known_hosts::{HostKeyVerification, KnownHosts};
pub use observer::{TracingObserver, TransferEvent, TransferObserver};
pub use orchestrator::TransferOrchestrator;
pub use session::{HandshakeError, HostKeyHandler, RusshSession, RusshTransport};
pub use transport::{SftpChannel, SshSession, Transport};
pub use types::{AuthStrategy, SessionOutcome, SessionState, TransferRequest, ValidRequest};
pub use utils::{mask_secret, parse_port};
pub use validate::validate;
