use tracing::{debug, error, info, warn};

use crate::error::AuthFailure;
use crate::types::SessionState;

/// Something worth knowing about while a request is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A `port` was supplied but could not be used
    PortDropped { raw: String },
    State { host: String, state: SessionState },
    AuthAttemptFailed { host: String, failure: AuthFailure },
    Authenticated { host: String, method: &'static str },
    Uploaded { local: String, remote: String, bytes: u64 },
    TeardownFailed { host: String, reason: String },
    Failed { host: String, message: String },
}

/// Sink for [`TransferEvent`]s, handed to whoever needs to report.
pub trait TransferObserver: Send + Sync {
    fn observe(&self, event: TransferEvent);
}

/// Default sink: every event becomes a `tracing` record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TransferObserver for TracingObserver {
    fn observe(&self, event: TransferEvent) {
        match event {
            TransferEvent::PortDropped { raw } => {
                warn!("Wrong port format {:?}, using default port", raw)
            }
            TransferEvent::State { host, state } => debug!("[{}] session state: {}", host, state),
            TransferEvent::AuthAttemptFailed { host, failure } => {
                warn!("[{}] {}", host, failure)
            }
            TransferEvent::Authenticated { host, method } => {
                info!("[{}] authenticated with {}", host, method)
            }
            TransferEvent::Uploaded {
                local,
                remote,
                bytes,
            } => info!("Uploaded {:?} to {:?} ({} bytes)", local, remote, bytes),
            TransferEvent::TeardownFailed { host, reason } => {
                warn!("[{}] Error when disconnecting from SSH/SFTP: {}", host, reason)
            }
            TransferEvent::Failed { host, message } => error!("[{}] {}", host, message),
        }
    }
}
