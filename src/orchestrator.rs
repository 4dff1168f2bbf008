use std::sync::Arc;

use tracing::debug;

use crate::error::{AuthFailure, TransferError};
use crate::observer::{TransferEvent, TransferObserver};
use crate::transport::{SftpChannel, SshSession, Transport};
use crate::types::{AuthStrategy, SessionOutcome, SessionState, ValidRequest};

type SftpOf<T> = <<T as Transport>::Session as SshSession>::Sftp;

/// Runs one upload end to end over a [`Transport`]
///
/// known hosts → connect → authenticate → upload, with teardown of whatever
/// was opened on every exit path.
pub struct TransferOrchestrator<T: Transport> {
    transport: Arc<T>,
    observer: Arc<dyn TransferObserver>,
}

impl<T: Transport> TransferOrchestrator<T> {
    pub fn new(transport: Arc<T>, observer: Arc<dyn TransferObserver>) -> Self {
        Self {
            transport,
            observer,
        }
    }

    /// Executes the transfer and folds every failure into the outcome.
    /// Never panics on a per-request failure.
    pub async fn execute(&self, request: &ValidRequest) -> SessionOutcome {
        let outcome = match self.run(request).await {
            Ok(()) => SessionOutcome::Success,
            Err(err) => {
                let message = err.to_string();
                self.observer.observe(TransferEvent::Failed {
                    host: request.hostname.clone(),
                    message: message.clone(),
                });
                SessionOutcome::failure(message)
            }
        };
        self.state(&request.hostname, SessionState::Closed);
        outcome
    }

    /// Same as [`execute`](Self::execute) but keeps the classified error
    pub async fn run(&self, request: &ValidRequest) -> Result<(), TransferError> {
        let host = request.hostname.as_str();
        self.state(host, SessionState::Init);

        let known_hosts = self
            .transport
            .load_known_hosts(&request.known_hosts)
            .map_err(|e| self.fail(host, TransferError::TrustStore(format!("{:#}", e))))?;
        self.state(host, SessionState::KnownHostsLoaded);

        match request.port {
            Some(port) => debug!("Connecting to {}:{}", host, port),
            None => debug!("Connecting to {} on the default port", host),
        }
        let mut session = self
            .transport
            .connect(host, request.port, known_hosts)
            .await
            .map_err(|e| self.fail(host, TransferError::Connect(format!("{:#}", e))))?;
        self.state(host, SessionState::Connected);

        let mut sftp: Option<SftpOf<T>> = None;
        let result = self.authenticate_and_upload(&mut session, &mut sftp, request).await;
        let result = result.map_err(|e| self.fail(host, e));

        self.teardown(host, session, sftp).await;
        result
    }

    async fn authenticate_and_upload(
        &self,
        session: &mut T::Session,
        sftp: &mut Option<SftpOf<T>>,
        request: &ValidRequest,
    ) -> Result<(), TransferError> {
        let host = request.hostname.as_str();

        self.authenticate(session, request).await?;
        self.state(host, SessionState::Authenticated);

        debug!("Opening sftp channel");
        let channel = sftp.insert(
            session
                .open_sftp()
                .await
                .map_err(|e| TransferError::Transfer(format!("{:#}", e)))?,
        );
        let bytes = channel
            .put(&request.local_file, &request.dist_file)
            .await
            .map_err(|e| TransferError::Transfer(format!("{:#}", e)))?;

        self.observer.observe(TransferEvent::Uploaded {
            local: request.local_file.display().to_string(),
            remote: request.dist_file.clone(),
            bytes,
        });
        self.state(host, SessionState::Transferred);
        Ok(())
    }

    /// Tries each strategy in order and stops at the first that gets in.
    /// A key that cannot be loaded counts as a failed attempt, not as a
    /// fatal error, so a password can still be tried after it.
    async fn authenticate(
        &self,
        session: &mut T::Session,
        request: &ValidRequest,
    ) -> Result<(), TransferError> {
        let username = request.username.as_str();
        let mut attempts = Vec::new();

        for strategy in &request.auth {
            let result = match strategy {
                AuthStrategy::PublicKey {
                    key_path,
                    passphrase,
                } => match self.transport.load_key(key_path, passphrase.as_deref()) {
                    Ok(key) => attempt(
                        strategy.name(),
                        session.authenticate_publickey(username, key).await,
                    ),
                    Err(e) => Err(AuthFailure::KeyLoad(format!("{:#}", e))),
                },
                AuthStrategy::Password { password } => attempt(
                    strategy.name(),
                    session.authenticate_password(username, password).await,
                ),
            };

            match result {
                Ok(()) => {
                    self.observer.observe(TransferEvent::Authenticated {
                        host: request.hostname.clone(),
                        method: strategy.name(),
                    });
                    return Ok(());
                }
                Err(failure) => {
                    self.observer.observe(TransferEvent::AuthAttemptFailed {
                        host: request.hostname.clone(),
                        failure: failure.clone(),
                    });
                    attempts.push(failure);
                }
            }
        }

        Err(TransferError::Auth { attempts })
    }

    /// Closes the channel, then the session. Failures are reported and
    /// otherwise swallowed.
    async fn teardown(&self, host: &str, mut session: T::Session, sftp: Option<SftpOf<T>>) {
        if let Some(mut sftp) = sftp {
            if let Err(e) = sftp.close().await {
                self.teardown_failed(host, e);
            }
        }
        if let Err(e) = session.disconnect().await {
            self.teardown_failed(host, e);
        }
    }

    fn teardown_failed(&self, host: &str, err: anyhow::Error) {
        self.observer.observe(TransferEvent::TeardownFailed {
            host: host.to_string(),
            reason: format!("{:#}", err),
        });
    }

    fn fail(&self, host: &str, err: TransferError) -> TransferError {
        self.state(host, SessionState::Failed);
        err
    }

    fn state(&self, host: &str, state: SessionState) {
        self.observer.observe(TransferEvent::State {
            host: host.to_string(),
            state,
        });
    }
}

fn attempt(method: &'static str, result: Result<bool, anyhow::Error>) -> Result<(), AuthFailure> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthFailure::Rejected { method }),
        Err(e) => Err(AuthFailure::Error {
            method,
            reason: format!("{:#}", e),
        }),
    }
}
