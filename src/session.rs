use anyhow::anyhow;
use async_trait::async_trait;
use russh::client;
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::{PrivateKey, PublicKey};
use russh::Disconnect;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::RusshSftp;
use crate::config::AdapterConfig;
use crate::known_hosts::{HostKeyVerification, KnownHosts};
use crate::transport::{SshSession, Transport};

/// Errors raised while the SSH handshake is running
#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error(transparent)]
    Ssh(#[from] russh::Error),

    #[error("host key verification failed for {host}: {reason}")]
    HostKey { host: String, reason: String },
}

/// russh callback handler that checks the server key against a
/// [`KnownHosts`] store
pub struct HostKeyHandler {
    host: String,
    port: u16,
    known_hosts: KnownHosts,
}

impl client::Handler for HostKeyHandler {
    type Error = HandshakeError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let reason = match self
            .known_hosts
            .verify(&self.host, self.port, server_public_key)
        {
            HostKeyVerification::Verified => {
                info!("Host key verified for {}:{}", self.host, self.port);
                return Ok(true);
            }
            HostKeyVerification::Unknown { fingerprint } => {
                format!("unknown host key {}", fingerprint)
            }
            HostKeyVerification::Mismatch { fingerprint } => {
                format!("host key changed, server offered {}", fingerprint)
            }
            HostKeyVerification::Revoked { fingerprint } => {
                format!("host key {} is revoked", fingerprint)
            }
        };
        warn!("Rejecting {}:{}: {}", self.host, self.port, reason);
        Err(HandshakeError::HostKey {
            host: format!("{}:{}", self.host, self.port),
            reason,
        })
    }
}

/// [`Transport`] backed by russh and russh-sftp
#[derive(Debug, Clone)]
pub struct RusshTransport {
    default_port: u16,
    io_size: usize,
}

impl RusshTransport {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            default_port: config.default_port,
            io_size: config.io_size,
        }
    }
}

#[async_trait]
impl Transport for RusshTransport {
    type Key = PrivateKey;
    type Session = RusshSession;

    fn load_key(&self, path: &Path, passphrase: Option<&str>) -> Result<PrivateKey, anyhow::Error> {
        debug!("Loading ssh key {:?}", path);
        russh::keys::load_secret_key(path, passphrase)
            .map_err(|e| anyhow!("failed to load ssh key {:?}: {}", path, e))
    }

    async fn connect(
        &self,
        host: &str,
        port: Option<u16>,
        known_hosts: KnownHosts,
    ) -> Result<RusshSession, anyhow::Error> {
        let port = port.unwrap_or(self.default_port);
        info!("Connecting to {}:{}", host, port);

        let handler = HostKeyHandler {
            host: host.to_string(),
            port,
            known_hosts,
        };
        // No inactivity timeout: a stalled server stalls the request.
        let config = Arc::new(client::Config::default());
        let handle = client::connect(config, (host, port), handler)
            .await
            .map_err(|e| anyhow!("{}", e))?;
        debug!("SSH handshake completed with {}:{}", host, port);

        Ok(RusshSession {
            handle,
            io_size: self.io_size,
        })
    }
}

/// Live russh connection for a single request
pub struct RusshSession {
    handle: client::Handle<HostKeyHandler>,
    io_size: usize,
}

#[async_trait]
impl SshSession for RusshSession {
    type Key = PrivateKey;
    type Sftp = RusshSftp;

    async fn authenticate_publickey(
        &mut self,
        username: &str,
        key: PrivateKey,
    ) -> Result<bool, anyhow::Error> {
        let key_with_hash = PrivateKeyWithHashAlg::new(Arc::new(key), None);
        let result = self
            .handle
            .authenticate_publickey(username, key_with_hash)
            .await
            .map_err(|e| anyhow!("public key authentication failed: {}", e))?;
        Ok(result.success())
    }

    async fn authenticate_password(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<bool, anyhow::Error> {
        let result = self
            .handle
            .authenticate_password(username, password)
            .await
            .map_err(|e| anyhow!("password authentication failed: {}", e))?;
        Ok(result.success())
    }

    async fn open_sftp(&mut self) -> Result<RusshSftp, anyhow::Error> {
        debug!("Creating sftp client from session");
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| anyhow!("failed to open session channel: {}", e))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| anyhow!("failed to request sftp subsystem: {}", e))?;
        let sftp = russh_sftp::client::SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| anyhow!("failed to start sftp session: {}", e))?;
        debug!("sftp client created successfully");
        Ok(RusshSftp::new(sftp, self.io_size))
    }

    async fn disconnect(&mut self) -> Result<(), anyhow::Error> {
        if self.handle.is_closed() {
            debug!("SSH session already closed");
            return Ok(());
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| anyhow!("failed to close ssh session: {}", e))?;
        info!("SSH session closed");
        Ok(())
    }
}

