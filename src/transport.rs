use std::path::Path;

use async_trait::async_trait;

use crate::known_hosts::KnownHosts;

/// Entry point into the SSH/SFTP stack.
///
/// The orchestrator drives a transfer only through this trait and the two
/// below it; the russh-backed implementation lives in [`crate::session`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Loaded private key material
    type Key: Send;
    type Session: SshSession<Key = Self::Key>;

    /// Loads the host-key trust store
    fn load_known_hosts(&self, path: &Path) -> Result<KnownHosts, anyhow::Error> {
        KnownHosts::from_file(path)
    }

    /// Reads a private key, decrypting it with `passphrase` when given
    fn load_key(&self, path: &Path, passphrase: Option<&str>) -> Result<Self::Key, anyhow::Error>;

    /// Opens a TCP connection and completes the SSH handshake, checking the
    /// server key against `known_hosts`. `port: None` means the default port.
    async fn connect(
        &self,
        host: &str,
        port: Option<u16>,
        known_hosts: KnownHosts,
    ) -> Result<Self::Session, anyhow::Error>;
}

/// One connected, possibly not yet authenticated, SSH session
#[async_trait]
pub trait SshSession: Send {
    type Key: Send;
    type Sftp: SftpChannel;

    /// `Ok(false)` means the server refused the key
    async fn authenticate_publickey(
        &mut self,
        username: &str,
        key: Self::Key,
    ) -> Result<bool, anyhow::Error>;

    /// `Ok(false)` means the server refused the password
    async fn authenticate_password(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<bool, anyhow::Error>;

    async fn open_sftp(&mut self) -> Result<Self::Sftp, anyhow::Error>;

    async fn disconnect(&mut self) -> Result<(), anyhow::Error>;
}

/// SFTP subsystem channel over an authenticated session
#[async_trait]
pub trait SftpChannel: Send {
    /// Uploads `local` to `remote`, replacing any existing remote file.
    /// Returns the number of bytes written.
    async fn put(&mut self, local: &Path, remote: &str) -> Result<u64, anyhow::Error>;

    async fn close(&mut self) -> Result<(), anyhow::Error>;
}
