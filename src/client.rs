use anyhow::anyhow;
use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use std::path::Path;
use tracing::info;

use crate::operations::upload;
use crate::transport::SftpChannel;

/// SFTP channel opened on an authenticated russh session
pub struct RusshSftp {
    sftp: SftpSession,
    io_size: usize,
}

impl RusshSftp {
    /// Creates a new SFTP client instance (internal use)
    pub(crate) fn new(sftp: SftpSession, io_size: usize) -> Self {
        Self { sftp, io_size }
    }
}

#[async_trait]
impl SftpChannel for RusshSftp {
    /// Uploads a local file to the remote server
    ///
    /// The remote file is created, or truncated when it already exists.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let bytes = channel.put(Path::new("/local/file.txt"), "/remote/file.txt").await?;
    /// ```
    async fn put(&mut self, local: &Path, remote: &str) -> Result<u64, anyhow::Error> {
        let mut remote_file = self.sftp.create(remote).await.map_err(|err| {
            info!("Failed to open file: {:?} ERROR: {:?}", remote, err);
            anyhow!("SFTP error: {}", err)
        })?;
        info!("Remote file created path: {:?}", remote);
        upload::put(local, &mut remote_file, self.io_size).await
    }

    /// Closes the SFTP client and releases resources
    async fn close(&mut self) -> Result<(), anyhow::Error> {
        self.sftp
            .close()
            .await
            .map_err(|e| anyhow!("failed to close sftp session: {}", e))
    }
}
