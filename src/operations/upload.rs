use anyhow::anyhow;
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

/// Uploads a local file into an already opened remote file
///
/// Reads the local file in `io_size` chunks and writes each chunk, in order,
/// to `remote_file`. The remote file is flushed and shut down before
/// returning, so the server has the whole content when this resolves.
///
/// # Arguments
///
/// * `local_path` - Path to the local file to upload
/// * `remote_file` - Writable handle on the destination file
/// * `io_size` - Chunk size for each read/write
///
/// # Returns
///
/// Returns the number of bytes written to the remote file
///
/// # Errors
///
/// Returns an error if:
/// - The local file cannot be opened or read
/// - The remote file cannot be written to or closed
pub async fn put<W>(
    local_path: &Path,
    remote_file: &mut W,
    io_size: usize,
) -> Result<u64, anyhow::Error>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let upload_time = Instant::now();
    let mut local_file = fs::File::open(local_path)
        .await
        .map_err(|e| anyhow!("Failed to open local file {:?}: {}", local_path, e))?;
    info!("Local file opened: {:?}", local_path);
    let local_file_size = local_file.metadata().await?.len();

    let mut buffer = vec![0; io_size.max(1)];
    let mut written: u64 = 0;
    loop {
        let bytes_read = match local_file.read(&mut buffer[..]).await {
            Ok(0) => {
                info!("Upload: End of file reached");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                error!("Error reading local file: {:?}", e);
                return Err(anyhow!("Failed to read from local file: {e}"));
            }
        };
        remote_file
            .write_all(&buffer[..bytes_read])
            .await
            .map_err(|e| anyhow!("SFTP write error: {e}"))?;
        written += bytes_read as u64;
    }

    remote_file
        .flush()
        .await
        .map_err(|e| anyhow!("SFTP flush error: {e}"))?;
    remote_file
        .shutdown()
        .await
        .map_err(|e| anyhow!("SFTP close error: {e}"))?;

    if written != local_file_size {
        info!(
            "Local file {:?} changed size during upload ({} bytes at open, {} sent)",
            local_path, local_file_size, written
        );
    }
    info!(
        "File {:?} uploaded. Time taken {:?}",
        local_path,
        upload_time.elapsed(),
    );
    Ok(written)
}
