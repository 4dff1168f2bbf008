//! Line-delimited JSON framing around a [`MessageHandler`].

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ValidationError;
use crate::handler::{MessageHandler, rejected, reply};
use crate::transport::Transport;

/// Longest accepted message line, in bytes
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Reads one message per line from `input` and sends one reply per non-blank
/// line to `replies`.
///
/// Each message is handled on its own task. A line that cannot be framed
/// (invalid UTF-8, longer than [`MAX_LINE_LENGTH`]) gets a failure reply and
/// reading carries on. Returns once `input` is exhausted or `shutdown` fires
/// and every in-flight task has finished, with the number of non-blank lines
/// read.
pub async fn serve<R, T>(
    handler: Arc<MessageHandler<T>>,
    input: R,
    replies: mpsc::Sender<Value>,
    shutdown: CancellationToken,
) -> usize
where
    R: AsyncRead + Unpin,
    T: Transport + 'static,
{
    let mut lines = FramedRead::new(input, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut tasks = JoinSet::new();
    let mut received = 0;
    // FramedRead yields a single `None` right after a decode error
    let mut resuming = false;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    error!("Request task failed: {}", e);
                }
            }
            line = lines.next() => {
                let line = match line {
                    Some(Ok(line)) => line,
                    Some(Err(e)) => {
                        warn!("Failed to read message: {}", e);
                        resuming = true;
                        received += 1;
                        let outcome = rejected(ValidationError::Malformed(e.to_string()));
                        if replies.send(reply(outcome, None)).await.is_err() {
                            warn!("Reply writer is gone, dropping reply");
                        }
                        continue;
                    }
                    None if resuming => {
                        resuming = false;
                        continue;
                    }
                    None => {
                        info!("Input closed");
                        break;
                    }
                };
                resuming = false;
                if line.trim().is_empty() {
                    continue;
                }
                received += 1;
                let handler = handler.clone();
                let replies = replies.clone();
                tasks.spawn(async move {
                    let reply = handler.handle_line(&line).await;
                    if replies.send(reply).await.is_err() {
                        warn!("Reply writer is gone, dropping reply");
                    }
                });
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Request task failed: {}", e);
        }
    }
    received
}
