use anyhow::Context;
use serde_json::Value;
use sftp_adapter::{
    AdapterConfig, CONFIG_ENV, MessageHandler, RusshTransport, TracingObserver, serve,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<AdapterConfig> {
    let path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(CONFIG_ENV))
        .map(PathBuf::from);
    match path {
        Some(path) => {
            info!("Loading config from {:?}", path);
            AdapterConfig::load(&path).context("failed to load adapter config")
        }
        None => Ok(AdapterConfig::default()),
    }
}

/// Reads one JSON message per line on stdin and writes one JSON reply per
/// line on stdout. Logs go to stderr.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;

    let transport = Arc::new(RusshTransport::new(&config));
    let handler = Arc::new(
        MessageHandler::new(transport, Arc::new(TracingObserver)).with_address(&config.address),
    );
    info!("SFTP adapter listening on address {:?}", handler.address());

    let (tx, mut rx) = mpsc::channel::<Value>(64);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(reply) = rx.recv().await {
            let mut line = reply.to_string();
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested, waiting for in-flight transfers");
            ctrl_c.cancel();
        }
    });

    let handled = serve(handler, tokio::io::stdin(), tx, shutdown).await;
    info!("Handled {} messages", handled);

    writer.await??;
    Ok(())
}
