// demos/send_request.rs
// Run with: cargo run --example send_request -- <host> <user> <password> <local> <remote>

use serde_json::json;
use sftp_adapter::{AdapterConfig, MessageHandler, RusshTransport, SessionOutcome, TracingObserver};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [host, user, password, local, remote] = args.as_slice() else {
        eprintln!("usage: send_request <host> <user> <password> <local-file> <dist-file>");
        std::process::exit(2);
    };
    let known_hosts = std::env::var("HOME")
        .map(|home| format!("{}/.ssh/known_hosts", home))
        .unwrap_or_else(|_| "/etc/ssh/ssh_known_hosts".to_string());

    // 1. Build the handler around the russh transport
    let config = AdapterConfig::default();
    let handler = MessageHandler::new(
        Arc::new(RusshTransport::new(&config)),
        Arc::new(TracingObserver),
    );

    // 2. Send one message, exactly as it would arrive on the bus
    let message = json!({
        "action": "send",
        "known-hosts": known_hosts,
        "hostname": host,
        "username": user,
        "password": password,
        "local-file": local,
        "dist-file": remote,
    });

    // 3. Inspect the reply
    match handler.handle(&message).await {
        SessionOutcome::Success => println!("✅ Uploaded {} to {}:{}", local, host, remote),
        SessionOutcome::Failure { message } => println!("❌ {}", message),
    }

    Ok(())
}
