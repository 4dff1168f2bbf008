use std::path::PathBuf;

use crate::error::ValidationError;
use crate::observer::{TransferEvent, TransferObserver};
use crate::types::{AuthStrategy, TransferRequest, ValidRequest};
use crate::utils::{non_empty, parse_port};

fn required<'a>(
    field: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, ValidationError> {
    non_empty(field).ok_or(ValidationError::MissingField(name))
}

/// Checks field presence and shape, in a fixed order, stopping at the first
/// problem. Never touches the filesystem or the network.
///
/// An unusable `port` is not an error: it is dropped and reported to
/// `observer` as [`TransferEvent::PortDropped`].
pub fn validate(
    request: Option<&TransferRequest>,
    observer: &dyn TransferObserver,
) -> Result<ValidRequest, ValidationError> {
    let request = request.ok_or(ValidationError::MissingParams)?;

    let known_hosts = required(&request.known_hosts, "known-hosts")?;
    let hostname = required(&request.hostname, "hostname")?;
    let username = required(&request.username, "username")?;

    let password = non_empty(&request.password);
    let ssh_key = non_empty(&request.ssh_key);
    if password.is_none() && ssh_key.is_none() {
        return Err(ValidationError::MissingCredentials);
    }

    let local_file = required(&request.local_file, "local-file")?;
    let dist_file = required(&request.dist_file, "dist-file")?;

    let port = match &request.port {
        None => None,
        Some(raw) => {
            let port = parse_port(raw);
            if port.is_none() {
                observer.observe(TransferEvent::PortDropped {
                    raw: raw.to_string(),
                });
            }
            port
        }
    };

    let mut auth = Vec::with_capacity(2);
    if let Some(key_path) = ssh_key {
        auth.push(AuthStrategy::PublicKey {
            key_path: PathBuf::from(key_path),
            passphrase: non_empty(&request.passphrase).map(str::to_string),
        });
    }
    if let Some(password) = password {
        auth.push(AuthStrategy::Password {
            password: password.to_string(),
        });
    }

    Ok(ValidRequest {
        known_hosts: PathBuf::from(known_hosts),
        hostname: hostname.to_string(),
        port,
        username: username.to_string(),
        auth,
        local_file: PathBuf::from(local_file),
        dist_file: dist_file.to_string(),
    })
}
