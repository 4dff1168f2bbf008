use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{TransferError, ValidationError};
use crate::observer::TransferObserver;
use crate::orchestrator::TransferOrchestrator;
use crate::transport::Transport;
use crate::types::{SessionOutcome, TransferRequest};
use crate::validate::validate;

pub const INVALID_ACTION: &str = "Invalid action.";
pub const INVALID_ADDRESS: &str = "Invalid address.";

/// What an inbound message asks for
#[derive(Debug, Clone)]
pub enum Action {
    /// Upload one file
    Send(Box<TransferRequest>),
    /// Anything else, including a missing `action`
    Unsupported(String),
}

impl Action {
    /// Reads the `action` discriminator. A body that is not a JSON object
    /// carries no params at all.
    pub fn from_message(body: &Value) -> Result<Self, ValidationError> {
        if !body.is_object() {
            return Err(ValidationError::MissingParams);
        }
        let action = body.get("action").and_then(Value::as_str).unwrap_or_default();
        match action {
            "send" => serde_json::from_value::<TransferRequest>(body.clone())
                .map(|request| Action::Send(Box::new(request)))
                .map_err(|e| ValidationError::Malformed(e.to_string())),
            other => Ok(Action::Unsupported(other.to_string())),
        }
    }
}

/// Turns bus messages into exactly one [`SessionOutcome`] each
pub struct MessageHandler<T: Transport> {
    orchestrator: TransferOrchestrator<T>,
    observer: Arc<dyn TransferObserver>,
    address: String,
}

impl<T: Transport> MessageHandler<T> {
    pub fn new(transport: Arc<T>, observer: Arc<dyn TransferObserver>) -> Self {
        Self {
            orchestrator: TransferOrchestrator::new(transport, observer.clone()),
            observer,
            address: "sftp".to_string(),
        }
    }

    /// Only messages addressed here (or carrying no address) are handled
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Handles one raw line from the bus and builds the reply for it.
    ///
    /// The reply is the serialized [`SessionOutcome`], with the message's
    /// `id` copied over when it has one.
    pub async fn handle_line(&self, line: &str) -> Value {
        let body: Value = match serde_json::from_str(line) {
            Ok(body) => body,
            Err(e) => {
                warn!("Unparseable message: {}", e);
                return reply(rejected(ValidationError::Malformed(e.to_string())), None);
            }
        };
        let id = body.get("id").cloned();

        let outcome = match body.get("address").and_then(Value::as_str) {
            Some(address) if address != self.address => {
                warn!("Message for address {:?} received on {:?}", address, self.address);
                SessionOutcome::failure(INVALID_ADDRESS)
            }
            _ => self.handle(&body).await,
        };
        reply(outcome, id)
    }

    pub async fn handle(&self, body: &Value) -> SessionOutcome {
        info!("Message received on SFTP");
        let action = match Action::from_message(body) {
            Ok(action) => action,
            Err(e) => return rejected(e),
        };

        match action {
            Action::Send(request) => self.send(&request).await,
            Action::Unsupported(name) => {
                debug!("Unsupported action {:?}", name);
                SessionOutcome::failure(INVALID_ACTION)
            }
        }
    }

    async fn send(&self, request: &TransferRequest) -> SessionOutcome {
        info!("Send request {:?}", request);
        match validate(Some(request), self.observer.as_ref()) {
            Ok(valid) => self.orchestrator.execute(&valid).await,
            Err(e) => rejected(e),
        }
    }
}

/// A request that never reached the orchestrator
pub(crate) fn rejected(err: ValidationError) -> SessionOutcome {
    debug!("Request rejected: {}", err);
    SessionOutcome::failure(TransferError::from(err).to_string())
}

pub(crate) fn reply(outcome: SessionOutcome, id: Option<Value>) -> Value {
    let mut reply = serde_json::to_value(&outcome).unwrap_or_else(|_| {
        serde_json::json!({ "status": "error", "message": "failed to encode reply" })
    });
    if let (Some(id), Value::Object(map)) = (id, &mut reply) {
        map.insert("id".to_string(), id);
    }
    reply
}
