//! Turns a component's declared action into an outgoing request.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::api::InboundMessage;
use crate::core::chat_stream::TransportError;
use crate::core::component::Action;
use crate::core::data_store::DataStore;

/// `{name, context}` with every bound path already read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRequest {
    pub name: String,
    pub context: BTreeMap<String, String>,
}

impl ActionRequest {
    /// Entries without a `value.path` are skipped; unknown paths read as "".
    pub fn build(action: &Action, store: &DataStore) -> Self {
        let context = action
            .context
            .iter()
            .filter_map(|entry| {
                entry
                    .value
                    .path
                    .as_deref()
                    .map(|path| (entry.key.clone(), store.get(path).to_string()))
            })
            .collect();
        Self {
            name: action.name.clone(),
            context,
        }
    }
}

/// Sends an action and waits for the single reply message.
#[async_trait]
pub trait ActionTransport: Send + Sync {
    async fn send_action(&self, request: &ActionRequest) -> Result<InboundMessage, TransportError>;
}

/// Tracks whether a stream read loop is running for the current turn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TurnGate {
    streaming: bool,
}

impl TurnGate {
    pub fn open_stream(&mut self) {
        self.streaming = true;
    }

    pub fn close_stream(&mut self) {
        self.streaming = false;
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }
}

#[derive(Debug)]
pub enum DispatchError {
    /// A stream is still open; the action was not sent.
    Busy { action: String },
    Transport(TransportError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Busy { action } => write!(
                f,
                "Cannot run '{action}' while a response is still streaming"
            ),
            DispatchError::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for DispatchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DispatchError::Busy { .. } => None,
            DispatchError::Transport(err) => Some(err),
        }
    }
}

impl From<TransportError> for DispatchError {
    fn from(err: TransportError) -> Self {
        DispatchError::Transport(err)
    }
}

pub struct ActionDispatcher<T> {
    transport: T,
}

impl<T: ActionTransport> ActionDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Rejects while `gate` reports an open stream; otherwise sends the
    /// request built from `store` and returns the reply.
    pub async fn dispatch(
        &self,
        action: &Action,
        store: &DataStore,
        gate: &TurnGate,
    ) -> Result<InboundMessage, DispatchError> {
        if gate.is_streaming() {
            return Err(DispatchError::Busy {
                action: action.name.clone(),
            });
        }
        let request = ActionRequest::build(action, store);
        debug!(action = %request.name, keys = request.context.len(), "dispatching action");
        Ok(self.transport.send_action(&request).await?)
    }
}
