//! One client session: the DataStore, the router and the turn gate.
//!
//! Everything runs on the caller's task. Frames are applied one at a time
//! between channel reads, so the store needs no locking.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ChatRequest, InboundMessage};
use crate::core::action::{ActionDispatcher, ActionTransport, DispatchError, TurnGate};
use crate::core::chat_stream::{ServerConnection, StreamMessage};
use crate::core::component::Action;
use crate::core::data_store::DataStore;
use crate::core::router::{MessageRouter, RenderSink, RouteOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Continue,
    Finished,
}

#[derive(Debug, Default)]
pub struct Session {
    store: DataStore,
    router: MessageRouter,
    gate: TurnGate,
    stream_id: u64,
    cancel_token: Option<CancellationToken>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn is_streaming(&self) -> bool {
        self.gate.is_streaming()
    }

    /// Edit callback of a bound input field.
    pub fn edit_field(&mut self, path: &str, value: impl Into<String>) {
        self.store.set(path, value);
    }

    /// Opens a new streaming turn and returns its cancel token and id.
    pub fn begin_stream(&mut self) -> (CancellationToken, u64) {
        if let Some(previous) = self.cancel_token.take() {
            previous.cancel();
        }
        self.stream_id += 1;
        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());
        self.gate.open_stream();
        self.router.begin_turn();
        (token, self.stream_id)
    }

    pub fn cancel_stream(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.finish_stream();
    }

    fn finish_stream(&mut self) {
        self.cancel_token = None;
        self.gate.close_stream();
        self.router.end_turn();
    }

    pub fn handle_stream_message(
        &mut self,
        message: StreamMessage,
        stream_id: u64,
        sink: &mut dyn RenderSink,
    ) -> StreamStatus {
        if stream_id != self.stream_id || !self.gate.is_streaming() {
            debug!(stream_id, current = self.stream_id, "dropping message from stale stream");
            return StreamStatus::Continue;
        }
        match message {
            StreamMessage::Frame(frame) => {
                self.router.handle_frame(&frame, &mut self.store, sink);
                StreamStatus::Continue
            }
            StreamMessage::Error(err) => {
                sink.render_error(&err.to_string());
                StreamStatus::Continue
            }
            StreamMessage::End => {
                self.finish_stream();
                StreamStatus::Finished
            }
        }
    }

    /// Drains `rx` until the current stream ends or the channel closes.
    pub async fn run_stream(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
        sink: &mut dyn RenderSink,
    ) {
        while let Some((message, stream_id)) = rx.recv().await {
            if self.handle_stream_message(message, stream_id, sink) == StreamStatus::Finished {
                return;
            }
        }
        self.finish_stream();
    }

    pub fn handle_envelope(
        &mut self,
        message: &InboundMessage,
        sink: &mut dyn RenderSink,
    ) -> RouteOutcome {
        self.router.handle_envelope(message, &mut self.store, sink)
    }

    /// Non-streaming turn: one request, one envelope.
    pub async fn send_prompt(
        &mut self,
        connection: &ServerConnection,
        request: &ChatRequest,
        sink: &mut dyn RenderSink,
    ) -> Option<RouteOutcome> {
        match connection.send(request, connection.accept_widgets).await {
            Ok(message) => Some(self.handle_envelope(&message, sink)),
            Err(err) => {
                sink.render_error(&err.to_string());
                None
            }
        }
    }

    /// Dispatches a button action; the reply re-enters the envelope path.
    /// Failures are shown through `sink` and also returned.
    pub async fn dispatch<T: ActionTransport>(
        &mut self,
        dispatcher: &ActionDispatcher<T>,
        action: &Action,
        sink: &mut dyn RenderSink,
    ) -> Result<RouteOutcome, DispatchError> {
        match dispatcher.dispatch(action, &self.store, &self.gate).await {
            Ok(reply) => Ok(self.handle_envelope(&reply, sink)),
            Err(err) => {
                sink.render_error(&err.to_string());
                Err(err)
            }
        }
    }
}
