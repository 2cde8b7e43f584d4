//! Drives turns for the `ask` and `chat` commands.

use std::io::Write;

use tokio::sync::mpsc;
use tracing::debug;

use crate::api::ChatRequest;
use crate::cli::RunSettings;
use crate::core::action::ActionDispatcher;
use crate::core::chat_stream::{ChatStreamService, ServerConnection, StreamMessage, StreamParams};
use crate::core::resolver::Control;
use crate::core::session::Session;
use crate::ui::transcript::Transcript;

pub struct ChatClient<W: Write> {
    session: Session,
    stream: bool,
    connection: ServerConnection,
    dispatcher: ActionDispatcher<ServerConnection>,
    streams: ChatStreamService,
    rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    transcript: Transcript<W>,
}

impl<W: Write> ChatClient<W> {
    pub fn new(settings: &RunSettings, transcript: Transcript<W>) -> Self {
        let (streams, rx) = ChatStreamService::new();
        Self {
            session: Session::new(),
            stream: settings.stream,
            connection: settings.connection.clone(),
            dispatcher: ActionDispatcher::new(settings.connection.clone()),
            streams,
            rx,
            transcript,
        }
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript<W> {
        &mut self.transcript
    }

    pub fn into_transcript(self) -> Transcript<W> {
        self.transcript
    }

    /// Sends a user prompt and renders the whole reply.
    pub async fn prompt(&mut self, text: &str) {
        self.transcript.user_prompt(text);
        let request = ChatRequest::prompt(text);

        if !self.stream {
            self.session
                .send_prompt(&self.connection, &request, &mut self.transcript)
                .await;
            return;
        }

        let (cancel_token, stream_id) = self.session.begin_stream();
        self.streams.spawn_stream(StreamParams {
            connection: self.connection.clone(),
            request,
            cancel_token,
            stream_id,
        });
        self.session
            .run_stream(&mut self.rx, &mut self.transcript)
            .await;
        self.transcript.finish_turn();
    }

    /// Dispatches the action of button `index` (1-based) on the latest surface.
    pub async fn press(&mut self, index: usize) -> Result<(), String> {
        let buttons = self.transcript.buttons();
        let Some(Control::Button { label, action, .. }) = nth(&buttons, index) else {
            return Err(format!("No button [{index}] on the current surface"));
        };
        let Some(action) = action.clone() else {
            return Err(format!("Button '{label}' has no action"));
        };
        if let Err(err) = self
            .session
            .dispatch(&self.dispatcher, &action, &mut self.transcript)
            .await
        {
            debug!(action = %action.name, error = %err, "action dispatch failed");
        }
        Ok(())
    }

    /// Writes `value` into the DataStore path bound to field `index`.
    pub fn set_field(&mut self, index: usize, value: &str) -> Result<String, String> {
        let fields = self.transcript.fields();
        let Some(Control::Field { label, binding, .. }) = nth(&fields, index) else {
            return Err(format!("No field [{index}] on the current surface"));
        };
        let Some(path) = binding else {
            return Err(format!("Field '{label}' is read-only"));
        };
        self.session.edit_field(path, value);
        Ok(format!("{label} = {value}"))
    }

    /// Numbered fields with their current values.
    pub fn field_summary(&self) -> String {
        let fields = self.transcript.fields();
        if fields.is_empty() {
            return "No fields on the current surface".to_string();
        }
        fields
            .iter()
            .enumerate()
            .filter_map(|(i, control)| match control {
                Control::Field {
                    label,
                    binding: Some(path),
                    ..
                } => Some(format!(
                    "[{}] {label}: {} ({path})",
                    i + 1,
                    self.session.store().get(path)
                )),
                Control::Field { label, .. } => Some(format!("[{}] {label} (read-only)", i + 1)),
                Control::Button { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn store_summary(&self) -> String {
        let entries = self.session.store().entries();
        if entries.is_empty() {
            return "Data store is empty".to_string();
        }
        entries
            .iter()
            .map(|(path, value)| format!("{path} = {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn nth(controls: &[Control], index: usize) -> Option<&Control> {
    index.checked_sub(1).and_then(|i| controls.get(i))
}
