//! Routes decoded frames and reply envelopes to the rendering collaborator.
//!
//! One turn moves `Idle -> Streaming -> Done -> Idle`. Narrative text is
//! accumulated into a single open buffer that is re-rendered in full on each
//! append; widget surfaces arrive as siblings and never close that buffer.

use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::api::InboundMessage;
use crate::core::data_store::DataStore;
use crate::core::frame_parser::StreamFrame;
use crate::core::surface::{self, SurfaceView};

pub const EVENT_A2UI: &str = "a2ui";
pub const EVENT_TEXT: &str = "text";
pub const EVENT_DONE: &str = "done";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextBufferId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Widget payload could not be decoded.
    Payload { message: String },
    /// The chart plotting collaborator refused the data.
    Chart { message: String },
}

impl RenderError {
    /// Text shown to the user in place of the surface.
    pub fn system_message(&self) -> String {
        format!("[System Error: Failed to render UI components. {self}]")
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Payload { message } => write!(f, "Invalid widget payload: {message}"),
            RenderError::Chart { message } => write!(f, "Chart could not be drawn: {message}"),
        }
    }
}

impl StdError for RenderError {}

/// The platform side of rendering.
pub trait RenderSink {
    /// Shows a fully applied surface. Errors become a system message.
    fn render_surface(&mut self, view: SurfaceView) -> Result<(), RenderError>;
    /// Re-renders a streaming text buffer from its complete contents.
    fn render_text(&mut self, buffer: TextBufferId, contents: &str);
    /// No more appends will arrive for `buffer`.
    fn close_text(&mut self, buffer: TextBufferId);
    /// A complete, non-streamed narrative reply.
    fn render_message(&mut self, text: &str);
    fn render_error(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenText {
    pub id: TextBufferId,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Streaming {
        open_text: Option<OpenText>,
    },
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Surface,
    Text,
    Message,
    Done,
    Failed,
    Ignored,
}

#[derive(Debug, Default)]
pub struct MessageRouter {
    state: TurnState,
    next_buffer: u64,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn open_text(&self) -> Option<&OpenText> {
        match &self.state {
            TurnState::Streaming { open_text } => open_text.as_ref(),
            _ => None,
        }
    }

    pub fn begin_turn(&mut self) {
        self.state = TurnState::Streaming { open_text: None };
    }

    /// Returns to `Idle`. A buffer still open here was never finalized by a
    /// `done` frame and is left as is; returns whether that happened.
    pub fn end_turn(&mut self) -> bool {
        let unfinished = self.open_text().is_some();
        if unfinished {
            debug!("turn ended without a done frame");
        }
        self.state = TurnState::Idle;
        unfinished
    }

    pub fn handle_frame(
        &mut self,
        frame: &StreamFrame,
        store: &mut DataStore,
        sink: &mut dyn RenderSink,
    ) -> RouteOutcome {
        match frame.event.as_str() {
            EVENT_A2UI => handle_widget(frame.data.get("data"), store, sink),
            EVENT_TEXT => match frame.data.get("text").and_then(Value::as_str) {
                Some(delta) => {
                    self.append_text(delta, sink);
                    RouteOutcome::Text
                }
                None => {
                    debug!("text frame without a text field");
                    RouteOutcome::Ignored
                }
            },
            EVENT_DONE => {
                if let Some(open) = self.open_text() {
                    sink.close_text(open.id);
                }
                self.state = TurnState::Done;
                RouteOutcome::Done
            }
            other => {
                debug!(event = other, "ignoring unknown event type");
                RouteOutcome::Ignored
            }
        }
    }

    /// Handles a single non-streaming reply (chat turn or action result).
    pub fn handle_envelope(
        &mut self,
        message: &InboundMessage,
        store: &mut DataStore,
        sink: &mut dyn RenderSink,
    ) -> RouteOutcome {
        if message.is_widget() {
            handle_widget(message.data.as_ref(), store, sink)
        } else {
            sink.render_message(message.text.as_deref().unwrap_or("Error"));
            RouteOutcome::Message
        }
    }

    fn append_text(&mut self, delta: &str, sink: &mut dyn RenderSink) {
        if !matches!(self.state, TurnState::Streaming { .. }) {
            self.begin_turn();
        }
        let TurnState::Streaming { open_text } = &mut self.state else {
            return;
        };
        let open = open_text.get_or_insert_with(|| {
            self.next_buffer += 1;
            OpenText {
                id: TextBufferId(self.next_buffer),
                contents: String::new(),
            }
        });
        open.contents.push_str(delta);
        sink.render_text(open.id, &open.contents);
    }
}

/// Applies a widget payload and hands the whole surface to the sink at once.
fn handle_widget(
    data: Option<&Value>,
    store: &mut DataStore,
    sink: &mut dyn RenderSink,
) -> RouteOutcome {
    let view = match data {
        Some(data) => surface::apply(data, store).map_err(|err| RenderError::Payload {
            message: err.to_string(),
        }),
        None => Err(RenderError::Payload {
            message: "missing data".to_string(),
        }),
    };
    let result = view.and_then(|view| sink.render_surface(view));

    match result {
        Ok(()) => RouteOutcome::Surface,
        Err(err) => {
            sink.render_error(&err.system_message());
            RouteOutcome::Failed
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::resolver::NodeKind;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum SinkEvent {
        Surface(SurfaceView),
        Text(TextBufferId, String),
        Close(TextBufferId),
        Message(String),
        Error(String),
    }

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) events: Vec<SinkEvent>,
        pub(crate) fail_surfaces: bool,
    }

    impl RenderSink for RecordingSink {
        fn render_surface(&mut self, view: SurfaceView) -> Result<(), RenderError> {
            if self.fail_surfaces {
                return Err(RenderError::Chart {
                    message: "plotter unavailable".into(),
                });
            }
            self.events.push(SinkEvent::Surface(view));
            Ok(())
        }

        fn render_text(&mut self, buffer: TextBufferId, contents: &str) {
            self.events
                .push(SinkEvent::Text(buffer, contents.to_string()));
        }

        fn close_text(&mut self, buffer: TextBufferId) {
            self.events.push(SinkEvent::Close(buffer));
        }

        fn render_message(&mut self, text: &str) {
            self.events.push(SinkEvent::Message(text.to_string()));
        }

        fn render_error(&mut self, message: &str) {
            self.events.push(SinkEvent::Error(message.to_string()));
        }
    }

    fn frame(event: &str, data: Value) -> StreamFrame {
        StreamFrame {
            event: event.into(),
            data,
        }
    }

    #[test]
    fn text_accumulates_until_done_then_starts_fresh() {
        let mut router = MessageRouter::new();
        let mut store = DataStore::new();
        let mut sink = RecordingSink::default();
        router.begin_turn();

        router.handle_frame(&frame("text", json!({"text": "Hel"})), &mut store, &mut sink);
        router.handle_frame(&frame("text", json!({"text": "lo"})), &mut store, &mut sink);
        assert_eq!(router.open_text().unwrap().contents, "Hello");
        router.handle_frame(&frame("done", json!({})), &mut store, &mut sink);
        assert_eq!(router.state(), &TurnState::Done);
        router.handle_frame(&frame("text", json!({"text": "next"})), &mut store, &mut sink);

        let first = TextBufferId(1);
        let second = TextBufferId(2);
        assert_eq!(
            sink.events,
            vec![
                SinkEvent::Text(first, "Hel".into()),
                SinkEvent::Text(first, "Hello".into()),
                SinkEvent::Close(first),
                SinkEvent::Text(second, "next".into()),
            ]
        );
    }

    #[test]
    fn widget_frame_does_not_close_open_text() {
        let mut router = MessageRouter::new();
        let mut store = DataStore::new();
        let mut sink = RecordingSink::default();
        router.begin_turn();

        router.handle_frame(&frame("text", json!({"text": "Here "})), &mut store, &mut sink);
        let outcome = router.handle_frame(
            &frame(
                "a2ui",
                json!({"kind": "a2ui", "data": {
                    "dataModelUpdate": {"contents": [{"key": "calc", "valueMap": [{"key": "rate", "valueString": "5.5"}]}]},
                    "surfaceUpdate": {"components": [{"id": "t", "component": {"Text": {"text": {"path": "/calc/rate"}}}}]},
                    "beginRendering": {"root": "t"}
                }}),
            ),
            &mut store,
            &mut sink,
        );
        assert_eq!(outcome, RouteOutcome::Surface);
        router.handle_frame(&frame("text", json!({"text": "it is"})), &mut store, &mut sink);

        assert_eq!(store.get("/calc/rate"), "5.5");
        assert_eq!(router.open_text().unwrap().contents, "Here it is");
        assert!(matches!(sink.events[1], SinkEvent::Surface(SurfaceView::Tree(_))));
        assert!(matches!(&sink.events[2], SinkEvent::Text(TextBufferId(1), s) if s == "Here it is"));
    }

    #[test]
    fn stray_entries_do_not_cost_the_rest_of_the_surface() {
        let mut router = MessageRouter::new();
        let mut store = DataStore::new();
        let mut sink = RecordingSink::default();
        router.begin_turn();

        let outcome = router.handle_frame(
            &frame(
                "a2ui",
                json!({"data": {
                    "dataModelUpdate": {"contents": [{"key": "loan", "valueMap": [
                        {"key": "years", "valueString": 30},
                        {"key": "rate", "valueString": "6.1"}
                    ]}]},
                    "surfaceUpdate": {"components": [
                        {"id": "root", "component": {"Column": {"children": {"explicitList": ["t"]}}}},
                        {"id": "t", "component": {"Text": {"text": {"path": "/loan/years"}}}},
                        {"component": {"Text": {"text": {"literalString": "no id"}}}}
                    ]},
                    "beginRendering": {"root": "root"}
                }}),
            ),
            &mut store,
            &mut sink,
        );

        assert_eq!(outcome, RouteOutcome::Surface);
        assert_eq!(store.get("/loan/years"), "30");
        assert_eq!(store.get("/loan/rate"), "6.1");
        let SinkEvent::Surface(SurfaceView::Tree(tree)) = &sink.events[0] else {
            panic!("expected a surface, got {:?}", sink.events);
        };
        assert_eq!(tree.len(), 2);
        assert!(tree.diagnostics().is_empty());
        let texts: Vec<&str> = (0..tree.len())
            .filter_map(|id| tree.node(id))
            .filter_map(|node| match &node.kind {
                NodeKind::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["30"]);
    }

    #[test]
    fn render_failure_becomes_system_message() {
        let mut router = MessageRouter::new();
        let mut store = DataStore::new();
        let mut sink = RecordingSink {
            fail_surfaces: true,
            ..Default::default()
        };
        let widget = frame(
            "a2ui",
            json!({"data": {"surfaceUpdate": {"components": []}, "beginRendering": {"root": "x"}}}),
        );
        assert_eq!(
            router.handle_frame(&widget, &mut store, &mut sink),
            RouteOutcome::Failed
        );
        // The loop keeps going afterwards.
        router.handle_frame(&frame("text", json!({"text": "still here"})), &mut store, &mut sink);

        match &sink.events[0] {
            SinkEvent::Error(msg) => {
                assert!(msg.starts_with("[System Error: Failed to render UI components."))
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(sink.events.len(), 2);
    }

    #[test]
    fn missing_or_invalid_widget_data_is_a_render_failure() {
        let mut router = MessageRouter::new();
        let mut store = DataStore::new();
        let mut sink = RecordingSink::default();
        for data in [json!({"kind": "a2ui"}), json!({"data": {"surfaceUpdate": "nope"}})] {
            assert_eq!(
                router.handle_frame(&frame("a2ui", data), &mut store, &mut sink),
                RouteOutcome::Failed
            );
        }
        assert!(sink.events.iter().all(|e| matches!(e, SinkEvent::Error(_))));
    }

    #[test]
    fn unknown_events_and_textless_frames_are_ignored() {
        let mut router = MessageRouter::new();
        let mut store = DataStore::new();
        let mut sink = RecordingSink::default();
        assert_eq!(
            router.handle_frame(&frame("ping", json!({})), &mut store, &mut sink),
            RouteOutcome::Ignored
        );
        assert_eq!(
            router.handle_frame(&frame("text", json!({"t": 1})), &mut store, &mut sink),
            RouteOutcome::Ignored
        );
        assert!(sink.events.is_empty());
        assert_eq!(router.state(), &TurnState::Idle);
    }

    #[test]
    fn end_turn_reports_unfinished_buffer() {
        let mut router = MessageRouter::new();
        let mut store = DataStore::new();
        let mut sink = RecordingSink::default();
        router.begin_turn();
        router.handle_frame(&frame("text", json!({"text": "partial"})), &mut store, &mut sink);
        assert!(router.end_turn());
        assert_eq!(router.state(), &TurnState::Idle);
        assert!(!sink.events.iter().any(|e| matches!(e, SinkEvent::Close(_))));
    }

    #[test]
    fn envelopes_route_by_kind() {
        let mut router = MessageRouter::new();
        let mut store = DataStore::new();
        let mut sink = RecordingSink::default();
        let text = InboundMessage {
            kind: "text".into(),
            data: None,
            text: Some("Monthly Payment: $10".into()),
        };
        let textless = InboundMessage {
            kind: "text".into(),
            data: None,
            text: None,
        };
        let widget = InboundMessage {
            kind: "a2ui".into(),
            data: Some(json!({"surfaceUpdate": {"components": []}, "beginRendering": {"root": "gone"}})),
            text: None,
        };

        router.handle_envelope(&text, &mut store, &mut sink);
        router.handle_envelope(&textless, &mut store, &mut sink);
        router.handle_envelope(&widget, &mut store, &mut sink);

        assert_eq!(sink.events[0], SinkEvent::Message("Monthly Payment: $10".into()));
        assert_eq!(sink.events[1], SinkEvent::Message("Error".into()));
        match &sink.events[2] {
            SinkEvent::Surface(SurfaceView::Tree(tree)) => assert!(tree.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
