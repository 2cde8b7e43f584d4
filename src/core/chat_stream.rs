use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{ChatRequest, InboundMessage, CLIENT_A2UI_HEADER};
use crate::core::action::{ActionRequest, ActionTransport};
use crate::core::frame_parser::{FrameParser, StreamFrame};
use crate::utils::url::construct_api_url;

pub const STREAM_ENDPOINT: &str = "chat/stream";
pub const CHAT_ENDPOINT: &str = "chat";

#[derive(Debug)]
pub enum TransportError {
    Connect { message: String },
    Status { status: u16, body: String },
    Body { message: String },
    Decode { message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect { message } => {
                write!(f, "Error connecting to server: {message}")
            }
            TransportError::Status { status, body } => match extract_error_summary(body) {
                Some(summary) => write!(f, "Server error {status}: {summary}"),
                None if body.trim().is_empty() => write!(f, "Server error {status}"),
                None => write!(f, "Server error {status}: {}", body.trim()),
            },
            TransportError::Body { message } => {
                write!(f, "Connection lost while reading the response: {message}")
            }
            TransportError::Decode { message } => {
                write!(f, "Unexpected reply from server: {message}")
            }
        }
    }
}

impl StdError for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode {
                message: err.to_string(),
            }
        } else if err.is_body() {
            TransportError::Body {
                message: err.to_string(),
            }
        } else {
            TransportError::Connect {
                message: err.to_string(),
            }
        }
    }
}

/// Pulls a one-line summary out of a JSON error body.
fn extract_error_summary(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("detail").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))?;
    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(collapsed).filter(|s| !s.is_empty())
}

/// Endpoint and capability settings for one server.
#[derive(Clone, Debug)]
pub struct ServerConnection {
    pub client: reqwest::Client,
    pub base_url: String,
    pub accept_widgets: bool,
    /// Outgoing `text` for action requests; the action name when unset.
    pub action_text: Option<String>,
}

impl ServerConnection {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            accept_widgets: true,
            action_text: None,
        }
    }

    fn post(&self, endpoint: &str, accept_widgets: bool) -> reqwest::RequestBuilder {
        self.client
            .post(construct_api_url(&self.base_url, endpoint))
            .header("Content-Type", "application/json")
            .header(CLIENT_A2UI_HEADER, if accept_widgets { "true" } else { "false" })
    }

    /// Non-streaming turn against `/chat`.
    pub async fn send(
        &self,
        request: &ChatRequest,
        accept_widgets: bool,
    ) -> Result<InboundMessage, TransportError> {
        let response = self
            .post(CHAT_ENDPOINT, accept_widgets)
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| TransportError::Decode {
            message: err.to_string(),
        })
    }

    pub fn action_request(&self, request: &ActionRequest) -> ChatRequest {
        ChatRequest {
            text: self
                .action_text
                .clone()
                .unwrap_or_else(|| request.name.clone()),
            client_context: Some(request.context.clone()),
        }
    }
}

#[async_trait]
impl ActionTransport for ServerConnection {
    async fn send_action(&self, request: &ActionRequest) -> Result<InboundMessage, TransportError> {
        // Action replies are always allowed to carry widgets.
        self.send(&self.action_request(request), true).await
    }
}

#[derive(Debug)]
pub enum StreamMessage {
    Frame(StreamFrame),
    Error(TransportError),
    End,
}

pub struct StreamParams {
    pub connection: ServerConnection,
    pub request: ChatRequest,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                connection,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = read_stream(&connection, &request, &tx, stream_id) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn read_stream(
    connection: &ServerConnection,
    request: &ChatRequest,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) {
    let send_error = |err: TransportError| {
        let _ = tx.send((StreamMessage::Error(err), stream_id));
        let _ = tx.send((StreamMessage::End, stream_id));
    };

    let response = match connection
        .post(STREAM_ENDPOINT, connection.accept_widgets)
        .json(request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => return send_error(err.into()),
    };

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return send_error(TransportError::Status { status, body });
    }

    let mut parser = FrameParser::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for frame in parser.feed(&bytes) {
                    if tx.send((StreamMessage::Frame(frame), stream_id)).is_err() {
                        return;
                    }
                }
            }
            Err(err) => return send_error(err.into()),
        }
    }

    if parser.buffered_len() > 0 {
        debug!(
            stream_id,
            bytes = parser.buffered_len(),
            "stream ended inside a line"
        );
    }
    let _ = tx.send((StreamMessage::End, stream_id));
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    pub(crate) struct CapturedRequest {
        pub(crate) request_line: String,
        pub(crate) headers: Vec<(String, String)>,
        pub(crate) body: serde_json::Value,
    }

    impl CapturedRequest {
        pub(crate) fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    pub(crate) async fn read_http_request(stream: &mut TcpStream) -> CapturedRequest {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let read = stream.read(&mut chunk).await.expect("read request");
            assert!(read > 0, "unexpected EOF in request headers");
            raw.extend_from_slice(&chunk[..read]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
        };

        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let content_length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = raw[header_end + 4..].to_vec();
        while body.len() < content_length {
            let read = stream.read(&mut chunk).await.expect("read body");
            assert!(read > 0, "unexpected EOF in request body");
            body.extend_from_slice(&chunk[..read]);
        }
        body.truncate(content_length);

        CapturedRequest {
            request_line,
            headers,
            body: serde_json::from_slice(&body).expect("json body"),
        }
    }

    #[tokio::test]
    async fn stream_turn_reassembles_frames_across_writes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_http_request(&mut stream).await;
            let body = "event: text\ndata: {\"text\":\"안녕\"}\n\nevent: done\ndata: {}\n\n";
            let bytes = body.as_bytes();
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\n\r\n",
                bytes.len()
            );
            stream.write_all(head.as_bytes()).await.unwrap();
            // Split inside the first Hangul syllable.
            let cut = body.find('안').unwrap() + 1;
            stream.write_all(&bytes[..cut]).await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            stream.write_all(&bytes[cut..]).await.unwrap();
            stream.flush().await.unwrap();
            request
        });

        let (service, mut rx) = ChatStreamService::new();
        let mut connection = ServerConnection::new(format!("http://{addr}/"));
        connection.accept_widgets = false;
        service.spawn_stream(StreamParams {
            connection,
            request: ChatRequest::prompt("hello"),
            cancel_token: tokio_util::sync::CancellationToken::new(),
            stream_id: 7,
        });

        let mut frames = Vec::new();
        while let Some((message, stream_id)) = rx.recv().await {
            assert_eq!(stream_id, 7);
            match message {
                StreamMessage::Frame(frame) => frames.push(frame),
                StreamMessage::Error(err) => panic!("unexpected error: {err}"),
                StreamMessage::End => break,
            }
        }

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, json!({"text": "안녕"}));
        assert_eq!(frames[1].event, "done");

        let request = server.await.unwrap();
        assert_eq!(request.request_line, "POST /chat/stream HTTP/1.1");
        assert_eq!(request.header(CLIENT_A2UI_HEADER), Some("false"));
        assert_eq!(request.body, json!({"text": "hello"}));
    }

    #[tokio::test]
    async fn action_posts_context_and_reads_envelope() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_http_request(&mut stream).await;
            let body = r#"{"kind":"text","text":"Monthly Payment: $1.00"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            request
        });

        let mut connection = ServerConnection::new(format!("http://{addr}"));
        connection.accept_widgets = false;
        connection.action_text = Some("recalculate".into());
        let reply = connection
            .send_action(&ActionRequest {
                name: "calculateLoan".into(),
                context: BTreeMap::from([("annualRate".to_string(), "5.5".to_string())]),
            })
            .await
            .unwrap();
        assert_eq!(reply.text.as_deref(), Some("Monthly Payment: $1.00"));

        let request = server.await.unwrap();
        assert_eq!(request.request_line, "POST /chat HTTP/1.1");
        assert_eq!(request.header(CLIENT_A2UI_HEADER), Some("true"));
        assert_eq!(
            request.body,
            json!({"text": "recalculate", "client_context": {"annualRate": "5.5"}})
        );
    }

    #[tokio::test]
    async fn unreachable_server_reports_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(StreamParams {
            connection: ServerConnection::new(format!("http://{addr}")),
            request: ChatRequest::prompt("hi"),
            cancel_token: tokio_util::sync::CancellationToken::new(),
            stream_id: 1,
        });

        let (first, _) = rx.recv().await.unwrap();
        match first {
            StreamMessage::Error(TransportError::Connect { .. }) => {}
            other => panic!("expected connect error, got {other:?}"),
        }
        assert!(matches!(rx.recv().await, Some((StreamMessage::End, 1))));
    }

    #[test]
    fn status_error_prefers_json_summary() {
        let err = TransportError::Status {
            status: 422,
            body: r#"{"detail":"text   field required"}"#.into(),
        };
        assert_eq!(err.to_string(), "Server error 422: text field required");

        let err = TransportError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "Server error 500: boom");
    }

    #[test]
    fn action_text_defaults_to_action_name() {
        let connection = ServerConnection::new("http://localhost");
        let request = connection.action_request(&ActionRequest {
            name: "reserve".into(),
            context: BTreeMap::new(),
        });
        assert_eq!(request.text, "reserve");
        assert_eq!(request.client_context, Some(BTreeMap::new()));
    }
}
