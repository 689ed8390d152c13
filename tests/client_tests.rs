//! End-to-end tests of the completion client against an in-process HTTP server.
//!
//! Each server accepts a single connection, captures the request, and replies
//! with a canned response written in fragments before closing the socket.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use chatline::chat::{ChatSession, Control, ProgressIndicator, Renderer};
use chatline::render::{CLEAR_LINE, SPINNER_CADENCE, SharedWriter};
use chatline::{
    ChatCompletion, ChatCompletionRequest, ClientLogger, CompletionClient, Completions, Error,
    Message, Mode, StreamEvent,
};

/// A request as seen by the fake server.
struct CapturedRequest {
    head: String,
    body: Value,
}

async fn serve_once(
    status_line: &str,
    content_type: &str,
    fragments: Vec<impl Into<Vec<u8>>>,
) -> (String, JoinHandle<CapturedRequest>) {
    let fragments: Vec<Vec<u8>> = fragments.into_iter().map(Into::into).collect();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let head = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nConnection: close\r\n\r\n"
    );
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        // The client may hang up early; write errors are not failures.
        let _ = socket.write_all(head.as_bytes()).await;
        for fragment in fragments {
            let _ = socket.write_all(&fragment).await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let _ = socket.shutdown().await;
        request
    });
    (format!("http://{addr}/v1/chat/completions"), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8(buf[..header_end].to_vec()).unwrap();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().unwrap())
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before body");
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = serde_json::from_slice(&buf[header_end..header_end + content_length]).unwrap();
    CapturedRequest {
        head: head.to_ascii_lowercase(),
        body,
    }
}

fn data(token: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"content": token}}]})
    )
}

fn client(endpoint: &str) -> CompletionClient {
    CompletionClient::with_options("sk-test", "gpt-3.5-turbo", Some(endpoint), None).unwrap()
}

#[derive(Debug, Default)]
struct RecordingRenderer {
    events: Vec<String>,
}

impl Renderer for RecordingRenderer {
    fn start_reply(&mut self, mode: Mode) {
        self.events.push(format!("start:{mode}"));
    }

    fn print_text(&mut self, text: &str) {
        self.events.push(format!("text:{text}"));
    }

    fn print_markdown(&mut self, markdown: &str) {
        self.events.push(format!("markdown:{markdown}"));
    }

    fn print_error(&mut self, error: &str) {
        self.events.push(format!("error:{error}"));
    }

    fn print_info(&mut self, info: &str) {
        self.events.push(format!("info:{info}"));
    }

    fn finish_response(&mut self) {
        self.events.push("finish".to_string());
    }
}

/// Renderer whose progress indicator draws into a captured buffer.
#[derive(Default)]
struct SpinnerRenderer {
    output: Arc<Mutex<Vec<u8>>>,
}

impl SpinnerRenderer {
    fn drawn(&self) -> String {
        String::from_utf8(self.output.lock().unwrap().clone()).unwrap()
    }
}

impl Renderer for SpinnerRenderer {
    fn start_reply(&mut self, _: Mode) {}

    fn print_text(&mut self, _: &str) {}

    fn print_markdown(&mut self, _: &str) {}

    fn print_error(&mut self, _: &str) {}

    fn print_info(&mut self, _: &str) {}

    fn start_progress(&mut self) -> ProgressIndicator {
        let writer: SharedWriter = self.output.clone();
        ProgressIndicator::start(writer, SPINNER_CADENCE)
    }

    fn finish_response(&mut self) {}
}

/// Logger that remembers every stream event it is handed.
#[derive(Default)]
struct EventLogger {
    events: Mutex<Vec<StreamEvent>>,
}

impl ClientLogger for EventLogger {
    fn log_request(&self, _: &ChatCompletionRequest<'_>) {}

    fn log_response(&self, _: &ChatCompletion) {}

    fn log_stream_event(&self, event: &StreamEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn log_error(&self, _: &Error) {}
}

#[tokio::test]
async fn streaming_reply_is_echoed_and_accumulated() {
    let fragments = vec![
        ": keep-alive\n\n".to_string(),
        data("Hel"),
        data("lo"),
        "data: {not json}\n\n".to_string(),
        data(", world"),
        "data: [DONE]\n\n".to_string(),
    ];
    let (endpoint, server) = serve_once("200 OK", "text/event-stream", fragments).await;
    let client = client(&endpoint);
    let mut renderer = RecordingRenderer::default();

    let reply = client
        .complete_streaming(&[Message::user("hi")], &mut renderer)
        .await
        .unwrap();

    assert_eq!(reply, "Hello, world");
    assert_eq!(
        renderer.events,
        vec!["start:streaming", "text:Hel", "text:lo", "text:, world"]
    );

    let request = server.await.unwrap();
    assert!(request.head.starts_with("post /v1/chat/completions"));
    assert!(request.head.contains("authorization: bearer sk-test"));
    assert_eq!(
        request.body,
        json!({
            "model": "gpt-3.5-turbo",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true,
        })
    );
}

#[tokio::test]
async fn stream_stops_at_done_sentinel() {
    let fragments = vec![
        data("only"),
        "data: [DONE]\n\n".to_string(),
        data("ignored"),
    ];
    let (endpoint, server) = serve_once("200 OK", "text/event-stream", fragments).await;
    let mut renderer = RecordingRenderer::default();

    let reply = client(&endpoint)
        .complete_streaming(&[Message::user("hi")], &mut renderer)
        .await
        .unwrap();

    assert_eq!(reply, "only");
    server.await.unwrap();
}

#[tokio::test]
async fn line_split_across_writes_is_reassembled() {
    let line = data("Grüße").into_bytes();
    // Split between the two bytes of 'ü'.
    let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
    let fragments = vec![
        line[..split].to_vec(),
        line[split..].to_vec(),
        b"data: [DONE]\n".to_vec(),
    ];
    let (endpoint, server) = serve_once("200 OK", "text/event-stream", fragments).await;
    let mut renderer = RecordingRenderer::default();

    let reply = client(&endpoint)
        .complete_streaming(&[Message::user("hi")], &mut renderer)
        .await
        .unwrap();

    assert_eq!(reply, "Grüße");
    server.await.unwrap();
}

#[tokio::test]
async fn buffered_reply_returns_first_choice() {
    let body = json!({
        "id": "chatcmpl-1",
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "# Title\n\n- item"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 4, "total_tokens": 9}
    });
    let (endpoint, server) =
        serve_once("200 OK", "application/json", vec![body.to_string()]).await;
    let mut renderer = RecordingRenderer::default();

    let reply = client(&endpoint)
        .complete_buffered(
            &[Message::user("hi"), Message::assistant("hello"), Message::user("list")],
            &mut renderer,
        )
        .await
        .unwrap();

    assert_eq!(reply, "# Title\n\n- item");
    assert!(renderer.events.is_empty());
    let request = server.await.unwrap();
    assert_eq!(request.body["stream"], json!(false));
    assert_eq!(request.body["messages"].as_array().unwrap().len(), 3);
    assert_eq!(request.body["messages"][1]["role"], "assistant");
}

#[tokio::test]
async fn unauthorized_is_an_upstream_error_with_body() {
    let body = json!({"error": {"message": "Incorrect API key provided"}}).to_string();
    let (endpoint, server) = serve_once("401 Unauthorized", "application/json", vec![body]).await;
    let mut renderer = RecordingRenderer::default();

    let err = client(&endpoint)
        .complete_streaming(&[Message::user("hi")], &mut renderer)
        .await
        .unwrap_err();

    assert!(err.is_upstream());
    assert_eq!(err.status_code(), Some(401));
    assert!(err.to_string().contains("Incorrect API key provided"));
    assert!(renderer.events.is_empty());
    server.await.unwrap();
}

#[tokio::test]
async fn undecodable_lines_are_not_logged() {
    let fragments = vec![
        "data: {bad\n\n".to_string(),
        ": ping\n\n".to_string(),
        data("ok"),
        "data: {\"choices\":[]}\n\n".to_string(),
        "data: [DONE]\n\n".to_string(),
    ];
    let (endpoint, server) = serve_once("200 OK", "text/event-stream", fragments).await;
    let logger = Arc::new(EventLogger::default());
    let client = client(&endpoint).with_logger(logger.clone());
    let mut renderer = RecordingRenderer::default();

    let reply = client
        .complete_streaming(&[Message::user("hi")], &mut renderer)
        .await
        .unwrap();

    assert_eq!(reply, "ok");
    assert_eq!(
        *logger.events.lock().unwrap(),
        vec![StreamEvent::Token("ok".to_string()), StreamEvent::Terminal]
    );
    server.await.unwrap();
}

#[tokio::test]
async fn buffered_unauthorized_stops_progress_indicator() {
    let body = json!({"error": "bad key"}).to_string();
    let (endpoint, server) = serve_once("401 Unauthorized", "application/json", vec![body]).await;
    let mut renderer = SpinnerRenderer::default();

    let err = client(&endpoint)
        .complete_buffered(&[Message::user("hi")], &mut renderer)
        .await
        .unwrap_err();

    assert!(err.is_upstream());
    assert_eq!(err.status_code(), Some(401));
    assert!(err.to_string().contains("bad key"));
    let stopped = renderer.drawn();
    assert!(stopped.ends_with(CLEAR_LINE));

    tokio::time::sleep(SPINNER_CADENCE * 4).await;
    assert_eq!(renderer.drawn(), stopped);
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_buffered_body_is_a_response_shape_error() {
    let (endpoint, server) =
        serve_once("200 OK", "application/json", vec!["not json".to_string()]).await;
    let mut renderer = RecordingRenderer::default();

    let err = client(&endpoint)
        .complete_buffered(&[Message::user("hi")], &mut renderer)
        .await
        .unwrap_err();

    assert!(err.is_response_shape());
    server.await.unwrap();
}

#[tokio::test]
async fn missing_content_is_a_response_shape_error() {
    let body = json!({"choices": []}).to_string();
    let (endpoint, server) = serve_once("200 OK", "application/json", vec![body]).await;
    let mut renderer = RecordingRenderer::default();

    let err = client(&endpoint)
        .complete_buffered(&[Message::user("hi")], &mut renderer)
        .await
        .unwrap_err();

    assert!(err.is_response_shape());
    server.await.unwrap();
}

#[tokio::test]
async fn refused_connection_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let mut renderer = RecordingRenderer::default();

    let err = client(&format!("http://{addr}/v1/chat/completions"))
        .complete_streaming(&[Message::user("hi")], &mut renderer)
        .await
        .unwrap_err();

    assert!(err.is_connection());
}

#[tokio::test]
async fn markdown_session_end_to_end() {
    let body = json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "**done**"}}]
    });
    let (endpoint, server) =
        serve_once("200 OK", "application/json", vec![body.to_string()]).await;
    let mut session = ChatSession::new(client(&endpoint), Mode::Streaming);
    let mut renderer = RecordingRenderer::default();

    let control = session.handle_line("/nsm finish up", &mut renderer).await;

    assert_eq!(control, Control::Continue);
    assert_eq!(session.mode(), Mode::Rendered);
    assert_eq!(
        session.conversation().snapshot(),
        &[Message::user("finish up"), Message::assistant("**done**")]
    );
    assert_eq!(
        renderer.events.last().map(String::as_str),
        Some("markdown:**done**")
    );
    server.await.unwrap();
}
