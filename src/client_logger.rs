//! Logging trait for completion client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! every request and response passing through the
//! [`CompletionClient`](crate::CompletionClient), plus [`JsonLinesLogger`], a
//! file-backed implementation used by the `--log-file` flag.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::Mutex;

use serde_json::{Value, json};

use crate::types::{ChatCompletion, ChatCompletionRequest, StreamEvent};
use crate::{Error, Result};

/// A trait for logging completion client operations.
///
/// Implement this trait to record all API interactions, including the request
/// payloads, individual streaming events and complete buffered responses.
pub trait ClientLogger: Send + Sync {
    /// Log the payload of an outgoing request.
    fn log_request(&self, request: &ChatCompletionRequest<'_>);

    /// Log a complete response from a buffered request.
    fn log_response(&self, completion: &ChatCompletion);

    /// Log a token or the terminal event of a streamed reply.
    ///
    /// Undecodable lines are never passed here.
    fn log_stream_event(&self, event: &StreamEvent);

    /// Log a request that failed.
    fn log_error(&self, error: &Error);
}

/// Appends one JSON object per logged operation to a file.
pub struct JsonLinesLogger {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesLogger {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &str) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| Error::io(format!("failed to open log file {path}"), err))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_record(&self, record: Value) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        // Logging must never fail a turn.
        let _ = writeln!(writer, "{record}");
        let _ = writer.flush();
    }
}

impl ClientLogger for JsonLinesLogger {
    fn log_request(&self, request: &ChatCompletionRequest<'_>) {
        self.write_record(json!({"kind": "request", "request": request}));
    }

    fn log_response(&self, completion: &ChatCompletion) {
        self.write_record(json!({"kind": "response", "response": completion}));
    }

    fn log_stream_event(&self, event: &StreamEvent) {
        let record = match event {
            StreamEvent::Token(token) => json!({"kind": "stream_token", "token": token}),
            StreamEvent::Terminal => json!({"kind": "stream_done"}),
            StreamEvent::Malformed => return,
        };
        self.write_record(record);
    }

    fn log_error(&self, error: &Error) {
        let mut record = json!({"kind": "error", "error": error.to_string()});
        if let Some(status_code) = error.status_code() {
            record["status_code"] = json!(status_code);
        }
        self.write_record(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    fn temp_log_path(name: &str) -> String {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("chatline-{name}-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn writes_one_json_object_per_line() {
        let path = temp_log_path("logger");
        let logger = JsonLinesLogger::open(&path).unwrap();
        let messages = vec![Message::user("hello")];
        logger.log_request(&ChatCompletionRequest::streaming("m", &messages));
        logger.log_stream_event(&StreamEvent::Token("Hi".to_string()));
        logger.log_stream_event(&StreamEvent::Malformed);
        logger.log_stream_event(&StreamEvent::Terminal);
        logger.log_error(&Error::upstream(401, "bad key"));
        drop(logger);

        let contents = std::fs::read_to_string(&path).unwrap();
        let records: Vec<Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0]["kind"], "request");
        assert_eq!(records[0]["request"]["messages"][0]["content"], "hello");
        assert_eq!(records[1]["token"], "Hi");
        assert_eq!(records[2]["kind"], "stream_done");
        assert_eq!(records[3]["status_code"], 401);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn open_fails_for_missing_directory() {
        let err = JsonLinesLogger::open("/nonexistent-chatline-dir/log.jsonl")
            .err()
            .unwrap();
        assert!(matches!(err, Error::Io { .. }));
    }
}
