use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CLIENT_UPSTREAM_ERRORS,
    STREAM_NOISE, STREAM_TOKENS, STREAM_TTFB,
};
use crate::render::Renderer;
use crate::sse::process_sse;
use crate::types::{ChatCompletion, ChatCompletionRequest, Message, Mode, StreamEvent};

/// The chat completions endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// The model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// The request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

//////////////////////////////////////////// Completions ///////////////////////////////////////////

/// Turns a conversation snapshot into the assistant's reply.
///
/// Implementations write progress to the renderer (token echoes or the
/// progress indicator) but never touch the conversation; the caller appends
/// both the user message and the returned reply.
#[async_trait::async_trait]
pub trait Completions: Send + Sync {
    /// The model identifier sent with every request.
    fn model(&self) -> &str;

    /// Requests a streamed reply, echoing every token to `renderer` as it
    /// arrives, and returns the accumulated text.
    async fn complete_streaming(
        &self,
        messages: &[Message],
        renderer: &mut dyn Renderer,
    ) -> Result<String>;

    /// Requests the complete reply at once while `renderer` shows progress.
    async fn complete_buffered(
        &self,
        messages: &[Message],
        renderer: &mut dyn Renderer,
    ) -> Result<String>;
}

///////////////////////////////////////// CompletionClient /////////////////////////////////////////

/// Client for a chat completions endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    api_key: String,
    model: String,
    endpoint: Url,
    client: ReqwestClient,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl CompletionClient {
    /// Create a new client for the default endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, model, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::configuration("an API key is required"));
        }
        let endpoint = Url::parse(endpoint.unwrap_or(DEFAULT_ENDPOINT))?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            model: model.into(),
            endpoint,
            client,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every request, event and response.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The endpoint requests are POSTed to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::configuration("API key contains invalid header characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Turn a non-2xx response into an upstream error carrying its body.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        match response.text().await {
            Ok(body) => Error::upstream(status_code, body),
            Err(e) => Error::upstream(status_code, format!("<unreadable body: {e}>")),
        }
    }

    fn map_request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    fn record_error(&self, error: &Error) {
        CLIENT_REQUEST_ERRORS.click();
        if error.is_upstream() {
            CLIENT_UPSTREAM_ERRORS.click();
        }
        if let Some(logger) = &self.logger {
            logger.log_error(error);
        }
    }

    async fn post(&self, request: &ChatCompletionRequest<'_>) -> Result<Response> {
        CLIENT_REQUESTS.click();
        if let Some(logger) = &self.logger {
            logger.log_request(request);
        }

        let mut headers = self.default_headers()?;
        if request.stream {
            headers.insert(
                header::ACCEPT,
                HeaderValue::from_static("text/event-stream"),
            );
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e));
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.record_error(&err);
                return Err(err);
            }
        };

        if !response.status().is_success() {
            let err = Self::process_error_response(response).await;
            self.record_error(&err);
            return Err(err);
        }
        Ok(response)
    }

    /// Send the conversation and get a complete, non-streaming response.
    pub async fn send(&self, messages: &[Message]) -> Result<ChatCompletion> {
        let start = Instant::now();
        let request = ChatCompletionRequest::buffered(&self.model, messages);
        let response = self.post(&request).await?;

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let err = self.map_request_error(e);
                self.record_error(&err);
                return Err(err);
            }
        };
        let completion = serde_json::from_str::<ChatCompletion>(&body).map_err(|e| {
            Error::response_shape(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        });
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        match completion {
            Ok(completion) => {
                if let Some(logger) = &self.logger {
                    logger.log_response(&completion);
                }
                Ok(completion)
            }
            Err(err) => {
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Send the conversation and get a streaming response.
    ///
    /// Returns the lazily decoded events of the response body.
    pub async fn stream(
        &self,
        messages: &[Message],
    ) -> Result<impl Stream<Item = Result<StreamEvent>>> {
        let request = ChatCompletionRequest::streaming(&self.model, messages);
        let response = self.post(&request).await?;
        Ok(process_sse(response.bytes_stream()))
    }
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Completions for CompletionClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_streaming(
        &self,
        messages: &[Message],
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let start = Instant::now();
        let events = self.stream(messages).await?;
        futures::pin_mut!(events);
        renderer.start_reply(Mode::Streaming);

        let mut reply = String::new();
        let mut first_token = true;
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    self.record_error(&err);
                    return Err(err);
                }
            };
            if !matches!(event, StreamEvent::Malformed)
                && let Some(logger) = &self.logger
            {
                logger.log_stream_event(&event);
            }
            match event {
                StreamEvent::Token(token) => {
                    if first_token {
                        STREAM_TTFB.add(start.elapsed().as_secs_f64());
                        first_token = false;
                    }
                    STREAM_TOKENS.click();
                    renderer.print_text(&token);
                    reply.push_str(&token);
                }
                StreamEvent::Terminal => break,
                StreamEvent::Malformed => STREAM_NOISE.click(),
            }
        }
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        Ok(reply)
    }

    async fn complete_buffered(
        &self,
        messages: &[Message],
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let progress = renderer.start_progress();
        let completion = self.send(messages).await;
        progress.stop();

        let completion = completion?;
        match completion.first_content() {
            Some(content) => Ok(content.to_string()),
            None => {
                let err =
                    Error::response_shape("response has no choices[0].message.content", None);
                self.record_error(&err);
                Err(err)
            }
        }
    }
}
