//! Completion service — OpenAI-compatible chat completions over HTTP.
//!
//! Streaming replies arrive as server-sent events. A background task reads
//! the response body, decodes `data:` lines and forwards each content delta
//! through a bounded channel; the consumer sees that channel as a
//! [`FragmentStream`]. Dropping the stream closes the channel, which stops
//! the reader at its next send.
//!
//! Retries live here rather than in the coordinator: a request is retried
//! while it is being established, never after a fragment has been handed out.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use virtu_core::types::{ConversationMessage, DecodingArgs, LlmConfig};

use crate::error::{Error, Result};

/// Fragments buffered between the HTTP reader and the coordinator. The
/// reader keeps going while a synthesis call is outstanding.
const FRAGMENT_QUEUE_CAPACITY: usize = 256;

/// Reply fragments in generation order. Finite, not restartable.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Anything that can complete a conversation.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Start a streamed completion of `messages` with `model`.
    fn stream(&self, messages: &[ConversationMessage], model: &str) -> FragmentStream;

    /// Complete `messages` in one piece.
    async fn complete(&self, messages: &[ConversationMessage], model: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationMessage],
    stream: bool,
    #[serde(flatten)]
    decoding: &'a DecodingArgs,
}

/// Client for any server implementing `POST /chat/completions`
/// (OpenRouter, OpenAI, vLLM, Ollama, ...).
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn post(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let mut req = self.http.post(self.endpoint()).json(request);
        if !self.config.api_key.is_empty() {
            req = req.bearer_auth(&self.config.api_key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Completion(format!("{status}: {body}")))
    }

    async fn post_with_retry(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            match self.post(request).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        "llm: request failed ({e}); retry {attempt}/{} in {:?}",
                        self.config.max_retries, self.config.retry_delay
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read one streamed reply into `tx`. Returns early, without error, when
    /// the receiving side has gone away.
    async fn pump(
        &self,
        messages: &[ConversationMessage],
        model: &str,
        tx: &mpsc::Sender<Result<String>>,
    ) -> Result<()> {
        let request = ChatRequest {
            model,
            messages,
            stream: true,
            decoding: &self.config.decoding,
        };
        let resp = self.post_with_retry(&request).await?;

        let mut body = resp.bytes_stream();
        let mut lines = SseLines::default();
        let mut fragments = 0usize;

        while let Some(bytes) = body.next().await {
            let bytes = bytes?;
            for data in lines.push(&bytes) {
                match parse_event(&data)? {
                    SseEvent::Fragment(text) => {
                        fragments += 1;
                        if tx.send(Ok(text)).await.is_err() {
                            debug!("llm: receiver dropped after {fragments} fragments");
                            return Ok(());
                        }
                    }
                    SseEvent::Done => {
                        debug!("llm: stream done ({fragments} fragments)");
                        return Ok(());
                    }
                    SseEvent::Empty => {}
                }
            }
        }

        debug!("llm: body ended without [DONE] ({fragments} fragments)");
        Ok(())
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    fn stream(&self, messages: &[ConversationMessage], model: &str) -> FragmentStream {
        let (tx, rx) = mpsc::channel(FRAGMENT_QUEUE_CAPACITY);
        let client = self.clone();
        let messages = messages.to_vec();
        let model = model.to_string();

        tokio::spawn(async move {
            debug!("llm: streaming {} messages to {model}", messages.len());
            if let Err(e) = client.pump(&messages, &model, &tx).await {
                let _ = tx.send(Err(e)).await;
            }
        });

        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed()
    }

    async fn complete(&self, messages: &[ConversationMessage], model: &str) -> Result<String> {
        let mut decoding = self.config.decoding.clone();
        let mut attempt = 0;

        loop {
            let request = ChatRequest {
                model,
                messages,
                stream: false,
                decoding: &decoding,
            };
            let result = match self.post(&request).await {
                Ok(resp) => resp.json::<Value>().await.map_err(Error::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(body) => return message_content(&body),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!("llm: completion failed ({e}), attempt {attempt}");
                    if e.to_string().contains("Please reduce") {
                        decoding.max_tokens = decoding.max_tokens * 4 / 5;
                        warn!("llm: reducing max_tokens to {}", decoding.max_tokens);
                    } else {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn message_content(body: &Value) -> Result<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Completion(format!("reply has no message content: {body}")))
}

// ─── SSE decoding ──────────────────────────────────────────────────────────

/// Splits a byte stream into lines and keeps the `data:` payloads.
///
/// Bytes are decoded only once a whole line is buffered, so multi-byte
/// characters split across network reads survive.
#[derive(Default)]
struct SseLines {
    buf: Vec<u8>,
}

impl SseLines {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(end) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(data) = line.trim_end().strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Fragment(String),
    Done,
    /// Role announcements, finish markers, empty deltas.
    Empty,
}

fn parse_event(data: &str) -> Result<SseEvent> {
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let event: Value = serde_json::from_str(data)?;
    if let Some(err) = event.get("error") {
        let message = err["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(Error::Completion(message));
    }

    Ok(match event["choices"][0]["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => SseEvent::Fragment(text.to_string()),
        _ => SseEvent::Empty,
    })
}
