//! Shared types for the virtu avatar backend.
//!
//! Conversation messages, voice selection, and the configuration structs
//! consumed by virtu-lib and virtu-cli. Kept here so consumers can depend on
//! them without pulling in tokio, reqwest, or axum.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::segment::{DEFAULT_MAX_CHUNK_LEN, DEFAULT_MIN_CHUNK_LEN};

// ─── Conversation ──────────────────────────────────────────────────────────

/// Author of a [`ConversationMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a session's chat history, in the chat-completions wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Speaker identity handed to the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub language: String,
    pub speaker: String,
}

impl Voice {
    pub fn new(language: impl Into<String>, speaker: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            speaker: speaker.into(),
        }
    }
}

// ─── Segmentation ──────────────────────────────────────────────────────────

/// Chunk size thresholds, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Below this length no cut is attempted.
    pub min_chunk_len: usize,
    /// The first boundary at or past this length forces a cut.
    pub max_chunk_len: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_chunk_len: DEFAULT_MIN_CHUNK_LEN,
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
        }
    }
}

// ─── LLM ───────────────────────────────────────────────────────────────────

/// Sampling parameters sent with every chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodingArgs {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl Default for DecodingArgs {
    fn default() -> Self {
        Self {
            max_tokens: 2560,
            temperature: 1.0,
            top_p: 1.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            stop: None,
        }
    }
}

/// Completion service configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub api_key: String,
    pub decoding: DecodingArgs,
    /// Attempts after the first failed request before giving up.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".into(),
            api_key: String::new(),
            decoding: DecodingArgs::default(),
            max_retries: 3,
            retry_delay: Duration::from_secs(20),
        }
    }
}

// ─── TTS ───────────────────────────────────────────────────────────────────

/// Speech synthesis service configuration.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub url: String,
    pub sample_rate: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8001".into(),
            sample_rate: 48_000,
        }
    }
}
