//! Fake collaborators for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use virtu_core::catalog::Catalogs;
use virtu_core::protocol::Outbound;
use virtu_core::types::{ConversationMessage, SegmentConfig, Voice};

use crate::coordinator::{Coordinator, TurnSink};
use crate::error::{Error, Result};
use crate::llm::{CompletionService, FragmentStream};
use crate::state::AppState;
use crate::tts::SpeechSynthesizer;

/// Replays fixed fragments, optionally ending in an upstream error, and
/// records what it was asked and how much of the reply was read.
#[derive(Default)]
pub struct ScriptedCompletion {
    pub fragments: Vec<String>,
    pub error: Option<String>,
    pub requests: Mutex<Vec<(String, Vec<ConversationMessage>)>>,
    pub consumed: Arc<AtomicUsize>,
}

impl ScriptedCompletion {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing_after(fragments: &[&str], error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(fragments)
        }
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    fn stream(&self, messages: &[ConversationMessage], model: &str) -> FragmentStream {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));

        let mut items: Vec<Result<String>> = self.fragments.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.error {
            items.push(Err(Error::Completion(message.clone())));
        }
        let consumed = self.consumed.clone();
        stream::iter(items)
            .inspect(move |_| {
                consumed.fetch_add(1, Ordering::SeqCst);
            })
            .boxed()
    }

    async fn complete(&self, _messages: &[ConversationMessage], _model: &str) -> Result<String> {
        Ok(self.fragments.concat())
    }
}

/// "Synthesizes" by echoing the text as bytes, prefixed with the speaker.
pub struct EchoSynthesizer;

#[async_trait]
impl SpeechSynthesizer for EchoSynthesizer {
    async fn synthesize(&self, text: &str, voice: &Voice) -> Result<Vec<u8>> {
        Ok(format!("{}:{text}", voice.speaker).into_bytes())
    }
}

pub struct FailingSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FailingSynthesizer {
    async fn synthesize(&self, _text: &str, _voice: &Voice) -> Result<Vec<u8>> {
        Err(Error::Synthesis("service down".into()))
    }
}

/// Collects outbound messages; refuses every send once `capacity` is hit,
/// and reports itself closed from then on.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Vec<Outbound>,
    pub capacity: Option<usize>,
}

impl RecordingSink {
    pub fn disconnecting_after(capacity: usize) -> Self {
        Self {
            sent: Vec::new(),
            capacity: Some(capacity),
        }
    }
}

#[async_trait]
impl TurnSink for RecordingSink {
    async fn send(&mut self, message: Outbound) -> Result<()> {
        if Some(self.sent.len()) == self.capacity {
            return Err(Error::Disconnected);
        }
        self.sent.push(message);
        Ok(())
    }

    async fn closed(&mut self) {
        if Some(self.sent.len()) != self.capacity {
            std::future::pending::<()>().await;
        }
    }
}

pub fn coordinator(
    completion: impl CompletionService + 'static,
    synthesizer: impl SpeechSynthesizer + 'static,
) -> Coordinator {
    Coordinator::new(
        Arc::new(completion),
        Arc::new(synthesizer),
        SegmentConfig::default(),
    )
}

/// Application state over the built-in catalogs and the given fakes.
pub fn app_state(
    completion: impl CompletionService + 'static,
    synthesizer: impl SpeechSynthesizer + 'static,
) -> AppState {
    AppState::new(Catalogs::default(), coordinator(completion, synthesizer))
}

/// Like [`app_state`], keeping a handle on the completion fake.
pub fn shared_app_state(completion: Arc<ScriptedCompletion>) -> AppState {
    let coordinator = Coordinator::new(
        completion,
        Arc::new(EchoSynthesizer),
        SegmentConfig::default(),
    );
    AppState::new(Catalogs::default(), coordinator)
}
