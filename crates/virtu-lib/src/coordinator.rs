//! Turn coordinator — one user message in, expression + text + audio out.
//!
//! ```text
//! user text → Session::begin_turn → CompletionService::stream
//!     → StreamAccumulator: emotion → {"expression"}
//!                          chunks  → {"text"} + synthesize → audio
//!     → stream end: flush → {"done": true} → Session::finish_turn
//! ```
//!
//! Synthesis is awaited inline, so audio clips reach the client in chunk
//! order and no later chunk is dispatched while one is outstanding. The
//! fragment reader keeps filling its channel meanwhile.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, info};

use virtu_core::catalog::Catalogs;
use virtu_core::protocol::Outbound;
use virtu_core::segment::is_speakable;
use virtu_core::session::Session;
use virtu_core::turn::StreamAccumulator;
use virtu_core::types::{SegmentConfig, Voice};

use crate::error::{Error, Result};
use crate::llm::CompletionService;
use crate::tts::SpeechSynthesizer;

/// Where a turn's output goes. Any send error is treated as a disconnect.
#[async_trait]
pub trait TurnSink: Send {
    async fn send(&mut self, message: Outbound) -> Result<()>;

    /// Resolves once the client is gone. Waiting for fragments races
    /// against this, so a departure is noticed even while nothing is sent.
    async fn closed(&mut self) {
        std::future::pending::<()>().await
    }
}

/// Stateless turn runner shared by every connection.
pub struct Coordinator {
    completion: Arc<dyn CompletionService>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    segment: SegmentConfig,
}

impl Coordinator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        segment: SegmentConfig,
    ) -> Self {
        Self {
            completion,
            synthesizer,
            segment,
        }
    }

    /// Run one turn to completion.
    ///
    /// On error the turn is abandoned where it stands: chunks already sent
    /// stay sent, no done marker follows and nothing is archived. The user
    /// message remains in the history.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        catalogs: &Catalogs,
        text: &str,
        sink: &mut dyn TurnSink,
    ) -> Result<()> {
        let started = Instant::now();
        session.begin_turn(text, catalogs);

        let profile = session.profile(catalogs);
        let voice = session.voice().clone();
        let mut acc = StreamAccumulator::new(self.segment);
        let mut fragments = self.completion.stream(session.history(), session.llm());
        let mut chunks = 0usize;

        loop {
            let fragment = tokio::select! {
                biased;
                _ = sink.closed() => {
                    debug!("turn: client gone, dropping completion stream");
                    return Err(Error::Disconnected);
                }
                next = fragments.next() => match next {
                    Some(fragment) => fragment?,
                    None => break,
                },
            };

            if let Some(emotion) = acc.push(&fragment, profile) {
                debug!("turn: emotion {emotion}");
                sink.send(Outbound::Expression(emotion)).await?;
            }
            while let Some(chunk) = acc.next_chunk() {
                self.dispatch(chunk, &voice, sink).await?;
                chunks += 1;
            }
        }

        if let Some(rest) = acc.flush() {
            self.dispatch(rest, &voice, sink).await?;
            chunks += 1;
        }
        sink.send(Outbound::Done).await?;

        let reply = acc.finish();
        info!(
            "turn: {chunks} chunks, {} chars in {:?}",
            reply.chars().count(),
            started.elapsed()
        );
        session.finish_turn(reply);
        Ok(())
    }

    /// Send a chunk's text, then its audio. Chunks with nothing to
    /// pronounce are sent as text only.
    async fn dispatch(&self, chunk: String, voice: &Voice, sink: &mut dyn TurnSink) -> Result<()> {
        let speakable = is_speakable(&chunk);
        let spoken = format!("{chunk} ");
        sink.send(Outbound::Text(chunk)).await?;

        if !speakable {
            debug!("turn: skipping synthesis of unspeakable chunk");
            return Ok(());
        }
        let audio = self.synthesizer.synthesize(&spoken, voice).await?;
        sink.send(Outbound::Audio(audio)).await
    }
}
