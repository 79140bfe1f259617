//! Per-turn stream accumulator.
//!
//! Drives emotion parsing, markup stripping and sentence batching over the
//! fragments of one streamed reply. Pure state, no I/O — the async side in
//! virtu-lib feeds fragments in and ships whatever comes out.
//!
//! ```text
//! AwaitingEmotion ──emotion found──▶ EmittingChunks
//!        │                                │
//!        └────────stream end──────▶ Flushing ──▶ Done
//! ```

use crate::catalog::AvatarProfile;
use crate::emotion::{parse_emotion, strip_markup};
use crate::segment::take_chunk;
use crate::types::SegmentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Text accumulates unseen until the reply's emotion is known.
    AwaitingEmotion,
    /// Chunks are cut from the pending buffer as boundaries appear.
    EmittingChunks,
    /// The stream ended; the remainder has been handed out.
    Flushing,
    Done,
}

/// Buffers for one in-flight reply.
#[derive(Debug)]
pub struct StreamAccumulator {
    /// Every fragment received, in arrival order.
    full: String,
    /// Text not yet handed out as a chunk.
    pending: String,
    phase: TurnPhase,
    config: SegmentConfig,
}

impl StreamAccumulator {
    pub fn new(config: SegmentConfig) -> Self {
        Self {
            full: String::new(),
            pending: String::new(),
            phase: TurnPhase::AwaitingEmotion,
            config,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn full_text(&self) -> &str {
        &self.full
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Append a fragment. Returns the reply's emotion the first time it can
    /// be resolved, and `None` on every other call.
    pub fn push(&mut self, fragment: &str, profile: &AvatarProfile) -> Option<String> {
        if matches!(self.phase, TurnPhase::Flushing | TurnPhase::Done) {
            return None;
        }

        self.full.push_str(fragment);
        self.pending.push_str(fragment);

        if self.phase != TurnPhase::AwaitingEmotion {
            return None;
        }

        let emotion = parse_emotion(&self.full, profile)?;
        self.pending = strip_markup(&self.pending);
        self.phase = TurnPhase::EmittingChunks;
        Some(emotion)
    }

    /// Next finalized chunk, if the pending buffer holds one.
    ///
    /// Call repeatedly until `None` after every [`push`](Self::push).
    /// Nothing is released before the emotion is resolved.
    pub fn next_chunk(&mut self) -> Option<String> {
        if self.phase != TurnPhase::EmittingChunks {
            return None;
        }

        while self.pending.chars().count() >= self.config.min_chunk_len {
            let chunk = take_chunk(&mut self.pending, &self.config)?;
            if !chunk.is_empty() {
                return Some(chunk);
            }
        }
        None
    }

    /// End of stream: hand out whatever is left, stripped and trimmed.
    ///
    /// Valid from either earlier phase, so a reply whose emotion never
    /// resolved is still delivered.
    pub fn flush(&mut self) -> Option<String> {
        if matches!(self.phase, TurnPhase::Flushing | TurnPhase::Done) {
            return None;
        }
        self.phase = TurnPhase::Flushing;

        let rest = strip_markup(&std::mem::take(&mut self.pending));
        let rest = rest.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }

    /// Close the turn and return the cleaned reply for the history.
    pub fn finish(&mut self) -> String {
        self.phase = TurnPhase::Done;
        strip_markup(&self.full).trim().to_string()
    }
}
