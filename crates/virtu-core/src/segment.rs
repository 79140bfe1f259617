//! Sentence-boundary batching for low-latency synthesis.
//!
//! A growing buffer of response text is cut at terminal punctuation once it
//! is long enough to make a natural-sounding clip, and never allowed to run
//! far past the maximum when punctuation is available. Lengths are counted
//! in characters; returned offsets are byte offsets into the buffer.

use crate::emotion::strip_markup;
use crate::types::SegmentConfig;

/// Default minimum chunk length for [`SegmentConfig`].
pub const DEFAULT_MIN_CHUNK_LEN: usize = 20;

/// Default maximum chunk length for [`SegmentConfig`].
pub const DEFAULT_MAX_CHUNK_LEN: usize = 300;

/// Position just past a run of terminal punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Byte offset into the text.
    pub byte: usize,
    /// Characters before the boundary.
    pub chars: usize,
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '．')
}

/// Every sentence boundary in `text`, in order.
///
/// Consecutive terminal punctuation (`?!`, `...`) forms a single boundary
/// placed after the last mark.
pub fn sentence_boundaries(text: &str) -> Vec<Boundary> {
    let mut boundaries = Vec::new();
    let mut run: Option<Boundary> = None;
    let mut chars = 0;

    for (i, c) in text.char_indices() {
        chars += 1;
        if is_terminal(c) {
            run = Some(Boundary {
                byte: i + c.len_utf8(),
                chars,
            });
        } else if let Some(end) = run.take() {
            boundaries.push(end);
        }
    }
    boundaries.extend(run);

    boundaries
}

/// Decide where to cut `buffer`, if anywhere.
///
/// Returns the latest boundary at least `min_chunk_len` characters in, unless
/// some boundary reaches `max_chunk_len` first, in which case that one is
/// returned immediately. `None` means more text must accumulate.
pub fn find_cut(buffer: &str, config: &SegmentConfig) -> Option<usize> {
    let mut cut = None;
    for boundary in sentence_boundaries(buffer) {
        if boundary.chars < config.min_chunk_len {
            continue;
        }
        cut = Some(boundary.byte);
        if boundary.chars >= config.max_chunk_len {
            break;
        }
    }
    cut
}

/// Cut the next chunk off the front of `buffer`.
///
/// The chunk is marker-stripped and trimmed, and may be empty if the cut
/// span held nothing but whitespace and markup. The remainder, minus one
/// leading space, stays in `buffer`.
pub fn take_chunk(buffer: &mut String, config: &SegmentConfig) -> Option<String> {
    let cut = find_cut(buffer, config)?;
    let chunk = strip_markup(&buffer[..cut]).trim().to_string();

    let rest = &buffer[cut..];
    *buffer = rest.strip_prefix(' ').unwrap_or(rest).to_string();

    Some(chunk)
}

/// Whether `text` has anything a synthesizer can pronounce.
pub fn is_speakable(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}
