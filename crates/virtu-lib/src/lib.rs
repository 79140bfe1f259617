//! virtu-lib — Avatar backend engine.
//!
//! Completion streaming, speech synthesis, turn coordination, and the
//! HTTP/WebSocket API. Depends on virtu-core for pure types and text processing.

pub mod coordinator;
pub mod error;
pub mod llm;
pub mod server;
pub mod state;
pub mod tts;

#[cfg(test)]
mod test_support;

// Re-export virtu-core for convenience
pub use virtu_core;
