//! virtu-core — Pure types, catalogs and response segmentation.
//!
//! No async runtime, no I/O, no platform dependencies.

pub mod catalog;
pub mod emotion;
pub mod prompt;
pub mod protocol;
pub mod segment;
pub mod session;
pub mod turn;
pub mod types;
pub mod wav;
