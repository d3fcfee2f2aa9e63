//! HudClip Common Utilities
//!
//! Shared infrastructure for all HudClip crates:
//! - Error types and result aliases
//! - Timecode parsing and artifact timestamps
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
