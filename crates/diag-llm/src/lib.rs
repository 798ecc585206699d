//! Hosted text-generation backends for the delegated diagnosis generator.
//!
//! [`ChatBackend`] speaks the OpenAI-compatible `chat/completions` wire
//! format, which most hosted and self-hosted model servers accept.

mod chat;

pub mod error;

pub use chat::{ChatBackend, DEFAULT_BASE_URL};
pub use error::{Error, Result};
