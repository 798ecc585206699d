//! Error type for `diag-llm`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),

  #[error("no API key configured")]
  MissingApiKey,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
