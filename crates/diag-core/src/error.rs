//! Error types for `diag-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("machine name must not be blank")]
  BlankMachine,

  #[error("unknown urgency level: {0:?}")]
  UnknownUrgency(String),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
