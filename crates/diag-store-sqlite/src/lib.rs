//! SQLite backend for the diagnosis record store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod store;

pub mod error;
pub mod migrations;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
