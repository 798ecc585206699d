//! Core types and trait definitions for the maintenance diagnosis service.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::RecordStore`]; text-generation providers implement
//! [`generate::TextBackend`].

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// trait definitions instead.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod export;
pub mod generate;
pub mod record;
pub mod seed;
pub mod store;
pub mod submit;
pub mod view;

pub use error::{Error, Result};
