//! The `RecordStore` trait.
//!
//! Implemented by storage backends (e.g. `diag-store-sqlite`). The submission
//! workflow, the HTTP API and the CLI depend on this abstraction only.

use std::future::Future;

use crate::record::{DiagnosisRecord, NewRecord};

/// Durable, append-only table of diagnosis records.
///
/// There is no per-record update or delete. Every read goes back to the
/// backing storage; implementations must not cache.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Ensure the backing table exists with the current schema. Safe to call
  /// on every start and any number of times.
  fn initialize(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Persist `record` and return it with its assigned id.
  fn append(
    &self,
    record: NewRecord,
  ) -> impl Future<Output = Result<DiagnosisRecord, Self::Error>> + Send + '_;

  /// Persist every record in `records`, in order, but only if the store is
  /// empty. The emptiness check and the inserts are one atomic step. Returns
  /// the stored records, or nothing when the store already had rows.
  fn append_all_if_empty(
    &self,
    records: Vec<NewRecord>,
  ) -> impl Future<Output = Result<Vec<DiagnosisRecord>, Self::Error>> + Send + '_;

  /// Every record, most recent (highest id) first.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<DiagnosisRecord>, Self::Error>> + Send + '_;

  /// Number of stored records.
  fn count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Remove every record. Irreversible. Returns how many rows were removed.
  fn clear(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
