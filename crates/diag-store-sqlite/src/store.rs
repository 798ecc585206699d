//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use diag_core::{
  record::{DiagnosisRecord, NewRecord},
  store::RecordStore,
};
use rusqlite::{Connection, TransactionBehavior};

use crate::{
  Result,
  encode::{RECORD_COLUMNS, RawRecord, encode_dt, encode_urgency},
  migrations,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A diagnosis store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Separate
/// handles (or processes) on the same file rely on SQLite's own locking.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and bring its schema up to date.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.initialize().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.initialize().await?;
    Ok(store)
  }

  /// Names of the migrations recorded as applied, in application order.
  pub async fn applied_migrations(&self) -> Result<Vec<String>> {
    let names = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT name FROM schema_migrations ORDER BY rowid")?;
        let names = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
      })
      .await?;
    Ok(names)
  }
}

fn insert(conn: &Connection, record: &NewRecord) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO diagnoses (
       machine, problem, diagnosis, urgency, created_at, generated_by
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      record.machine,
      record.problem,
      record.diagnosis,
      encode_urgency(record.urgency),
      encode_dt(record.created_at),
      record.generated_by,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  async fn initialize(&self) -> Result<()> {
    let applied = self
      .conn
      .call(|conn| Ok(migrations::initialize(conn)?))
      .await?;

    for name in applied {
      tracing::info!(migration = name, "applied schema migration");
    }
    Ok(())
  }

  async fn append(&self, record: NewRecord) -> Result<DiagnosisRecord> {
    let stored = self
      .conn
      .call(move |conn| {
        let id = insert(conn, &record)?;
        Ok(record.with_id(id))
      })
      .await?;
    Ok(stored)
  }

  async fn append_all_if_empty(
    &self,
    records: Vec<NewRecord>,
  ) -> Result<Vec<DiagnosisRecord>> {
    let stored = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: i64 =
          tx.query_row("SELECT COUNT(*) FROM diagnoses", [], |row| row.get(0))?;
        if existing > 0 {
          return Ok(Vec::new());
        }

        let mut stored = Vec::with_capacity(records.len());
        for record in records {
          let id = insert(&tx, &record)?;
          stored.push(record.with_id(id));
        }
        tx.commit()?;
        Ok(stored)
      })
      .await?;
    Ok(stored)
  }

  async fn list_all(&self) -> Result<Vec<DiagnosisRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM diagnoses ORDER BY id DESC"
        ))?;
        let rows = stmt
          .query_map([], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM diagnoses", [], |row| row.get(0))?)
      })
      .await?;
    Ok(n as u64)
  }

  async fn clear(&self) -> Result<u64> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM diagnoses", [])?))
      .await?;

    tracing::warn!(removed, "cleared all diagnoses");
    Ok(removed as u64)
  }
}
