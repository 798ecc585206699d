//! Schema for the diagnosis store, as an ordered list of named migrations.
//!
//! Applied names are recorded in `schema_migrations`. Every step is also
//! idempotent on its own, so a database created by an older release (with
//! the table but without bookkeeping) converges to the same schema.
//!
//! Several processes may open the same new file at once. Each migration runs
//! in an immediate transaction, so only one of them writes the schema and the
//! rest wait on `busy_timeout`. Lock errors SQLite reports without consulting
//! the busy handler (a stale WAL snapshot, the journal-mode switch) restart
//! [`initialize`] from the top after a short pause.

use std::{thread, time::Duration};

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, TransactionBehavior, params};

/// How long a statement waits on another connection's lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const BUSY_RETRIES: u32 = 50;
const BUSY_PAUSE: Duration = Duration::from_millis(20);

/// Per-connection journal mode; applied after the busy timeout.
const CONNECTION_SETUP: &str = "PRAGMA journal_mode = WAL;";

const BOOKKEEPING: &str = "
CREATE TABLE IF NOT EXISTS schema_migrations (
    name        TEXT PRIMARY KEY,
    applied_at  TEXT NOT NULL
);
";

/// One named, idempotent schema change.
pub struct Migration {
  pub name:  &'static str,
  pub apply: fn(&Connection) -> rusqlite::Result<()>,
}

/// Every migration, in application order. Append only; never reorder.
pub const MIGRATIONS: &[Migration] = &[
  Migration {
    name:  "create_diagnoses",
    apply: create_diagnoses,
  },
  Migration {
    name:  "add_urgency",
    apply: add_urgency,
  },
  Migration {
    name:  "add_generated_by",
    apply: add_generated_by,
  },
  Migration {
    name:  "index_created_at",
    apply: index_created_at,
  },
];

// Records are append-only: no UPDATE is ever issued against this table, and
// DELETE only as the bulk clear. AUTOINCREMENT keeps ids from being reused
// after a clear.
fn create_diagnoses(conn: &Connection) -> rusqlite::Result<()> {
  conn.execute_batch(
    "CREATE TABLE IF NOT EXISTS diagnoses (
         id          INTEGER PRIMARY KEY AUTOINCREMENT,
         machine     TEXT NOT NULL,
         problem     TEXT,
         diagnosis   TEXT NOT NULL,
         created_at  TEXT NOT NULL      -- ISO 8601, second precision
     );",
  )
}

fn add_urgency(conn: &Connection) -> rusqlite::Result<()> {
  ensure_column(conn, "diagnoses", "urgency", "TEXT NOT NULL DEFAULT 'Média'")
}

fn add_generated_by(conn: &Connection) -> rusqlite::Result<()> {
  ensure_column(conn, "diagnoses", "generated_by", "TEXT")
}

fn index_created_at(conn: &Connection) -> rusqlite::Result<()> {
  conn.execute_batch(
    "CREATE INDEX IF NOT EXISTS diagnoses_created_idx ON diagnoses(created_at);",
  )
}

/// Names of the columns of `table`.
pub fn columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
  let names = stmt
    .query_map([], |row| row.get::<_, String>(1))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(names)
}

/// Add `column` to `table` unless it is already there.
pub fn ensure_column(
  conn: &Connection,
  table: &str,
  column: &str,
  definition: &str,
) -> rusqlite::Result<()> {
  if columns(conn, table)?.iter().any(|c| c == column) {
    return Ok(());
  }
  conn.execute_batch(&format!(
    "ALTER TABLE {table} ADD COLUMN {column} {definition};"
  ))
}

/// Configure `conn` and apply every pending migration. Returns the names
/// applied by this call.
pub fn initialize(conn: &mut Connection) -> rusqlite::Result<Vec<&'static str>> {
  conn.busy_timeout(BUSY_TIMEOUT)?;

  let mut applied = Vec::new();
  let mut retries = 0;
  loop {
    match setup_and_run(conn, &mut applied) {
      Err(e) if is_busy(&e) && retries < BUSY_RETRIES => {
        retries += 1;
        tracing::debug!(retries, "database busy during initialize, retrying");
        thread::sleep(BUSY_PAUSE);
      }
      Err(e) => return Err(e),
      Ok(()) => return Ok(applied),
    }
  }
}

fn setup_and_run(
  conn: &mut Connection,
  applied: &mut Vec<&'static str>,
) -> rusqlite::Result<()> {
  conn.execute_batch(CONNECTION_SETUP)?;
  apply_pending(conn, applied)
}

fn is_busy(e: &rusqlite::Error) -> bool {
  matches!(
    e.sqlite_error_code(),
    Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  )
}

/// Apply every pending migration, each in its own immediate transaction,
/// appending the applied names to `applied`.
fn apply_pending(
  conn: &mut Connection,
  applied: &mut Vec<&'static str>,
) -> rusqlite::Result<()> {
  for migration in MIGRATIONS {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(BOOKKEEPING)?;
    let done: bool = tx.query_row(
      "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE name = ?1)",
      params![migration.name],
      |row| row.get(0),
    )?;
    if done {
      continue;
    }

    (migration.apply)(&tx)?;
    tx.execute(
      "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, ?2)",
      params![migration.name, Utc::now().to_rfc3339()],
    )?;
    tx.commit()?;
    applied.push(migration.name);
  }
  Ok(())
}
