//! Integration tests for `SqliteStore` against in-memory and on-disk
//! databases.

use chrono::{TimeZone, Utc};
use diag_core::{
  export,
  record::{NewRecord, Urgency},
  seed::{SAMPLES, seed_if_empty},
  store::RecordStore,
};

use crate::{SqliteStore, migrations};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_record(machine: &str, urgency: Urgency) -> NewRecord {
  NewRecord {
    machine:      machine.into(),
    problem:      "Ruído intermitente no motor principal".into(),
    diagnosis:    "Rolamento com folga".into(),
    urgency,
    created_at:   Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 5).unwrap(),
    generated_by: Some("template".into()),
  }
}

/// A table as written by releases that predate the urgency column.
const LEGACY_TABLE: &str = "
CREATE TABLE diagnoses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    machine TEXT NOT NULL,
    problem TEXT,
    diagnosis TEXT NOT NULL,
    created_at TEXT NOT NULL
);
INSERT INTO diagnoses (machine, problem, diagnosis, created_at)
VALUES ('Esteira 3', NULL, 'antigo', '2023-11-02T09:15:00.123456');
INSERT INTO diagnoses (machine, problem, diagnosis, created_at)
VALUES ('Forno 1', 'aquecimento', 'antigo 2', '2023-11-03T10:00:00');
";

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn initialize_twice_is_a_noop() {
  let s = store().await;
  s.append(new_record("Prensa A", Urgency::High)).await.unwrap();

  s.initialize().await.unwrap();
  s.initialize().await.unwrap();

  assert_eq!(s.count().await.unwrap(), 1);
  let applied = s.applied_migrations().await.unwrap();
  let expected: Vec<_> = migrations::MIGRATIONS.iter().map(|m| m.name).collect();
  assert_eq!(applied, expected);
}

#[test]
fn migration_names_are_unique() {
  let mut names: Vec<_> = migrations::MIGRATIONS.iter().map(|m| m.name).collect();
  names.sort_unstable();
  names.dedup();
  assert_eq!(names.len(), migrations::MIGRATIONS.len());
}

#[test]
fn ensure_column_is_idempotent() {
  let conn = rusqlite::Connection::open_in_memory().unwrap();
  conn.execute_batch("CREATE TABLE t (a TEXT);").unwrap();

  migrations::ensure_column(&conn, "t", "b", "TEXT NOT NULL DEFAULT 'x'").unwrap();
  migrations::ensure_column(&conn, "t", "b", "TEXT NOT NULL DEFAULT 'x'").unwrap();

  assert_eq!(migrations::columns(&conn, "t").unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn legacy_table_gains_urgency_with_default() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("diagnostics.db");
  {
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(LEGACY_TABLE).unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  let rows = s.list_all().await.unwrap();

  assert_eq!(rows.len(), 2);
  assert!(rows.iter().all(|r| r.urgency == Urgency::Medium));
  assert!(rows.iter().all(|r| r.generated_by.is_none()));

  assert_eq!(rows[0].machine, "Forno 1");
  assert_eq!(
    rows[0].created_at,
    Utc.with_ymd_and_hms(2023, 11, 3, 10, 0, 0).unwrap()
  );
  assert_eq!(rows[1].problem, "");
  assert_eq!(
    rows[1].created_at.timestamp(),
    Utc.with_ymd_and_hms(2023, 11, 2, 9, 15, 0).unwrap().timestamp()
  );

  // New rows land after the legacy ones.
  let added = s.append(new_record("Esteira 3", Urgency::Low)).await.unwrap();
  assert_eq!(added.id, 3);
}

#[tokio::test]
async fn table_with_urgency_but_no_bookkeeping_is_preserved() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("diagnostics.db");
  {
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn
      .execute_batch(
        "CREATE TABLE diagnoses (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             machine TEXT NOT NULL,
             problem TEXT,
             diagnosis TEXT NOT NULL,
             urgency TEXT NOT NULL DEFAULT 'Média',
             created_at TEXT NOT NULL
         );
         INSERT INTO diagnoses (machine, problem, diagnosis, urgency, created_at)
         VALUES ('Compressor Z9', 'vibração', 'texto', 'Alta', '2024-01-05T08:00:00');",
      )
      .unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  let rows = s.list_all().await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].urgency, Urgency::High);
  assert_eq!(rows[0].problem, "vibração");
}

#[tokio::test]
async fn reopening_applies_nothing_new() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("diagnostics.db");

  let first = SqliteStore::open(&path).await.unwrap();
  first.append(new_record("Misturador M5", Urgency::High)).await.unwrap();
  drop(first);

  let second = SqliteStore::open(&path).await.unwrap();
  assert_eq!(second.count().await.unwrap(), 1);
  assert_eq!(
    second.applied_migrations().await.unwrap().len(),
    migrations::MIGRATIONS.len()
  );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_opens_of_a_new_file_converge() {
  for _ in 0..10 {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diagnostics.db");

    let handles: Vec<_> = (0..4)
      .map(|_| {
        let path = path.clone();
        tokio::spawn(async move { SqliteStore::open(&path).await })
      })
      .collect();

    let mut stores = Vec::new();
    for handle in handles {
      stores.push(handle.await.unwrap().expect("concurrent open"));
    }

    let expected: Vec<_> = migrations::MIGRATIONS.iter().map(|m| m.name).collect();
    for s in &stores {
      assert_eq!(s.applied_migrations().await.unwrap(), expected);
    }
    stores[0].append(new_record("Esteira 3", Urgency::Low)).await.unwrap();
    assert_eq!(stores[3].count().await.unwrap(), 1);
  }
}

// ─── Append / list ───────────────────────────────────────────────────────────

#[tokio::test]
async fn append_assigns_increasing_ids() {
  let s = store().await;
  let a = s.append(new_record("A", Urgency::Low)).await.unwrap();
  let b = s.append(new_record("B", Urgency::Medium)).await.unwrap();
  let c = s.append(new_record("C", Urgency::High)).await.unwrap();
  assert!(a.id < b.id && b.id < c.id);
}

#[tokio::test]
async fn list_all_is_most_recent_first_and_stable() {
  let s = store().await;
  for m in ["Esteira 3", "Esteira 4", "Forno 1"] {
    s.append(new_record(m, Urgency::Medium)).await.unwrap();
  }

  let first = s.list_all().await.unwrap();
  let ids: Vec<_> = first.iter().map(|r| r.id).collect();
  let mut sorted = ids.clone();
  sorted.sort_by(|a, b| b.cmp(a));
  assert_eq!(ids, sorted);
  assert_eq!(first[0].machine, "Forno 1");

  let second = s.list_all().await.unwrap();
  assert_eq!(first, second);
}

#[tokio::test]
async fn round_trip_preserves_every_field() {
  let s = store().await;
  let mut input = new_record("Prensa Hidráulica B", Urgency::High);
  input.problem = "Queda súbita de pressão; \"manômetro\" oscilando\nlinha 2".into();
  input.diagnosis = "Vedação danificada — trocar kit".into();
  input.generated_by = None;

  let stored = s.append(input.clone()).await.unwrap();
  let rows = s.list_all().await.unwrap();

  assert_eq!(rows, vec![stored.clone()]);
  assert_eq!(stored, input.with_id(stored.id));
}

#[tokio::test]
async fn empty_problem_round_trips_as_empty() {
  let s = store().await;
  let mut input = new_record("Esteira 4", Urgency::Low);
  input.problem = String::new();
  s.append(input).await.unwrap();
  assert_eq!(s.list_all().await.unwrap()[0].problem, "");
}

#[tokio::test]
async fn writes_are_visible_to_other_handles_on_the_same_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("diagnostics.db");

  let writer = SqliteStore::open(&path).await.unwrap();
  let reader = SqliteStore::open(&path).await.unwrap();

  writer.append(new_record("Bobinadeira 01", Urgency::High)).await.unwrap();
  writer.append(new_record("Bobinadeira 02", Urgency::Low)).await.unwrap();

  let rows = reader.list_all().await.unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0].machine, "Bobinadeira 02");
}

// ─── Clear ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn clear_removes_everything_and_ids_keep_growing() {
  let s = store().await;
  s.append(new_record("A", Urgency::Low)).await.unwrap();
  let last = s.append(new_record("B", Urgency::Low)).await.unwrap();

  assert_eq!(s.clear().await.unwrap(), 2);
  assert!(s.list_all().await.unwrap().is_empty());
  assert_eq!(s.count().await.unwrap(), 0);

  let next = s.append(new_record("C", Urgency::Low)).await.unwrap();
  assert!(next.id > last.id);
}

#[tokio::test]
async fn clear_on_empty_store() {
  let s = store().await;
  assert_eq!(s.clear().await.unwrap(), 0);
}

#[tokio::test]
async fn append_all_if_empty_skips_a_populated_store() {
  let s = store().await;
  let batch = vec![new_record("A", Urgency::Low), new_record("B", Urgency::High)];

  let stored = s.append_all_if_empty(batch.clone()).await.unwrap();
  assert_eq!(stored.len(), 2);
  assert!(stored[0].id < stored[1].id);

  assert!(s.append_all_if_empty(batch).await.unwrap().is_empty());
  assert_eq!(s.count().await.unwrap(), 2);
}

// ─── Seeding ─────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_seeding_inserts_the_samples_once() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("diagnostics.db");
  let first = SqliteStore::open(&path).await.unwrap();
  let second = SqliteStore::open(&path).await.unwrap();

  let (a, b) = tokio::join!(
    tokio::spawn(async move { seed_if_empty(&first).await }),
    tokio::spawn(async move { seed_if_empty(&second).await }),
  );
  let inserted = a.unwrap().unwrap() + b.unwrap().unwrap();
  assert_eq!(inserted, SAMPLES.len());

  let reader = SqliteStore::open(&path).await.unwrap();
  assert_eq!(reader.count().await.unwrap(), SAMPLES.len() as u64);
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn legacy_naive_timestamps_export_with_their_wall_clock_as_utc() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("diagnostics.db");
  {
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(LEGACY_TABLE).unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  let csv = export::to_csv_string(&s.list_all().await.unwrap()).unwrap();
  let rows: Vec<_> = csv.lines().skip(1).collect();

  assert_eq!(rows.len(), 2);
  assert!(rows[0].starts_with("2,Forno 1,aquecimento,antigo 2,Média,"));
  assert!(rows[0].ends_with(",2023-11-03T10:00:00Z"));
  assert!(rows[1].ends_with(",2023-11-02T09:15:00Z"));
}
