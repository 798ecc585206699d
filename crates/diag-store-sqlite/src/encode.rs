//! Conversions between domain types and the plain-text column values.
//!
//! Timestamps are written as RFC 3339 UTC with second precision. Rows from
//! older releases may hold naive ISO 8601 local times; those are read as UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use diag_core::record::{DiagnosisRecord, Urgency};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  NAIVE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|naive| naive.and_utc())
    .ok_or_else(|| Error::DateParse(format!("unrecognised timestamp: {s:?}")))
}

// ─── Urgency ─────────────────────────────────────────────────────────────────

pub fn encode_urgency(u: Urgency) -> &'static str { u.label() }

/// Missing or empty values fall back to the default level.
pub fn decode_urgency(s: Option<&str>) -> Result<Urgency> {
  match s.map(str::trim) {
    None | Some("") => Ok(Urgency::default()),
    Some(label) => Ok(label.parse()?),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `diagnoses` row.
pub struct RawRecord {
  pub id:           i64,
  pub machine:      String,
  pub problem:      Option<String>,
  pub diagnosis:    String,
  pub urgency:      Option<String>,
  pub created_at:   String,
  pub generated_by: Option<String>,
}

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str =
  "id, machine, problem, diagnosis, urgency, created_at, generated_by";

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      machine:      row.get(1)?,
      problem:      row.get(2)?,
      diagnosis:    row.get(3)?,
      urgency:      row.get(4)?,
      created_at:   row.get(5)?,
      generated_by: row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<DiagnosisRecord> {
    Ok(DiagnosisRecord {
      id:           self.id,
      machine:      self.machine,
      problem:      self.problem.unwrap_or_default(),
      diagnosis:    self.diagnosis,
      urgency:      decode_urgency(self.urgency.as_deref())?,
      created_at:   decode_dt(&self.created_at)?,
      generated_by: self.generated_by,
    })
  }
}
