//! Diagnosis records: one row per submitted form.
//!
//! Records are append-only: created once after the diagnosis text exists,
//! never edited, and removed only by an explicit bulk clear.

use std::{fmt, str::FromStr};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Urgency ─────────────────────────────────────────────────────────────────

/// How urgently the technician wants the machine looked at.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum Urgency {
  #[serde(rename = "Baixa")]
  Low,
  /// Also the value back-filled into rows written before the column existed.
  #[default]
  #[serde(rename = "Média")]
  Medium,
  #[serde(rename = "Alta")]
  High,
}

impl Urgency {
  /// Every level, in ascending order.
  pub const ALL: [Urgency; 3] = [Urgency::Low, Urgency::Medium, Urgency::High];

  /// The canonical label, as stored and displayed.
  pub fn label(self) -> &'static str {
    match self {
      Self::Low => "Baixa",
      Self::Medium => "Média",
      Self::High => "Alta",
    }
  }
}

impl fmt::Display for Urgency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Accepts the canonical labels case-insensitively, plus `media` without the
/// accent.
impl FromStr for Urgency {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "baixa" => Ok(Self::Low),
      "média" | "media" => Ok(Self::Medium),
      "alta" => Ok(Self::High),
      _ => Err(Error::UnknownUrgency(s.to_owned())),
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A persisted diagnosis submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
  /// Store-assigned surrogate key; strictly increasing in insertion order.
  pub id:           i64,
  pub machine:      String,
  pub problem:      String,
  pub diagnosis:    String,
  pub urgency:      Urgency,
  /// Set once by the submitter; never changes after insert.
  pub created_at:   DateTime<Utc>,
  /// Which generation path produced `diagnosis`. `None` for rows written
  /// before this was tracked.
  pub generated_by: Option<String>,
}

/// Input to [`crate::store::RecordStore::append`]. Every field is populated
/// by the caller; only the id is left to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
  pub machine:      String,
  pub problem:      String,
  pub diagnosis:    String,
  pub urgency:      Urgency,
  pub created_at:   DateTime<Utc>,
  pub generated_by: Option<String>,
}

impl NewRecord {
  /// Attach the store-assigned id.
  pub fn with_id(self, id: i64) -> DiagnosisRecord {
    DiagnosisRecord {
      id,
      machine: self.machine,
      problem: self.problem,
      diagnosis: self.diagnosis,
      urgency: self.urgency,
      created_at: self.created_at,
      generated_by: self.generated_by,
    }
  }
}

/// The current time at the precision the store keeps.
pub fn now_seconds() -> DateTime<Utc> { Utc::now().trunc_subsecs(0) }

// ─── Submission ──────────────────────────────────────────────────────────────

/// Raw form input, before validation.
#[derive(Debug, Clone, Default)]
pub struct Submission {
  pub machine: String,
  pub problem: String,
  pub urgency: Urgency,
}

impl Submission {
  pub fn new(
    machine: impl Into<String>,
    problem: impl Into<String>,
    urgency: Urgency,
  ) -> Self {
    Self {
      machine: machine.into(),
      problem: problem.into(),
      urgency,
    }
  }

  /// Trim both text fields and reject a blank machine name. Case is
  /// preserved.
  pub fn normalize(self) -> Result<Self> {
    let machine = self.machine.trim();
    if machine.is_empty() {
      return Err(Error::BlankMachine);
    }
    Ok(Self {
      machine: machine.to_owned(),
      problem: self.problem.trim().to_owned(),
      urgency: self.urgency,
    })
  }
}
