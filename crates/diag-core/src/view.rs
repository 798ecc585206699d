//! The dashboard read model: never stored, always rebuilt from the store.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
  record::{DiagnosisRecord, Urgency},
  store::RecordStore,
};

/// Number of diagnoses for one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineCount {
  /// Spelling of the most recent record for this machine.
  pub machine: String,
  pub count:   usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrgencyCount {
  pub urgency: Urgency,
  pub count:   usize,
}

/// A short-lived snapshot of the full history plus its aggregates.
///
/// Build one per interaction with [`HistoryView::load`] and drop it
/// afterwards; the store stays the only source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryView {
  /// Most recent first.
  pub records:    Vec<DiagnosisRecord>,
  pub total:      usize,
  pub latest:     Option<DiagnosisRecord>,
  /// Machines grouped case-insensitively, most diagnosed first. Ties keep
  /// the order in which the machine was last seen.
  pub by_machine: Vec<MachineCount>,
  /// One entry per urgency level, zero-filled, in ascending order.
  pub by_urgency: Vec<UrgencyCount>,
}

impl HistoryView {
  /// Re-read the whole store and aggregate it.
  pub async fn load<S: RecordStore>(store: &S) -> Result<Self, S::Error> {
    Ok(Self::from_records(store.list_all().await?))
  }

  /// Aggregate `records`, which must already be ordered most recent first.
  pub fn from_records(records: Vec<DiagnosisRecord>) -> Self {
    let mut by_machine: Vec<MachineCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut urgency_counts = [0usize; 3];

    for record in &records {
      let label = record.machine.trim();
      let key = label.to_lowercase();
      match index.get(&key) {
        Some(&i) => by_machine[i].count += 1,
        None => {
          index.insert(key, by_machine.len());
          by_machine.push(MachineCount {
            machine: label.to_owned(),
            count:   1,
          });
        }
      }

      let slot = match record.urgency {
        Urgency::Low => 0,
        Urgency::Medium => 1,
        Urgency::High => 2,
      };
      urgency_counts[slot] += 1;
    }

    // Stable, so ties stay in last-seen order.
    by_machine.sort_by(|a, b| b.count.cmp(&a.count));

    let by_urgency = Urgency::ALL
      .iter()
      .zip(urgency_counts)
      .map(|(&urgency, count)| UrgencyCount { urgency, count })
      .collect();

    Self {
      total: records.len(),
      latest: records.first().cloned(),
      records,
      by_machine,
      by_urgency,
    }
  }
}
