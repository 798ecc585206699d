//! The submission workflow: validate, generate, persist, reload.

use thiserror::Error;

use crate::{
  generate::{Generation, Generator},
  record::{DiagnosisRecord, NewRecord, Submission, now_seconds},
  store::RecordStore,
  view::HistoryView,
};

#[derive(Debug, Error)]
pub enum SubmitError {
  /// Rejected before anything was generated or stored.
  #[error("validation error: {0}")]
  Validation(#[from] crate::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Everything a caller needs to render the result of one submission.
#[derive(Debug, Clone)]
pub struct Submitted {
  pub record:     DiagnosisRecord,
  pub generation: Generation,
  /// Rebuilt from the store after the insert.
  pub view:       HistoryView,
}

/// Run one form submission end to end.
///
/// A blank machine name stops here with no side effects. Past validation a
/// record is always written, even when generation degraded to error text.
pub async fn submit<S, G>(
  store: &S,
  generator: &G,
  submission: Submission,
) -> Result<Submitted, SubmitError>
where
  S: RecordStore,
  G: Generator,
{
  let submission = submission.normalize()?;

  let generation = generator
    .generate(&submission.machine, &submission.problem)
    .await;

  let record = store
    .append(NewRecord {
      machine:      submission.machine,
      problem:      submission.problem,
      diagnosis:    generation.text.clone(),
      urgency:      submission.urgency,
      created_at:   now_seconds(),
      generated_by: Some(generation.generated_by()),
    })
    .await
    .map_err(|e| SubmitError::Store(Box::new(e)))?;

  tracing::info!(
    id = record.id,
    machine = %record.machine,
    urgency = %record.urgency,
    outcome = ?generation.outcome,
    "diagnosis stored"
  );

  let view = HistoryView::load(store)
    .await
    .map_err(|e| SubmitError::Store(Box::new(e)))?;

  Ok(Submitted {
    record,
    generation,
    view,
  })
}
