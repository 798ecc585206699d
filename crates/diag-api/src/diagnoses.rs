//! Handlers for `/diagnoses` endpoints.
//!
//! | Method   | Path              | Notes |
//! |----------|-------------------|-------|
//! | `GET`    | `/diagnoses`      | Most recent first |
//! | `POST`   | `/diagnoses`      | Body: `{"machine":"...","problem":"...","urgency":"Alta"}` |
//! | `DELETE` | `/diagnoses`      | Removes every record |
//! | `GET`    | `/diagnoses.csv`  | CSV download |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::{StatusCode, header},
  response::IntoResponse,
};
use diag_core::{
  export,
  generate::{Attempt, Generator, Outcome},
  record::{DiagnosisRecord, Submission, Urgency},
  store::RecordStore,
  submit::submit,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /diagnoses`
pub async fn list<S, G>(
  State(state): State<ApiState<S, G>>,
) -> Result<Json<Vec<DiagnosisRecord>>, ApiError>
where
  S: RecordStore,
  G: Generator,
{
  let records = state
    .store
    .list_all()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(default)]
  pub machine: String,
  #[serde(default)]
  pub problem: String,
  /// Any spelling [`Urgency`]'s `FromStr` accepts; defaults to `Média`.
  pub urgency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Created {
  pub record:   DiagnosisRecord,
  pub outcome:  Outcome,
  pub attempts: Vec<Attempt>,
}

/// `POST /diagnoses`
pub async fn create<S, G>(
  State(state): State<ApiState<S, G>>,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  G: Generator,
{
  let Json(body) = body?;
  let urgency = match body.urgency.as_deref() {
    None => Urgency::default(),
    Some(s) => s
      .parse()
      .map_err(|e: diag_core::Error| ApiError::BadRequest(e.to_string()))?,
  };

  let submitted = submit(
    state.store.as_ref(),
    state.generator.as_ref(),
    Submission::new(body.machine, body.problem, urgency),
  )
  .await?;

  Ok((
    StatusCode::CREATED,
    Json(Created {
      record:   submitted.record,
      outcome:  submitted.generation.outcome,
      attempts: submitted.generation.attempts,
    }),
  ))
}

// ─── Clear ────────────────────────────────────────────────────────────────────

/// `DELETE /diagnoses`
pub async fn clear<S, G>(
  State(state): State<ApiState<S, G>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  G: Generator,
{
  let removed = state
    .store
    .clear()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(json!({ "removed": removed })))
}

// ─── Export ───────────────────────────────────────────────────────────────────

/// `GET /diagnoses.csv`
pub async fn export_csv<S, G>(
  State(state): State<ApiState<S, G>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  G: Generator,
{
  let records = state
    .store
    .list_all()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let body = export::to_csv_string(&records)?;

  Ok((
    [
      (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
      (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", export::FILE_NAME),
      ),
    ],
    body,
  ))
}
