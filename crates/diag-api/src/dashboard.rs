//! Handler for `GET /dashboard`.

use axum::{Json, extract::State};
use diag_core::{generate::Generator, store::RecordStore, view::HistoryView};

use crate::{ApiState, error::ApiError};

/// `GET /dashboard`: totals, latest record and per-machine / per-urgency
/// counts, rebuilt from the store on every request.
pub async fn handler<S, G>(
  State(state): State<ApiState<S, G>>,
) -> Result<Json<HistoryView>, ApiError>
where
  S: RecordStore,
  G: Generator,
{
  let view = HistoryView::load(state.store.as_ref())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(view))
}
