//! Handlers for `/dates` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/dates` | Body: a full [`DateDim`] row; returns 201 |
//! | `POST` | `/dates/populate` | Body: [`PopulateBody`]; returns `{"inserted": n}` |
//! | `GET`  | `/dates/{key}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use retail_core::{
  calendar::{DateDim, FiscalCalendar},
  store::WarehouseStore,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

/// `POST /dates`
pub async fn create<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Json(body): Json<DateDim>,
) -> Result<impl IntoResponse, ApiError> {
  let date = store.add_date(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(date)))
}

#[derive(Debug, Deserialize)]
pub struct PopulateBody {
  pub start:                   NaiveDate,
  pub end:                     NaiveDate,
  /// Month the fiscal year starts in. Defaults to the router's configured
  /// calendar.
  pub fiscal_year_start_month: Option<u32>,
}

/// `POST /dates/populate`, body: `{"start":"2024-01-01","end":"2024-12-31"}`
pub async fn populate<S: WarehouseStore>(
  State(AppState { store, fiscal }): State<AppState<S>>,
  Json(body): Json<PopulateBody>,
) -> Result<Json<Value>, ApiError> {
  let fiscal = match body.fiscal_year_start_month {
    Some(m) => FiscalCalendar::new(m).map_err(|e| ApiError::BadRequest(e.to_string()))?,
    None => fiscal,
  };
  let inserted = store
    .populate_dates(body.start, body.end, fiscal)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "inserted": inserted })))
}

/// `GET /dates/{key}`
pub async fn get_one<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(key): Path<i64>,
) -> Result<Json<DateDim>, ApiError> {
  let date = store
    .get_date(key)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("date {key} not found")))?;
  Ok(Json(date))
}
