//! Handlers for `/customers` endpoints (SCD Type 2).
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/customers` | Body: [`NewCustomer`]; 409 if already current |
//! | `GET`  | `/customers/{id}` | Current version, or the one valid `?as_of=YYYY-MM-DD` |
//! | `GET`  | `/customers/{id}/history` | Every version, oldest first |
//! | `POST` | `/customers/{id}/supersede` | Body: [`SupersedeBody`]; returns both versions |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use retail_core::{
  dimension::{CustomerAttributes, CustomerVersion, NewCustomer},
  store::WarehouseStore,
  version::Supersession,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// `POST /customers`
pub async fn create<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Json(body): Json<NewCustomer>,
) -> Result<impl IntoResponse, ApiError> {
  let customer = store.add_customer(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(customer)))
}

#[derive(Debug, Deserialize)]
pub struct AsOfParams {
  pub as_of: Option<NaiveDate>,
}

/// `GET /customers/{id}[?as_of=YYYY-MM-DD]`
pub async fn get_one<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(id): Path<String>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<CustomerVersion>, ApiError> {
  let found = match params.as_of {
    Some(date) => store.customer_as_of(id.clone(), date).await,
    None => store.current_customer(id.clone()).await,
  }
  .map_err(ApiError::store)?;

  let customer = found.ok_or_else(|| ApiError::NotFound(format!("customer {id} not found")))?;
  Ok(Json(customer))
}

/// `GET /customers/{id}/history`
pub async fn history<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<CustomerVersion>>, ApiError> {
  let versions = store.customer_history(id).await.map_err(ApiError::store)?;
  Ok(Json(versions))
}

/// The replacement attributes plus the date they take effect.
#[derive(Debug, Deserialize)]
pub struct SupersedeBody {
  pub effective_date: NaiveDate,
  #[serde(flatten)]
  pub attributes:     CustomerAttributes,
}

/// `POST /customers/{id}/supersede`
pub async fn supersede<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(id): Path<String>,
  Json(body): Json<SupersedeBody>,
) -> Result<Json<Supersession<CustomerVersion>>, ApiError> {
  let sup = store
    .supersede_customer(id, body.attributes, body.effective_date)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sup))
}
