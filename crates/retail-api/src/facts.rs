//! Handlers for fact endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sales` | Body: [`NewSale`]; returns 201 + stored line |
//! | `POST` | `/sales/batch` | Body: array of [`NewSale`]; all or nothing |
//! | `GET`  | `/sales/{key}` | Single sales line |
//! | `GET`  | `/inventory` | Query params map to [`InventoryQuery`] |
//! | `POST` | `/inventory` | Body: [`NewInventory`]; returns 201 |
//!
//! Facts reference dimensions by surrogate key; a dangling key is a 409.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use retail_core::{
  fact::{InventoryQuery, InventorySnapshot, NewInventory, NewSale, SalesLine},
  store::WarehouseStore,
};

use crate::{AppState, error::ApiError};

// ─── Sales ────────────────────────────────────────────────────────────────────

/// `POST /sales`
pub async fn record_sale<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Json(body): Json<NewSale>,
) -> Result<impl IntoResponse, ApiError> {
  let line = store.record_sale(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(line)))
}

/// `POST /sales/batch`
pub async fn record_batch<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Json(body): Json<Vec<NewSale>>,
) -> Result<impl IntoResponse, ApiError> {
  if body.is_empty() {
    return Err(ApiError::BadRequest("empty sales batch".into()));
  }
  let lines = store.record_sales(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(lines)))
}

/// `GET /sales/{key}`
pub async fn get_sale<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(key): Path<i64>,
) -> Result<Json<SalesLine>, ApiError> {
  let line = store
    .get_sale(key)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("sale {key} not found")))?;
  Ok(Json(line))
}

// ─── Inventory ────────────────────────────────────────────────────────────────

/// `GET /inventory[?date_key=..][&product_key=..][&store_key=..][&below_reorder=true][&limit=..]`
pub async fn list_inventory<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Query(query): Query<InventoryQuery>,
) -> Result<Json<Vec<InventorySnapshot>>, ApiError> {
  let snapshots = store.inventory_snapshots(&query).await.map_err(ApiError::store)?;
  Ok(Json(snapshots))
}

/// `POST /inventory`
pub async fn record_inventory<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Json(body): Json<NewInventory>,
) -> Result<impl IntoResponse, ApiError> {
  let snapshot = store.record_inventory(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(snapshot)))
}
