//! Handlers for `/stores` endpoints. Stores are Type 1: `PUT` overwrites.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use retail_core::{
  dimension::{NewStore, Store, StoreAttributes},
  store::WarehouseStore,
};

use crate::{AppState, error::ApiError};

/// `GET /stores`
pub async fn list<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
) -> Result<Json<Vec<Store>>, ApiError> {
  let stores = store.list_stores().await.map_err(ApiError::store)?;
  Ok(Json(stores))
}

/// `POST /stores`
pub async fn create<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Json(body): Json<NewStore>,
) -> Result<impl IntoResponse, ApiError> {
  let created = store.add_store(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /stores/{id}`
pub async fn get_one<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Store>, ApiError> {
  let found = store
    .get_store(id.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("store {id} not found")))?;
  Ok(Json(found))
}

/// `PUT /stores/{id}`. Body: the full attribute set.
pub async fn update<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(id): Path<String>,
  Json(body): Json<StoreAttributes>,
) -> Result<Json<Store>, ApiError> {
  let updated = store.update_store(id, body).await.map_err(ApiError::store)?;
  Ok(Json(updated))
}
