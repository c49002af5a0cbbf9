//! Handlers for `/products` endpoints. Same shape as [`crate::customers`].

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use retail_core::{
  dimension::{NewProduct, ProductAttributes, ProductVersion},
  store::WarehouseStore,
  version::Supersession,
};
use serde::Deserialize;

use crate::{AppState, customers::AsOfParams, error::ApiError};

/// `POST /products`
pub async fn create<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Json(body): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
  let product = store.add_product(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products/{id}[?as_of=YYYY-MM-DD]`
pub async fn get_one<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(id): Path<String>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<ProductVersion>, ApiError> {
  let found = match params.as_of {
    Some(date) => store.product_as_of(id.clone(), date).await,
    None => store.current_product(id.clone()).await,
  }
  .map_err(ApiError::store)?;

  let product = found.ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))?;
  Ok(Json(product))
}

/// `GET /products/{id}/history`
pub async fn history<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<ProductVersion>>, ApiError> {
  let versions = store.product_history(id).await.map_err(ApiError::store)?;
  Ok(Json(versions))
}

#[derive(Debug, Deserialize)]
pub struct SupersedeBody {
  pub effective_date: NaiveDate,
  #[serde(flatten)]
  pub attributes:     ProductAttributes,
}

/// `POST /products/{id}/supersede`
pub async fn supersede<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(id): Path<String>,
  Json(body): Json<SupersedeBody>,
) -> Result<Json<Supersession<ProductVersion>>, ApiError> {
  let sup = store
    .supersede_product(id, body.attributes, body.effective_date)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sup))
}
