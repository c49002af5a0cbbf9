//! Read-only reporting endpoints: the two views and the reporting queries.

use axum::{
  Json,
  extract::{Query, State},
};
use retail_core::{
  report::{CustomerSpend, RegionQuarterRevenue, SalesSummaryRow, SummaryQuery, TopProductRow},
  store::WarehouseStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

const DEFAULT_TOP_CUSTOMERS: usize = 10;

/// `GET /views/sales-summary[?year=..][&region=..][&limit=..][&offset=..]`
pub async fn sales_summary<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Query(query): Query<SummaryQuery>,
) -> Result<Json<Vec<SalesSummaryRow>>, ApiError> {
  let rows = store.sales_summary(&query).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
  pub limit: Option<usize>,
}

/// `GET /views/top-products[?limit=..]`
pub async fn top_products<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<TopProductRow>>, ApiError> {
  let rows = store.top_products(params.limit).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct YearParams {
  pub year: Option<i32>,
}

/// `GET /reports/region-quarter[?year=..]`
pub async fn region_quarter<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Query(params): Query<YearParams>,
) -> Result<Json<Vec<RegionQuarterRevenue>>, ApiError> {
  let rows = store
    .revenue_by_region_quarter(params.year)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /reports/top-customers[?limit=..]`, 10 by default.
pub async fn top_customers<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<CustomerSpend>>, ApiError> {
  let limit = params.limit.unwrap_or(DEFAULT_TOP_CUSTOMERS);
  let rows = store.top_customers(limit).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}
