//! Handlers for `/aggregates` and `/integrity`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/aggregates/refresh` | Body: `{"policy":"full"}` or `{"policy":"incremental","from":..,"to":..}` |
//! | `GET`  | `/aggregates/daily` | Optional `from`, `to`, `store_key` |
//! | `GET`  | `/aggregates/monthly/{year_month}` | `YYYY-MM` |
//! | `GET`  | `/aggregates/refreshes` | Newest first, `?limit` (default 20) |
//! | `GET`  | `/integrity` | Current-version and aggregate drift audit |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use retail_core::{
  aggregate::{DailySales, DailySalesQuery, MonthlyProduct, RefreshPolicy, RefreshReport, YearMonth},
  report::IntegrityReport,
  store::WarehouseStore,
};

use crate::{AppState, error::ApiError, views::LimitParams};

const DEFAULT_REFRESH_HISTORY: usize = 20;

/// `POST /aggregates/refresh`
pub async fn refresh<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Json(policy): Json<RefreshPolicy>,
) -> Result<Json<RefreshReport>, ApiError> {
  let report = store.refresh_aggregates(policy).await.map_err(ApiError::store)?;
  Ok(Json(report))
}

/// `GET /aggregates/daily[?from=..][&to=..][&store_key=..]`
pub async fn daily<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Query(query): Query<DailySalesQuery>,
) -> Result<Json<Vec<DailySales>>, ApiError> {
  let rows = store.daily_sales(&query).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /aggregates/monthly/{year_month}`
pub async fn monthly<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Path(year_month): Path<String>,
) -> Result<Json<Vec<MonthlyProduct>>, ApiError> {
  let ym: YearMonth = year_month
    .parse()
    .map_err(|e: retail_core::Error| ApiError::BadRequest(e.to_string()))?;
  let rows = store.monthly_product(ym).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /aggregates/refreshes[?limit=..]`
pub async fn refreshes<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<RefreshReport>>, ApiError> {
  let limit = params.limit.unwrap_or(DEFAULT_REFRESH_HISTORY);
  let runs = store.refresh_history(limit).await.map_err(ApiError::store)?;
  Ok(Json(runs))
}

/// `GET /integrity`
pub async fn integrity<S: WarehouseStore>(
  State(AppState { store, .. }): State<AppState<S>>,
) -> Result<Json<IntegrityReport>, ApiError> {
  let report = store.check_integrity().await.map_err(ApiError::store)?;
  Ok(Json(report))
}
