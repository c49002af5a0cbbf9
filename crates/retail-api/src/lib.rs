//! JSON REST API for the retail warehouse.
//!
//! Exposes an axum [`Router`] backed by any
//! [`retail_core::store::WarehouseStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", retail_api::api_router(store.clone(), fiscal))
//! ```

pub mod aggregates;
pub mod customers;
pub mod dates;
pub mod error;
pub mod facts;
pub mod products;
pub mod stores;
pub mod views;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use retail_core::{calendar::FiscalCalendar, store::WarehouseStore};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  /// Used by `POST /dates/populate` unless the body names a start month.
  pub fiscal: FiscalCalendar,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store), fiscal: self.fiscal } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, fiscal: FiscalCalendar) -> Router<()>
where
  S: WarehouseStore + 'static,
{
  Router::new()
    // Date dimension
    .route("/dates", post(dates::create::<S>))
    .route("/dates/populate", post(dates::populate::<S>))
    .route("/dates/{key}", get(dates::get_one::<S>))
    // Customers
    .route("/customers", post(customers::create::<S>))
    .route("/customers/{id}", get(customers::get_one::<S>))
    .route("/customers/{id}/history", get(customers::history::<S>))
    .route("/customers/{id}/supersede", post(customers::supersede::<S>))
    // Products
    .route("/products", post(products::create::<S>))
    .route("/products/{id}", get(products::get_one::<S>))
    .route("/products/{id}/history", get(products::history::<S>))
    .route("/products/{id}/supersede", post(products::supersede::<S>))
    // Stores
    .route("/stores", get(stores::list::<S>).post(stores::create::<S>))
    .route("/stores/{id}", get(stores::get_one::<S>).put(stores::update::<S>))
    // Facts
    .route("/sales", post(facts::record_sale::<S>))
    .route("/sales/batch", post(facts::record_batch::<S>))
    .route("/sales/{key}", get(facts::get_sale::<S>))
    .route(
      "/inventory",
      get(facts::list_inventory::<S>).post(facts::record_inventory::<S>),
    )
    // Views and reports
    .route("/views/sales-summary", get(views::sales_summary::<S>))
    .route("/views/top-products", get(views::top_products::<S>))
    .route("/reports/region-quarter", get(views::region_quarter::<S>))
    .route("/reports/top-customers", get(views::top_customers::<S>))
    // Aggregates
    .route("/aggregates/refresh", post(aggregates::refresh::<S>))
    .route("/aggregates/daily", get(aggregates::daily::<S>))
    .route("/aggregates/monthly/{year_month}", get(aggregates::monthly::<S>))
    .route("/aggregates/refreshes", get(aggregates::refreshes::<S>))
    .route("/integrity", get(aggregates::integrity::<S>))
    .with_state(AppState { store, fiscal })
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
  };
  use retail_core::calendar::FiscalCalendar;
  use retail_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::api_router;

  async fn app_with(fiscal: FiscalCalendar) -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store), fiscal)
  }

  async fn app() -> Router { app_with(FiscalCalendar::default()).await }

  async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
  }

  /// Dates for January 2024, one store, product and customer.
  async fn seeded() -> Router {
    let app = app().await;
    let (status, body) = send(
      &app,
      "POST",
      "/dates/populate",
      Some(json!({ "start": "2024-01-01", "end": "2024-01-31" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inserted"], 31);

    let (status, _) = send(
      &app,
      "POST",
      "/stores",
      Some(json!({ "store_id": "S-1", "store_name": "Downtown", "region": "North" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
      &app,
      "POST",
      "/products",
      Some(json!({
        "product_id": "P-1",
        "product_name": "Widget",
        "category": "Hardware",
        "brand": "Acme",
        "unit_price": 10.0,
        "unit_cost": 4.0,
        "effective_date": "2023-06-01"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
      &app,
      "POST",
      "/customers",
      Some(json!({
        "customer_id": "C-1",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "effective_date": "2023-06-01"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    app
  }

  fn sale(txid: &str, customer_key: i64, quantity: i64) -> Value {
    json!({
      "date_key": 20240115,
      "customer_key": customer_key,
      "product_key": 1,
      "store_key": 1,
      "transaction_id": txid,
      "quantity": quantity,
      "unit_price": 10.0,
      "total_amount": 10.0 * quantity as f64,
      "cost_amount": 4.0 * quantity as f64,
      "profit_amount": 6.0 * quantity as f64,
      "transaction_timestamp": "2024-01-15T12:00:00Z"
    })
  }

  #[tokio::test]
  async fn missing_date_returns_404() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/dates/20240101", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("20240101"));
  }

  #[tokio::test]
  async fn populate_uses_configured_fiscal_calendar() {
    let app = app_with(FiscalCalendar::new(7).unwrap()).await;
    let (status, _) = send(
      &app,
      "POST",
      "/dates/populate",
      Some(json!({ "start": "2024-07-01", "end": "2024-07-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, july) = send(&app, "GET", "/dates/20240701", None).await;
    assert_eq!(july["fiscal_year"], 2025);
    assert_eq!(july["fiscal_quarter"], 1);

    // An explicit start month in the body wins.
    let (status, _) = send(
      &app,
      "POST",
      "/dates/populate",
      Some(json!({ "start": "2024-08-01", "end": "2024-08-01", "fiscal_year_start_month": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, august) = send(&app, "GET", "/dates/20240801", None).await;
    assert_eq!(august["fiscal_year"], 2024);
    assert_eq!(august["fiscal_quarter"], 3);
  }

  #[tokio::test]
  async fn reversed_populate_range_is_400() {
    let app = app().await;
    let (status, _) = send(
      &app,
      "POST",
      "/dates/populate",
      Some(json!({ "start": "2024-02-01", "end": "2024-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn customer_lifecycle_over_http() {
    let app = seeded().await;

    let (status, _) = send(
      &app,
      "POST",
      "/customers",
      Some(json!({
        "customer_id": "C-1",
        "first_name": "Ada",
        "last_name": "King",
        "effective_date": "2024-01-01"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
      &app,
      "POST",
      "/customers/C-1/supersede",
      Some(json!({ "first_name": "Ada", "last_name": "King", "effective_date": "2023-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
      &app,
      "POST",
      "/customers/C-1/supersede",
      Some(json!({
        "first_name": "Ada",
        "last_name": "King",
        "customer_segment": "Premium",
        "effective_date": "2024-02-01"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expired"]["expiration_date"], "2024-02-01");
    assert_eq!(body["expired"]["is_current"], false);
    assert_eq!(body["current"]["is_current"], true);
    assert_eq!(body["current"]["expiration_date"], Value::Null);

    let (_, current) = send(&app, "GET", "/customers/C-1", None).await;
    assert_eq!(current["last_name"], "King");

    let (_, old) = send(&app, "GET", "/customers/C-1?as_of=2024-01-15", None).await;
    assert_eq!(old["last_name"], "Lovelace");

    let (_, history) = send(&app, "GET", "/customers/C-1/history", None).await;
    assert_eq!(history.as_array().unwrap().len(), 2);

    let (status, _) = send(
      &app,
      "POST",
      "/customers/C-404/supersede",
      Some(json!({ "first_name": "No", "last_name": "One", "effective_date": "2024-02-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn store_update_is_in_place() {
    let app = seeded().await;
    let (status, body) = send(
      &app,
      "PUT",
      "/stores/S-1",
      Some(json!({ "store_name": "Uptown", "region": "South" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store_key"], 1);
    assert_eq!(body["store_name"], "Uptown");

    let (status, _) = send(&app, "PUT", "/stores/S-404", Some(json!({ "store_name": "X" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn dangling_sale_is_conflict() {
    let app = seeded().await;
    let (status, body) = send(&app, "POST", "/sales", Some(sale("T-1", 99, 1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("foreign key"));
  }

  #[tokio::test]
  async fn sales_flow_through_views_and_aggregates() {
    let app = seeded().await;

    let (status, lines) = send(
      &app,
      "POST",
      "/sales/batch",
      Some(json!([sale("T-1", 1, 2), sale("T-2", 1, 1)])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lines.as_array().unwrap().len(), 2);

    let (_, summary) = send(&app, "GET", "/views/sales-summary?region=North", None).await;
    assert_eq!(summary.as_array().unwrap().len(), 2);
    assert_eq!(summary[0]["customer_name"], "Ada Lovelace");

    let (_, top) = send(&app, "GET", "/views/top-products?limit=5", None).await;
    assert_eq!(top[0]["product_name"], "Widget");
    assert_eq!(top[0]["total_revenue"], 30.0);

    let (_, customers) = send(&app, "GET", "/reports/top-customers", None).await;
    assert_eq!(customers[0]["transaction_count"], 2);

    let (status, report) =
      send(&app, "POST", "/aggregates/refresh", Some(json!({ "policy": "full" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["daily_rows"], 1);

    let (_, daily) = send(&app, "GET", "/aggregates/daily?from=2024-01-01&to=2024-01-31", None).await;
    assert_eq!(daily[0]["total_revenue"], 30.0);
    assert_eq!(daily[0]["avg_transaction_value"], 15.0);

    let (_, monthly) = send(&app, "GET", "/aggregates/monthly/2024-01", None).await;
    assert_eq!(monthly[0]["year_month"], "2024-01");
    assert_eq!(monthly[0]["profit_margin"], 60.0);

    let (_, runs) = send(&app, "GET", "/aggregates/refreshes", None).await;
    assert_eq!(runs[0]["policy"]["policy"], "full");

    let (_, integrity) = send(&app, "GET", "/integrity", None).await;
    assert_eq!(integrity["daily_drift"], json!([]));
  }

  #[tokio::test]
  async fn malformed_year_month_is_400() {
    let app = app().await;
    let (status, _) = send(&app, "GET", "/aggregates/monthly/2024-13", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }
}
