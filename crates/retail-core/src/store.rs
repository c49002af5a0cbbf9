//! The `WarehouseStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `retail-store-sqlite`).
//! Higher layers (`retail-api`, `retail-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  aggregate::{DailySales, DailySalesQuery, MonthlyProduct, RefreshPolicy, RefreshReport, YearMonth},
  calendar::{DateDim, FiscalCalendar},
  dimension::{
    CustomerAttributes, CustomerVersion, Dimension, NewCustomer, NewProduct, NewStore,
    ProductAttributes, ProductVersion, Store, StoreAttributes,
  },
  error::Classify,
  fact::{InventoryQuery, InventorySnapshot, NewInventory, NewSale, SalesLine},
  report::{
    CustomerSpend, IntegrityReport, RegionQuarterRevenue, SalesSummaryRow, SummaryQuery,
    TopProductRow,
  },
  version::Supersession,
};

/// Abstraction over a retail warehouse backend.
///
/// Dimension writes follow the SCD rules of their table: customers and
/// products are versioned (Type 2) and only change through `supersede_*`;
/// stores are overwritten in place (Type 1). Facts are append-only.
/// Aggregates change only through [`WarehouseStore::refresh_aggregates`] or
/// an explicit [`WarehouseStore::insert_daily_sales`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait WarehouseStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Date dimension ────────────────────────────────────────────────────

  fn add_date(
    &self,
    date: DateDim,
  ) -> impl Future<Output = Result<DateDim, Self::Error>> + Send + '_;

  fn get_date(
    &self,
    date_key: i64,
  ) -> impl Future<Output = Result<Option<DateDim>, Self::Error>> + Send + '_;

  /// Insert a derived row for every day in `start..=end` that is not yet
  /// present. Returns the number of rows inserted.
  fn populate_dates(
    &self,
    start: NaiveDate,
    end: NaiveDate,
    fiscal: FiscalCalendar,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Customer dimension (SCD Type 2) ───────────────────────────────────

  /// Insert the first version of a customer as current.
  ///
  /// Returns an error if the customer already has a current version, or if
  /// `effective_date` falls before the end of an earlier closed version.
  fn add_customer(
    &self,
    input: NewCustomer,
  ) -> impl Future<Output = Result<CustomerVersion, Self::Error>> + Send + '_;

  /// Close the current version at `effective_date` and open a new one with
  /// `attributes`, atomically.
  ///
  /// Returns an error if there is no current version or `effective_date` is
  /// not after the current version's effective date.
  fn supersede_customer(
    &self,
    customer_id: String,
    attributes: CustomerAttributes,
    effective_date: NaiveDate,
  ) -> impl Future<Output = Result<Supersession<CustomerVersion>, Self::Error>> + Send + '_;

  fn current_customer(
    &self,
    customer_id: String,
  ) -> impl Future<Output = Result<Option<CustomerVersion>, Self::Error>> + Send + '_;

  /// Every version, oldest first.
  fn customer_history(
    &self,
    customer_id: String,
  ) -> impl Future<Output = Result<Vec<CustomerVersion>, Self::Error>> + Send + '_;

  /// The version whose validity window covers `date`.
  fn customer_as_of(
    &self,
    customer_id: String,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<CustomerVersion>, Self::Error>> + Send + '_;

  // ── Product dimension (SCD Type 2) ────────────────────────────────────

  fn add_product(
    &self,
    input: NewProduct,
  ) -> impl Future<Output = Result<ProductVersion, Self::Error>> + Send + '_;

  fn supersede_product(
    &self,
    product_id: String,
    attributes: ProductAttributes,
    effective_date: NaiveDate,
  ) -> impl Future<Output = Result<Supersession<ProductVersion>, Self::Error>> + Send + '_;

  fn current_product(
    &self,
    product_id: String,
  ) -> impl Future<Output = Result<Option<ProductVersion>, Self::Error>> + Send + '_;

  fn product_history(
    &self,
    product_id: String,
  ) -> impl Future<Output = Result<Vec<ProductVersion>, Self::Error>> + Send + '_;

  fn product_as_of(
    &self,
    product_id: String,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<ProductVersion>, Self::Error>> + Send + '_;

  // ── Store dimension (Type 1) ──────────────────────────────────────────

  fn add_store(
    &self,
    input: NewStore,
  ) -> impl Future<Output = Result<Store, Self::Error>> + Send + '_;

  /// Overwrite a store's attributes in place.
  fn update_store(
    &self,
    store_id: String,
    attributes: StoreAttributes,
  ) -> impl Future<Output = Result<Store, Self::Error>> + Send + '_;

  fn get_store(
    &self,
    store_id: String,
  ) -> impl Future<Output = Result<Option<Store>, Self::Error>> + Send + '_;

  fn list_stores(&self) -> impl Future<Output = Result<Vec<Store>, Self::Error>> + Send + '_;

  /// Hard-delete one dimension row by surrogate key. Fails with a
  /// foreign-key error while any fact or aggregate references it, and
  /// refuses the current customer or product version while older versions
  /// of the same business key remain. Returns whether a row was removed.
  fn delete_dimension_row(
    &self,
    dimension: Dimension,
    key: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Facts (append-only) ────────────────────────────────────────

  fn record_sale(
    &self,
    input: NewSale,
  ) -> impl Future<Output = Result<SalesLine, Self::Error>> + Send + '_;

  /// Record a batch of sales lines; either all are stored or none.
  fn record_sales(
    &self,
    input: Vec<NewSale>,
  ) -> impl Future<Output = Result<Vec<SalesLine>, Self::Error>> + Send + '_;

  fn get_sale(
    &self,
    sales_key: i64,
  ) -> impl Future<Output = Result<Option<SalesLine>, Self::Error>> + Send + '_;

  fn record_inventory(
    &self,
    input: NewInventory,
  ) -> impl Future<Output = Result<InventorySnapshot, Self::Error>> + Send + '_;

  fn inventory_snapshots<'a>(
    &'a self,
    query: &'a InventoryQuery,
  ) -> impl Future<Output = Result<Vec<InventorySnapshot>, Self::Error>> + Send + 'a;

  // ── Views and reports ─────────────────────────────────────────────────

  fn sales_summary<'a>(
    &'a self,
    query: &'a SummaryQuery,
  ) -> impl Future<Output = Result<Vec<SalesSummaryRow>, Self::Error>> + Send + 'a;

  /// Rows of `vw_top_products`, highest revenue first; ties are broken by
  /// name, category and brand.
  fn top_products(
    &self,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<TopProductRow>, Self::Error>> + Send + '_;

  fn revenue_by_region_quarter(
    &self,
    year: Option<i32>,
  ) -> impl Future<Output = Result<Vec<RegionQuarterRevenue>, Self::Error>> + Send + '_;

  fn top_customers(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<CustomerSpend>, Self::Error>> + Send + '_;

  // ── Aggregates ────────────────────────────────────────────────────────

  /// Rebuild aggregate rows according to `policy` in one transaction and
  /// log the run.
  fn refresh_aggregates(
    &self,
    policy: RefreshPolicy,
  ) -> impl Future<Output = Result<RefreshReport, Self::Error>> + Send + '_;

  /// Write one daily aggregate row directly. Fails if the
  /// `(date_key, store_key)` pair already has a row.
  fn insert_daily_sales(
    &self,
    row: DailySales,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn daily_sales<'a>(
    &'a self,
    query: &'a DailySalesQuery,
  ) -> impl Future<Output = Result<Vec<DailySales>, Self::Error>> + Send + 'a;

  fn monthly_product(
    &self,
    year_month: YearMonth,
  ) -> impl Future<Output = Result<Vec<MonthlyProduct>, Self::Error>> + Send + '_;

  /// The most recent refresh runs, newest first.
  fn refresh_history(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<RefreshReport>, Self::Error>> + Send + '_;

  // ── Audit ─────────────────────────────────────────────────────────────

  fn check_integrity(&self) -> impl Future<Output = Result<IntegrityReport, Self::Error>> + Send + '_;
}
