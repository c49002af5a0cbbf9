//! Read models: rows of the two reporting views, the reporting queries, and
//! the integrity audit. None of these are stored; all are derived on read.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── vw_sales_summary ────────────────────────────────────────────────────────

/// One row of `vw_sales_summary`: a sales line attributed to the current
/// customer and product versions it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummaryRow {
  pub sales_key:             i64,
  pub transaction_id:        String,
  pub date_value:            NaiveDate,
  pub year:                  i32,
  pub quarter:               u32,
  pub month_name:            String,
  pub customer_id:           String,
  pub customer_name:         String,
  pub customer_segment:      Option<String>,
  pub product_id:            String,
  pub product_name:          String,
  pub category:              Option<String>,
  pub brand:                 Option<String>,
  pub store_id:              String,
  pub store_name:            String,
  pub store_city:            Option<String>,
  pub region:                Option<String>,
  pub quantity:              i64,
  pub unit_price:            f64,
  pub discount_amount:       f64,
  pub total_amount:          f64,
  pub profit_amount:         f64,
  pub transaction_timestamp: DateTime<Utc>,
}

/// Parameters for [`crate::store::WarehouseStore::sales_summary`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
  pub year:   Option<i32>,
  pub region: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

// ─── vw_top_products ─────────────────────────────────────────────────────────

/// One row of `vw_top_products`. Rows are keyed by descriptive attributes,
/// so distinct product keys sharing name, category and brand are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProductRow {
  pub product_name:        String,
  pub category:            Option<String>,
  pub brand:               Option<String>,
  pub total_quantity_sold: i64,
  pub total_revenue:       f64,
  pub total_profit:        f64,
  /// Rounded to 2 dp.
  pub avg_unit_price:      f64,
}

// ─── Reporting queries ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionQuarterRevenue {
  pub region:            Option<String>,
  pub year:              i32,
  pub quarter:           u32,
  pub total_revenue:     f64,
  pub total_profit:      f64,
  pub transaction_count: i64,
}

/// Lifetime spend of one customer across all of their versions, labelled
/// with the current version's attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSpend {
  pub customer_id:       String,
  pub customer_name:     String,
  pub customer_segment:  Option<String>,
  pub total_spent:       f64,
  pub transaction_count: i64,
}

// ─── Integrity audit ─────────────────────────────────────────────────────────

/// A business key whose number of current versions is not exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentVersionAnomaly {
  pub business_id:   String,
  pub current_count: i64,
}

/// Why an `agg_daily_sales` row disagrees with the facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
  /// Facts exist for the pair but no aggregate row does.
  Missing,
  /// An aggregate row exists with no facts behind it.
  Orphaned,
  /// Both exist but the totals differ.
  Mismatched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDrift {
  pub date_key:  i64,
  pub store_key: i64,
  pub kind:      DriftKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
  pub customers:   Vec<CurrentVersionAnomaly>,
  pub products:    Vec<CurrentVersionAnomaly>,
  pub daily_drift: Vec<AggregateDrift>,
}

impl IntegrityReport {
  pub fn is_clean(&self) -> bool {
    self.customers.is_empty() && self.products.is_empty() && self.daily_drift.is_empty()
  }
}
