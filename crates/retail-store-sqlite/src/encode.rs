//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD`, timestamps as RFC 3339 UTC strings with
//! microsecond precision, UUIDs as hyphenated lowercase strings. An open
//! validity window is stored as [`OPEN_END`]. Each `Raw*` struct mirrors one table's column list and is
//! read with the matching `*_COLUMNS` constant.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use retail_core::{
  aggregate::{DailySales, MonthlyProduct, RefreshPolicy, RefreshReport},
  calendar::DateDim,
  dimension::{
    CustomerAttributes, CustomerVersion, ProductAttributes, ProductVersion, Store, StoreAttributes,
  },
  fact::{InventorySnapshot, SaleKeys, SalesLine},
  report::{SalesSummaryRow, TopProductRow},
  version::Validity,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result, schema::OPEN_END};

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_opt_date(d: Option<NaiveDate>) -> Option<String> { d.map(encode_date) }

pub fn decode_opt_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
  s.map(decode_date).transpose()
}

/// `None` (still open) is stored as the far-future sentinel.
pub fn encode_expiration(d: Option<NaiveDate>) -> String {
  d.map(encode_date).unwrap_or_else(|| OPEN_END.to_owned())
}

pub fn decode_expiration(s: &str) -> Result<Option<NaiveDate>> {
  if s == OPEN_END { Ok(None) } else { decode_date(s).map(Some) }
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width so stored timestamps sort lexicographically.
/// Fixed-width RFC 3339 with nanoseconds; stored values sort as text.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── dim_date ────────────────────────────────────────────────────────────────

pub const DATE_COLUMNS: &str = "date_key, date_value, day_of_week, day_name, day_of_month, \
  day_of_year, week_of_year, month, month_name, quarter, year, is_weekend, is_holiday, \
  fiscal_year, fiscal_quarter";

pub struct RawDate {
  pub date_key:       i64,
  pub date_value:     String,
  pub day_of_week:    u32,
  pub day_name:       String,
  pub day_of_month:   u32,
  pub day_of_year:    u32,
  pub week_of_year:   u32,
  pub month:          u32,
  pub month_name:     String,
  pub quarter:        u32,
  pub year:           i32,
  pub is_weekend:     bool,
  pub is_holiday:     bool,
  pub fiscal_year:    i32,
  pub fiscal_quarter: u32,
}

impl RawDate {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      date_key:       row.get(0)?,
      date_value:     row.get(1)?,
      day_of_week:    row.get(2)?,
      day_name:       row.get(3)?,
      day_of_month:   row.get(4)?,
      day_of_year:    row.get(5)?,
      week_of_year:   row.get(6)?,
      month:          row.get(7)?,
      month_name:     row.get(8)?,
      quarter:        row.get(9)?,
      year:           row.get(10)?,
      is_weekend:     row.get(11)?,
      is_holiday:     row.get(12)?,
      fiscal_year:    row.get(13)?,
      fiscal_quarter: row.get(14)?,
    })
  }

  pub fn into_date(self) -> Result<DateDim> {
    Ok(DateDim {
      date_key:       self.date_key,
      date_value:     decode_date(&self.date_value)?,
      day_of_week:    self.day_of_week,
      day_name:       self.day_name,
      day_of_month:   self.day_of_month,
      day_of_year:    self.day_of_year,
      week_of_year:   self.week_of_year,
      month:          self.month,
      month_name:     self.month_name,
      quarter:        self.quarter,
      year:           self.year,
      is_weekend:     self.is_weekend,
      is_holiday:     self.is_holiday,
      fiscal_year:    self.fiscal_year,
      fiscal_quarter: self.fiscal_quarter,
    })
  }
}

// ─── Validity window ─────────────────────────────────────────────────────────

pub struct RawValidity {
  pub effective_date:  String,
  pub expiration_date: String,
  pub is_current:      bool,
}

impl RawValidity {
  /// Read the three SCD columns starting at column `at`.
  fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      effective_date:  row.get(at)?,
      expiration_date: row.get(at + 1)?,
      is_current:      row.get(at + 2)?,
    })
  }

  fn into_validity(self) -> Result<Validity> {
    Ok(Validity {
      effective_date:  decode_date(&self.effective_date)?,
      expiration_date: decode_expiration(&self.expiration_date)?,
      is_current:      self.is_current,
    })
  }
}

// ─── dim_customer ────────────────────────────────────────────────────────────

pub const CUSTOMER_COLUMNS: &str = "customer_key, customer_id, first_name, last_name, email, \
  phone, address, city, state, country, postal_code, customer_segment, registration_date, \
  effective_date, expiration_date, is_current";

pub struct RawCustomer {
  pub customer_key:      i64,
  pub customer_id:       String,
  pub first_name:        String,
  pub last_name:         String,
  pub email:             Option<String>,
  pub phone:             Option<String>,
  pub address:           Option<String>,
  pub city:              Option<String>,
  pub state:             Option<String>,
  pub country:           Option<String>,
  pub postal_code:       Option<String>,
  pub customer_segment:  Option<String>,
  pub registration_date: Option<String>,
  pub validity:          RawValidity,
}

impl RawCustomer {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      customer_key:      row.get(0)?,
      customer_id:       row.get(1)?,
      first_name:        row.get(2)?,
      last_name:         row.get(3)?,
      email:             row.get(4)?,
      phone:             row.get(5)?,
      address:           row.get(6)?,
      city:              row.get(7)?,
      state:             row.get(8)?,
      country:           row.get(9)?,
      postal_code:       row.get(10)?,
      customer_segment:  row.get(11)?,
      registration_date: row.get(12)?,
      validity:          RawValidity::read(row, 13)?,
    })
  }

  pub fn into_customer(self) -> Result<CustomerVersion> {
    Ok(CustomerVersion {
      customer_key: self.customer_key,
      customer_id:  self.customer_id,
      attributes:   CustomerAttributes {
        first_name:        self.first_name,
        last_name:         self.last_name,
        email:             self.email,
        phone:             self.phone,
        address:           self.address,
        city:              self.city,
        state:             self.state,
        country:           self.country,
        postal_code:       self.postal_code,
        customer_segment:  self.customer_segment,
        registration_date: decode_opt_date(self.registration_date.as_deref())?,
      },
      validity:     self.validity.into_validity()?,
    })
  }
}

// ─── dim_product ─────────────────────────────────────────────────────────────

pub const PRODUCT_COLUMNS: &str = "product_key, product_id, product_name, category, subcategory, \
  brand, supplier, unit_price, unit_cost, effective_date, expiration_date, is_current";

pub struct RawProduct {
  pub product_key:  i64,
  pub product_id:   String,
  pub product_name: String,
  pub category:     Option<String>,
  pub subcategory:  Option<String>,
  pub brand:        Option<String>,
  pub supplier:     Option<String>,
  pub unit_price:   f64,
  pub unit_cost:    f64,
  pub validity:     RawValidity,
}

impl RawProduct {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      product_key:  row.get(0)?,
      product_id:   row.get(1)?,
      product_name: row.get(2)?,
      category:     row.get(3)?,
      subcategory:  row.get(4)?,
      brand:        row.get(5)?,
      supplier:     row.get(6)?,
      unit_price:   row.get(7)?,
      unit_cost:    row.get(8)?,
      validity:     RawValidity::read(row, 9)?,
    })
  }

  pub fn into_product(self) -> Result<ProductVersion> {
    Ok(ProductVersion {
      product_key: self.product_key,
      product_id:  self.product_id,
      attributes:  ProductAttributes {
        product_name: self.product_name,
        category:     self.category,
        subcategory:  self.subcategory,
        brand:        self.brand,
        supplier:     self.supplier,
        unit_price:   self.unit_price,
        unit_cost:    self.unit_cost,
      },
      validity:    self.validity.into_validity()?,
    })
  }
}

// ─── dim_store ───────────────────────────────────────────────────────────────

pub const STORE_COLUMNS: &str = "store_key, store_id, store_name, store_type, address, city, \
  state, country, postal_code, region, manager_name, opening_date, square_footage";

pub struct RawStore {
  pub store_key:      i64,
  pub store_id:       String,
  pub store_name:     String,
  pub store_type:     Option<String>,
  pub address:        Option<String>,
  pub city:           Option<String>,
  pub state:          Option<String>,
  pub country:        Option<String>,
  pub postal_code:    Option<String>,
  pub region:         Option<String>,
  pub manager_name:   Option<String>,
  pub opening_date:   Option<String>,
  pub square_footage: Option<i64>,
}

impl RawStore {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      store_key:      row.get(0)?,
      store_id:       row.get(1)?,
      store_name:     row.get(2)?,
      store_type:     row.get(3)?,
      address:        row.get(4)?,
      city:           row.get(5)?,
      state:          row.get(6)?,
      country:        row.get(7)?,
      postal_code:    row.get(8)?,
      region:         row.get(9)?,
      manager_name:   row.get(10)?,
      opening_date:   row.get(11)?,
      square_footage: row.get(12)?,
    })
  }

  pub fn into_store(self) -> Result<Store> {
    Ok(Store {
      store_key:  self.store_key,
      store_id:   self.store_id,
      attributes: StoreAttributes {
        store_name:     self.store_name,
        store_type:     self.store_type,
        address:        self.address,
        city:           self.city,
        state:          self.state,
        country:        self.country,
        postal_code:    self.postal_code,
        region:         self.region,
        manager_name:   self.manager_name,
        opening_date:   decode_opt_date(self.opening_date.as_deref())?,
        square_footage: self.square_footage,
      },
    })
  }
}

// ─── fact_sales ──────────────────────────────────────────────────────────────

pub const SALES_COLUMNS: &str = "sales_key, date_key, customer_key, product_key, store_key, \
  transaction_id, quantity, unit_price, discount_amount, total_amount, cost_amount, \
  profit_amount, transaction_timestamp";

pub struct RawSale {
  pub sales_key:             i64,
  pub keys:                  SaleKeys,
  pub transaction_id:        String,
  pub quantity:              i64,
  pub unit_price:            f64,
  pub discount_amount:       f64,
  pub total_amount:          f64,
  pub cost_amount:           f64,
  pub profit_amount:         f64,
  pub transaction_timestamp: String,
}

impl RawSale {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      sales_key:             row.get(0)?,
      keys:                  SaleKeys {
        date_key:     row.get(1)?,
        customer_key: row.get(2)?,
        product_key:  row.get(3)?,
        store_key:    row.get(4)?,
      },
      transaction_id:        row.get(5)?,
      quantity:              row.get(6)?,
      unit_price:            row.get(7)?,
      discount_amount:       row.get(8)?,
      total_amount:          row.get(9)?,
      cost_amount:           row.get(10)?,
      profit_amount:         row.get(11)?,
      transaction_timestamp: row.get(12)?,
    })
  }

  pub fn into_sale(self) -> Result<SalesLine> {
    Ok(SalesLine {
      sales_key:             self.sales_key,
      keys:                  self.keys,
      transaction_id:        self.transaction_id,
      quantity:              self.quantity,
      unit_price:            self.unit_price,
      discount_amount:       self.discount_amount,
      total_amount:          self.total_amount,
      cost_amount:           self.cost_amount,
      profit_amount:         self.profit_amount,
      transaction_timestamp: decode_dt(&self.transaction_timestamp)?,
    })
  }
}

// ─── fact_inventory ──────────────────────────────────────────────────────────

pub const INVENTORY_COLUMNS: &str = "inventory_key, date_key, product_key, store_key, \
  quantity_on_hand, quantity_reserved, quantity_available, reorder_point";

/// Inventory rows have no encoded columns, so they map straight to the
/// domain type.
pub fn read_inventory(row: &Row<'_>) -> rusqlite::Result<InventorySnapshot> {
  Ok(InventorySnapshot {
    inventory_key:      row.get(0)?,
    date_key:           row.get(1)?,
    product_key:        row.get(2)?,
    store_key:          row.get(3)?,
    quantity_on_hand:   row.get(4)?,
    quantity_reserved:  row.get(5)?,
    quantity_available: row.get(6)?,
    reorder_point:      row.get(7)?,
  })
}

// ─── Views ───────────────────────────────────────────────────────────────────

pub const SUMMARY_COLUMNS: &str = "sales_key, transaction_id, date_value, year, quarter, \
  month_name, customer_id, customer_name, customer_segment, product_id, product_name, \
  category, brand, store_id, store_name, store_city, region, quantity, unit_price, \
  discount_amount, total_amount, profit_amount, transaction_timestamp";

pub struct RawSummary {
  pub sales_key:             i64,
  pub transaction_id:        String,
  pub date_value:            String,
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
  pub transaction_timestamp: String,
}

impl RawSummary {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      sales_key:             row.get(0)?,
      transaction_id:        row.get(1)?,
      date_value:            row.get(2)?,
      year:                  row.get(3)?,
      quarter:               row.get(4)?,
      month_name:            row.get(5)?,
      customer_id:           row.get(6)?,
      customer_name:         row.get(7)?,
      customer_segment:      row.get(8)?,
      product_id:            row.get(9)?,
      product_name:          row.get(10)?,
      category:              row.get(11)?,
      brand:                 row.get(12)?,
      store_id:              row.get(13)?,
      store_name:            row.get(14)?,
      store_city:            row.get(15)?,
      region:                row.get(16)?,
      quantity:              row.get(17)?,
      unit_price:            row.get(18)?,
      discount_amount:       row.get(19)?,
      total_amount:          row.get(20)?,
      profit_amount:         row.get(21)?,
      transaction_timestamp: row.get(22)?,
    })
  }

  pub fn into_row(self) -> Result<SalesSummaryRow> {
    Ok(SalesSummaryRow {
      sales_key:             self.sales_key,
      transaction_id:        self.transaction_id,
      date_value:            decode_date(&self.date_value)?,
      year:                  self.year,
      quarter:               self.quarter,
      month_name:            self.month_name,
      customer_id:           self.customer_id,
      customer_name:         self.customer_name,
      customer_segment:      self.customer_segment,
      product_id:            self.product_id,
      product_name:          self.product_name,
      category:              self.category,
      brand:                 self.brand,
      store_id:              self.store_id,
      store_name:            self.store_name,
      store_city:            self.store_city,
      region:                self.region,
      quantity:              self.quantity,
      unit_price:            self.unit_price,
      discount_amount:       self.discount_amount,
      total_amount:          self.total_amount,
      profit_amount:         self.profit_amount,
      transaction_timestamp: decode_dt(&self.transaction_timestamp)?,
    })
  }
}

pub fn read_top_product(row: &Row<'_>) -> rusqlite::Result<TopProductRow> {
  Ok(TopProductRow {
    product_name:        row.get(0)?,
    category:            row.get(1)?,
    brand:               row.get(2)?,
    total_quantity_sold: row.get(3)?,
    total_revenue:       row.get(4)?,
    total_profit:        row.get(5)?,
    avg_unit_price:      row.get(6)?,
  })
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

pub const DAILY_COLUMNS: &str = "date_key, store_key, total_transactions, total_quantity, \
  total_revenue, total_cost, total_profit, avg_transaction_value";

pub fn read_daily(row: &Row<'_>) -> rusqlite::Result<DailySales> {
  Ok(DailySales {
    date_key:              row.get(0)?,
    store_key:             row.get(1)?,
    total_transactions:    row.get(2)?,
    total_quantity:        row.get(3)?,
    total_revenue:         row.get(4)?,
    total_cost:            row.get(5)?,
    total_profit:          row.get(6)?,
    avg_transaction_value: row.get(7)?,
  })
}

pub const MONTHLY_COLUMNS: &str = "year_month, product_key, total_quantity, total_revenue, \
  total_cost, total_profit, profit_margin";

pub struct RawMonthly {
  pub year_month:     String,
  pub product_key:    i64,
  pub total_quantity: i64,
  pub total_revenue:  f64,
  pub total_cost:     f64,
  pub total_profit:   f64,
  pub profit_margin:  f64,
}

impl RawMonthly {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      year_month:     row.get(0)?,
      product_key:    row.get(1)?,
      total_quantity: row.get(2)?,
      total_revenue:  row.get(3)?,
      total_cost:     row.get(4)?,
      total_profit:   row.get(5)?,
      profit_margin:  row.get(6)?,
    })
  }

  pub fn into_monthly(self) -> Result<MonthlyProduct> {
    Ok(MonthlyProduct {
      year_month:     self.year_month.parse()?,
      product_key:    self.product_key,
      total_quantity: self.total_quantity,
      total_revenue:  self.total_revenue,
      total_cost:     self.total_cost,
      total_profit:   self.total_profit,
      profit_margin:  self.profit_margin,
    })
  }
}

// ─── agg_refresh_log ─────────────────────────────────────────────────────────

pub const REFRESH_COLUMNS: &str = "refresh_id, policy, range_start, range_end, daily_rows, \
  monthly_rows, started_at, finished_at";

pub struct RawRefresh {
  pub refresh_id:   String,
  pub policy:       String,
  pub range_start:  Option<String>,
  pub range_end:    Option<String>,
  pub daily_rows:   i64,
  pub monthly_rows: i64,
  pub started_at:   String,
  pub finished_at:  String,
}

impl RawRefresh {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      refresh_id:   row.get(0)?,
      policy:       row.get(1)?,
      range_start:  row.get(2)?,
      range_end:    row.get(3)?,
      daily_rows:   row.get(4)?,
      monthly_rows: row.get(5)?,
      started_at:   row.get(6)?,
      finished_at:  row.get(7)?,
    })
  }

  pub fn into_report(self) -> Result<RefreshReport> {
    let policy = match (self.policy.as_str(), self.range_start, self.range_end) {
      ("full", _, _) => RefreshPolicy::Full,
      ("incremental", Some(from), Some(to)) => RefreshPolicy::Incremental {
        from: decode_date(&from)?,
        to:   decode_date(&to)?,
      },
      (other, ..) => return Err(Error::Decode(format!("unknown refresh policy: {other:?}"))),
    };
    Ok(RefreshReport {
      refresh_id: decode_uuid(&self.refresh_id)?,
      policy,
      daily_rows: self.daily_rows as usize,
      monthly_rows: self.monthly_rows as usize,
      started_at: decode_dt(&self.started_at)?,
      finished_at: decode_dt(&self.finished_at)?,
    })
  }
}
