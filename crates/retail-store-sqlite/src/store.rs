//! [`SqliteStore`]: the SQLite implementation of [`WarehouseStore`].

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension as _};

use retail_core::{
  aggregate::{DailySales, DailySalesQuery, MonthlyProduct, RefreshPolicy, RefreshReport, YearMonth},
  calendar::{self, DateDim, FiscalCalendar},
  dimension::{
    CustomerAttributes, CustomerVersion, Dimension, NewCustomer, NewProduct, NewStore,
    ProductAttributes, ProductVersion, Store, StoreAttributes,
  },
  fact::{InventoryQuery, InventorySnapshot, NewInventory, NewSale, SalesLine},
  report::{
    CurrentVersionAnomaly, CustomerSpend, IntegrityReport, RegionQuarterRevenue, SalesSummaryRow,
    SummaryQuery, TopProductRow,
  },
  store::WarehouseStore,
  version::Supersession,
};

use crate::{
  Error, Result,
  encode::{
    DAILY_COLUMNS, DATE_COLUMNS, INVENTORY_COLUMNS, MONTHLY_COLUMNS, REFRESH_COLUMNS,
    SALES_COLUMNS, STORE_COLUMNS, SUMMARY_COLUMNS, RawCustomer, RawDate, RawMonthly, RawProduct,
    RawRefresh, RawSale, RawStore, RawSummary, encode_date, encode_dt, encode_expiration,
    encode_opt_date, read_daily, read_inventory, read_top_product,
  },
  refresh,
  scd::{self, CUSTOMERS, PRODUCTS, VersionedTable},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A retail warehouse backed by a single SQLite file.
///
/// Cloning shares the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread, keeping its crate-level error intact.
  pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── Row writers ─────────────────────────────────────────────────────────────

/// `verb` is `INSERT` or `INSERT OR IGNORE`.
fn insert_date(conn: &Connection, verb: &str, d: &DateDim) -> rusqlite::Result<usize> {
  conn.execute(
    &format!(
      "{verb} INTO dim_date ({DATE_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
    ),
    rusqlite::params![
      d.date_key,
      encode_date(d.date_value),
      d.day_of_week,
      d.day_name,
      d.day_of_month,
      d.day_of_year,
      d.week_of_year,
      d.month,
      d.month_name,
      d.quarter,
      d.year,
      d.is_weekend,
      d.is_holiday,
      d.fiscal_year,
      d.fiscal_quarter,
    ],
  )
}

/// Insert a current customer version and return its surrogate key.
fn insert_customer_row(
  conn: &Connection,
  customer_id: &str,
  a: &CustomerAttributes,
  effective_date: NaiveDate,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO dim_customer (
       customer_id, first_name, last_name, email, phone, address, city, state,
       country, postal_code, customer_segment, registration_date,
       effective_date, expiration_date, is_current
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, TRUE)",
    rusqlite::params![
      customer_id,
      a.first_name,
      a.last_name,
      a.email,
      a.phone,
      a.address,
      a.city,
      a.state,
      a.country,
      a.postal_code,
      a.customer_segment,
      encode_opt_date(a.registration_date),
      encode_date(effective_date),
      encode_expiration(None),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

fn insert_product_row(
  conn: &Connection,
  product_id: &str,
  a: &ProductAttributes,
  effective_date: NaiveDate,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO dim_product (
       product_id, product_name, category, subcategory, brand, supplier,
       unit_price, unit_cost, effective_date, expiration_date, is_current
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, TRUE)",
    rusqlite::params![
      product_id,
      a.product_name,
      a.category,
      a.subcategory,
      a.brand,
      a.supplier,
      a.unit_price,
      a.unit_cost,
      encode_date(effective_date),
      encode_expiration(None),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

fn insert_sale(conn: &Connection, s: &NewSale) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO fact_sales (
       date_key, customer_key, product_key, store_key, transaction_id,
       quantity, unit_price, discount_amount, total_amount, cost_amount,
       profit_amount, transaction_timestamp
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    rusqlite::params![
      s.keys.date_key,
      s.keys.customer_key,
      s.keys.product_key,
      s.keys.store_key,
      s.transaction_id,
      s.quantity,
      s.unit_price,
      s.discount_amount,
      s.total_amount,
      s.cost_amount,
      s.profit_amount,
      encode_dt(s.transaction_timestamp),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

fn sale_by_key(conn: &Connection, sales_key: i64) -> rusqlite::Result<Option<RawSale>> {
  conn
    .query_row(
      &format!("SELECT {SALES_COLUMNS} FROM fact_sales WHERE sales_key = ?1"),
      rusqlite::params![sales_key],
      RawSale::read,
    )
    .optional()
}

fn store_by_id(conn: &Connection, store_id: &str) -> rusqlite::Result<Option<RawStore>> {
  conn
    .query_row(
      &format!("SELECT {STORE_COLUMNS} FROM dim_store WHERE store_id = ?1"),
      rusqlite::params![store_id],
      RawStore::read,
    )
    .optional()
}

/// Clamp a count to SQLite's integer range.
fn sql_int(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

/// `LIMIT -1` is SQLite for "no limit".
fn sql_limit(limit: Option<usize>) -> i64 { limit.map_or(-1, sql_int) }

// ─── WarehouseStore impl ─────────────────────────────────────────────────────

impl WarehouseStore for SqliteStore {
  type Error = Error;

  // ── Date dimension ────────────────────────────────────────────────────────

  async fn add_date(&self, date: DateDim) -> Result<DateDim> {
    let row = date.clone();
    self
      .with_conn(move |conn| {
        insert_date(conn, "INSERT", &row)?;
        Ok(())
      })
      .await?;
    Ok(date)
  }

  async fn get_date(&self, date_key: i64) -> Result<Option<DateDim>> {
    let raw: Option<RawDate> = self
      .with_conn(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DATE_COLUMNS} FROM dim_date WHERE date_key = ?1"),
              rusqlite::params![date_key],
              RawDate::read,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDate::into_date).transpose()
  }

  async fn populate_dates(
    &self,
    start: NaiveDate,
    end: NaiveDate,
    fiscal: FiscalCalendar,
  ) -> Result<usize> {
    let rows: Vec<DateDim> = calendar::days(start, end)?
      .map(|d| DateDim::for_date(d, &fiscal))
      .collect();
    let requested = rows.len();

    let inserted = self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for row in &rows {
          inserted += insert_date(&tx, "INSERT OR IGNORE", row)?;
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    tracing::info!(%start, %end, requested, inserted, "populated date dimension");
    Ok(inserted)
  }

  // ── Customer dimension ────────────────────────────────────────────────────

  async fn add_customer(&self, input: NewCustomer) -> Result<CustomerVersion> {
    let raw = self
      .with_conn(move |conn| {
        let NewCustomer { customer_id, attributes, effective_date } = input;
        scd::insert_first(
          conn,
          &CUSTOMERS,
          &customer_id,
          effective_date,
          |c| insert_customer_row(c, &customer_id, &attributes, effective_date),
          RawCustomer::read,
        )
      })
      .await?;

    let customer = raw.into_customer()?;
    tracing::debug!(
      customer_id = %customer.customer_id,
      customer_key = customer.customer_key,
      "added customer"
    );
    Ok(customer)
  }

  async fn supersede_customer(
    &self,
    customer_id: String,
    attributes: CustomerAttributes,
    effective_date: NaiveDate,
  ) -> Result<Supersession<CustomerVersion>> {
    self
      .with_conn(move |conn| {
        scd::supersede(
          conn,
          &CUSTOMERS,
          &customer_id,
          effective_date,
          |c| insert_customer_row(c, &customer_id, &attributes, effective_date),
          RawCustomer::read,
        )
      })
      .await?
      .try_map(RawCustomer::into_customer)
  }

  async fn current_customer(&self, customer_id: String) -> Result<Option<CustomerVersion>> {
    let raw = self
      .with_conn(move |conn| scd::current(conn, &CUSTOMERS, &customer_id, RawCustomer::read))
      .await?;
    raw.map(RawCustomer::into_customer).transpose()
  }

  async fn customer_history(&self, customer_id: String) -> Result<Vec<CustomerVersion>> {
    let raws = self
      .with_conn(move |conn| scd::history(conn, &CUSTOMERS, &customer_id, RawCustomer::read))
      .await?;
    raws.into_iter().map(RawCustomer::into_customer).collect()
  }

  async fn customer_as_of(
    &self,
    customer_id: String,
    date: NaiveDate,
  ) -> Result<Option<CustomerVersion>> {
    let raw = self
      .with_conn(move |conn| scd::as_of(conn, &CUSTOMERS, &customer_id, date, RawCustomer::read))
      .await?;
    raw.map(RawCustomer::into_customer).transpose()
  }

  // ── Product dimension ─────────────────────────────────────────────────────

  async fn add_product(&self, input: NewProduct) -> Result<ProductVersion> {
    let raw = self
      .with_conn(move |conn| {
        let NewProduct { product_id, attributes, effective_date } = input;
        scd::insert_first(
          conn,
          &PRODUCTS,
          &product_id,
          effective_date,
          |c| insert_product_row(c, &product_id, &attributes, effective_date),
          RawProduct::read,
        )
      })
      .await?;

    let product = raw.into_product()?;
    tracing::debug!(
      product_id = %product.product_id,
      product_key = product.product_key,
      "added product"
    );
    Ok(product)
  }

  async fn supersede_product(
    &self,
    product_id: String,
    attributes: ProductAttributes,
    effective_date: NaiveDate,
  ) -> Result<Supersession<ProductVersion>> {
    self
      .with_conn(move |conn| {
        scd::supersede(
          conn,
          &PRODUCTS,
          &product_id,
          effective_date,
          |c| insert_product_row(c, &product_id, &attributes, effective_date),
          RawProduct::read,
        )
      })
      .await?
      .try_map(RawProduct::into_product)
  }

  async fn current_product(&self, product_id: String) -> Result<Option<ProductVersion>> {
    let raw = self
      .with_conn(move |conn| scd::current(conn, &PRODUCTS, &product_id, RawProduct::read))
      .await?;
    raw.map(RawProduct::into_product).transpose()
  }

  async fn product_history(&self, product_id: String) -> Result<Vec<ProductVersion>> {
    let raws = self
      .with_conn(move |conn| scd::history(conn, &PRODUCTS, &product_id, RawProduct::read))
      .await?;
    raws.into_iter().map(RawProduct::into_product).collect()
  }

  async fn product_as_of(
    &self,
    product_id: String,
    date: NaiveDate,
  ) -> Result<Option<ProductVersion>> {
    let raw = self
      .with_conn(move |conn| scd::as_of(conn, &PRODUCTS, &product_id, date, RawProduct::read))
      .await?;
    raw.map(RawProduct::into_product).transpose()
  }

  // ── Store dimension ───────────────────────────────────────────────────────

  async fn add_store(&self, input: NewStore) -> Result<Store> {
    let raw = self
      .with_conn(move |conn| {
        let a = &input.attributes;
        conn.execute(
          "INSERT INTO dim_store (
             store_id, store_name, store_type, address, city, state, country,
             postal_code, region, manager_name, opening_date, square_footage
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            input.store_id,
            a.store_name,
            a.store_type,
            a.address,
            a.city,
            a.state,
            a.country,
            a.postal_code,
            a.region,
            a.manager_name,
            encode_opt_date(a.opening_date),
            a.square_footage,
          ],
        )?;
        store_by_id(conn, &input.store_id)?.ok_or(Error::StoreNotFound(input.store_id))
      })
      .await?;

    raw.into_store()
  }

  async fn update_store(&self, store_id: String, attributes: StoreAttributes) -> Result<Store> {
    let raw = self
      .with_conn(move |conn| {
        let a = &attributes;
        let changed = conn.execute(
          "UPDATE dim_store SET
             store_name = ?2, store_type = ?3, address = ?4, city = ?5, state = ?6,
             country = ?7, postal_code = ?8, region = ?9, manager_name = ?10,
             opening_date = ?11, square_footage = ?12
           WHERE store_id = ?1",
          rusqlite::params![
            store_id,
            a.store_name,
            a.store_type,
            a.address,
            a.city,
            a.state,
            a.country,
            a.postal_code,
            a.region,
            a.manager_name,
            encode_opt_date(a.opening_date),
            a.square_footage,
          ],
        )?;
        if changed == 0 {
          return Err(Error::StoreNotFound(store_id));
        }
        store_by_id(conn, &store_id)?.ok_or(Error::StoreNotFound(store_id))
      })
      .await?;

    raw.into_store()
  }

  async fn get_store(&self, store_id: String) -> Result<Option<Store>> {
    let raw = self.with_conn(move |conn| Ok(store_by_id(conn, &store_id)?)).await?;
    raw.map(RawStore::into_store).transpose()
  }

  async fn list_stores(&self) -> Result<Vec<Store>> {
    let raws: Vec<RawStore> = self
      .with_conn(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {STORE_COLUMNS} FROM dim_store ORDER BY store_key"))?;
        let rows = stmt.query_map([], RawStore::read)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStore::into_store).collect()
  }

  async fn delete_dimension_row(&self, dimension: Dimension, key: i64) -> Result<bool> {
    let removed = self
      .with_conn(move |conn| match dimension {
        Dimension::Customer => scd::delete_version(conn, &CUSTOMERS, key),
        Dimension::Product => scd::delete_version(conn, &PRODUCTS, key),
        Dimension::Date | Dimension::Store => {
          let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            dimension.table(),
            dimension.key_column()
          );
          Ok(conn.execute(&sql, rusqlite::params![key])? > 0)
        }
      })
      .await?;

    tracing::debug!(table = dimension.table(), key, removed, "deleted dimension row");
    Ok(removed)
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn record_sale(&self, input: NewSale) -> Result<SalesLine> {
    let raw = self
      .with_conn(move |conn| {
        let key = insert_sale(conn, &input)?;
        Ok(conn.query_row(
          &format!("SELECT {SALES_COLUMNS} FROM fact_sales WHERE sales_key = ?1"),
          rusqlite::params![key],
          RawSale::read,
        )?)
      })
      .await?;

    raw.into_sale()
  }

  async fn record_sales(&self, input: Vec<NewSale>) -> Result<Vec<SalesLine>> {
    let count = input.len();
    let raws: Vec<RawSale> = self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let mut keys = Vec::with_capacity(input.len());
        for sale in &input {
          keys.push(insert_sale(&tx, sale)?);
        }
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
          if let Some(raw) = sale_by_key(&tx, key)? {
            rows.push(raw);
          }
        }
        tx.commit()?;
        Ok(rows)
      })
      .await?;

    tracing::debug!(count, "recorded sales batch");
    raws.into_iter().map(RawSale::into_sale).collect()
  }

  async fn get_sale(&self, sales_key: i64) -> Result<Option<SalesLine>> {
    let raw = self.with_conn(move |conn| Ok(sale_by_key(conn, sales_key)?)).await?;
    raw.map(RawSale::into_sale).transpose()
  }

  async fn record_inventory(&self, input: NewInventory) -> Result<InventorySnapshot> {
    let inventory_key = self
      .with_conn({
        let input = input.clone();
        move |conn| {
          conn.execute(
            "INSERT INTO fact_inventory (
               date_key, product_key, store_key, quantity_on_hand,
               quantity_reserved, quantity_available, reorder_point
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
              input.date_key,
              input.product_key,
              input.store_key,
              input.quantity_on_hand,
              input.quantity_reserved,
              input.quantity_available,
              input.reorder_point,
            ],
          )?;
          Ok(conn.last_insert_rowid())
        }
      })
      .await?;

    Ok(InventorySnapshot {
      inventory_key,
      date_key: input.date_key,
      product_key: input.product_key,
      store_key: input.store_key,
      quantity_on_hand: input.quantity_on_hand,
      quantity_reserved: input.quantity_reserved,
      quantity_available: input.quantity_available,
      reorder_point: input.reorder_point,
    })
  }

  async fn inventory_snapshots<'a>(
    &'a self,
    query: &'a InventoryQuery,
  ) -> Result<Vec<InventorySnapshot>> {
    let (date_key, product_key, store_key) = (query.date_key, query.product_key, query.store_key);
    let below_reorder = query.below_reorder;
    let limit = sql_limit(query.limit);

    self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {INVENTORY_COLUMNS} FROM fact_inventory
           WHERE (?1 IS NULL OR date_key = ?1)
             AND (?2 IS NULL OR product_key = ?2)
             AND (?3 IS NULL OR store_key = ?3)
             AND (NOT ?4 OR (reorder_point IS NOT NULL AND quantity_available <= reorder_point))
           ORDER BY inventory_key
           LIMIT ?5"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![date_key, product_key, store_key, below_reorder, limit],
            read_inventory,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }

  // ── Views and reports ─────────────────────────────────────────────────────

  async fn sales_summary<'a>(&'a self, query: &'a SummaryQuery) -> Result<Vec<SalesSummaryRow>> {
    let year = query.year;
    let region = query.region.clone();
    let limit = sql_limit(query.limit);
    let offset = sql_int(query.offset.unwrap_or(0));

    let raws: Vec<RawSummary> = self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUMMARY_COLUMNS} FROM vw_sales_summary
           WHERE (?1 IS NULL OR year = ?1)
             AND (?2 IS NULL OR region = ?2)
           ORDER BY transaction_timestamp, sales_key
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![year, region, limit, offset], RawSummary::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSummary::into_row).collect()
  }

  async fn top_products(&self, limit: Option<usize>) -> Result<Vec<TopProductRow>> {
    let limit = sql_limit(limit);
    self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT product_name, category, brand, total_quantity_sold,
                  total_revenue, total_profit, avg_unit_price
           FROM vw_top_products
           ORDER BY total_revenue DESC, product_name, category, brand
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], read_top_product)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }

  async fn revenue_by_region_quarter(&self, year: Option<i32>) -> Result<Vec<RegionQuarterRevenue>> {
    self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT st.region, d.year, d.quarter,
                  SUM(s.total_amount)  AS revenue,
                  SUM(s.profit_amount) AS profit,
                  COUNT(DISTINCT s.transaction_id)
           FROM fact_sales s
           JOIN dim_date  d  ON d.date_key   = s.date_key
           JOIN dim_store st ON st.store_key = s.store_key
           WHERE ?1 IS NULL OR d.year = ?1
           GROUP BY st.region, d.year, d.quarter
           ORDER BY d.year, d.quarter, revenue DESC, st.region",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![year], |r| {
            Ok(RegionQuarterRevenue {
              region:            r.get(0)?,
              year:              r.get(1)?,
              quarter:           r.get(2)?,
              total_revenue:     r.get(3)?,
              total_profit:      r.get(4)?,
              transaction_count: r.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }

  async fn top_customers(&self, limit: usize) -> Result<Vec<CustomerSpend>> {
    let limit = sql_int(limit);
    self
      .with_conn(move |conn| {
        // Facts point at whichever version was current when they were
        // recorded; `cur` folds every version onto the current one.
        let mut stmt = conn.prepare(
          "SELECT cur.customer_id,
                  cur.first_name || ' ' || cur.last_name,
                  cur.customer_segment,
                  SUM(s.total_amount) AS spent,
                  COUNT(DISTINCT s.transaction_id)
           FROM fact_sales s
           JOIN dim_customer c   ON c.customer_key = s.customer_key
           JOIN dim_customer cur ON cur.customer_id = c.customer_id AND cur.is_current = TRUE
           GROUP BY cur.customer_key
           ORDER BY spent DESC, cur.customer_id
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |r| {
            Ok(CustomerSpend {
              customer_id:       r.get(0)?,
              customer_name:     r.get(1)?,
              customer_segment:  r.get(2)?,
              total_spent:       r.get(3)?,
              transaction_count: r.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn refresh_aggregates(&self, policy: RefreshPolicy) -> Result<RefreshReport> {
    self.with_conn(move |conn| refresh::run(conn, policy)).await
  }

  async fn insert_daily_sales(&self, row: DailySales) -> Result<()> {
    self
      .with_conn(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO agg_daily_sales ({DAILY_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
          ),
          rusqlite::params![
            row.date_key,
            row.store_key,
            row.total_transactions,
            row.total_quantity,
            row.total_revenue,
            row.total_cost,
            row.total_profit,
            row.avg_transaction_value,
          ],
        )?;
        Ok(())
      })
      .await
  }

  async fn daily_sales<'a>(&'a self, query: &'a DailySalesQuery) -> Result<Vec<DailySales>> {
    let from = query.from.map(encode_date);
    let to = query.to.map(encode_date);
    let store_key = query.store_key;

    self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DAILY_COLUMNS} FROM agg_daily_sales
           WHERE (?3 IS NULL OR store_key = ?3)
             AND date_key IN (
               SELECT date_key FROM dim_date
               WHERE (?1 IS NULL OR date_value >= ?1)
                 AND (?2 IS NULL OR date_value <= ?2)
             )
           ORDER BY date_key, store_key"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![from, to, store_key], read_daily)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }

  async fn monthly_product(&self, year_month: YearMonth) -> Result<Vec<MonthlyProduct>> {
    let ym = year_month.to_string();
    let raws: Vec<RawMonthly> = self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MONTHLY_COLUMNS} FROM agg_monthly_product
           WHERE year_month = ?1
           ORDER BY total_revenue DESC, product_key"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![ym], RawMonthly::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMonthly::into_monthly).collect()
  }

  async fn refresh_history(&self, limit: usize) -> Result<Vec<RefreshReport>> {
    let limit = sql_int(limit);
    let raws: Vec<RawRefresh> = self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REFRESH_COLUMNS} FROM agg_refresh_log
           ORDER BY started_at DESC, rowid DESC
           LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], RawRefresh::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRefresh::into_report).collect()
  }

  // ── Audit ─────────────────────────────────────────────────────────────────

  async fn check_integrity(&self) -> Result<IntegrityReport> {
    let report = self
      .with_conn(|conn| {
        let conn: &Connection = conn;
        let anomalies = |table: &VersionedTable| -> Result<Vec<CurrentVersionAnomaly>> {
          Ok(
            scd::current_anomalies(conn, table)?
              .into_iter()
              .map(|(business_id, current_count)| CurrentVersionAnomaly { business_id, current_count })
              .collect(),
          )
        };
        Ok(IntegrityReport {
          customers:   anomalies(&CUSTOMERS)?,
          products:    anomalies(&PRODUCTS)?,
          daily_drift: refresh::daily_drift(conn)?,
        })
      })
      .await?;

    if !report.is_clean() {
      tracing::warn!(
        customers = report.customers.len(),
        products = report.products.len(),
        daily_drift = report.daily_drift.len(),
        "integrity audit found problems"
      );
    }
    Ok(report)
  }
}
