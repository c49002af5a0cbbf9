//! SCD Type 2 transitions shared by `dim_customer` and `dim_product`.
//!
//! Both tables carry the same three validity columns and differ only in
//! their key, business-id and attribute columns, so the transitions here are
//! written once against a [`VersionedTable`] descriptor. Every function runs
//! on the connection thread; multi-statement transitions open their own
//! transaction so a business key is never observed with zero or two current
//! rows.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension as _, Row};

use crate::{
  Error, Result,
  encode::{CUSTOMER_COLUMNS, PRODUCT_COLUMNS, decode_date, encode_date},
};
use retail_core::version::Supersession;

/// Table and column names of one versioned dimension.
pub struct VersionedTable {
  /// Human-readable name used in errors and logs.
  pub dimension:  &'static str,
  pub table:      &'static str,
  pub key_column: &'static str,
  pub id_column:  &'static str,
  pub columns:    &'static str,
}

pub const CUSTOMERS: VersionedTable = VersionedTable {
  dimension:  "customer",
  table:      "dim_customer",
  key_column: "customer_key",
  id_column:  "customer_id",
  columns:    CUSTOMER_COLUMNS,
};

pub const PRODUCTS: VersionedTable = VersionedTable {
  dimension:  "product",
  table:      "dim_product",
  key_column: "product_key",
  id_column:  "product_id",
  columns:    PRODUCT_COLUMNS,
};

/// Row reader for one table's `Raw*` type.
pub type ReadRow<R> = fn(&Row<'_>) -> rusqlite::Result<R>;

impl VersionedTable {
  fn by_key<R>(&self, conn: &Connection, key: i64, read: ReadRow<R>) -> Result<R> {
    let sql = format!(
      "SELECT {} FROM {} WHERE {} = ?1",
      self.columns, self.table, self.key_column
    );
    Ok(conn.query_row(&sql, rusqlite::params![key], read)?)
  }

  fn has_current(&self, conn: &Connection, business_id: &str) -> Result<bool> {
    let sql = format!(
      "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = ?1 AND is_current = TRUE)",
      self.table, self.id_column
    );
    Ok(conn.query_row(&sql, rusqlite::params![business_id], |r| r.get(0))?)
  }

  fn current_window(&self, conn: &Connection, business_id: &str) -> Result<Option<(i64, NaiveDate)>> {
    let sql = format!(
      "SELECT {}, effective_date FROM {} WHERE {} = ?1 AND is_current = TRUE",
      self.key_column, self.table, self.id_column
    );
    let found: Option<(i64, String)> = conn
      .query_row(&sql, rusqlite::params![business_id], |r| Ok((r.get(0)?, r.get(1)?)))
      .optional()?;
    found.map(|(key, eff)| Ok((key, decode_date(&eff)?))).transpose()
  }

  /// The latest expiration among this key's closed versions.
  fn latest_expiration(&self, conn: &Connection, business_id: &str) -> Result<Option<NaiveDate>> {
    let sql = format!(
      "SELECT MAX(expiration_date) FROM {} WHERE {} = ?1 AND is_current = FALSE",
      self.table, self.id_column
    );
    let latest: Option<String> = conn.query_row(&sql, rusqlite::params![business_id], |r| r.get(0))?;
    latest.as_deref().map(decode_date).transpose()
  }

  fn no_current(&self, business_id: &str) -> Error {
    Error::NoCurrentVersion { dimension: self.dimension, business_id: business_id.to_owned() }
  }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Insert a version of `business_id` as current when none is.
///
/// If the key has closed history, `effective_date` may not start before the
/// latest expiration, so windows never overlap. `insert` writes the row
/// (leaving the validity columns to their defaults apart from
/// `effective_date`) and returns its rowid.
pub fn insert_first<R>(
  conn: &mut Connection,
  table: &VersionedTable,
  business_id: &str,
  effective_date: NaiveDate,
  insert: impl FnOnce(&Connection) -> rusqlite::Result<i64>,
  read: ReadRow<R>,
) -> Result<R> {
  let tx = conn.transaction()?;
  if table.has_current(&tx, business_id)? {
    return Err(Error::AlreadyCurrent {
      dimension:   table.dimension,
      business_id: business_id.to_owned(),
    });
  }
  if let Some(latest) = table.latest_expiration(&tx, business_id)?
    && effective_date < latest
  {
    return Err(Error::InvalidEffectiveDate { current: latest, new: effective_date });
  }
  let key = insert(&*tx)?;
  let row = table.by_key(&tx, key, read)?;
  tx.commit()?;
  Ok(row)
}

/// Expire the current version of `business_id` at `effective_date` and insert
/// its replacement, in one transaction.
pub fn supersede<R>(
  conn: &mut Connection,
  table: &VersionedTable,
  business_id: &str,
  effective_date: NaiveDate,
  insert: impl FnOnce(&Connection) -> rusqlite::Result<i64>,
  read: ReadRow<R>,
) -> Result<Supersession<R>> {
  let tx = conn.transaction()?;

  let (old_key, old_effective) = table
    .current_window(&tx, business_id)?
    .ok_or_else(|| table.no_current(business_id))?;

  if effective_date <= old_effective {
    return Err(Error::InvalidEffectiveDate { current: old_effective, new: effective_date });
  }

  let expire = format!(
    "UPDATE {} SET expiration_date = ?1, is_current = FALSE WHERE {} = ?2",
    table.table, table.key_column
  );
  tx.execute(&expire, rusqlite::params![encode_date(effective_date), old_key])?;

  let new_key = insert(&*tx)?;
  let expired = table.by_key(&tx, old_key, read)?;
  let current = table.by_key(&tx, new_key, read)?;
  tx.commit()?;

  tracing::debug!(
    dimension = table.dimension,
    business_id,
    old_key,
    new_key,
    %effective_date,
    "superseded dimension version"
  );

  Ok(Supersession { expired, current })
}

/// Hard-delete one version by surrogate key.
///
/// The current version of a key that still has closed history is refused;
/// removing it would leave the key with no current row.
pub fn delete_version(conn: &mut Connection, table: &VersionedTable, key: i64) -> Result<bool> {
  let tx = conn.transaction()?;
  let lookup = format!(
    "SELECT v.{id}, v.is_current,
            (SELECT COUNT(*) FROM {t} o WHERE o.{id} = v.{id} AND o.{k} != v.{k})
     FROM {t} v WHERE v.{k} = ?1",
    id = table.id_column,
    t = table.table,
    k = table.key_column
  );
  let found: Option<(String, bool, i64)> = tx
    .query_row(&lookup, rusqlite::params![key], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
    .optional()?;

  if let Some((business_id, true, others)) = found
    && others > 0
  {
    return Err(Error::CurrentVersionHasHistory { dimension: table.dimension, business_id });
  }

  let delete = format!("DELETE FROM {} WHERE {} = ?1", table.table, table.key_column);
  let removed = tx.execute(&delete, rusqlite::params![key])? > 0;
  tx.commit()?;
  Ok(removed)
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn current<R>(
  conn: &Connection,
  table: &VersionedTable,
  business_id: &str,
  read: ReadRow<R>,
) -> Result<Option<R>> {
  let sql = format!(
    "SELECT {} FROM {} WHERE {} = ?1 AND is_current = TRUE",
    table.columns, table.table, table.id_column
  );
  Ok(conn.query_row(&sql, rusqlite::params![business_id], read).optional()?)
}

/// Every version of `business_id`, oldest first.
pub fn history<R>(
  conn: &Connection,
  table: &VersionedTable,
  business_id: &str,
  read: ReadRow<R>,
) -> Result<Vec<R>> {
  let sql = format!(
    "SELECT {} FROM {} WHERE {} = ?1 ORDER BY effective_date",
    table.columns, table.table, table.id_column
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(rusqlite::params![business_id], read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// The version whose half-open window `[effective_date, expiration_date)`
/// contains `date`.
pub fn as_of<R>(
  conn: &Connection,
  table: &VersionedTable,
  business_id: &str,
  date: NaiveDate,
  read: ReadRow<R>,
) -> Result<Option<R>> {
  let sql = format!(
    "SELECT {} FROM {} WHERE {} = ?1 AND effective_date <= ?2 AND ?2 < expiration_date",
    table.columns, table.table, table.id_column
  );
  Ok(
    conn
      .query_row(&sql, rusqlite::params![business_id, encode_date(date)], read)
      .optional()?,
  )
}

/// Business keys whose number of current rows is not exactly one.
pub fn current_anomalies(conn: &Connection, table: &VersionedTable) -> Result<Vec<(String, i64)>> {
  let sql = format!(
    "SELECT {id}, SUM(is_current) AS n FROM {t} GROUP BY {id} HAVING n != 1 ORDER BY {id}",
    id = table.id_column,
    t = table.table
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}
