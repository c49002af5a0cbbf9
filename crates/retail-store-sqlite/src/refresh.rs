//! Aggregate refresh and drift detection.
//!
//! Both aggregate tables are rebuilt by "delete the slice, re-insert from
//! facts". A full refresh uses the whole table as its slice; an incremental
//! refresh restricts the daily slice to the requested days and the monthly
//! slice to every month those days touch.

use chrono::Utc;
use retail_core::{
  aggregate::{RefreshPolicy, RefreshReport, YearMonth},
  report::{AggregateDrift, DriftKind},
};
use rusqlite::Connection;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{encode_date, encode_dt, encode_uuid},
};

const DAILY_SELECT: &str = "
  SELECT s.date_key,
         s.store_key,
         COUNT(DISTINCT s.transaction_id),
         SUM(s.quantity),
         SUM(s.total_amount),
         SUM(s.cost_amount),
         SUM(s.profit_amount),
         ROUND(SUM(s.total_amount) / COUNT(DISTINCT s.transaction_id), 2)
  FROM fact_sales s
  JOIN dim_date d ON d.date_key = s.date_key";

const MONTHLY_SELECT: &str = "
  SELECT strftime('%Y-%m', d.date_value) AS ym,
         s.product_key,
         SUM(s.quantity),
         SUM(s.total_amount),
         SUM(s.cost_amount),
         SUM(s.profit_amount),
         CASE WHEN SUM(s.total_amount) = 0 THEN 0
              ELSE ROUND(SUM(s.profit_amount) * 100.0 / SUM(s.total_amount), 2)
         END
  FROM fact_sales s
  JOIN dim_date d ON d.date_key = s.date_key";

const DAILY_INSERT: &str = "INSERT INTO agg_daily_sales (date_key, store_key, \
  total_transactions, total_quantity, total_revenue, total_cost, total_profit, \
  avg_transaction_value)";

const MONTHLY_INSERT: &str = "INSERT INTO agg_monthly_product (year_month, product_key, \
  total_quantity, total_revenue, total_cost, total_profit, profit_margin)";

/// Rebuild the aggregate slices selected by `policy` and log the run, all in
/// one transaction.
pub fn run(conn: &mut Connection, policy: RefreshPolicy) -> Result<RefreshReport> {
  policy.validate()?;
  let started_at = Utc::now();
  let tx = conn.transaction()?;

  let (daily_rows, monthly_rows) = match policy {
    RefreshPolicy::Full => {
      tx.execute("DELETE FROM agg_daily_sales", [])?;
      tx.execute("DELETE FROM agg_monthly_product", [])?;
      let daily = tx.execute(
        &format!("{DAILY_INSERT} {DAILY_SELECT} GROUP BY s.date_key, s.store_key"),
        [],
      )?;
      let monthly = tx.execute(
        &format!("{MONTHLY_INSERT} {MONTHLY_SELECT} GROUP BY ym, s.product_key"),
        [],
      )?;
      (daily, monthly)
    }
    RefreshPolicy::Incremental { from, to } => {
      let (from_s, to_s) = (encode_date(from), encode_date(to));
      let (first_month, last_month) = (YearMonth::of(from).to_string(), YearMonth::of(to).to_string());

      tx.execute(
        "DELETE FROM agg_daily_sales WHERE date_key IN (
           SELECT date_key FROM dim_date WHERE date_value BETWEEN ?1 AND ?2
         )",
        rusqlite::params![from_s, to_s],
      )?;
      let daily = tx.execute(
        &format!(
          "{DAILY_INSERT} {DAILY_SELECT}
           WHERE d.date_value BETWEEN ?1 AND ?2
           GROUP BY s.date_key, s.store_key"
        ),
        rusqlite::params![from_s, to_s],
      )?;

      tx.execute(
        "DELETE FROM agg_monthly_product WHERE year_month BETWEEN ?1 AND ?2",
        rusqlite::params![first_month, last_month],
      )?;
      let monthly = tx.execute(
        &format!(
          "{MONTHLY_INSERT} {MONTHLY_SELECT}
           WHERE strftime('%Y-%m', d.date_value) BETWEEN ?1 AND ?2
           GROUP BY ym, s.product_key"
        ),
        rusqlite::params![first_month, last_month],
      )?;
      (daily, monthly)
    }
  };

  let report = RefreshReport {
    refresh_id: Uuid::new_v4(),
    policy,
    daily_rows,
    monthly_rows,
    started_at,
    finished_at: Utc::now(),
  };
  log_run(&tx, &report)?;
  tx.commit()?;

  tracing::info!(
    refresh_id = %report.refresh_id,
    policy = policy.name(),
    daily_rows,
    monthly_rows,
    "refreshed aggregates"
  );
  Ok(report)
}

fn log_run(conn: &Connection, report: &RefreshReport) -> Result<()> {
  let (range_start, range_end) = match report.policy {
    RefreshPolicy::Full => (None, None),
    RefreshPolicy::Incremental { from, to } => (Some(encode_date(from)), Some(encode_date(to))),
  };
  conn.execute(
    "INSERT INTO agg_refresh_log (
       refresh_id, policy, range_start, range_end,
       daily_rows, monthly_rows, started_at, finished_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      encode_uuid(report.refresh_id),
      report.policy.name(),
      range_start,
      range_end,
      report.daily_rows as i64,
      report.monthly_rows as i64,
      encode_dt(report.started_at),
      encode_dt(report.finished_at),
    ],
  )?;
  Ok(())
}

/// Tolerance when comparing stored money totals against a fresh sum.
const MONEY_EPSILON: f64 = 0.005;

/// Every `(date_key, store_key)` pair where `agg_daily_sales` disagrees with
/// a fresh aggregation of `fact_sales`.
pub fn daily_drift(conn: &Connection) -> Result<Vec<AggregateDrift>> {
  let mut stmt = conn.prepare(
    "WITH fresh AS (
       SELECT date_key, store_key,
              COUNT(DISTINCT transaction_id) AS tx,
              SUM(quantity)      AS qty,
              SUM(total_amount)  AS revenue,
              SUM(cost_amount)   AS cost,
              SUM(profit_amount) AS profit
       FROM fact_sales
       GROUP BY date_key, store_key
     )
     SELECT f.date_key, f.store_key,
            CASE WHEN a.date_key IS NULL THEN 'missing' ELSE 'mismatched' END
     FROM fresh f
     LEFT JOIN agg_daily_sales a
       ON a.date_key = f.date_key AND a.store_key = f.store_key
     WHERE a.date_key IS NULL
        OR a.total_transactions != f.tx
        OR a.total_quantity     != f.qty
        OR ABS(a.total_revenue - f.revenue) > ?1
        OR ABS(a.total_cost    - f.cost)    > ?1
        OR ABS(a.total_profit  - f.profit)  > ?1
     UNION ALL
     SELECT a.date_key, a.store_key, 'orphaned'
     FROM agg_daily_sales a
     LEFT JOIN fresh f
       ON f.date_key = a.date_key AND f.store_key = a.store_key
     WHERE f.date_key IS NULL
     ORDER BY 1, 2",
  )?;

  let raws = stmt
    .query_map(rusqlite::params![MONEY_EPSILON], |r| {
      Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?, r.get::<_, String>(2)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws
    .into_iter()
    .map(|(date_key, store_key, kind)| {
      let kind = match kind.as_str() {
        "missing" => DriftKind::Missing,
        "orphaned" => DriftKind::Orphaned,
        "mismatched" => DriftKind::Mismatched,
        other => return Err(Error::Decode(format!("unknown drift kind: {other:?}"))),
      };
      Ok(AggregateDrift { date_key, store_key, kind })
    })
    .collect()
}
