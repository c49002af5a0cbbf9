//! SQL schema for the retail warehouse.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Creation order follows the foreign-key graph: dimensions, then facts,
//! then aggregates and views.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Dimensions ──────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS dim_date (
    date_key        INTEGER PRIMARY KEY,     -- YYYYMMDD by convention
    date_value      TEXT    NOT NULL UNIQUE, -- ISO 8601 date
    day_of_week     INTEGER NOT NULL,        -- 1 = Monday
    day_name        TEXT    NOT NULL,
    day_of_month    INTEGER NOT NULL,
    day_of_year     INTEGER NOT NULL,
    week_of_year    INTEGER NOT NULL,        -- ISO week
    month           INTEGER NOT NULL,
    month_name      TEXT    NOT NULL,
    quarter         INTEGER NOT NULL,
    year            INTEGER NOT NULL,
    is_weekend      INTEGER NOT NULL,
    is_holiday      INTEGER NOT NULL DEFAULT 0,
    fiscal_year     INTEGER NOT NULL,
    fiscal_quarter  INTEGER NOT NULL
);

-- SCD Type 2: a new row per version; exactly one is_current row per
-- customer_id is maintained by the store, not by a constraint.
CREATE TABLE IF NOT EXISTS dim_customer (
    customer_key      INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id       TEXT    NOT NULL,
    first_name        TEXT    NOT NULL,
    last_name         TEXT    NOT NULL,
    email             TEXT,
    phone             TEXT,
    address           TEXT,
    city              TEXT,
    state             TEXT,
    country           TEXT,
    postal_code       TEXT,
    customer_segment  TEXT,
    registration_date TEXT,
    effective_date    TEXT    NOT NULL,
    expiration_date   TEXT    NOT NULL DEFAULT '9999-12-31',
    is_current        INTEGER NOT NULL DEFAULT 1,
    UNIQUE (customer_id, effective_date)
);

CREATE TABLE IF NOT EXISTS dim_product (
    product_key     INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id      TEXT    NOT NULL,
    product_name    TEXT    NOT NULL,
    category        TEXT,
    subcategory     TEXT,
    brand           TEXT,
    supplier        TEXT,
    unit_price      REAL    NOT NULL,
    unit_cost       REAL    NOT NULL,
    effective_date  TEXT    NOT NULL,
    expiration_date TEXT    NOT NULL DEFAULT '9999-12-31',
    is_current      INTEGER NOT NULL DEFAULT 1,
    UNIQUE (product_id, effective_date)
);

-- Type 1: overwritten in place.
CREATE TABLE IF NOT EXISTS dim_store (
    store_key      INTEGER PRIMARY KEY AUTOINCREMENT,
    store_id       TEXT    NOT NULL UNIQUE,
    store_name     TEXT    NOT NULL,
    store_type     TEXT,
    address        TEXT,
    city           TEXT,
    state          TEXT,
    country        TEXT,
    postal_code    TEXT,
    region         TEXT,
    manager_name   TEXT,
    opening_date   TEXT,
    square_footage INTEGER
);

-- ── Facts ───────────────────────────────────────────────────────────────────

-- Grain: one row per transaction line. Append-only.
-- total/cost/profit are derived by the loader and not checked here.
CREATE TABLE IF NOT EXISTS fact_sales (
    sales_key             INTEGER PRIMARY KEY AUTOINCREMENT,
    date_key              INTEGER NOT NULL REFERENCES dim_date(date_key),
    customer_key          INTEGER NOT NULL REFERENCES dim_customer(customer_key),
    product_key           INTEGER NOT NULL REFERENCES dim_product(product_key),
    store_key             INTEGER NOT NULL REFERENCES dim_store(store_key),
    transaction_id        TEXT    NOT NULL,
    quantity              INTEGER NOT NULL,
    unit_price            REAL    NOT NULL,
    discount_amount       REAL    NOT NULL DEFAULT 0,
    total_amount          REAL    NOT NULL,
    cost_amount           REAL    NOT NULL,
    profit_amount         REAL    NOT NULL,
    transaction_timestamp TEXT    NOT NULL  -- RFC 3339 UTC
);

-- Grain: daily on-hand snapshot per product and store. Not unique.
CREATE TABLE IF NOT EXISTS fact_inventory (
    inventory_key      INTEGER PRIMARY KEY AUTOINCREMENT,
    date_key           INTEGER NOT NULL REFERENCES dim_date(date_key),
    product_key        INTEGER NOT NULL REFERENCES dim_product(product_key),
    store_key          INTEGER NOT NULL REFERENCES dim_store(store_key),
    quantity_on_hand   INTEGER NOT NULL,
    quantity_reserved  INTEGER NOT NULL DEFAULT 0,
    quantity_available INTEGER NOT NULL,
    reorder_point      INTEGER
);

CREATE INDEX IF NOT EXISTS idx_fact_sales_date      ON fact_sales(date_key);
CREATE INDEX IF NOT EXISTS idx_fact_sales_customer  ON fact_sales(customer_key);
CREATE INDEX IF NOT EXISTS idx_fact_sales_product   ON fact_sales(product_key);
CREATE INDEX IF NOT EXISTS idx_fact_sales_store     ON fact_sales(store_key);
CREATE INDEX IF NOT EXISTS idx_fact_sales_timestamp ON fact_sales(transaction_timestamp);

CREATE INDEX IF NOT EXISTS idx_fact_inventory_date    ON fact_inventory(date_key);
CREATE INDEX IF NOT EXISTS idx_fact_inventory_product ON fact_inventory(product_key);
CREATE INDEX IF NOT EXISTS idx_fact_inventory_store   ON fact_inventory(store_key);

CREATE INDEX IF NOT EXISTS idx_dim_customer_id ON dim_customer(customer_id);
CREATE INDEX IF NOT EXISTS idx_dim_product_id  ON dim_product(product_id);

-- ── Aggregates ──────────────────────────────────────────────────────────────

-- Derived cache over fact_sales; rebuilt by refresh_aggregates.
CREATE TABLE IF NOT EXISTS agg_daily_sales (
    date_key              INTEGER NOT NULL REFERENCES dim_date(date_key),
    store_key             INTEGER NOT NULL REFERENCES dim_store(store_key),
    total_transactions    INTEGER NOT NULL,
    total_quantity        INTEGER NOT NULL,
    total_revenue         REAL    NOT NULL,
    total_cost            REAL    NOT NULL,
    total_profit          REAL    NOT NULL,
    avg_transaction_value REAL    NOT NULL,
    PRIMARY KEY (date_key, store_key)
);

CREATE TABLE IF NOT EXISTS agg_monthly_product (
    year_month     TEXT    NOT NULL,  -- YYYY-MM
    product_key    INTEGER NOT NULL REFERENCES dim_product(product_key),
    total_quantity INTEGER NOT NULL,
    total_revenue  REAL    NOT NULL,
    total_cost     REAL    NOT NULL,
    total_profit   REAL    NOT NULL,
    profit_margin  REAL    NOT NULL,  -- percent of revenue
    PRIMARY KEY (year_month, product_key)
);

CREATE TABLE IF NOT EXISTS agg_refresh_log (
    refresh_id   TEXT    PRIMARY KEY,
    policy       TEXT    NOT NULL,    -- 'full' | 'incremental'
    range_start  TEXT,
    range_end    TEXT,
    daily_rows   INTEGER NOT NULL,
    monthly_rows INTEGER NOT NULL,
    started_at   TEXT    NOT NULL,
    finished_at  TEXT    NOT NULL
);

-- ── Views ───────────────────────────────────────────────────────────────────

-- Inner joins: facts whose customer or product row is not current drop out.
CREATE VIEW IF NOT EXISTS vw_sales_summary AS
SELECT
    s.sales_key,
    s.transaction_id,
    d.date_value,
    d.year,
    d.quarter,
    d.month_name,
    c.customer_id,
    c.first_name || ' ' || c.last_name AS customer_name,
    c.customer_segment,
    p.product_id,
    p.product_name,
    p.category,
    p.brand,
    st.store_id,
    st.store_name,
    st.city AS store_city,
    st.region,
    s.quantity,
    s.unit_price,
    s.discount_amount,
    s.total_amount,
    s.profit_amount,
    s.transaction_timestamp
FROM fact_sales s
JOIN dim_date     d  ON s.date_key     = d.date_key
JOIN dim_customer c  ON s.customer_key = c.customer_key
JOIN dim_product  p  ON s.product_key  = p.product_key
JOIN dim_store    st ON s.store_key    = st.store_key
WHERE c.is_current = TRUE
  AND p.is_current = TRUE;

-- Grouped by descriptive attributes, not by product_key.
CREATE VIEW IF NOT EXISTS vw_top_products AS
SELECT
    p.product_name,
    p.category,
    p.brand,
    SUM(s.quantity)            AS total_quantity_sold,
    SUM(s.total_amount)        AS total_revenue,
    SUM(s.profit_amount)       AS total_profit,
    ROUND(AVG(s.unit_price), 2) AS avg_unit_price
FROM fact_sales s
JOIN dim_product p ON s.product_key = p.product_key
WHERE p.is_current = TRUE
GROUP BY p.product_name, p.category, p.brand
ORDER BY total_revenue DESC;

PRAGMA user_version = 1;
";

/// The stored form of an open-ended `expiration_date`.
pub const OPEN_END: &str = "9999-12-31";
