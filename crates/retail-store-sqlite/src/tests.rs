//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use retail_core::{
  Classify as _, ErrorClass,
  aggregate::{DailySales, DailySalesQuery, RefreshPolicy},
  calendar::{self, FiscalCalendar},
  dimension::{
    CustomerAttributes, CustomerVersion, Dimension, NewCustomer, NewProduct, NewStore,
    ProductAttributes, ProductVersion, Store, StoreAttributes,
  },
  fact::{InventoryQuery, NewInventory, NewSale, SaleKeys},
  report::{DriftKind, SummaryQuery},
  store::WarehouseStore,
};

use crate::{ConstraintKind, Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn customer_attrs(first: &str, last: &str, segment: &str) -> CustomerAttributes {
  CustomerAttributes {
    first_name: first.into(),
    last_name: last.into(),
    city: Some("London".into()),
    customer_segment: Some(segment.into()),
    ..Default::default()
  }
}

fn product_attrs(name: &str, brand: &str, price: f64, cost: f64) -> ProductAttributes {
  ProductAttributes {
    product_name: name.into(),
    category: Some("Hardware".into()),
    brand: Some(brand.into()),
    unit_price: price,
    unit_cost: cost,
    ..Default::default()
  }
}

fn store_attrs(name: &str, region: &str) -> StoreAttributes {
  StoreAttributes {
    store_name: name.into(),
    city: Some("Leeds".into()),
    region: Some(region.into()),
    ..Default::default()
  }
}

/// A store with the first four months of 2024 in `dim_date` and one
/// customer, product and store.
struct Fixture {
  s:        SqliteStore,
  customer: CustomerVersion,
  product:  ProductVersion,
  shop:     Store,
}

impl Fixture {
  fn keys(&self, date: NaiveDate) -> SaleKeys {
    SaleKeys {
      date_key:     calendar::date_key(date),
      customer_key: self.customer.customer_key,
      product_key:  self.product.product_key,
      store_key:    self.shop.store_key,
    }
  }

  /// A sale of the fixture product at 10.00 each, costing 4.00 each.
  fn sale(&self, txid: &str, date: NaiveDate, quantity: i64) -> NewSale {
    let ts = date.and_hms_opt(12, 0, 0).unwrap().and_utc();
    NewSale::priced(self.keys(date), txid, quantity, 10.0, 0.0, 4.0, ts)
  }
}

async fn seeded() -> Fixture {
  let s = store().await;
  s.populate_dates(ymd(2024, 1, 1), ymd(2024, 4, 30), FiscalCalendar::default())
    .await
    .unwrap();

  let customer = s
    .add_customer(NewCustomer {
      customer_id:    "C-1".into(),
      attributes:     customer_attrs("Ada", "Lovelace", "Regular"),
      effective_date: ymd(2023, 6, 1),
    })
    .await
    .unwrap();
  let product = s
    .add_product(NewProduct {
      product_id:     "P-1".into(),
      attributes:     product_attrs("Widget", "Acme", 10.0, 4.0),
      effective_date: ymd(2023, 6, 1),
    })
    .await
    .unwrap();
  let shop = s
    .add_store(NewStore { store_id: "S-1".into(), attributes: store_attrs("Downtown", "North") })
    .await
    .unwrap();

  Fixture { s, customer, product, shop }
}

// ─── Date dimension ──────────────────────────────────────────────────────────

#[tokio::test]
async fn populate_dates_skips_existing_days() {
  let s = store().await;
  let fiscal = FiscalCalendar::default();

  let n = s.populate_dates(ymd(2024, 1, 1), ymd(2024, 1, 31), fiscal).await.unwrap();
  assert_eq!(n, 31);

  let again = s.populate_dates(ymd(2024, 1, 1), ymd(2024, 1, 31), fiscal).await.unwrap();
  assert_eq!(again, 0);

  let extended = s.populate_dates(ymd(2024, 1, 25), ymd(2024, 2, 4), fiscal).await.unwrap();
  assert_eq!(extended, 4);
}

#[tokio::test]
async fn populated_date_round_trips() {
  let s = store().await;
  let fiscal = FiscalCalendar::new(7).unwrap();
  s.populate_dates(ymd(2024, 7, 6), ymd(2024, 7, 6), fiscal).await.unwrap();

  let d = s.get_date(20240706).await.unwrap().expect("date row");
  assert_eq!(d.date_value, ymd(2024, 7, 6));
  assert_eq!(d.day_name, "Saturday");
  assert_eq!(d.day_of_week, 6);
  assert!(d.is_weekend);
  assert_eq!(d.quarter, 3);
  assert_eq!(d.fiscal_year, 2025);
  assert_eq!(d.fiscal_quarter, 1);

  assert!(s.get_date(20240707).await.unwrap().is_none());
}

#[tokio::test]
async fn populate_dates_rejects_reversed_range() {
  let s = store().await;
  let result = s
    .populate_dates(ymd(2024, 2, 1), ymd(2024, 1, 1), FiscalCalendar::default())
    .await;
  assert!(matches!(result, Err(Error::Core(_))));
}

#[tokio::test]
async fn add_date_rejects_duplicate_value() {
  let s = store().await;
  let d = calendar::DateDim::for_date(ymd(2024, 3, 1), &FiscalCalendar::default());
  s.add_date(d.clone()).await.unwrap();

  let mut other_key = d;
  other_key.date_key = 1;
  let err = s.add_date(other_key).await.unwrap_err();
  assert_eq!(err.constraint(), Some(ConstraintKind::Unique));
}

// ─── SCD Type 2 ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_customer_twice_is_already_current() {
  let f = seeded().await;
  let result = f
    .s
    .add_customer(NewCustomer {
      customer_id:    "C-1".into(),
      attributes:     customer_attrs("Ada", "King", "Premium"),
      effective_date: ymd(2024, 1, 1),
    })
    .await;
  assert!(matches!(result, Err(Error::AlreadyCurrent { .. })));
}

#[tokio::test]
async fn supersede_customer_expires_old_version() {
  let f = seeded().await;
  let switch = ymd(2024, 2, 1);

  let sup = f
    .s
    .supersede_customer("C-1".into(), customer_attrs("Ada", "King", "Premium"), switch)
    .await
    .unwrap();

  assert_eq!(sup.expired.customer_key, f.customer.customer_key);
  assert!(!sup.expired.validity.is_current);
  assert_eq!(sup.expired.validity.expiration_date, Some(switch));
  assert_eq!(sup.expired.attributes.last_name, "Lovelace");

  assert_ne!(sup.current.customer_key, f.customer.customer_key);
  assert!(sup.current.validity.is_current);
  assert_eq!(sup.current.validity.effective_date, switch);
  assert_eq!(sup.current.validity.expiration_date, None);

  let history = f.s.customer_history("C-1".into()).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history.iter().filter(|v| v.validity.is_current).count(), 1);

  let current = f.s.current_customer("C-1".into()).await.unwrap().unwrap();
  assert_eq!(current.attributes.customer_segment.as_deref(), Some("Premium"));
}

#[tokio::test]
async fn supersede_requires_later_effective_date() {
  let f = seeded().await;
  let attrs = customer_attrs("Ada", "King", "Premium");

  for date in [ymd(2023, 6, 1), ymd(2023, 1, 1)] {
    let result = f.s.supersede_customer("C-1".into(), attrs.clone(), date).await;
    assert!(matches!(result, Err(Error::InvalidEffectiveDate { .. })), "{date}");
  }

  // Nothing changed.
  assert_eq!(f.s.customer_history("C-1".into()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn supersede_unknown_business_key_errors() {
  let f = seeded().await;
  let result = f
    .s
    .supersede_product("P-404".into(), product_attrs("Ghost", "None", 1.0, 1.0), ymd(2024, 1, 1))
    .await;
  assert!(matches!(result, Err(Error::NoCurrentVersion { .. })));
}

#[tokio::test]
async fn as_of_uses_half_open_windows() {
  let f = seeded().await;
  let switch = ymd(2024, 2, 1);
  let sup = f
    .s
    .supersede_product("P-1".into(), product_attrs("Widget", "Acme", 12.0, 5.0), switch)
    .await
    .unwrap();

  let before_first = f.s.product_as_of("P-1".into(), ymd(2023, 1, 1)).await.unwrap();
  assert!(before_first.is_none());

  let old = f.s.product_as_of("P-1".into(), ymd(2024, 1, 31)).await.unwrap().unwrap();
  assert_eq!(old.product_key, sup.expired.product_key);

  let on_switch = f.s.product_as_of("P-1".into(), switch).await.unwrap().unwrap();
  assert_eq!(on_switch.product_key, sup.current.product_key);
  assert_eq!(on_switch.attributes.unit_price, 12.0);

  let far_future = f.s.product_as_of("P-1".into(), ymd(2999, 1, 1)).await.unwrap().unwrap();
  assert_eq!(far_future.product_key, sup.current.product_key);
}

#[tokio::test]
async fn current_of_unknown_key_is_none() {
  let f = seeded().await;
  assert!(f.s.current_customer("C-404".into()).await.unwrap().is_none());
  assert!(f.s.product_history("P-404".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn current_version_with_history_cannot_be_deleted() {
  let f = seeded().await;
  let sup = f
    .s
    .supersede_customer("C-1".into(), customer_attrs("Ada", "King", "Premium"), ymd(2024, 2, 1))
    .await
    .unwrap();

  let err = f
    .s
    .delete_dimension_row(Dimension::Customer, sup.current.customer_key)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::CurrentVersionHasHistory { .. }), "{err}");
  assert_eq!(err.class(), ErrorClass::Conflict);

  let current = f.s.current_customer("C-1".into()).await.unwrap().unwrap();
  assert_eq!(current.customer_key, sup.current.customer_key);
  assert!(f.s.check_integrity().await.unwrap().customers.is_empty());

  // Closed versions can go, after which the lone current one can too.
  assert!(f.s.delete_dimension_row(Dimension::Customer, sup.expired.customer_key).await.unwrap());
  assert!(f.s.delete_dimension_row(Dimension::Customer, sup.current.customer_key).await.unwrap());
  assert!(f.s.customer_history("C-1".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn readded_key_cannot_overlap_closed_history() {
  let f = seeded().await;
  let sup = f
    .s
    .supersede_customer("C-1".into(), customer_attrs("Ada", "King", "Premium"), ymd(2024, 2, 1))
    .await
    .unwrap();

  // Leave C-1 with closed history and no current row.
  let current_key = sup.current.customer_key;
  f.s
    .with_conn(move |conn| {
      conn.execute("DELETE FROM dim_customer WHERE customer_key = ?1", [current_key])?;
      Ok(())
    })
    .await
    .unwrap();

  for date in [ymd(2020, 1, 1), ymd(2023, 7, 1), ymd(2024, 1, 31)] {
    let result = f
      .s
      .add_customer(NewCustomer {
        customer_id:    "C-1".into(),
        attributes:     customer_attrs("Eve", "Early", "Regular"),
        effective_date: date,
      })
      .await;
    assert!(matches!(result, Err(Error::InvalidEffectiveDate { .. })), "{date}");
  }

  let readded = f
    .s
    .add_customer(NewCustomer {
      customer_id:    "C-1".into(),
      attributes:     customer_attrs("Eve", "Later", "Regular"),
      effective_date: ymd(2024, 2, 1),
    })
    .await
    .unwrap();

  let old = f.s.customer_as_of("C-1".into(), ymd(2023, 7, 1)).await.unwrap().unwrap();
  assert_eq!(old.customer_key, f.customer.customer_key);
  let new = f.s.customer_as_of("C-1".into(), ymd(2024, 3, 1)).await.unwrap().unwrap();
  assert_eq!(new.customer_key, readded.customer_key);
}

// ─── Stores (Type 1) ─────────────────────────────────────────────────────────

#[tokio::test]
async fn update_store_overwrites_in_place() {
  let f = seeded().await;
  let updated = f.s.update_store("S-1".into(), store_attrs("Uptown", "South")).await.unwrap();

  assert_eq!(updated.store_key, f.shop.store_key);
  assert_eq!(updated.attributes.store_name, "Uptown");
  assert_eq!(f.s.list_stores().await.unwrap().len(), 1);

  let fetched = f.s.get_store("S-1".into()).await.unwrap().unwrap();
  assert_eq!(fetched, updated);
}

#[tokio::test]
async fn update_unknown_store_is_not_found() {
  let f = seeded().await;
  let result = f.s.update_store("S-404".into(), store_attrs("Nowhere", "None")).await;
  assert!(matches!(result, Err(Error::StoreNotFound(_))));
}

#[tokio::test]
async fn duplicate_store_id_is_rejected() {
  let f = seeded().await;
  let err = f
    .s
    .add_store(NewStore { store_id: "S-1".into(), attributes: store_attrs("Again", "North") })
    .await
    .unwrap_err();
  assert_eq!(err.constraint(), Some(ConstraintKind::Unique));
}

// ─── Facts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_and_get_sale() {
  let f = seeded().await;
  let line = f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 3)).await.unwrap();

  assert_eq!(line.total_amount, 30.0);
  assert_eq!(line.cost_amount, 12.0);
  assert_eq!(line.profit_amount, 18.0);

  let fetched = f.s.get_sale(line.sales_key).await.unwrap().unwrap();
  assert_eq!(fetched, line);
}

#[tokio::test]
async fn sale_timestamp_keeps_nanoseconds() {
  let f = seeded().await;
  let mut sale = f.sale("T-1", ymd(2024, 1, 15), 1);
  sale.transaction_timestamp = ymd(2024, 1, 15)
    .and_hms_nano_opt(9, 30, 0, 123_456_789)
    .unwrap()
    .and_utc();

  let line = f.s.record_sale(sale.clone()).await.unwrap();
  assert_eq!(line.transaction_timestamp, sale.transaction_timestamp);
  let fetched = f.s.get_sale(line.sales_key).await.unwrap().unwrap();
  assert_eq!(fetched.transaction_timestamp, sale.transaction_timestamp);
}

#[tokio::test]
async fn dangling_dimension_key_is_rejected() {
  let f = seeded().await;
  let mut sale = f.sale("T-1", ymd(2024, 1, 15), 1);
  sale.keys.customer_key = 9_999;

  let err = f.s.record_sale(sale).await.unwrap_err();
  assert_eq!(err.constraint(), Some(ConstraintKind::ForeignKey));

  let mut sale = f.sale("T-2", ymd(2024, 1, 15), 1);
  sale.keys.date_key = 20_200_101;
  let err = f.s.record_sale(sale).await.unwrap_err();
  assert_eq!(err.constraint(), Some(ConstraintKind::ForeignKey));
}

#[tokio::test]
async fn sales_batch_is_all_or_nothing() {
  let f = seeded().await;
  let good = f.sale("T-1", ymd(2024, 1, 15), 1);
  let mut bad = f.sale("T-2", ymd(2024, 1, 15), 1);
  bad.keys.store_key = 9_999;

  assert!(f.s.record_sales(vec![good.clone(), bad]).await.is_err());
  assert!(f.s.sales_summary(&SummaryQuery::default()).await.unwrap().is_empty());

  let lines = f
    .s
    .record_sales(vec![good, f.sale("T-2", ymd(2024, 1, 16), 2)])
    .await
    .unwrap();
  assert_eq!(lines.len(), 2);
  assert_eq!(lines[1].quantity, 2);
}

#[tokio::test]
async fn referenced_dimension_row_cannot_be_deleted() {
  let f = seeded().await;
  f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 1)).await.unwrap();

  let err = f
    .s
    .delete_dimension_row(Dimension::Customer, f.customer.customer_key)
    .await
    .unwrap_err();
  assert_eq!(err.constraint(), Some(ConstraintKind::ForeignKey));

  // An unreferenced day can go.
  let removed = f
    .s
    .delete_dimension_row(Dimension::Date, calendar::date_key(ymd(2024, 4, 30)))
    .await
    .unwrap();
  assert!(removed);
  assert!(!f.s.delete_dimension_row(Dimension::Date, 1).await.unwrap());
}

#[tokio::test]
async fn inventory_snapshots_allow_duplicates_and_filter() {
  let f = seeded().await;
  let snap = |available, reorder| NewInventory {
    date_key:           calendar::date_key(ymd(2024, 1, 15)),
    product_key:        f.product.product_key,
    store_key:          f.shop.store_key,
    quantity_on_hand:   available + 2,
    quantity_reserved:  2,
    quantity_available: available,
    reorder_point:      reorder,
  };

  f.s.record_inventory(snap(50, Some(20))).await.unwrap();
  let low = f.s.record_inventory(snap(5, Some(20))).await.unwrap();
  f.s.record_inventory(snap(5, None)).await.unwrap();

  let all = f
    .s
    .inventory_snapshots(&InventoryQuery { product_key: Some(f.product.product_key), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 3);

  let below = f
    .s
    .inventory_snapshots(&InventoryQuery { below_reorder: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(below, vec![low]);

  let limited = f
    .s
    .inventory_snapshots(&InventoryQuery { limit: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
}

// ─── Views and reports ───────────────────────────────────────────────────────

#[tokio::test]
async fn sales_summary_joins_all_dimensions() {
  let f = seeded().await;
  let line = f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 2)).await.unwrap();

  let rows = f.s.sales_summary(&SummaryQuery::default()).await.unwrap();
  assert_eq!(rows.len(), 1);
  let row = &rows[0];
  assert_eq!(row.sales_key, line.sales_key);
  assert_eq!(row.date_value, ymd(2024, 1, 15));
  assert_eq!(row.year, 2024);
  assert_eq!(row.quarter, 1);
  assert_eq!(row.month_name, "January");
  assert_eq!(row.customer_name, "Ada Lovelace");
  assert_eq!(row.product_name, "Widget");
  assert_eq!(row.store_city.as_deref(), Some("Leeds"));
  assert_eq!(row.region.as_deref(), Some("North"));
  assert_eq!(row.total_amount, 20.0);
  assert_eq!(row.transaction_timestamp, line.transaction_timestamp);

  let other_region = SummaryQuery { region: Some("South".into()), ..Default::default() };
  assert!(f.s.sales_summary(&other_region).await.unwrap().is_empty());
}

#[tokio::test]
async fn sales_summary_drops_facts_on_expired_versions() {
  let f = seeded().await;
  f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 1)).await.unwrap();

  let sup = f
    .s
    .supersede_customer("C-1".into(), customer_attrs("Ada", "King", "Premium"), ymd(2024, 2, 1))
    .await
    .unwrap();
  assert!(f.s.sales_summary(&SummaryQuery::default()).await.unwrap().is_empty());

  let mut later = f.sale("T-2", ymd(2024, 2, 10), 1);
  later.keys.customer_key = sup.current.customer_key;
  f.s.record_sale(later).await.unwrap();

  let rows = f.s.sales_summary(&SummaryQuery::default()).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].transaction_id, "T-2");
  assert_eq!(rows[0].customer_name, "Ada King");
}

#[tokio::test]
async fn views_drop_facts_on_expired_product_versions() {
  let f = seeded().await;
  f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 3)).await.unwrap();

  let sup = f
    .s
    .supersede_product("P-1".into(), product_attrs("Widget", "Acme", 12.0, 5.0), ymd(2024, 2, 1))
    .await
    .unwrap();
  assert!(f.s.sales_summary(&SummaryQuery::default()).await.unwrap().is_empty());
  assert!(f.s.top_products(None).await.unwrap().is_empty());

  let mut later = f.sale("T-2", ymd(2024, 2, 10), 1);
  later.keys.product_key = sup.current.product_key;
  f.s.record_sale(later).await.unwrap();

  let rows = f.s.sales_summary(&SummaryQuery::default()).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].transaction_id, "T-2");

  let top = f.s.top_products(None).await.unwrap();
  assert_eq!(top.len(), 1);
  assert_eq!(top[0].total_quantity_sold, 1);
  assert_eq!(top[0].total_revenue, 10.0);
}

#[tokio::test]
async fn top_products_merges_by_descriptive_attributes() {
  let f = seeded().await;
  let twin = f
    .s
    .add_product(NewProduct {
      product_id:     "P-2".into(),
      attributes:     product_attrs("Widget", "Acme", 10.0, 4.0),
      effective_date: ymd(2023, 6, 1),
    })
    .await
    .unwrap();
  let other = f
    .s
    .add_product(NewProduct {
      product_id:     "P-3".into(),
      attributes:     product_attrs("Gadget", "Acme", 10.0, 4.0),
      effective_date: ymd(2023, 6, 1),
    })
    .await
    .unwrap();

  f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 2)).await.unwrap();
  let mut s2 = f.sale("T-2", ymd(2024, 1, 15), 3);
  s2.keys.product_key = twin.product_key;
  f.s.record_sale(s2).await.unwrap();
  let mut s3 = f.sale("T-3", ymd(2024, 1, 15), 1);
  s3.keys.product_key = other.product_key;
  f.s.record_sale(s3).await.unwrap();

  let top = f.s.top_products(None).await.unwrap();
  assert_eq!(top.len(), 2);
  assert_eq!(top[0].product_name, "Widget");
  assert_eq!(top[0].total_quantity_sold, 5);
  assert_eq!(top[0].total_revenue, 50.0);
  assert_eq!(top[0].total_profit, 30.0);
  assert_eq!(top[0].avg_unit_price, 10.0);
  assert_eq!(top[1].product_name, "Gadget");

  assert_eq!(f.s.top_products(Some(1)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn top_customers_folds_versions_together() {
  let f = seeded().await;
  f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 1)).await.unwrap();

  let sup = f
    .s
    .supersede_customer("C-1".into(), customer_attrs("Ada", "King", "Premium"), ymd(2024, 2, 1))
    .await
    .unwrap();
  let mut later = f.sale("T-2", ymd(2024, 2, 10), 2);
  later.keys.customer_key = sup.current.customer_key;
  f.s.record_sale(later).await.unwrap();

  let top = f.s.top_customers(10).await.unwrap();
  assert_eq!(top.len(), 1);
  assert_eq!(top[0].customer_id, "C-1");
  assert_eq!(top[0].customer_name, "Ada King");
  assert_eq!(top[0].customer_segment.as_deref(), Some("Premium"));
  assert_eq!(top[0].total_spent, 30.0);
  assert_eq!(top[0].transaction_count, 2);
}

#[tokio::test]
async fn revenue_groups_by_region_and_quarter() {
  let f = seeded().await;
  f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 1)).await.unwrap();
  f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 1)).await.unwrap();
  f.s.record_sale(f.sale("T-2", ymd(2024, 4, 2), 4)).await.unwrap();

  let rows = f.s.revenue_by_region_quarter(Some(2024)).await.unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!((rows[0].quarter, rows[0].total_revenue, rows[0].transaction_count), (1, 20.0, 1));
  assert_eq!((rows[1].quarter, rows[1].total_revenue, rows[1].transaction_count), (2, 40.0, 1));
  assert_eq!(rows[0].region.as_deref(), Some("North"));

  assert!(f.s.revenue_by_region_quarter(Some(2023)).await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_limits_mean_everything() {
  let f = seeded().await;
  f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 1)).await.unwrap();
  f.s.refresh_aggregates(RefreshPolicy::Full).await.unwrap();

  assert_eq!(f.s.top_customers(usize::MAX).await.unwrap().len(), 1);
  assert_eq!(f.s.top_products(Some(usize::MAX)).await.unwrap().len(), 1);
  assert_eq!(f.s.refresh_history(usize::MAX).await.unwrap().len(), 1);
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn daily_aggregate_primary_key_rejects_duplicates() {
  let f = seeded().await;
  let row = DailySales {
    date_key:              calendar::date_key(ymd(2024, 1, 15)),
    store_key:             f.shop.store_key,
    total_transactions:    1,
    total_quantity:        1,
    total_revenue:         10.0,
    total_cost:            4.0,
    total_profit:          6.0,
    avg_transaction_value: 10.0,
  };
  f.s.insert_daily_sales(row.clone()).await.unwrap();

  let err = f.s.insert_daily_sales(row).await.unwrap_err();
  assert!(matches!(
    err.constraint(),
    Some(ConstraintKind::PrimaryKey | ConstraintKind::Unique)
  ));
}

#[tokio::test]
async fn full_refresh_rebuilds_from_facts() {
  let f = seeded().await;
  let day = ymd(2024, 1, 15);
  f.s.record_sale(f.sale("T-1", day, 2)).await.unwrap();
  f.s.record_sale(f.sale("T-1", day, 1)).await.unwrap();
  f.s.record_sale(f.sale("T-2", day, 3)).await.unwrap();

  let report = f.s.refresh_aggregates(RefreshPolicy::Full).await.unwrap();
  assert_eq!(report.daily_rows, 1);
  assert_eq!(report.monthly_rows, 1);

  let daily = f.s.daily_sales(&DailySalesQuery::default()).await.unwrap();
  assert_eq!(daily.len(), 1);
  let d = &daily[0];
  assert_eq!(d.total_transactions, 2);
  assert_eq!(d.total_quantity, 6);
  assert_eq!(d.total_revenue, 60.0);
  assert_eq!(d.total_cost, 24.0);
  assert_eq!(d.total_profit, 36.0);
  assert_eq!(d.avg_transaction_value, 30.0);

  let monthly = f.s.monthly_product("2024-01".parse().unwrap()).await.unwrap();
  assert_eq!(monthly.len(), 1);
  assert_eq!(monthly[0].total_quantity, 6);
  assert_eq!(monthly[0].profit_margin, 60.0);

  assert!(f.s.check_integrity().await.unwrap().is_clean());
}

#[tokio::test]
async fn incremental_refresh_leaves_other_days_alone() {
  let f = seeded().await;
  f.s.record_sale(f.sale("T-1", ymd(2024, 1, 15), 1)).await.unwrap();
  f.s.refresh_aggregates(RefreshPolicy::Full).await.unwrap();

  f.s.record_sale(f.sale("T-2", ymd(2024, 2, 10), 2)).await.unwrap();
  let drift = f.s.check_integrity().await.unwrap().daily_drift;
  assert_eq!(drift.len(), 1);
  assert_eq!(drift[0].kind, DriftKind::Missing);

  let policy = RefreshPolicy::Incremental { from: ymd(2024, 2, 1), to: ymd(2024, 2, 29) };
  let report = f.s.refresh_aggregates(policy).await.unwrap();
  assert_eq!(report.daily_rows, 1);
  assert_eq!(report.monthly_rows, 1);
  assert!(f.s.check_integrity().await.unwrap().is_clean());

  let january = DailySalesQuery { to: Some(ymd(2024, 1, 31)), ..Default::default() };
  assert_eq!(f.s.daily_sales(&january).await.unwrap().len(), 1);
  assert_eq!(f.s.daily_sales(&DailySalesQuery::default()).await.unwrap().len(), 2);

  let history = f.s.refresh_history(10).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].policy, policy);
  assert_eq!(history[1].policy, RefreshPolicy::Full);
}

#[tokio::test]
async fn reversed_incremental_range_is_invalid() {
  let f = seeded().await;
  let policy = RefreshPolicy::Incremental { from: ymd(2024, 2, 1), to: ymd(2024, 1, 1) };
  let result = f.s.refresh_aggregates(policy).await;
  assert!(matches!(result, Err(Error::Core(_))));
  assert!(f.s.refresh_history(10).await.unwrap().is_empty());
}

// ─── Integrity audit ─────────────────────────────────────────────────────────

#[tokio::test]
async fn integrity_reports_orphaned_and_mismatched_rows() {
  let f = seeded().await;
  let day = ymd(2024, 1, 15);
  f.s.record_sale(f.sale("T-1", day, 1)).await.unwrap();

  let row = |date, revenue| DailySales {
    date_key:              calendar::date_key(date),
    store_key:             f.shop.store_key,
    total_transactions:    1,
    total_quantity:        1,
    total_revenue:         revenue,
    total_cost:            4.0,
    total_profit:          6.0,
    avg_transaction_value: revenue,
  };
  f.s.insert_daily_sales(row(day, 99.0)).await.unwrap();
  f.s.insert_daily_sales(row(ymd(2024, 1, 16), 10.0)).await.unwrap();

  let kinds: Vec<_> = f
    .s
    .check_integrity()
    .await
    .unwrap()
    .daily_drift
    .into_iter()
    .map(|d| d.kind)
    .collect();
  assert_eq!(kinds, vec![DriftKind::Mismatched, DriftKind::Orphaned]);
}

#[tokio::test]
async fn integrity_reports_multiple_current_versions() {
  let f = seeded().await;
  f.s
    .supersede_customer("C-1".into(), customer_attrs("Ada", "King", "Premium"), ymd(2024, 2, 1))
    .await
    .unwrap();

  f.s
    .with_conn(|conn| {
      conn.execute("UPDATE dim_customer SET is_current = TRUE", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let report = f.s.check_integrity().await.unwrap();
  assert_eq!(report.customers.len(), 1);
  assert_eq!(report.customers[0].business_id, "C-1");
  assert_eq!(report.customers[0].current_count, 2);
  assert!(report.products.is_empty());
}
