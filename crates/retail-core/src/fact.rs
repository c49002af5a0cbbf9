//! Fact rows: sales lines and inventory snapshots.
//!
//! Facts are append-only. They reference dimensions by surrogate key only;
//! the referenced rows must already exist when a fact is recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Sales ───────────────────────────────────────────────────────────────────

/// The four dimension references carried by a sales line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleKeys {
  pub date_key:     i64,
  pub customer_key: i64,
  pub product_key:  i64,
  pub store_key:    i64,
}

/// Input to [`crate::store::WarehouseStore::record_sale`].
///
/// `total_amount`, `cost_amount` and `profit_amount` are stored exactly as
/// given; the warehouse does not check them against quantity and price. Use
/// [`NewSale::priced`] to derive them consistently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
  #[serde(flatten)]
  pub keys:                  SaleKeys,
  pub transaction_id:        String,
  pub quantity:              i64,
  pub unit_price:            f64,
  #[serde(default)]
  pub discount_amount:       f64,
  pub total_amount:          f64,
  pub cost_amount:           f64,
  pub profit_amount:         f64,
  pub transaction_timestamp: DateTime<Utc>,
}

impl NewSale {
  /// Build a sale whose derived amounts follow from quantity, price,
  /// discount and the product's unit cost.
  pub fn priced(
    keys: SaleKeys,
    transaction_id: impl Into<String>,
    quantity: i64,
    unit_price: f64,
    discount_amount: f64,
    unit_cost: f64,
    transaction_timestamp: DateTime<Utc>,
  ) -> Self {
    let qty = quantity as f64;
    let total_amount = qty * unit_price - discount_amount;
    let cost_amount = qty * unit_cost;
    Self {
      keys,
      transaction_id: transaction_id.into(),
      quantity,
      unit_price,
      discount_amount,
      total_amount,
      cost_amount,
      profit_amount: total_amount - cost_amount,
      transaction_timestamp,
    }
  }
}

/// One row of `fact_sales`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesLine {
  pub sales_key:             i64,
  #[serde(flatten)]
  pub keys:                  SaleKeys,
  pub transaction_id:        String,
  pub quantity:              i64,
  pub unit_price:            f64,
  pub discount_amount:       f64,
  pub total_amount:          f64,
  pub cost_amount:           f64,
  pub profit_amount:         f64,
  pub transaction_timestamp: DateTime<Utc>,
}

// ─── Inventory ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::WarehouseStore::record_inventory`].
///
/// Nothing prevents two snapshots for the same (date, product, store);
/// readers see both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventory {
  pub date_key:           i64,
  pub product_key:        i64,
  pub store_key:          i64,
  pub quantity_on_hand:   i64,
  #[serde(default)]
  pub quantity_reserved:  i64,
  pub quantity_available: i64,
  pub reorder_point:      Option<i64>,
}

/// One row of `fact_inventory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
  pub inventory_key:      i64,
  pub date_key:           i64,
  pub product_key:        i64,
  pub store_key:          i64,
  pub quantity_on_hand:   i64,
  pub quantity_reserved:  i64,
  pub quantity_available: i64,
  pub reorder_point:      Option<i64>,
}

impl InventorySnapshot {
  /// Whether available stock has fallen to or below the reorder point.
  pub fn needs_reorder(&self) -> bool {
    self.reorder_point.is_some_and(|p| self.quantity_available <= p)
  }
}

/// Parameters for [`crate::store::WarehouseStore::inventory_snapshots`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryQuery {
  pub date_key:      Option<i64>,
  pub product_key:   Option<i64>,
  pub store_key:     Option<i64>,
  /// Only snapshots at or below their reorder point.
  #[serde(default)]
  pub below_reorder: bool,
  pub limit:         Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn priced_derives_amounts() {
    let keys = SaleKeys { date_key: 1, customer_key: 1, product_key: 1, store_key: 1 };
    let sale = NewSale::priced(keys, "T-1", 4, 2.5, 1.0, 1.25, Utc::now());

    assert_eq!(sale.total_amount, 9.0);
    assert_eq!(sale.cost_amount, 5.0);
    assert_eq!(sale.profit_amount, 4.0);
  }

  #[test]
  fn reorder_threshold_is_inclusive() {
    let mut snap = InventorySnapshot {
      inventory_key:      1,
      date_key:           1,
      product_key:        1,
      store_key:          1,
      quantity_on_hand:   12,
      quantity_reserved:  2,
      quantity_available: 10,
      reorder_point:      Some(10),
    };
    assert!(snap.needs_reorder());
    snap.quantity_available = 11;
    assert!(!snap.needs_reorder());
    snap.reorder_point = None;
    assert!(!snap.needs_reorder());
  }
}
