//! Dimension rows: customers and products (SCD Type 2) and stores (Type 1).
//!
//! The date dimension lives in [`crate::calendar`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::version::Validity;

// ─── Dimension selector ──────────────────────────────────────────────────────

/// Names one of the four dimension tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
  Date,
  Customer,
  Product,
  Store,
}

impl Dimension {
  pub fn table(&self) -> &'static str {
    match self {
      Self::Date => "dim_date",
      Self::Customer => "dim_customer",
      Self::Product => "dim_product",
      Self::Store => "dim_store",
    }
  }

  pub fn key_column(&self) -> &'static str {
    match self {
      Self::Date => "date_key",
      Self::Customer => "customer_key",
      Self::Product => "product_key",
      Self::Store => "store_key",
    }
  }
}

// ─── Customer ────────────────────────────────────────────────────────────────

/// The descriptive (versioned) attributes of a customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerAttributes {
  pub first_name:        String,
  pub last_name:         String,
  pub email:             Option<String>,
  pub phone:             Option<String>,
  pub address:           Option<String>,
  pub city:              Option<String>,
  pub state:             Option<String>,
  pub country:           Option<String>,
  pub postal_code:       Option<String>,
  /// Marketing segment, e.g. "Premium" or "Regular".
  pub customer_segment:  Option<String>,
  pub registration_date: Option<NaiveDate>,
}

/// Input to [`crate::store::WarehouseStore::add_customer`]: the first
/// version of a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
  pub customer_id:    String,
  #[serde(flatten)]
  pub attributes:     CustomerAttributes,
  pub effective_date: NaiveDate,
}

/// One row of `dim_customer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerVersion {
  pub customer_key: i64,
  /// Business key shared by every version of the same customer.
  pub customer_id:  String,
  #[serde(flatten)]
  pub attributes:   CustomerAttributes,
  #[serde(flatten)]
  pub validity:     Validity,
}

// ─── Product ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductAttributes {
  pub product_name: String,
  pub category:     Option<String>,
  pub subcategory:  Option<String>,
  pub brand:        Option<String>,
  pub supplier:     Option<String>,
  pub unit_price:   f64,
  pub unit_cost:    f64,
}

/// Input to [`crate::store::WarehouseStore::add_product`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
  pub product_id:     String,
  #[serde(flatten)]
  pub attributes:     ProductAttributes,
  pub effective_date: NaiveDate,
}

/// One row of `dim_product`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVersion {
  pub product_key: i64,
  pub product_id:  String,
  #[serde(flatten)]
  pub attributes:  ProductAttributes,
  #[serde(flatten)]
  pub validity:    Validity,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Store attributes. Stores are Type 1: changes overwrite in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreAttributes {
  pub store_name:     String,
  /// e.g. "Flagship", "Outlet", "Online".
  pub store_type:     Option<String>,
  pub address:        Option<String>,
  pub city:           Option<String>,
  pub state:          Option<String>,
  pub country:        Option<String>,
  pub postal_code:    Option<String>,
  pub region:         Option<String>,
  pub manager_name:   Option<String>,
  pub opening_date:   Option<NaiveDate>,
  pub square_footage: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStore {
  pub store_id:   String,
  #[serde(flatten)]
  pub attributes: StoreAttributes,
}

/// One row of `dim_store`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
  pub store_key:  i64,
  pub store_id:   String,
  #[serde(flatten)]
  pub attributes: StoreAttributes,
}
