//! Runtime configuration for the `retail-warehouse` binary.

use std::path::PathBuf;

use retail_core::calendar::FiscalCalendar;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `warehouse.toml` layered under
/// `RETAIL_*` environment variables. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                    String,
  #[serde(default = "default_port")]
  pub port:                    u16,
  /// SQLite database file. A leading `~/` is expanded by the binary.
  #[serde(default = "default_store_path")]
  pub store_path:              PathBuf,
  /// Month the fiscal year starts in, used when populating `dim_date`.
  #[serde(default = "default_fiscal_month")]
  pub fiscal_year_start_month: u32,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("warehouse.db") }
fn default_fiscal_month() -> u32 { 1 }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                    default_host(),
      port:                    default_port(),
      store_path:              default_store_path(),
      fiscal_year_start_month: default_fiscal_month(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn fiscal_calendar(&self) -> retail_core::Result<FiscalCalendar> {
    FiscalCalendar::new(self.fiscal_year_start_month)
  }
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg: ServerConfig = Config::builder().build().unwrap().try_deserialize().unwrap();
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.store_path, PathBuf::from("warehouse.db"));
    assert_eq!(cfg.fiscal_calendar().unwrap().start_month(), 1);
  }

  #[test]
  fn toml_overrides_selected_fields() {
    let toml = r#"
      port = 9000
      store_path = "~/data/retail.db"
      fiscal_year_start_month = 7
    "#;
    let cfg: ServerConfig = Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_path, PathBuf::from("~/data/retail.db"));
    assert_eq!(cfg.fiscal_calendar().unwrap().start_month(), 7);
  }

  #[test]
  fn out_of_range_fiscal_month_is_rejected() {
    let cfg = ServerConfig { fiscal_year_start_month: 13, ..ServerConfig::default() };
    assert!(cfg.fiscal_calendar().is_err());
  }
}
