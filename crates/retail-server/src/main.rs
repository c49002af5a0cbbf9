//! retail-warehouse binary.
//!
//! Reads `warehouse.toml` (or the path given with `--config`), opens the
//! SQLite warehouse, and runs one maintenance command or serves the JSON API.
//!
//! ```text
//! retail-warehouse populate-dates --start 2024-01-01 --end 2024-12-31
//! retail-warehouse refresh --from 2024-03-01 --to 2024-03-31
//! retail-warehouse serve
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use retail_core::{aggregate::RefreshPolicy, store::WarehouseStore};
use retail_server::ServerConfig;
use retail_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Retail star-schema warehouse")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "warehouse.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the schema if it does not exist and exit.
  Init,
  /// Fill `dim_date` for every day in `start..=end`.
  PopulateDates {
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end:   NaiveDate,
  },
  /// Rebuild the aggregate tables. Without a range, rebuilds everything.
  Refresh {
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,
    #[arg(long, requires = "from")]
    to:   Option<NaiveDate>,
  },
  /// Audit SCD current flags and daily aggregate drift. Exits non-zero if
  /// anything is found.
  Integrity,
  /// Serve the JSON API under `/api`.
  Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("RETAIL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);

  // Opening runs schema initialisation.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Init => {
      tracing::info!(path = ?store_path, "schema ready");
    }
    Command::PopulateDates { start, end } => {
      let fiscal = server_cfg.fiscal_calendar().context("invalid fiscal_year_start_month")?;
      let inserted = store
        .populate_dates(start, end, fiscal)
        .await
        .context("failed to populate dim_date")?;
      println!("inserted {inserted} dates");
    }
    Command::Refresh { from, to } => {
      let policy = match (from, to) {
        (Some(from), Some(to)) => RefreshPolicy::Incremental { from, to },
        _ => RefreshPolicy::Full,
      };
      let report = store
        .refresh_aggregates(policy)
        .await
        .context("aggregate refresh failed")?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Command::Integrity => {
      let report = store.check_integrity().await.context("integrity check failed")?;
      println!("{}", serde_json::to_string_pretty(&report)?);
      if !report.is_clean() {
        anyhow::bail!("integrity problems found");
      }
    }
    Command::Serve => serve(store, &server_cfg).await?,
  }

  Ok(())
}

async fn serve(store: SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  let fiscal = cfg.fiscal_calendar().context("invalid fiscal_year_start_month")?;
  let app = Router::new()
    .nest("/api", retail_api::api_router(Arc::new(store), fiscal))
    .layer(TraceLayer::new_for_http());
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
