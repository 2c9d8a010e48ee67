//! helpers for integration tests running against a real postgres

use crate::PgStore;
use anyhow::{Context, Result};
use std::sync::Once;
use url::Url;

static TRACING: Once = Once::new();

/// Console tracing with `RUST_LOG` filtering, installed once per process.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .try_init();
    });
}

/// Store connected to `DATABASE_URL` (via `.env` if present), with the
/// migrations applied.
pub async fn store_from_env() -> Result<PgStore> {
    init_test_tracing();
    let _ = dotenvy::dotenv();
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let store = PgStore::new(Url::parse(&url)?).await?;
    store.run_migration().await?;
    Ok(store)
}
