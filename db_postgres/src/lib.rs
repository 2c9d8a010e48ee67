// diesel postgres implementation of the engine store port

pub mod entry;
pub mod idempotency;
pub mod incident;
pub mod match_;
pub mod schema;
pub mod team;
#[cfg(feature = "test_support")]
pub mod test_support;
pub mod tournament;
pub mod tx;

pub use tx::PgTx;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::sql_types::Timestamptz;
use diesel_async::{
    AnsiTransactionManager, AsyncMigrationHarness, RunQueryDsl, TransactionManager,
    pooled_connection::{AsyncDieselConnectionManager, bb8::Pool},
};
use diesel_async::AsyncPgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use engine_core::{DbError, DbResult, StorePort, StoreTx};
use tracing::{info, instrument, warn};
use url::Url;
use uuid::Uuid;

/// embed migrations
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    pub async fn new(database: Url) -> Result<Self> {
        let config = AsyncDieselConnectionManager::new(database);
        Ok(PgStore {
            pool: Pool::builder().build(config).await?,
        })
    }

    #[instrument(name = "db.migration", skip(self))]
    pub async fn run_migration(&self) -> DbResult<()> {
        let conn = self
            .pool
            .get_owned()
            .await
            .map_err(|e| DbError::Other(e.to_string()))?;
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut harness = AsyncMigrationHarness::new(conn);
            harness
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| anyhow!("migration failed: {e}"))?;
            Ok(())
        })
        .await
        .context("Join error while running migrations")
        .map_err(|e| DbError::Other(e.to_string()))?
        .map_err(|e| DbError::Other(e.to_string()))?;

        info!("Migrations applied successfully");
        Ok(())
    }
}

#[async_trait]
impl StorePort for PgStore {
    /// One serializable transaction per engine operation. The row locks the
    /// transaction takes (`FOR UPDATE`) serialize writers on the same rows.
    #[instrument(name = "db.tx.begin", skip(self))]
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>> {
        let mut conn = match self.pool.get_owned().await {
            Ok(conn) => conn,
            Err(e) => {
                // Pool exhausted or database unavailable
                warn!(error = %e, "pool_get_failed");
                return Err(DbError::Other(e.to_string()));
            }
        };
        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(map_db_err)?;
        diesel::sql_query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut conn)
            .await
            .map_err(map_db_err)?;
        Ok(Box::new(PgTx::new(conn)))
    }

    #[instrument(name = "db.matches.pending_before", skip(self))]
    async fn list_pending_confirmation_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DbResult<Vec<(Uuid, Uuid)>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| DbError::Other(e.to_string()))?;
        let rows: Vec<PendingMatchRow> = diesel::sql_query(
            "SELECT tenant_id, id FROM matches \
             WHERE status = 'in_progress' \
               AND pending_result ->> 'status' = 'pending_confirmation' \
               AND (pending_result ->> 'reported_at')::timestamptz < $1",
        )
        .bind::<Timestamptz, _>(cutoff)
        .load(&mut conn)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(|row| (row.tenant_id, row.id)).collect())
    }
}

#[derive(diesel::QueryableByName)]
struct PendingMatchRow {
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    tenant_id: Uuid,
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    id: Uuid,
}

use diesel::result::{DatabaseErrorKind as K, Error as DE};

pub(crate) fn map_db_err(e: DE) -> DbError {
    match &e {
        DE::NotFound => DbError::NotFound,
        DE::DatabaseError(kind, info) => {
            let c = info.constraint_name().map(|s| s.to_string());
            match kind {
                K::UniqueViolation => DbError::UniqueViolation(c),
                K::ForeignKeyViolation => DbError::ForeignKeyViolation(c),
                K::CheckViolation => DbError::CheckViolation(c),
                K::SerializationFailure => DbError::SerializationFailure,
                _ => DbError::Other(e.to_string()),
            }
        }
        _ => DbError::Other(e.to_string()),
    }
}

/// guards against rows with counters outside the domain range
pub(crate) fn to_u32(value: i32, field: &str) -> DbResult<u32> {
    u32::try_from(value).map_err(|_| DbError::Other(format!("negative {field} in row: {value}")))
}
