// one open serializable transaction

use crate::map_db_err;
use async_trait::async_trait;
use diesel_async::{
    AnsiTransactionManager, AsyncPgConnection, TransactionManager,
    pooled_connection::bb8::PooledConnection,
};
use engine_core::{DbResult, StoreTx};
use tracing::instrument;

/// A serializable postgres transaction holding its own pooled connection.
///
/// Dropping the transaction without commit leaves the connection in an open
/// transaction; the pool detects that on return, discards the connection, and
/// the server rolls back. Explicit [`StoreTx::rollback`] is still preferred.
pub struct PgTx {
    pub(crate) conn: PooledConnection<'static, AsyncPgConnection>,
}

impl PgTx {
    pub(crate) fn new(conn: PooledConnection<'static, AsyncPgConnection>) -> Self {
        PgTx { conn }
    }
}

#[async_trait]
impl StoreTx for PgTx {
    #[instrument(name = "db.tx.commit", skip(self))]
    async fn commit(mut self: Box<Self>) -> DbResult<()> {
        AnsiTransactionManager::commit_transaction(&mut *self.conn)
            .await
            .map_err(map_db_err)
    }

    #[instrument(name = "db.tx.rollback", skip(self))]
    async fn rollback(mut self: Box<Self>) -> DbResult<()> {
        AnsiTransactionManager::rollback_transaction(&mut *self.conn)
            .await
            .map_err(map_db_err)
    }
}
