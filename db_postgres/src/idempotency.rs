//! store transaction methods for idempotency records

use crate::{PgTx, map_db_err, schema::idempotency_records};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::{ExpressionMethods, Insertable, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use engine_core::{DbResult, IdempotencyRecord, TxIdempotency};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Insertable)]
#[diesel(table_name = idempotency_records)]
struct WriteDbIdempotency {
    tenant_id: Uuid,
    key: String,
    response: serde_json::Value,
    expires_at: DateTime<Utc>,
}

#[async_trait]
impl TxIdempotency for PgTx {
    #[instrument(name = "db.idempotency.get", skip(self, idem_key))]
    async fn get_idempotency(
        &mut self,
        tenant: Uuid,
        idem_key: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<serde_json::Value>> {
        let stored = idempotency_records::table
            .filter(idempotency_records::tenant_id.eq(tenant))
            .filter(idempotency_records::key.eq(idem_key))
            .filter(idempotency_records::expires_at.gt(now))
            .select(idempotency_records::response)
            .first::<serde_json::Value>(&mut self.conn)
            .await
            .optional()
            .map_err(map_db_err)?;
        if stored.is_some() {
            debug!("idempotency_hit");
        }
        Ok(stored)
    }

    #[instrument(name = "db.idempotency.put", skip(self, record))]
    async fn put_idempotency(&mut self, record: &IdempotencyRecord) -> DbResult<()> {
        diesel::insert_into(idempotency_records::table)
            .values(WriteDbIdempotency {
                tenant_id: record.tenant_id,
                key: record.key.clone(),
                response: record.response.clone(),
                expires_at: record.expires_at,
            })
            .on_conflict((idempotency_records::tenant_id, idempotency_records::key))
            .do_update()
            .set((
                idempotency_records::response.eq(record.response.clone()),
                idempotency_records::expires_at.eq(record.expires_at),
            ))
            .execute(&mut self.conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}
