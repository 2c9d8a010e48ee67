//! store transaction methods for entries

use crate::{PgTx, map_db_err, schema::entries, to_u32};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::{
    ExpressionMethods, OptionalExtension, PgSortExpressionMethods, QueryDsl, Queryable,
};
use diesel_async::RunQueryDsl;
use engine_core::{DbError, DbResult, Entry, EntryStatus, TxEntries};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Queryable)]
pub struct DbEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tournament_id: Uuid,
    pub team_id: Uuid,
    pub seed: Option<i32>,
    pub status: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbEntry> for Entry {
    type Error = DbError;

    fn try_from(r: DbEntry) -> Result<Self, Self::Error> {
        Ok(Entry {
            id: r.id,
            tenant_id: r.tenant_id,
            tournament_id: r.tournament_id,
            team_id: r.team_id,
            seed: r.seed.map(|seed| to_u32(seed, "seed")).transpose()?,
            status: EntryStatus::try_from(r.status.as_str()).map_err(DbError::Other)?,
            confirmed_at: r.confirmed_at,
        })
    }
}

#[async_trait]
impl TxEntries for PgTx {
    /// Locks the confirmed roster in a stable order so concurrent fixture
    /// generations serialize instead of deadlocking.
    #[instrument(name = "db.entries.lock_confirmed", skip(self), fields(tournament_id = %tournament))]
    async fn lock_confirmed_entries(
        &mut self,
        tenant: Uuid,
        tournament: Uuid,
    ) -> DbResult<Vec<Entry>> {
        let rows = entries::table
            .filter(entries::tenant_id.eq(tenant))
            .filter(entries::tournament_id.eq(tournament))
            .filter(entries::status.eq(EntryStatus::Confirmed.to_string()))
            .order((entries::seed.asc().nulls_last(), entries::confirmed_at.asc()))
            .for_update()
            .load::<DbEntry>(&mut self.conn)
            .await
            .map_err(map_db_err)?;
        debug!(count = rows.len(), "entries_locked");
        rows.into_iter().map(Entry::try_from).collect()
    }

    #[instrument(name = "db.entry.get", skip(self), fields(team_id = %team))]
    async fn get_entry(
        &mut self,
        tenant: Uuid,
        tournament: Uuid,
        team: Uuid,
    ) -> DbResult<Option<Entry>> {
        let row = entries::table
            .filter(entries::tenant_id.eq(tenant))
            .filter(entries::tournament_id.eq(tournament))
            .filter(entries::team_id.eq(team))
            .first::<DbEntry>(&mut self.conn)
            .await
            .optional()
            .map_err(map_db_err)?;
        row.map(Entry::try_from).transpose()
    }

    #[instrument(name = "db.entry.update", skip(self, entry), fields(id = %entry.id))]
    async fn update_entry(&mut self, entry: &Entry) -> DbResult<()> {
        let updated = diesel::update(
            entries::table
                .filter(entries::tenant_id.eq(entry.tenant_id))
                .filter(entries::id.eq(entry.id)),
        )
        .set((
            entries::seed.eq(entry.seed.map(|seed| seed as i32)),
            entries::status.eq(entry.status.to_string()),
            entries::confirmed_at.eq(entry.confirmed_at),
            entries::updated_at.eq(Utc::now()),
        ))
        .execute(&mut self.conn)
        .await
        .map_err(map_db_err)?;
        if updated == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
