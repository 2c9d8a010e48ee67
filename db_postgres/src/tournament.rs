//! store transaction methods for tournaments

use crate::{PgTx, map_db_err, schema::tournaments, to_u32};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::{ExpressionMethods, OptionalExtension, QueryDsl, Queryable};
use diesel_async::RunQueryDsl;
use engine_core::{DbError, DbResult, Tournament, TournamentStatus, TxTournaments};
use tracing::{debug, instrument};
use uuid::Uuid;

// ------------------- DB row (SELECT/RETURNING) -------------------
#[derive(Debug, Queryable)]
pub struct DbTournament {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub status: String,
    pub sets_to_win: i32,
    pub games_per_set: i32,
    pub min_teams: i32,
    pub max_teams: i32,
    pub start_date: NaiveDate,
    pub settings: serde_json::Value,
    pub fixture_generated_at: Option<DateTime<Utc>>,
    pub fixture_generated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Mapping DB -> Core
impl TryFrom<DbTournament> for Tournament {
    type Error = DbError;

    fn try_from(r: DbTournament) -> Result<Self, Self::Error> {
        Ok(Tournament {
            id: r.id,
            tenant_id: r.tenant_id,
            name: r.name,
            status: TournamentStatus::try_from(r.status.as_str()).map_err(DbError::Other)?,
            sets_to_win: to_u32(r.sets_to_win, "sets_to_win")?,
            games_per_set: to_u32(r.games_per_set, "games_per_set")?,
            min_teams: to_u32(r.min_teams, "min_teams")?,
            max_teams: to_u32(r.max_teams, "max_teams")?,
            start_date: r.start_date,
            settings: r.settings,
            fixture_generated_at: r.fixture_generated_at,
            fixture_generated_by: r.fixture_generated_by,
        })
    }
}

// ------------------- Impl trait --------------------

#[async_trait]
impl TxTournaments for PgTx {
    #[instrument(name = "db.tournament.lock", skip(self), fields(id = %t_id))]
    async fn lock_tournament(
        &mut self,
        tenant: Uuid,
        t_id: Uuid,
    ) -> DbResult<Option<Tournament>> {
        let row = tournaments::table
            .filter(tournaments::tenant_id.eq(tenant))
            .filter(tournaments::id.eq(t_id))
            .for_update()
            .first::<DbTournament>(&mut self.conn)
            .await
            .optional()
            .map_err(map_db_err)?;
        match row {
            Some(row) => {
                debug!("tournament_locked");
                Ok(Some(row.try_into()?))
            }
            None => Ok(None),
        }
    }

    #[instrument(name = "db.tournament.get", skip(self), fields(id = %t_id))]
    async fn get_tournament(&mut self, tenant: Uuid, t_id: Uuid) -> DbResult<Option<Tournament>> {
        let row = tournaments::table
            .filter(tournaments::tenant_id.eq(tenant))
            .filter(tournaments::id.eq(t_id))
            .first::<DbTournament>(&mut self.conn)
            .await
            .optional()
            .map_err(map_db_err)?;
        row.map(Tournament::try_from).transpose()
    }

    #[instrument(name = "db.tournament.update", skip(self, tournament), fields(id = %tournament.id))]
    async fn update_tournament(&mut self, tournament: &Tournament) -> DbResult<()> {
        let updated = diesel::update(
            tournaments::table
                .filter(tournaments::tenant_id.eq(tournament.tenant_id))
                .filter(tournaments::id.eq(tournament.id)),
        )
        .set((
            tournaments::name.eq(tournament.name.clone()),
            tournaments::status.eq(tournament.status.to_string()),
            tournaments::sets_to_win.eq(tournament.sets_to_win as i32),
            tournaments::games_per_set.eq(tournament.games_per_set as i32),
            tournaments::min_teams.eq(tournament.min_teams as i32),
            tournaments::max_teams.eq(tournament.max_teams as i32),
            tournaments::start_date.eq(tournament.start_date),
            tournaments::settings.eq(tournament.settings.clone()),
            tournaments::fixture_generated_at.eq(tournament.fixture_generated_at),
            tournaments::fixture_generated_by.eq(tournament.fixture_generated_by),
            tournaments::updated_at.eq(Utc::now()),
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
