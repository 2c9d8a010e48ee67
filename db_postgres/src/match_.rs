//! store transaction methods for matches and their set results

use crate::{PgTx, map_db_err, schema::matches, schema::set_results, to_u32};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::{
    ExpressionMethods, Insertable, OptionalExtension, QueryDsl, Queryable,
};
use diesel_async::RunQueryDsl;
use engine_core::{DbError, DbResult, Match, MatchStatus, PendingResult, SetScore, TxMatches};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

// ------------------- DB row (SELECT/RETURNING) -------------------
#[derive(Debug, Queryable)]
pub struct DbMatch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tournament_id: Uuid,
    pub round_number: i32,
    pub round_name: String,
    pub match_number: i32,
    pub bracket_position: String,
    pub team1_id: Option<Uuid>,
    pub team2_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: String,
    pub winner_id: Option<Uuid>,
    pub loser_id: Option<Uuid>,
    pub next_match_id: Option<Uuid>,
    pub pending_result: Option<serde_json::Value>,
    pub settings: serde_json::Value,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbMatch> for Match {
    type Error = DbError;

    fn try_from(r: DbMatch) -> Result<Self, Self::Error> {
        let pending_result: Option<PendingResult> = r
            .pending_result
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| DbError::Other(format!("failed to deserialize pending_result: {e}")))?;
        Ok(Match {
            id: r.id,
            tenant_id: r.tenant_id,
            tournament_id: r.tournament_id,
            round_number: to_u32(r.round_number, "round_number")?,
            round_name: r.round_name,
            match_number: to_u32(r.match_number, "match_number")?,
            bracket_position: r.bracket_position,
            team1_id: r.team1_id,
            team2_id: r.team2_id,
            scheduled_at: r.scheduled_at,
            status: MatchStatus::try_from(r.status.as_str()).map_err(DbError::Other)?,
            winner_id: r.winner_id,
            loser_id: r.loser_id,
            next_match_id: r.next_match_id,
            pending_result,
            duration_minutes: r
                .duration_minutes
                .map(|minutes| to_u32(minutes, "duration_minutes"))
                .transpose()?,
            notes: r.notes,
            finished_at: r.finished_at,
            settings: r.settings,
        })
    }
}

// ------------------- INSERT -------------------
#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct WriteDbMatch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tournament_id: Uuid,
    pub round_number: i32,
    pub round_name: String,
    pub match_number: i32,
    pub bracket_position: String,
    pub team1_id: Option<Uuid>,
    pub team2_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: String,
    pub winner_id: Option<Uuid>,
    pub loser_id: Option<Uuid>,
    pub next_match_id: Option<Uuid>,
    pub pending_result: Option<serde_json::Value>,
    pub settings: serde_json::Value,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<&Match> for WriteDbMatch {
    type Error = DbError;

    fn try_from(m: &Match) -> Result<Self, Self::Error> {
        let pending_result = m
            .pending_result
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| DbError::Other(format!("failed to serialize pending_result: {e}")))?;
        Ok(WriteDbMatch {
            id: m.id,
            tenant_id: m.tenant_id,
            tournament_id: m.tournament_id,
            round_number: m.round_number as i32,
            round_name: m.round_name.clone(),
            match_number: m.match_number as i32,
            bracket_position: m.bracket_position.clone(),
            team1_id: m.team1_id,
            team2_id: m.team2_id,
            scheduled_at: m.scheduled_at,
            status: m.status.to_string(),
            winner_id: m.winner_id,
            loser_id: m.loser_id,
            next_match_id: m.next_match_id,
            pending_result,
            settings: m.settings.clone(),
            duration_minutes: m.duration_minutes.map(|minutes| minutes as i32),
            notes: m.notes.clone(),
            finished_at: m.finished_at,
        })
    }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = set_results)]
pub struct DbSetResult {
    pub match_id: Uuid,
    pub set_number: i32,
    pub tenant_id: Uuid,
    pub team1_games: i32,
    pub team2_games: i32,
    pub tiebreak_team1: Option<i32>,
    pub tiebreak_team2: Option<i32>,
}

impl TryFrom<DbSetResult> for SetScore {
    type Error = DbError;

    fn try_from(r: DbSetResult) -> Result<Self, Self::Error> {
        Ok(SetScore {
            set_number: to_u32(r.set_number, "set_number")?,
            team1_games: to_u32(r.team1_games, "team1_games")?,
            team2_games: to_u32(r.team2_games, "team2_games")?,
            tiebreak_team1: r.tiebreak_team1.map(|tb| to_u32(tb, "tiebreak_team1")).transpose()?,
            tiebreak_team2: r.tiebreak_team2.map(|tb| to_u32(tb, "tiebreak_team2")).transpose()?,
        })
    }
}

// ------------------- Impl trait --------------------

#[async_trait]
impl TxMatches for PgTx {
    #[instrument(name = "db.match.lock", skip(self), fields(id = %m_id))]
    async fn lock_match(&mut self, tenant: Uuid, m_id: Uuid) -> DbResult<Option<Match>> {
        let row = matches::table
            .filter(matches::tenant_id.eq(tenant))
            .filter(matches::id.eq(m_id))
            .for_update()
            .first::<DbMatch>(&mut self.conn)
            .await
            .optional()
            .map_err(map_db_err)?;
        match row {
            Some(row) => {
                debug!("match_locked");
                Ok(Some(row.try_into()?))
            }
            None => Ok(None),
        }
    }

    #[instrument(name = "db.match.get", skip(self), fields(id = %m_id))]
    async fn get_match(&mut self, tenant: Uuid, m_id: Uuid) -> DbResult<Option<Match>> {
        let row = matches::table
            .filter(matches::tenant_id.eq(tenant))
            .filter(matches::id.eq(m_id))
            .first::<DbMatch>(&mut self.conn)
            .await
            .optional()
            .map_err(map_db_err)?;
        row.map(Match::try_from).transpose()
    }

    #[instrument(name = "db.match.list", skip(self), fields(tournament_id = %tournament))]
    async fn list_matches(&mut self, tenant: Uuid, tournament: Uuid) -> DbResult<Vec<Match>> {
        let rows = matches::table
            .filter(matches::tenant_id.eq(tenant))
            .filter(matches::tournament_id.eq(tournament))
            .order((matches::round_number.asc(), matches::match_number.asc()))
            .load::<DbMatch>(&mut self.conn)
            .await
            .map_err(map_db_err)?;
        rows.into_iter().map(Match::try_from).collect()
    }

    #[instrument(name = "db.match.insert_bulk", skip(self, new_matches), fields(count = new_matches.len()))]
    async fn insert_matches(&mut self, new_matches: &[Match]) -> DbResult<()> {
        let rows: Vec<WriteDbMatch> = new_matches
            .iter()
            .map(WriteDbMatch::try_from)
            .collect::<Result<_, _>>()?;
        diesel::insert_into(matches::table)
            .values(&rows)
            .execute(&mut self.conn)
            .await
            .map_err(map_db_err)?;
        info!("matches_inserted");
        Ok(())
    }

    #[instrument(name = "db.match.update", skip(self, m), fields(id = %m.id))]
    async fn update_match(&mut self, m: &Match) -> DbResult<()> {
        let w = WriteDbMatch::try_from(m)?;
        let updated = diesel::update(
            matches::table
                .filter(matches::tenant_id.eq(m.tenant_id))
                .filter(matches::id.eq(m.id)),
        )
        .set((
            matches::team1_id.eq(w.team1_id),
            matches::team2_id.eq(w.team2_id),
            matches::scheduled_at.eq(w.scheduled_at),
            matches::status.eq(w.status),
            matches::winner_id.eq(w.winner_id),
            matches::loser_id.eq(w.loser_id),
            matches::pending_result.eq(w.pending_result),
            matches::settings.eq(w.settings),
            matches::duration_minutes.eq(w.duration_minutes),
            matches::notes.eq(w.notes),
            matches::finished_at.eq(w.finished_at),
            matches::updated_at.eq(Utc::now()),
        ))
        .execute(&mut self.conn)
        .await
        .map_err(map_db_err)?;
        if updated == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    #[instrument(name = "db.match.delete_fixture", skip(self), fields(tournament_id = %tournament))]
    async fn delete_matches(&mut self, tenant: Uuid, tournament: Uuid) -> DbResult<usize> {
        let deleted = diesel::delete(
            matches::table
                .filter(matches::tenant_id.eq(tenant))
                .filter(matches::tournament_id.eq(tournament)),
        )
        .execute(&mut self.conn)
        .await
        .map_err(map_db_err)?;
        info!(deleted, "fixture_deleted");
        Ok(deleted)
    }

    #[instrument(name = "db.set_results.replace", skip(self, sets), fields(match_id = %m_id))]
    async fn replace_set_results(
        &mut self,
        tenant: Uuid,
        m_id: Uuid,
        sets: &[SetScore],
    ) -> DbResult<()> {
        diesel::delete(set_results::table.filter(set_results::match_id.eq(m_id)))
            .execute(&mut self.conn)
            .await
            .map_err(map_db_err)?;
        let rows: Vec<DbSetResult> = sets
            .iter()
            .map(|set| DbSetResult {
                match_id: m_id,
                set_number: set.set_number as i32,
                tenant_id: tenant,
                team1_games: set.team1_games as i32,
                team2_games: set.team2_games as i32,
                tiebreak_team1: set.tiebreak_team1.map(|tb| tb as i32),
                tiebreak_team2: set.tiebreak_team2.map(|tb| tb as i32),
            })
            .collect();
        diesel::insert_into(set_results::table)
            .values(&rows)
            .execute(&mut self.conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    #[instrument(name = "db.set_results.list", skip(self), fields(tournament_id = %tournament))]
    async fn list_set_results(
        &mut self,
        tenant: Uuid,
        tournament: Uuid,
    ) -> DbResult<HashMap<Uuid, Vec<SetScore>>> {
        let tournament_matches = matches::table
            .filter(matches::tenant_id.eq(tenant))
            .filter(matches::tournament_id.eq(tournament))
            .select(matches::id);
        let rows = set_results::table
            .filter(set_results::tenant_id.eq(tenant))
            .filter(set_results::match_id.eq_any(tournament_matches))
            .order((set_results::match_id.asc(), set_results::set_number.asc()))
            .load::<DbSetResult>(&mut self.conn)
            .await
            .map_err(map_db_err)?;

        let mut by_match: HashMap<Uuid, Vec<SetScore>> = HashMap::new();
        for row in rows {
            let match_id = row.match_id;
            by_match
                .entry(match_id)
                .or_default()
                .push(SetScore::try_from(row)?);
        }
        Ok(by_match)
    }
}
