// store port: transactional persistence with row locking

use crate::{Entry, Incident, Match, SetScore, TeamWarning, Tournament};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Error)]
pub enum DbError {
    /// row does not exist
    #[error("entity not found")]
    NotFound,

    /// constraint name if it is returned from the database
    #[error("unique violation{0:?}")]
    UniqueViolation(Option<String>),

    /// constraint name if it is returned from the database
    #[error("foreign key violation{0:?}")]
    ForeignKeyViolation(Option<String>),

    /// constraint name if it is returned from the database
    #[error("check violation{0:?}")]
    CheckViolation(Option<String>),

    /// the serializable transaction lost against a concurrent one (retry may work)
    #[error("serialization failure")]
    SerializationFailure,

    /// connection, pool, or other database errors
    #[error("database failure: {0}")]
    Other(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Stored response for an idempotency key; authoritative while unexpired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub tenant_id: Uuid,
    pub key: String,
    pub response: serde_json::Value,
    pub expires_at: DateTime<Utc>,
}

/// store port trait
///
/// All writes of one operation happen inside one serializable transaction
/// obtained through [`StorePort::begin`]. The lock methods of the transaction
/// take exclusive row locks (`FOR UPDATE` semantics); two operations touching
/// the same row serialize on them.
#[async_trait]
pub trait StorePort: Send + Sync {
    /// open a serializable transaction
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>>;

    /// Matches whose pending result has waited for confirmation since before
    /// `cutoff`, as (tenant_id, match_id) pairs. Read only; used by the auto
    /// confirmation sweep which then revalidates under lock.
    async fn list_pending_confirmation_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DbResult<Vec<(Uuid, Uuid)>>;
}

#[async_trait]
pub trait TxTournaments: Send {
    /// load the tournament under an exclusive row lock
    async fn lock_tournament(&mut self, tenant_id: Uuid, id: Uuid)
    -> DbResult<Option<Tournament>>;
    async fn get_tournament(&mut self, tenant_id: Uuid, id: Uuid) -> DbResult<Option<Tournament>>;
    async fn update_tournament(&mut self, tournament: &Tournament) -> DbResult<()>;
}

#[async_trait]
pub trait TxEntries: Send {
    /// Exclusively lock and return the confirmed entries of a tournament,
    /// ordered by (seed NULLS LAST, confirmed_at ASC).
    async fn lock_confirmed_entries(
        &mut self,
        tenant_id: Uuid,
        tournament_id: Uuid,
    ) -> DbResult<Vec<Entry>>;
    async fn get_entry(
        &mut self,
        tenant_id: Uuid,
        tournament_id: Uuid,
        team_id: Uuid,
    ) -> DbResult<Option<Entry>>;
    async fn update_entry(&mut self, entry: &Entry) -> DbResult<()>;
}

#[async_trait]
pub trait TxMatches: Send {
    /// load the match under an exclusive row lock
    async fn lock_match(&mut self, tenant_id: Uuid, id: Uuid) -> DbResult<Option<Match>>;
    async fn get_match(&mut self, tenant_id: Uuid, id: Uuid) -> DbResult<Option<Match>>;
    async fn list_matches(&mut self, tenant_id: Uuid, tournament_id: Uuid)
    -> DbResult<Vec<Match>>;
    /// bulk insert of a freshly generated fixture
    async fn insert_matches(&mut self, matches: &[Match]) -> DbResult<()>;
    async fn update_match(&mut self, m: &Match) -> DbResult<()>;
    /// delete all matches of a tournament (cascades to set results),
    /// returning the deleted count
    async fn delete_matches(&mut self, tenant_id: Uuid, tournament_id: Uuid) -> DbResult<usize>;
    /// atomically replace the stored set results of one match
    async fn replace_set_results(
        &mut self,
        tenant_id: Uuid,
        match_id: Uuid,
        sets: &[SetScore],
    ) -> DbResult<()>;
    async fn list_set_results(
        &mut self,
        tenant_id: Uuid,
        tournament_id: Uuid,
    ) -> DbResult<HashMap<Uuid, Vec<SetScore>>>;
}

#[async_trait]
pub trait TxIncidents: Send {
    async fn insert_incident(&mut self, incident: &Incident) -> DbResult<()>;
    /// load the incident under an exclusive row lock
    async fn lock_incident(&mut self, tenant_id: Uuid, id: Uuid) -> DbResult<Option<Incident>>;
    async fn update_incident(&mut self, incident: &Incident) -> DbResult<()>;
}

#[async_trait]
pub trait TxTeams: Send {
    async fn is_team_member(
        &mut self,
        tenant_id: Uuid,
        team_id: Uuid,
        profile_id: Uuid,
    ) -> DbResult<bool>;
    /// profile ids of all current members of a team
    async fn list_team_members(&mut self, tenant_id: Uuid, team_id: Uuid) -> DbResult<Vec<Uuid>>;
    /// profile ids of all admins and owners of a tenant
    async fn list_tenant_admins(&mut self, tenant_id: Uuid) -> DbResult<Vec<Uuid>>;
    async fn append_team_warning(
        &mut self,
        tenant_id: Uuid,
        team_id: Uuid,
        warning: &TeamWarning,
    ) -> DbResult<()>;
}

#[async_trait]
pub trait TxIdempotency: Send {
    /// the stored response for the key, if present and unexpired
    async fn get_idempotency(
        &mut self,
        tenant_id: Uuid,
        key: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<serde_json::Value>>;
    async fn put_idempotency(&mut self, record: &IdempotencyRecord) -> DbResult<()>;
}

/// One open serializable transaction. Dropping a transaction without calling
/// [`StoreTx::commit`] must roll it back.
#[async_trait]
pub trait StoreTx:
    TxTournaments + TxEntries + TxMatches + TxIncidents + TxTeams + TxIdempotency
{
    async fn commit(self: Box<Self>) -> DbResult<()>;
    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
