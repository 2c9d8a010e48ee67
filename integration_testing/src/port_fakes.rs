//! In-memory fakes for the engine ports.
//!
//! The store fake keeps real transaction semantics: one async mutex stands in
//! for the row locks of the database, a transaction mutates a private copy of
//! the state, and commit publishes the copy atomically. Concurrent operations
//! therefore serialize exactly like they do against postgres, which is what
//! the concurrency tests rely on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{
    AuditError, AuditEvent, AuditSinkPort, DbError, DbResult, Engine, EngineBuilder, Entry,
    IdempotencyRecord, Incident, Match, Notification, NotificationPort, NotifyError,
    PendingResultStatus, SetScore, StorePort, StoreTx, TeamWarning, Tournament, TxEntries,
    TxIdempotency, TxIncidents, TxMatches, TxTeams, TxTournaments,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct FakeState {
    pub tournaments: HashMap<Uuid, Tournament>,
    pub entries: Vec<Entry>,
    pub matches: HashMap<Uuid, Match>,
    pub set_results: HashMap<Uuid, Vec<SetScore>>,
    pub incidents: HashMap<Uuid, Incident>,
    /// team -> member profile ids
    pub team_members: HashMap<Uuid, Vec<Uuid>>,
    /// tenant -> admin profile ids
    pub tenant_admins: HashMap<Uuid, Vec<Uuid>>,
    /// team -> warnings
    pub warnings: HashMap<Uuid, Vec<TeamWarning>>,
    pub idempotency: HashMap<(Uuid, String), IdempotencyRecord>,
}

/// In-memory store fake implementing the full store port.
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
    tx_gate: Arc<AsyncMutex<()>>,
    fail_next_begin: Arc<Mutex<bool>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, seed: impl FnOnce(&mut FakeState)) {
        seed(&mut self.state.lock().unwrap());
    }

    /// committed state, cloned
    pub fn snapshot(&self) -> FakeState {
        self.state.lock().unwrap().clone()
    }

    pub fn fail_begin_once(&self) {
        *self.fail_next_begin.lock().unwrap() = true;
    }
}

#[async_trait]
impl StorePort for FakeStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>> {
        {
            let mut fail = self.fail_next_begin.lock().unwrap();
            if *fail {
                *fail = false;
                return Err(DbError::Other("injected begin failure".to_string()));
            }
        }
        let gate = self.tx_gate.clone().lock_owned().await;
        let work = self.state.lock().unwrap().clone();
        Ok(Box::new(FakeTx {
            _gate: gate,
            shared: self.state.clone(),
            work,
        }))
    }

    async fn list_pending_confirmation_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DbResult<Vec<(Uuid, Uuid)>> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<(Uuid, Uuid)> = state
            .matches
            .values()
            .filter(|m| {
                m.pending_result.as_ref().is_some_and(|pending| {
                    pending.status == PendingResultStatus::PendingConfirmation
                        && pending.reported_at < cutoff
                })
            })
            .map(|m| (m.tenant_id, m.id))
            .collect();
        found.sort();
        Ok(found)
    }
}

/// One open fake transaction; holds the global gate until commit or drop.
pub struct FakeTx {
    _gate: OwnedMutexGuard<()>,
    shared: Arc<Mutex<FakeState>>,
    work: FakeState,
}

#[async_trait]
impl TxTournaments for FakeTx {
    async fn lock_tournament(&mut self, tenant: Uuid, id: Uuid) -> DbResult<Option<Tournament>> {
        Ok(self
            .work
            .tournaments
            .get(&id)
            .filter(|t| t.tenant_id == tenant)
            .cloned())
    }

    async fn get_tournament(&mut self, tenant: Uuid, id: Uuid) -> DbResult<Option<Tournament>> {
        self.lock_tournament(tenant, id).await
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> DbResult<()> {
        if !self.work.tournaments.contains_key(&tournament.id) {
            return Err(DbError::NotFound);
        }
        self.work
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(())
    }
}

#[async_trait]
impl TxEntries for FakeTx {
    async fn lock_confirmed_entries(
        &mut self,
        tenant: Uuid,
        tournament: Uuid,
    ) -> DbResult<Vec<Entry>> {
        let mut confirmed: Vec<Entry> = self
            .work
            .entries
            .iter()
            .filter(|e| {
                e.tenant_id == tenant && e.tournament_id == tournament && e.is_confirmed()
            })
            .cloned()
            .collect();
        // seed NULLS LAST, then confirmation order
        confirmed.sort_by_key(|e| (e.seed.is_none(), e.seed, e.confirmed_at));
        Ok(confirmed)
    }

    async fn get_entry(
        &mut self,
        tenant: Uuid,
        tournament: Uuid,
        team: Uuid,
    ) -> DbResult<Option<Entry>> {
        Ok(self
            .work
            .entries
            .iter()
            .find(|e| {
                e.tenant_id == tenant && e.tournament_id == tournament && e.team_id == team
            })
            .cloned())
    }

    async fn update_entry(&mut self, entry: &Entry) -> DbResult<()> {
        match self.work.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(stored) => {
                *stored = entry.clone();
                Ok(())
            }
            None => Err(DbError::NotFound),
        }
    }
}

#[async_trait]
impl TxMatches for FakeTx {
    async fn lock_match(&mut self, tenant: Uuid, id: Uuid) -> DbResult<Option<Match>> {
        Ok(self
            .work
            .matches
            .get(&id)
            .filter(|m| m.tenant_id == tenant)
            .cloned())
    }

    async fn get_match(&mut self, tenant: Uuid, id: Uuid) -> DbResult<Option<Match>> {
        self.lock_match(tenant, id).await
    }

    async fn list_matches(&mut self, tenant: Uuid, tournament: Uuid) -> DbResult<Vec<Match>> {
        let mut listed: Vec<Match> = self
            .work
            .matches
            .values()
            .filter(|m| m.tenant_id == tenant && m.tournament_id == tournament)
            .cloned()
            .collect();
        listed.sort_by_key(|m| (m.round_number, m.match_number));
        Ok(listed)
    }

    async fn insert_matches(&mut self, new_matches: &[Match]) -> DbResult<()> {
        for m in new_matches {
            if self.work.matches.contains_key(&m.id) {
                return Err(DbError::UniqueViolation(Some("matches_pkey".to_string())));
            }
            self.work.matches.insert(m.id, m.clone());
        }
        Ok(())
    }

    async fn update_match(&mut self, m: &Match) -> DbResult<()> {
        if !self.work.matches.contains_key(&m.id) {
            return Err(DbError::NotFound);
        }
        self.work.matches.insert(m.id, m.clone());
        Ok(())
    }

    async fn delete_matches(&mut self, tenant: Uuid, tournament: Uuid) -> DbResult<usize> {
        let doomed: Vec<Uuid> = self
            .work
            .matches
            .values()
            .filter(|m| m.tenant_id == tenant && m.tournament_id == tournament)
            .map(|m| m.id)
            .collect();
        for id in &doomed {
            self.work.matches.remove(id);
            self.work.set_results.remove(id);
        }
        Ok(doomed.len())
    }

    async fn replace_set_results(
        &mut self,
        _tenant: Uuid,
        match_id: Uuid,
        sets: &[SetScore],
    ) -> DbResult<()> {
        self.work.set_results.insert(match_id, sets.to_vec());
        Ok(())
    }

    async fn list_set_results(
        &mut self,
        tenant: Uuid,
        tournament: Uuid,
    ) -> DbResult<HashMap<Uuid, Vec<SetScore>>> {
        let match_ids: Vec<Uuid> = self
            .work
            .matches
            .values()
            .filter(|m| m.tenant_id == tenant && m.tournament_id == tournament)
            .map(|m| m.id)
            .collect();
        Ok(self
            .work
            .set_results
            .iter()
            .filter(|(id, _)| match_ids.contains(id))
            .map(|(id, sets)| (*id, sets.clone()))
            .collect())
    }
}

#[async_trait]
impl TxIncidents for FakeTx {
    async fn insert_incident(&mut self, incident: &Incident) -> DbResult<()> {
        self.work.incidents.insert(incident.id, incident.clone());
        Ok(())
    }

    async fn lock_incident(&mut self, tenant: Uuid, id: Uuid) -> DbResult<Option<Incident>> {
        Ok(self
            .work
            .incidents
            .get(&id)
            .filter(|i| i.tenant_id == tenant)
            .cloned())
    }

    async fn update_incident(&mut self, incident: &Incident) -> DbResult<()> {
        if !self.work.incidents.contains_key(&incident.id) {
            return Err(DbError::NotFound);
        }
        self.work.incidents.insert(incident.id, incident.clone());
        Ok(())
    }
}

#[async_trait]
impl TxTeams for FakeTx {
    async fn is_team_member(
        &mut self,
        _tenant: Uuid,
        team: Uuid,
        profile: Uuid,
    ) -> DbResult<bool> {
        Ok(self
            .work
            .team_members
            .get(&team)
            .is_some_and(|members| members.contains(&profile)))
    }

    async fn list_team_members(&mut self, _tenant: Uuid, team: Uuid) -> DbResult<Vec<Uuid>> {
        Ok(self.work.team_members.get(&team).cloned().unwrap_or_default())
    }

    async fn list_tenant_admins(&mut self, tenant: Uuid) -> DbResult<Vec<Uuid>> {
        Ok(self
            .work
            .tenant_admins
            .get(&tenant)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_team_warning(
        &mut self,
        _tenant: Uuid,
        team: Uuid,
        warning: &TeamWarning,
    ) -> DbResult<()> {
        self.work
            .warnings
            .entry(team)
            .or_default()
            .push(warning.clone());
        Ok(())
    }
}

#[async_trait]
impl TxIdempotency for FakeTx {
    async fn get_idempotency(
        &mut self,
        tenant: Uuid,
        key: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<serde_json::Value>> {
        Ok(self
            .work
            .idempotency
            .get(&(tenant, key.to_string()))
            .filter(|record| record.expires_at > now)
            .map(|record| record.response.clone()))
    }

    async fn put_idempotency(&mut self, record: &IdempotencyRecord) -> DbResult<()> {
        self.work
            .idempotency
            .insert((record.tenant_id, record.key.clone()), record.clone());
        Ok(())
    }
}

#[async_trait]
impl StoreTx for FakeTx {
    async fn commit(self: Box<Self>) -> DbResult<()> {
        *self.shared.lock().unwrap() = self.work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        // the private copy is simply dropped
        Ok(())
    }
}

/// Notification queue fake recording every published record.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl FakeNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_once(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

#[async_trait]
impl NotificationPort for FakeNotifier {
    async fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(NotifyError::Queue("injected queue failure".to_string()));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Audit sink fake recording every emitted row.
#[derive(Clone, Default)]
pub struct FakeAuditSink {
    recorded: Arc<Mutex<Vec<AuditEvent>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl FakeAuditSink {
    pub fn recorded(&self) -> Vec<AuditEvent> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn fail_once(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

#[async_trait]
impl AuditSinkPort for FakeAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(AuditError::Sink("injected sink failure".to_string()));
        }
        self.recorded.lock().unwrap().push(event);
        Ok(())
    }
}

/// Engine wired to fresh fakes.
pub fn make_engine_with_fakes() -> (Engine, FakeStore, FakeNotifier, FakeAuditSink) {
    let store = FakeStore::new();
    let notifier = FakeNotifier::default();
    let audit = FakeAuditSink::default();
    let engine = EngineBuilder::new()
        .set_store(Arc::new(store.clone()))
        .set_notifications(Arc::new(notifier.clone()))
        .set_audit(Arc::new(audit.clone()))
        .build();
    (engine, store, notifier, audit)
}
