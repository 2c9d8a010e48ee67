// result reporting and two sided confirmation

use crate::{
    AuditEvent, DbError, Engine, EngineError, EngineResult, EntryStatus, IdempotencyRecord,
    Incident, MatchStatus, Notification, NotificationKind, PendingResult, PendingResultStatus,
    RequestContext, SetScore, StoreTx,
    advance::advance_winner,
    scoring::validate_score,
    utils::validation::{FieldError, ValidationErrors, check_text_length},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// player reported score sheet of one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultReport {
    pub match_id: Uuid,
    pub sets: Vec<SetScore>,
    pub winner_team_id: Uuid,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub match_id: Uuid,
    pub status: MatchStatus,
    pub needs_confirmation: bool,
    pub winner_team_id: Uuid,
    pub sets: Vec<SetScore>,
    pub message: String,
}

/// outcome of a confirmation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptOutcome {
    Finished,
    Disputed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptResponse {
    pub match_id: Uuid,
    pub status: AcceptOutcome,
    pub incident_id: Option<Uuid>,
    pub winner_team_id: Option<Uuid>,
    pub message: String,
}

enum ReportRun {
    /// the idempotency key already carries a stored response
    Replay(ReportResponse),
    Fresh(Box<ReportOutcome>),
}

struct ReportOutcome {
    response: ReportResponse,
    notification: Notification,
    audit_data: serde_json::Value,
}

struct AcceptRun {
    response: AcceptResponse,
    notification: Notification,
    audit_data: serde_json::Value,
}

impl Engine {
    /// Report the score of a match. Non admin reports park as a pending
    /// result awaiting the opposing team; admin reports finish the match
    /// immediately. Idempotent per key: a repeated call returns the stored
    /// response verbatim.
    #[instrument(
        name = "engine.result.report",
        skip(self, ctx, report, idempotency_key),
        fields(request_id = %ctx.request_id, tenant_id = %ctx.tenant_id, match_id = %report.match_id)
    )]
    pub async fn report_result(
        &self,
        ctx: &RequestContext,
        report: ResultReport,
        idempotency_key: Option<&str>,
    ) -> EngineResult<ReportResponse> {
        let mut errs = ValidationErrors::new();
        if let Some(notes) = &report.notes {
            check_text_length(&mut errs, "notes", notes, 0, 500);
        }
        errs.into_result()?;

        let ttl = Duration::hours(self.config.idempotency_ttl_hours as i64);
        let mut tx = self.store.begin().await?;
        match report_result_tx(ctx, tx.as_mut(), &report, idempotency_key, ttl).await {
            Ok(ReportRun::Replay(response)) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "rollback_failed");
                }
                info!("idempotent_replay");
                Ok(response)
            }
            Ok(ReportRun::Fresh(outcome)) => {
                tx.commit().await?;
                info!(
                    needs_confirmation = outcome.response.needs_confirmation,
                    "result_reported"
                );
                self.publish_notification(outcome.notification).await;
                self.record_audit(AuditEvent {
                    tenant_id: ctx.tenant_id,
                    request_id: ctx.request_id,
                    actor: ctx.profile_id,
                    action: "result.reported".to_string(),
                    entity: "match".to_string(),
                    entity_id: report.match_id,
                    data: outcome.audit_data,
                    occurred_at: ctx.now(),
                })
                .await;
                Ok(outcome.response)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "rollback_failed");
                }
                Err(error)
            }
        }
    }

    /// Confirm or dispute a pending result as the opposing team.
    #[instrument(
        name = "engine.result.accept",
        skip(self, ctx, dispute_reason),
        fields(request_id = %ctx.request_id, tenant_id = %ctx.tenant_id, match_id = %match_id, accept)
    )]
    pub async fn accept_result(
        &self,
        ctx: &RequestContext,
        match_id: Uuid,
        accept: bool,
        dispute_reason: Option<&str>,
    ) -> EngineResult<AcceptResponse> {
        let mut tx = self.store.begin().await?;
        match accept_result_tx(ctx, tx.as_mut(), match_id, accept, dispute_reason).await {
            Ok(run) => {
                tx.commit().await?;
                info!(outcome = ?run.response.status, "result_confirmation_handled");
                self.publish_notification(run.notification).await;
                self.record_audit(AuditEvent {
                    tenant_id: ctx.tenant_id,
                    request_id: ctx.request_id,
                    actor: ctx.profile_id,
                    action: if accept {
                        "result.confirmed".to_string()
                    } else {
                        "result.disputed".to_string()
                    },
                    entity: "match".to_string(),
                    entity_id: match_id,
                    data: run.audit_data,
                    occurred_at: ctx.now(),
                })
                .await;
                Ok(run.response)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "rollback_failed");
                }
                Err(error)
            }
        }
    }

    /// Maintenance sweep: confirm every pending result that has waited longer
    /// than the confirmation window, exactly as an explicit accept would, with
    /// the system identity as confirmer. Returns the confirmed count.
    #[instrument(name = "engine.result.auto_confirm", skip(self))]
    pub async fn auto_confirm_expired(&self, now: DateTime<Utc>) -> EngineResult<u32> {
        let cutoff = now - Duration::hours(self.config.confirmation_window_hours as i64);
        let candidates = self.store.list_pending_confirmation_before(cutoff).await?;
        let mut confirmed = 0;
        for (tenant_id, match_id) in candidates {
            match self.auto_confirm_one(tenant_id, match_id, cutoff, now).await {
                Ok(true) => confirmed += 1,
                Ok(false) => {}
                Err(error) => {
                    warn!(%match_id, error = %error, "auto_confirm_failed");
                }
            }
        }
        if confirmed > 0 {
            info!(confirmed, "auto_confirm_sweep_done");
        }
        Ok(confirmed)
    }

    async fn auto_confirm_one(
        &self,
        tenant_id: Uuid,
        match_id: Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let ctx = RequestContext::system(tenant_id).at(now);
        let mut tx = self.store.begin().await?;
        let Some(mut m) = tx.lock_match(tenant_id, match_id).await? else {
            tx.rollback().await?;
            return Ok(false);
        };
        // the candidate may have been confirmed or disputed since the scan
        let Some(pending) = m.pending_result.clone() else {
            tx.rollback().await?;
            return Ok(false);
        };
        if pending.status != PendingResultStatus::PendingConfirmation
            || pending.reported_at > cutoff
        {
            tx.rollback().await?;
            return Ok(false);
        }

        let winner = pending.winner_id;
        m.finish(winner, now);
        m.stamp_confirmed_by(Uuid::nil());
        tx.update_match(&m).await?;
        advance_winner(tx.as_mut(), &m, now).await?;

        let recipients = tx
            .list_team_members(tenant_id, pending.reporter_team_id)
            .await?;
        tx.commit().await?;

        self.publish_notification(Notification {
            tenant_id,
            kind: NotificationKind::ResultConfirmed,
            recipients,
            title: "Resultado confirmado automáticamente".to_string(),
            body: format!(
                "El resultado del partido {} se confirmó al vencer el plazo de confirmación",
                m.bracket_position
            ),
            data: serde_json::json!({ "match_id": match_id, "winner_team_id": winner }),
        })
        .await;
        self.record_audit(AuditEvent {
            tenant_id,
            request_id: ctx.request_id,
            actor: Uuid::nil(),
            action: "result.auto_confirmed".to_string(),
            entity: "match".to_string(),
            entity_id: match_id,
            data: serde_json::json!({ "winner_team_id": winner }),
            occurred_at: now,
        })
        .await;
        Ok(true)
    }
}

async fn report_result_tx(
    ctx: &RequestContext,
    tx: &mut dyn StoreTx,
    report: &ResultReport,
    idempotency_key: Option<&str>,
    ttl: Duration,
) -> EngineResult<ReportRun> {
    // the idempotency record is authoritative and consulted before locking
    if let Some(key) = idempotency_key
        && let Some(stored) = tx.get_idempotency(ctx.tenant_id, key, ctx.now()).await?
    {
        let response = serde_json::from_value(stored).map_err(|error| {
            EngineError::Db(DbError::Other(format!(
                "stored idempotency response is corrupt: {error}"
            )))
        })?;
        return Ok(ReportRun::Replay(response));
    }

    let Some(mut m) = tx.lock_match(ctx.tenant_id, report.match_id).await? else {
        return Err(EngineError::NotFound("match".to_string()));
    };
    if m.status.is_terminal() {
        return Err(EngineError::Conflict(format!(
            "match is already {}",
            m.status
        )));
    }
    if m.pending_result.is_some() {
        return Err(EngineError::Conflict(
            "a reported result is already awaiting confirmation".to_string(),
        ));
    }
    let (Some(team1), Some(team2)) = (m.team1_id, m.team2_id) else {
        return Err(EngineError::Conflict(
            "match teams are not resolved yet".to_string(),
        ));
    };

    let mut reporter_team = None;
    for team in [team1, team2] {
        if tx
            .is_team_member(ctx.tenant_id, team, ctx.profile_id)
            .await?
        {
            reporter_team = Some(team);
            break;
        }
    }
    if !ctx.is_admin() && reporter_team.is_none() {
        return Err(EngineError::Forbidden(
            "caller is not a member of either team".to_string(),
        ));
    }
    if report.winner_team_id != team1 && report.winner_team_id != team2 {
        return Err(EngineError::Field(
            FieldError::new("winner_team_id", "not_in_match")
                .with_message("winner_team_id is not a team of this match"),
        ));
    }
    // a disqualified entry can no longer win matches
    if let Some(entry) = tx
        .get_entry(ctx.tenant_id, m.tournament_id, report.winner_team_id)
        .await?
        && entry.status == EntryStatus::Disqualified
    {
        return Err(EngineError::Conflict(
            "the declared winner is disqualified".to_string(),
        ));
    }

    let Some(tournament) = tx.get_tournament(ctx.tenant_id, m.tournament_id).await? else {
        return Err(EngineError::NotFound("tournament".to_string()));
    };
    let outcome = validate_score(
        &report.sets,
        report.winner_team_id,
        team1,
        team2,
        tournament.rules(),
    )
    .map_err(|fault| EngineError::Field(fault.into()))?;

    m.duration_minutes = report.duration_minutes;
    m.notes = report.notes.clone();

    let needs_confirmation = !ctx.is_admin();
    let notification;
    let message;
    if needs_confirmation {
        let reporter_team_id =
            reporter_team.expect("non admin callers are members of one of the teams");
        let opponent_team = if reporter_team_id == team1 { team2 } else { team1 };
        m.status = MatchStatus::InProgress;
        m.pending_result = Some(PendingResult {
            reported_by: ctx.profile_id,
            reporter_team_id,
            reported_at: ctx.now(),
            winner_id: outcome.winner_id,
            loser_id: outcome.loser_id,
            sets: report.sets.clone(),
            status: PendingResultStatus::PendingConfirmation,
            dispute_reason: None,
            confirmed_by: None,
        });
        message = "Resultado registrado, pendiente de confirmación del equipo rival".to_string();
        notification = Notification {
            tenant_id: ctx.tenant_id,
            kind: NotificationKind::ResultPendingConfirmation,
            recipients: tx.list_team_members(ctx.tenant_id, opponent_team).await?,
            title: "Resultado pendiente de confirmación".to_string(),
            body: format!(
                "El partido {} tiene un resultado reportado que espera vuestra confirmación",
                m.bracket_position
            ),
            data: serde_json::json!({
                "match_id": m.id,
                "winner_team_id": outcome.winner_id,
                "sets": report.sets,
            }),
        };
    } else {
        m.finish(outcome.winner_id, ctx.now());
        m.stamp_confirmed_by(ctx.profile_id);
        message = "Resultado registrado y confirmado".to_string();
        let mut recipients = tx.list_team_members(ctx.tenant_id, team1).await?;
        recipients.extend(tx.list_team_members(ctx.tenant_id, team2).await?);
        notification = Notification {
            tenant_id: ctx.tenant_id,
            kind: NotificationKind::ResultReported,
            recipients: dedup_recipients(recipients),
            title: "Resultado registrado".to_string(),
            body: format!(
                "La organización registró el resultado del partido {}",
                m.bracket_position
            ),
            data: serde_json::json!({
                "match_id": m.id,
                "winner_team_id": outcome.winner_id,
                "sets": report.sets,
            }),
        };
    }

    tx.replace_set_results(ctx.tenant_id, m.id, &report.sets)
        .await?;
    tx.update_match(&m).await?;
    if m.status == MatchStatus::Finished {
        advance_winner(tx, &m, ctx.now()).await?;
    }

    let response = ReportResponse {
        match_id: m.id,
        status: m.status,
        needs_confirmation,
        winner_team_id: report.winner_team_id,
        sets: report.sets.clone(),
        message,
    };
    if let Some(key) = idempotency_key {
        let stored = serde_json::to_value(&response).map_err(|error| {
            EngineError::Db(DbError::Other(format!(
                "response could not be serialized: {error}"
            )))
        })?;
        tx.put_idempotency(&IdempotencyRecord {
            tenant_id: ctx.tenant_id,
            key: key.to_string(),
            response: stored,
            expires_at: ctx.now() + ttl,
        })
        .await?;
    }

    Ok(ReportRun::Fresh(Box::new(ReportOutcome {
        audit_data: serde_json::json!({
            "winner_team_id": response.winner_team_id,
            "needs_confirmation": needs_confirmation,
            "sets": response.sets,
        }),
        notification,
        response,
    })))
}

async fn accept_result_tx(
    ctx: &RequestContext,
    tx: &mut dyn StoreTx,
    match_id: Uuid,
    accept: bool,
    dispute_reason: Option<&str>,
) -> EngineResult<AcceptRun> {
    let Some(mut m) = tx.lock_match(ctx.tenant_id, match_id).await? else {
        return Err(EngineError::NotFound("match".to_string()));
    };
    let Some(mut pending) = m.pending_result.clone() else {
        return Err(EngineError::Conflict(
            "match has no result awaiting confirmation".to_string(),
        ));
    };
    if pending.status != PendingResultStatus::PendingConfirmation {
        return Err(EngineError::Conflict(format!(
            "pending result is {}",
            pending.status
        )));
    }

    // the reporter and their team cannot confirm their own report
    if ctx.profile_id == pending.reported_by
        || tx
            .is_team_member(ctx.tenant_id, pending.reporter_team_id, ctx.profile_id)
            .await?
    {
        return Err(EngineError::Forbidden(
            "the reporting team cannot confirm its own result".to_string(),
        ));
    }
    let opponent_team = m
        .opponent_of(pending.reporter_team_id)
        .ok_or_else(|| EngineError::Conflict("match teams are not resolved".to_string()))?;
    if !ctx.is_admin()
        && !tx
            .is_team_member(ctx.tenant_id, opponent_team, ctx.profile_id)
            .await?
    {
        return Err(EngineError::Forbidden(
            "only the opposing team may confirm or dispute".to_string(),
        ));
    }

    if accept {
        let winner = pending.winner_id;
        // the winner may have been disqualified while the result was pending
        if let Some(entry) = tx.get_entry(ctx.tenant_id, m.tournament_id, winner).await?
            && entry.status == EntryStatus::Disqualified
        {
            return Err(EngineError::Conflict(
                "the reported winner has been disqualified".to_string(),
            ));
        }
        m.finish(winner, ctx.now());
        m.stamp_confirmed_by(ctx.profile_id);
        tx.update_match(&m).await?;
        advance_winner(tx, &m, ctx.now()).await?;

        let recipients = tx
            .list_team_members(ctx.tenant_id, pending.reporter_team_id)
            .await?;
        Ok(AcceptRun {
            response: AcceptResponse {
                match_id,
                status: AcceptOutcome::Finished,
                incident_id: None,
                winner_team_id: Some(winner),
                message: "Resultado confirmado".to_string(),
            },
            notification: Notification {
                tenant_id: ctx.tenant_id,
                kind: NotificationKind::ResultConfirmed,
                recipients,
                title: "Resultado confirmado".to_string(),
                body: format!(
                    "El equipo rival confirmó el resultado del partido {}",
                    m.bracket_position
                ),
                data: serde_json::json!({ "match_id": match_id, "winner_team_id": winner }),
            },
            audit_data: serde_json::json!({ "winner_team_id": winner }),
        })
    } else {
        let reason = dispute_reason.unwrap_or_default();
        let mut errs = ValidationErrors::new();
        check_text_length(&mut errs, "dispute_reason", reason, 10, 500);
        errs.into_result()?;

        pending.status = PendingResultStatus::Disputed;
        pending.dispute_reason = Some(reason.to_string());
        let reported_sets = serde_json::to_value(&pending.sets).unwrap_or_default();
        let reporter = pending.reported_by;
        m.pending_result = Some(pending);
        tx.update_match(&m).await?;

        let incident = Incident::dispute(
            ctx.tenant_id,
            m.tournament_id,
            match_id,
            &m.bracket_position,
            reason,
            reported_sets,
            ctx.profile_id,
            ctx.now(),
        );
        tx.insert_incident(&incident).await?;

        let mut recipients = tx.list_tenant_admins(ctx.tenant_id).await?;
        recipients.push(reporter);
        Ok(AcceptRun {
            response: AcceptResponse {
                match_id,
                status: AcceptOutcome::Disputed,
                incident_id: Some(incident.id),
                winner_team_id: None,
                message: "Disputa registrada, la organización revisará el resultado".to_string(),
            },
            notification: Notification {
                tenant_id: ctx.tenant_id,
                kind: NotificationKind::ResultDisputed,
                recipients: dedup_recipients(recipients),
                title: "Resultado en disputa".to_string(),
                body: format!(
                    "El resultado reportado del partido {} fue disputado",
                    m.bracket_position
                ),
                data: serde_json::json!({
                    "match_id": match_id,
                    "incident_id": incident.id,
                    "dispute_reason": reason,
                }),
            },
            audit_data: serde_json::json!({
                "incident_id": incident.id,
                "dispute_reason": reason,
            }),
        })
    }
}

/// first occurrence wins, order preserved
pub(crate) fn dedup_recipients(recipients: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        if !seen.contains(&recipient) {
            seen.push(recipient);
        }
    }
    seen
}
