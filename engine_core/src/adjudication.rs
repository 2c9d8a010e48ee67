// incident adjudication

use crate::{
    AuditEvent, Engine, EngineError, EngineResult, Incident, Match, MatchStatus, Notification,
    NotificationKind, RequestContext, ResolutionAction, StoreTx, TeamWarning,
    advance::advance_winner,
    entry::EntryStatus,
    results::dedup_recipients,
    utils::validation::{FieldError, ValidationErrors, check_text_length},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// resolution state reported back to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    AlreadyResolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub incident_id: Uuid,
    pub status: ResolutionStatus,
    pub action: String,
    pub action_result: String,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: Uuid,
    pub notifications_sent: u32,
}

struct ResolutionRun {
    summary: ResolutionSummary,
    notification: Option<Notification>,
}

impl Engine {
    /// Resolve an incident with one of the five admin actions. Resolving an
    /// already resolved incident is a no-op returning `already_resolved`,
    /// whatever notes or action the retry carries.
    #[instrument(
        name = "engine.incident.resolve",
        skip(self, ctx, resolution_notes, action),
        fields(request_id = %ctx.request_id, tenant_id = %ctx.tenant_id, incident_id = %incident_id, action = action.slug())
    )]
    pub async fn resolve_incident(
        &self,
        ctx: &RequestContext,
        incident_id: Uuid,
        resolution_notes: &str,
        action: ResolutionAction,
    ) -> EngineResult<ResolutionSummary> {
        if !ctx.is_admin() {
            return Err(EngineError::Forbidden(
                "incident resolution requires an admin or owner role".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        match resolve_incident_tx(ctx, tx.as_mut(), incident_id, resolution_notes, action).await {
            Ok(run) => {
                tx.commit().await?;
                info!(status = ?run.summary.status, "incident_resolution_done");
                if let Some(notification) = run.notification {
                    self.publish_notification(notification).await;
                }
                if run.summary.status == ResolutionStatus::Resolved {
                    self.record_audit(AuditEvent {
                        tenant_id: ctx.tenant_id,
                        request_id: ctx.request_id,
                        actor: ctx.profile_id,
                        action: "incident.resolved".to_string(),
                        entity: "incident".to_string(),
                        entity_id: incident_id,
                        data: serde_json::json!({
                            "action": run.summary.action,
                            "action_result": run.summary.action_result,
                        }),
                        occurred_at: ctx.now(),
                    })
                    .await;
                }
                Ok(run.summary)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "rollback_failed");
                }
                Err(error)
            }
        }
    }
}

async fn resolve_incident_tx(
    ctx: &RequestContext,
    tx: &mut dyn StoreTx,
    incident_id: Uuid,
    resolution_notes: &str,
    action: ResolutionAction,
) -> EngineResult<ResolutionRun> {
    let Some(mut incident) = tx.lock_incident(ctx.tenant_id, incident_id).await? else {
        return Err(EngineError::NotFound("incident".to_string()));
    };
    if incident.is_resolved() {
        // resolved incidents are immutable; replay the stored markers
        return Ok(ResolutionRun {
            summary: ResolutionSummary {
                incident_id,
                status: ResolutionStatus::AlreadyResolved,
                action: action.slug().to_string(),
                action_result: "no action taken".to_string(),
                resolved_at: incident.resolved_at.expect("resolved incident has a timestamp"),
                resolved_by: incident.resolved_by.expect("resolved incident has a resolver"),
                notifications_sent: 0,
            },
            notification: None,
        });
    }

    // validated only once the idempotent replay is ruled out
    let mut errs = ValidationErrors::new();
    check_text_length(&mut errs, "resolution_notes", resolution_notes, 10, 1000);
    errs.into_result()?;

    let mut linked_match: Option<Match> = None;
    let action_result = match action {
        ResolutionAction::Dismiss => "incident dismissed without further effect".to_string(),
        ResolutionAction::Warn => {
            let team_id = incident.affected_team_id.ok_or_else(|| {
                EngineError::Field(
                    FieldError::required("affected_team_id")
                        .with_message("warn requires an affected team"),
                )
            })?;
            tx.append_team_warning(
                ctx.tenant_id,
                team_id,
                &TeamWarning {
                    incident_id,
                    reason: resolution_notes.to_string(),
                    issued_at: ctx.now(),
                    issued_by: ctx.profile_id,
                },
            )
            .await?;
            format!("warning issued to team {team_id}")
        }
        ResolutionAction::Disqualify => {
            disqualify(ctx, tx, &incident, &mut linked_match).await?
        }
        ResolutionAction::Reschedule { reschedule_to } => {
            reschedule(ctx, tx, &incident, reschedule_to, resolution_notes, &mut linked_match)
                .await?
        }
        ResolutionAction::OverrideResult { override_winner_id } => {
            override_result(ctx, tx, &incident, override_winner_id, &mut linked_match).await?
        }
    };

    incident.resolve(
        ctx.profile_id,
        ctx.now(),
        format!("[{}] {}", action.tag(), resolution_notes),
    );
    tx.update_incident(&incident).await?;

    let recipients = gather_recipients(ctx, tx, &incident, linked_match.as_ref()).await?;
    let notifications_sent = recipients.len() as u32;
    Ok(ResolutionRun {
        summary: ResolutionSummary {
            incident_id,
            status: ResolutionStatus::Resolved,
            action: action.slug().to_string(),
            action_result: action_result.clone(),
            resolved_at: ctx.now(),
            resolved_by: ctx.profile_id,
            notifications_sent,
        },
        notification: Some(Notification {
            tenant_id: ctx.tenant_id,
            kind: NotificationKind::IncidentResolved,
            recipients,
            title: format!("Incidencia resuelta: {}", incident.title),
            body: action_result,
            data: serde_json::json!({
                "incident_id": incident_id,
                "action": action.slug(),
            }),
        }),
    })
}

/// Disqualify the affected team's entry; a linked unfinished match becomes a
/// walkover for the opponent and the bracket advances.
async fn disqualify(
    ctx: &RequestContext,
    tx: &mut dyn StoreTx,
    incident: &Incident,
    linked_match: &mut Option<Match>,
) -> EngineResult<String> {
    let tournament_id = incident.tournament_id.ok_or_else(|| {
        EngineError::Field(
            FieldError::required("tournament_id")
                .with_message("disqualify requires the tournament"),
        )
    })?;
    let team_id = incident.affected_team_id.ok_or_else(|| {
        EngineError::Field(
            FieldError::required("affected_team_id")
                .with_message("disqualify requires an affected team"),
        )
    })?;
    let Some(mut entry) = tx.get_entry(ctx.tenant_id, tournament_id, team_id).await? else {
        return Err(EngineError::NotFound("entry".to_string()));
    };
    entry.status = EntryStatus::Disqualified;
    tx.update_entry(&entry).await?;

    let mut effect = format!("team {team_id} disqualified");
    if let Some(match_id) = incident.match_id
        && let Some(mut m) = tx.lock_match(ctx.tenant_id, match_id).await?
        && !m.status.is_terminal()
    {
        match m.opponent_of(team_id) {
            Some(opponent) => {
                m.walkover(opponent, Some(team_id), ctx.now());
                tx.update_match(&m).await?;
                advance_winner(tx, &m, ctx.now()).await?;
                effect.push_str(&format!(", match {} decided as walkover", m.bracket_position));
            }
            None => {
                // the disqualified team is not part of the linked match
                warn!(%match_id, "disqualified_team_not_in_match");
            }
        }
        *linked_match = Some(m);
    }
    Ok(effect)
}

/// Postpone the linked match; records the prior slot in the match settings.
async fn reschedule(
    ctx: &RequestContext,
    tx: &mut dyn StoreTx,
    incident: &Incident,
    reschedule_to: Option<DateTime<Utc>>,
    reason: &str,
    linked_match: &mut Option<Match>,
) -> EngineResult<String> {
    let match_id = incident.match_id.ok_or_else(|| {
        EngineError::Field(
            FieldError::required("match_id").with_message("reschedule requires a linked match"),
        )
    })?;
    let Some(mut m) = tx.lock_match(ctx.tenant_id, match_id).await? else {
        return Err(EngineError::NotFound("match".to_string()));
    };
    if m.status.is_terminal() {
        return Err(EngineError::Conflict(format!(
            "match is already {}",
            m.status
        )));
    }
    m.record_reschedule(reschedule_to, reason, ctx.profile_id, ctx.now());
    m.status = MatchStatus::Postponed;
    m.scheduled_at = reschedule_to;
    tx.update_match(&m).await?;

    let effect = match reschedule_to {
        Some(to) => format!("match {} postponed to {}", m.bracket_position, to.to_rfc3339()),
        None => format!("match {} postponed without a new time", m.bracket_position),
    };
    *linked_match = Some(m);
    Ok(effect)
}

/// Decide the linked match by admin fiat, archiving whatever it replaced.
/// Terminal: a match can only be overridden once.
async fn override_result(
    ctx: &RequestContext,
    tx: &mut dyn StoreTx,
    incident: &Incident,
    winner_id: Uuid,
    linked_match: &mut Option<Match>,
) -> EngineResult<String> {
    let match_id = incident.match_id.ok_or_else(|| {
        EngineError::Field(
            FieldError::required("match_id").with_message("override requires a linked match"),
        )
    })?;
    let Some(mut m) = tx.lock_match(ctx.tenant_id, match_id).await? else {
        return Err(EngineError::NotFound("match".to_string()));
    };
    if !m.involves(winner_id) {
        return Err(EngineError::Field(
            FieldError::new("override_winner_id", "not_in_match")
                .with_message("override winner is not a team of this match"),
        ));
    }
    if m.has_admin_override() {
        return Err(EngineError::Conflict(
            "match result was already overridden".to_string(),
        ));
    }

    let previous = m.pending_result.clone();
    m.archive_override(previous.as_ref(), ctx.profile_id, ctx.now());
    m.finish(winner_id, ctx.now());
    tx.update_match(&m).await?;
    advance_winner(tx, &m, ctx.now()).await?;

    let effect = format!(
        "match {} decided for team {winner_id} by admin override",
        m.bracket_position
    );
    *linked_match = Some(m);
    Ok(effect)
}

/// Deduplicated union of the incident reporter, the affected team's members,
/// and all members of both teams of the linked match.
async fn gather_recipients(
    ctx: &RequestContext,
    tx: &mut dyn StoreTx,
    incident: &Incident,
    linked_match: Option<&Match>,
) -> EngineResult<Vec<Uuid>> {
    let mut recipients = vec![incident.reported_by];
    if let Some(team_id) = incident.affected_team_id {
        recipients.extend(tx.list_team_members(ctx.tenant_id, team_id).await?);
    }
    let m = match linked_match {
        Some(m) => Some(m.clone()),
        None => match incident.match_id {
            Some(match_id) => tx.get_match(ctx.tenant_id, match_id).await?,
            None => None,
        },
    };
    if let Some(m) = m {
        for team in [m.team1_id, m.team2_id].into_iter().flatten() {
            recipients.extend(tx.list_team_members(ctx.tenant_id, team).await?);
        }
    }
    Ok(dedup_recipients(recipients))
}
