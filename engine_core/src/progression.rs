// group stage closing and bracket seeding

use crate::{
    AuditEvent, Engine, EngineError, EngineResult, Match, RequestContext, StoreTx,
    TournamentStatus,
    advance::advance_winner,
    draw::{bracket_size, seeding_order},
    schedule::Scheduler,
    standings::group_order,
};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStageCloseSummary {
    pub tournament_id: Uuid,
    /// advancing teams in bracket seed order (group winners first)
    pub advancing: Vec<Uuid>,
    /// first round playoff matches that received both teams and a start time
    pub matches_seeded: usize,
    /// first round shells decided as walkovers because of byes
    pub byes: usize,
}

impl Engine {
    /// Close a finished group stage: compute standings per group, promote the
    /// advancing teams into the playoff bracket, and schedule the resolved
    /// first round. Fails with `conflict` while any group match is still open
    /// or when the bracket is already seeded.
    #[instrument(
        name = "engine.fixture.close_groups",
        skip(self, ctx),
        fields(request_id = %ctx.request_id, tenant_id = %ctx.tenant_id, tournament_id = %tournament_id)
    )]
    pub async fn close_group_stage(
        &self,
        ctx: &RequestContext,
        tournament_id: Uuid,
    ) -> EngineResult<GroupStageCloseSummary> {
        if !ctx.is_admin() {
            return Err(EngineError::Forbidden(
                "closing the group stage requires an admin or owner role".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        match close_group_stage_tx(ctx, tx.as_mut(), tournament_id).await {
            Ok(summary) => {
                tx.commit().await?;
                info!(
                    advancing = summary.advancing.len(),
                    byes = summary.byes,
                    "group_stage_closed"
                );
                self.record_audit(AuditEvent {
                    tenant_id: ctx.tenant_id,
                    request_id: ctx.request_id,
                    actor: ctx.profile_id,
                    action: "fixture.group_stage_closed".to_string(),
                    entity: "tournament".to_string(),
                    entity_id: tournament_id,
                    data: serde_json::json!({
                        "advancing": summary.advancing,
                        "matches_seeded": summary.matches_seeded,
                        "byes": summary.byes,
                    }),
                    occurred_at: ctx.now(),
                })
                .await;
                Ok(summary)
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

async fn close_group_stage_tx(
    ctx: &RequestContext,
    tx: &mut dyn StoreTx,
    tournament_id: Uuid,
) -> EngineResult<GroupStageCloseSummary> {
    let Some(mut tournament) = tx.lock_tournament(ctx.tenant_id, tournament_id).await? else {
        return Err(EngineError::NotFound("tournament".to_string()));
    };
    if tournament.status != TournamentStatus::InProgress {
        return Err(EngineError::Conflict(format!(
            "group stage cannot be closed while the tournament is {}",
            tournament.status
        )));
    }
    if tournament.group_stage_closed() {
        return Err(EngineError::Conflict(
            "the playoff bracket is already seeded".to_string(),
        ));
    }
    let config = tournament.stored_fixture_config().unwrap_or_default();

    let matches = tx.list_matches(ctx.tenant_id, tournament_id).await?;
    let group_matches: Vec<&Match> = matches.iter().filter(|m| m.is_group_stage()).collect();
    if group_matches.is_empty() {
        return Err(EngineError::Conflict(
            "the tournament has no group stage fixture".to_string(),
        ));
    }
    if let Some(open) = group_matches.iter().find(|m| !m.status.is_terminal()) {
        return Err(EngineError::Conflict(format!(
            "group match {} is not finished",
            open.bracket_position
        )));
    }

    // groups reconstructed from the bracket positions; letters sort A, B, ...
    let mut teams_by_group: BTreeMap<char, Vec<Uuid>> = BTreeMap::new();
    for m in &group_matches {
        let Some(letter) = m.bracket_position.chars().nth(1) else {
            continue;
        };
        let teams = teams_by_group.entry(letter).or_default();
        for team in [m.team1_id, m.team2_id].into_iter().flatten() {
            if !teams.contains(&team) {
                teams.push(team);
            }
        }
    }

    let sets_by_match = tx.list_set_results(ctx.tenant_id, tournament_id).await?;
    let advance_per_group = config.teams_advance_per_group as usize;
    // rank major seed list: all group winners first, then all runners up, ...
    let mut ranked_by_group: Vec<Vec<Uuid>> = Vec::new();
    for (letter, teams) in &teams_by_group {
        let in_group: Vec<&Match> = group_matches
            .iter()
            .filter(|m| m.bracket_position.chars().nth(1) == Some(*letter))
            .copied()
            .collect();
        let order = group_order(teams, &in_group, &sets_by_match);
        if order.len() < advance_per_group {
            return Err(EngineError::Conflict(format!(
                "group {letter} is smaller than the advance count"
            )));
        }
        ranked_by_group.push(order.into_iter().map(|(team, _)| team).collect());
    }
    let mut advancing: Vec<Uuid> = Vec::new();
    for rank in 0..advance_per_group {
        for ranked in &ranked_by_group {
            advancing.push(ranked[rank]);
        }
    }

    // seed the first playoff round by the folded bracket order
    let size = bracket_size(advancing.len());
    let slots = seeding_order(size);
    let mut first_round: Vec<Match> = matches
        .iter()
        .filter(|m| m.is_playoff() && m.bracket_position.starts_with("PO-R1-"))
        .cloned()
        .collect();
    first_round.sort_by_key(|m| m.match_number);
    if first_round.len() != size / 2 {
        return Err(EngineError::Conflict(
            "playoff shells do not match the advancing team count".to_string(),
        ));
    }

    let team_for_seed = |seed: usize| -> Option<Uuid> { advancing.get(seed - 1).copied() };
    let playoff_start = playoff_start_date(ctx, &group_matches);
    let mut scheduler = Scheduler::new(&config, playoff_start);
    let mut matches_seeded = 0;
    let mut byes = 0;
    for (index, shell) in first_round.iter_mut().enumerate() {
        let team_a = team_for_seed(slots[2 * index]);
        let team_b = team_for_seed(slots[2 * index + 1]);
        shell.team1_id = team_a;
        shell.team2_id = team_b;
        match (team_a, team_b) {
            (Some(_), Some(_)) => {
                shell.scheduled_at = Some(scheduler.place(team_a, team_b));
                matches_seeded += 1;
                tx.update_match(shell).await?;
            }
            (Some(team), None) | (None, Some(team)) => {
                // a bye: the present team skips round 1
                shell.walkover(team, None, ctx.now());
                byes += 1;
                tx.update_match(shell).await?;
                advance_winner(tx, shell, ctx.now()).await?;
            }
            (None, None) => {
                return Err(EngineError::Conflict(
                    "playoff shell without any advancing team".to_string(),
                ));
            }
        }
    }

    tournament.stamp_group_stage_closed(ctx.now());
    tx.update_tournament(&tournament).await?;

    Ok(GroupStageCloseSummary {
        tournament_id,
        advancing,
        matches_seeded,
        byes,
    })
}

/// Playoffs start after one idle day following the last group match, and
/// never before the day after the stage is closed.
fn playoff_start_date(ctx: &RequestContext, group_matches: &[&Match]) -> NaiveDate {
    let last_group_day = group_matches
        .iter()
        .filter_map(|m| m.scheduled_at)
        .map(|at| at.date_naive())
        .max()
        .unwrap_or_else(|| ctx.now().date_naive());
    let planned = last_group_day
        .checked_add_days(Days::new(2))
        .unwrap_or(last_group_day);
    let earliest = ctx
        .now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or_else(|| ctx.now().date_naive());
    planned.max(earliest)
}
