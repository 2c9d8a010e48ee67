// fixture generation

use crate::{
    AuditEvent, Engine, EngineError, EngineResult, Match, RequestContext, StoreTx, Tournament,
    TournamentStatus,
    draw::{bracket_rounds, group_letter, round_robin, snake_distribute},
    match_::{group_position, playoff_position},
    schedule::{FixtureConfig, Scheduler},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub letter: char,
    /// seed ordered team ids of the group
    pub team_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStageSummary {
    pub groups: Vec<GroupSummary>,
    pub matches_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayoffStageSummary {
    pub rounds: u32,
    pub matches_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub start_date: NaiveDate,
    /// last day carrying a scheduled match; playoff days follow once the
    /// group stage closes
    pub end_date: NaiveDate,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSummary {
    pub tournament_id: Uuid,
    pub total_matches: usize,
    pub group_stage: GroupStageSummary,
    pub playoff_stage: PlayoffStageSummary,
    pub schedule: ScheduleSummary,
}

impl Engine {
    /// Build the complete fixture of a tournament: snake seeded groups, round
    /// robin pairings per group, playoff bracket shells wired through
    /// `next_match_id`, and the temporal schedule of the group stage.
    /// Replaces any previous fixture of the tournament and moves it to
    /// `in_progress`.
    #[instrument(
        name = "engine.fixture.generate",
        skip(self, ctx, config),
        fields(request_id = %ctx.request_id, tenant_id = %ctx.tenant_id, tournament_id = %tournament_id)
    )]
    pub async fn generate_fixture(
        &self,
        ctx: &RequestContext,
        tournament_id: Uuid,
        config: Option<FixtureConfig>,
    ) -> EngineResult<FixtureSummary> {
        if !ctx.is_admin() {
            return Err(EngineError::Forbidden(
                "fixture generation requires an admin or owner role".to_string(),
            ));
        }
        let config = config.unwrap_or_default();
        config.validate()?;

        let mut tx = self.store.begin().await?;
        match build_fixture(ctx, tx.as_mut(), tournament_id, &config).await {
            Ok((summary, deleted)) => {
                tx.commit().await?;
                info!(
                    total_matches = summary.total_matches,
                    deleted, "fixture_generated"
                );
                self.record_audit(AuditEvent {
                    tenant_id: ctx.tenant_id,
                    request_id: ctx.request_id,
                    actor: ctx.profile_id,
                    action: "fixture.generated".to_string(),
                    entity: "tournament".to_string(),
                    entity_id: tournament_id,
                    data: serde_json::json!({
                        "total_matches": summary.total_matches,
                        "deleted_matches": deleted,
                        "groups": summary.group_stage.groups.len(),
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

async fn build_fixture(
    ctx: &RequestContext,
    tx: &mut dyn StoreTx,
    tournament_id: Uuid,
    config: &FixtureConfig,
) -> EngineResult<(FixtureSummary, usize)> {
    let Some(mut tournament) = tx.lock_tournament(ctx.tenant_id, tournament_id).await? else {
        return Err(EngineError::NotFound("tournament".to_string()));
    };
    if !tournament.status.allows_fixture_generation() {
        return Err(EngineError::Conflict(format!(
            "fixture cannot be generated while the tournament is {}",
            tournament.status
        )));
    }

    let entries = tx
        .lock_confirmed_entries(ctx.tenant_id, tournament_id)
        .await?;
    let team_count = entries.len();
    if (team_count as u32) < tournament.min_teams {
        return Err(EngineError::Conflict(format!(
            "{} confirmed teams, tournament requires at least {}",
            team_count, tournament.min_teams
        )));
    }
    if (team_count as u32) > tournament.max_teams {
        return Err(EngineError::Conflict(format!(
            "{} confirmed teams, tournament allows at most {}",
            team_count, tournament.max_teams
        )));
    }

    let group_count = config.effective_group_count(team_count);
    if group_count > 26 {
        return Err(EngineError::Conflict(
            "more than 26 groups are not supported".to_string(),
        ));
    }
    if team_count < group_count * 2 {
        return Err(EngineError::Conflict(
            "group count leaves groups with fewer than 2 teams".to_string(),
        ));
    }

    let deleted = tx.delete_matches(ctx.tenant_id, tournament_id).await?;

    // entries arrive seed ordered from the store; the snake keeps that order
    let team_ids: Vec<Uuid> = entries.iter().map(|entry| entry.team_id).collect();
    let groups = snake_distribute(&team_ids, group_count);

    let group_matches = build_group_stage(ctx, &tournament, &groups);
    let group_rounds = group_matches
        .iter()
        .map(|m| m.round_number)
        .max()
        .unwrap_or(0);
    let advancing = group_count * config.teams_advance_per_group as usize;
    let playoff_matches = build_playoff_shells(ctx, &tournament, advancing, group_rounds);

    let mut all_matches = group_matches;
    let group_matches_count = all_matches.len();
    let playoff_matches_count = playoff_matches.len();
    let playoff_round_count = playoff_matches
        .iter()
        .map(|m| m.round_number - group_rounds)
        .max()
        .unwrap_or(0);

    // temporal schedule: group stage now, playoffs once their teams resolve
    let mut scheduler = Scheduler::new(config, tournament.start_date);
    scheduler.schedule(&mut all_matches);
    scheduler.break_between_phases();
    all_matches.extend(playoff_matches);

    tx.insert_matches(&all_matches).await?;

    tournament.status = TournamentStatus::InProgress;
    tournament.fixture_generated_at = Some(ctx.now());
    tournament.fixture_generated_by = Some(ctx.profile_id);
    tournament.remember_fixture_config(config);
    tx.update_tournament(&tournament).await?;

    let scheduled_days: BTreeSet<NaiveDate> = all_matches
        .iter()
        .filter_map(|m| m.scheduled_at)
        .map(|at| at.date_naive())
        .collect();
    let summary = FixtureSummary {
        tournament_id,
        total_matches: all_matches.len(),
        group_stage: GroupStageSummary {
            groups: groups
                .iter()
                .enumerate()
                .map(|(index, team_ids)| GroupSummary {
                    letter: group_letter(index),
                    team_ids: team_ids.clone(),
                })
                .collect(),
            matches_count: group_matches_count,
        },
        playoff_stage: PlayoffStageSummary {
            rounds: playoff_round_count,
            matches_count: playoff_matches_count,
        },
        schedule: ScheduleSummary {
            start_date: tournament.start_date,
            end_date: scheduled_days
                .iter()
                .next_back()
                .copied()
                .unwrap_or(tournament.start_date),
            days: scheduled_days.len() as u32,
        },
    };
    Ok((summary, deleted))
}

/// Round robin matches of every group, interleaved round by round so no group
/// monopolizes the early slots.
fn build_group_stage(
    ctx: &RequestContext,
    tournament: &Tournament,
    groups: &[Vec<Uuid>],
) -> Vec<Match> {
    let pairings_by_group: Vec<_> = groups.iter().map(|group| round_robin(group.len())).collect();
    let max_rounds = pairings_by_group
        .iter()
        .flat_map(|pairings| pairings.iter().map(|p| p.round))
        .max()
        .unwrap_or(0);

    let mut matches = Vec::new();
    for round in 1..=max_rounds {
        let mut match_number = 1;
        for (group_index, group) in groups.iter().enumerate() {
            let letter = group_letter(group_index);
            for pairing in pairings_by_group[group_index]
                .iter()
                .filter(|p| p.round == round)
            {
                matches.push(Match::group_stage(
                    ctx.tenant_id,
                    tournament.id,
                    round,
                    format!("Grupo {letter}"),
                    match_number,
                    group_position(
                        letter,
                        round,
                        pairing.home as u32 + 1,
                        pairing.away as u32 + 1,
                    ),
                    group[pairing.home],
                    group[pairing.away],
                ));
                match_number += 1;
            }
        }
    }
    matches
}

/// Empty playoff matches for `advancing` teams, wired by the pairing rule:
/// match m of round r feeds match ceil(m/2) of round r+1.
fn build_playoff_shells(
    ctx: &RequestContext,
    tournament: &Tournament,
    advancing: usize,
    round_offset: u32,
) -> Vec<Match> {
    let rounds = bracket_rounds(advancing);
    let mut matches: Vec<Match> = Vec::new();
    let mut ids_by_round: Vec<Vec<Uuid>> = Vec::new();
    for round in &rounds {
        let mut ids = Vec::with_capacity(round.match_count);
        for number in 1..=round.match_count as u32 {
            let m = Match::playoff(
                ctx.tenant_id,
                tournament.id,
                round_offset + round.number,
                round.name.clone(),
                number,
                playoff_position(round.number, number),
            );
            ids.push(m.id);
            matches.push(m);
        }
        ids_by_round.push(ids);
    }

    let mut cursor = 0;
    for feeder_round in 0..ids_by_round.len().saturating_sub(1) {
        for feeder_index in 0..ids_by_round[feeder_round].len() {
            matches[cursor].next_match_id = Some(ids_by_round[feeder_round + 1][feeder_index / 2]);
            cursor += 1;
        }
    }
    matches
}
