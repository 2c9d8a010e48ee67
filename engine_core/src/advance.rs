// bracket advancement

use crate::{EngineResult, Match, StoreTx, schedule::next_slot_after};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

/// Promote the winner of a finished or walkover match into its downstream
/// match and, once both downstream slots are known, give the downstream match
/// a start time.
///
/// The downstream slots fill `team1` before `team2` in the order of the
/// feeders' bracket position strings: the feeder whose position sorts first
/// sends its winner to `team1`. Runs inside the caller's transaction.
pub(crate) async fn advance_winner(
    tx: &mut dyn StoreTx,
    finished: &Match,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let Some(next_id) = finished.next_match_id else {
        return Ok(());
    };
    let Some(winner) = finished.winner_id else {
        return Ok(());
    };
    let Some(mut next) = tx.get_match(finished.tenant_id, next_id).await? else {
        debug!(%next_id, "next_match_missing");
        return Ok(());
    };

    if next.involves(winner) {
        // already promoted, nothing to do
        return Ok(());
    }
    let prefer_team1 = feeder_takes_team1(tx, finished, next_id).await?;
    if prefer_team1 && next.team1_id.is_none() {
        next.team1_id = Some(winner);
    } else if next.team2_id.is_none() {
        next.team2_id = Some(winner);
    } else if next.team1_id.is_none() {
        next.team1_id = Some(winner);
    } else {
        debug!(%next_id, "next_match_slots_occupied");
        return Ok(());
    }

    if next.teams_resolved() {
        reschedule_downstream(tx, finished, &mut next, now).await?;
    }
    tx.update_match(&next).await?;
    Ok(())
}

/// Whether the finishing feeder is the one whose bracket position string
/// sorts first among all feeders of the downstream match.
async fn feeder_takes_team1(
    tx: &mut dyn StoreTx,
    finished: &Match,
    next_id: Uuid,
) -> EngineResult<bool> {
    let matches = tx
        .list_matches(finished.tenant_id, finished.tournament_id)
        .await?;
    let first = matches
        .iter()
        .filter(|m| m.next_match_id == Some(next_id))
        .map(|m| m.bracket_position.as_str())
        .min();
    Ok(first.is_none_or(|first| first == finished.bracket_position))
}

/// (Re)schedule the downstream match on the fixture's slot grid, using `now`
/// as the earliest candidate cursor. An existing start time that already
/// honours the rest constraint is left unchanged.
async fn reschedule_downstream(
    tx: &mut dyn StoreTx,
    finished: &Match,
    next: &mut Match,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let Some(tournament) = tx
        .get_tournament(finished.tenant_id, finished.tournament_id)
        .await?
    else {
        return Ok(());
    };
    let config = tournament.stored_fixture_config().unwrap_or_default();

    // the teams' most recent terminal matches bound the earliest start
    let matches = tx
        .list_matches(finished.tenant_id, finished.tournament_id)
        .await?;
    let mut last_ends: Vec<DateTime<Utc>> = Vec::new();
    for team in [next.team1_id, next.team2_id].into_iter().flatten() {
        let last = matches
            .iter()
            .filter(|m| m.id != next.id && m.involves(team) && m.status.is_terminal())
            .filter_map(|m| m.finished_at)
            .max();
        if let Some(end) = last {
            last_ends.push(end);
        }
    }

    let rest = config.rest();
    let keeps_current = next
        .scheduled_at
        .is_some_and(|at| at >= now && last_ends.iter().all(|end| at - *end >= rest));
    if !keeps_current {
        let at = next_slot_after(&config, tournament.start_date, now, &last_ends);
        debug!(match_id = %next.id, scheduled_at = %at, "downstream_rescheduled");
        next.scheduled_at = Some(at);
    }
    Ok(())
}
