// group standings over finished matches

use crate::{Match, SetScore};
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

/// accumulated record of one team within its group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamRecord {
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub sets_won: u32,
    pub sets_lost: u32,
    pub games_won: u32,
    pub games_lost: u32,
}

impl TeamRecord {
    pub fn set_diff(&self) -> i64 {
        self.sets_won as i64 - self.sets_lost as i64
    }
    pub fn game_diff(&self) -> i64 {
        self.games_won as i64 - self.games_lost as i64
    }
}

/// Final order of a group over its terminal matches: wins, then set
/// difference, then game difference, then the head to head result, then the
/// team id so the order stays total and deterministic.
///
/// Walkovers count as wins without set or game contribution unless sets were
/// recorded.
pub fn group_order(
    teams: &[Uuid],
    matches: &[&Match],
    sets_by_match: &HashMap<Uuid, Vec<SetScore>>,
) -> Vec<(Uuid, TeamRecord)> {
    let mut records: HashMap<Uuid, TeamRecord> = teams
        .iter()
        .map(|team| (*team, TeamRecord::default()))
        .collect();
    // winner keyed by the unordered team pair for the head to head tie break
    let mut head_to_head: HashMap<(Uuid, Uuid), Uuid> = HashMap::new();

    for m in matches {
        let (Some(team1), Some(team2), Some(winner)) = (m.team1_id, m.team2_id, m.winner_id)
        else {
            continue;
        };
        if !m.status.is_terminal() {
            continue;
        }
        head_to_head.insert(pair_key(team1, team2), winner);

        let mut sets1 = 0u32;
        let mut sets2 = 0u32;
        let mut games1 = 0u32;
        let mut games2 = 0u32;
        if let Some(sets) = sets_by_match.get(&m.id) {
            for set in sets {
                games1 += set.team1_games;
                games2 += set.team2_games;
                if set.team1_games > set.team2_games {
                    sets1 += 1;
                } else {
                    sets2 += 1;
                }
            }
        }

        if let Some(record) = records.get_mut(&team1) {
            record.played += 1;
            if winner == team1 {
                record.wins += 1;
            } else {
                record.losses += 1;
            }
            record.sets_won += sets1;
            record.sets_lost += sets2;
            record.games_won += games1;
            record.games_lost += games2;
        }
        if let Some(record) = records.get_mut(&team2) {
            record.played += 1;
            if winner == team2 {
                record.wins += 1;
            } else {
                record.losses += 1;
            }
            record.sets_won += sets2;
            record.sets_lost += sets1;
            record.games_won += games2;
            record.games_lost += games1;
        }
    }

    let mut order: Vec<(Uuid, TeamRecord)> = teams
        .iter()
        .map(|team| (*team, records[team]))
        .collect();
    order.sort_by(|(team_a, rec_a), (team_b, rec_b)| {
        rec_b
            .wins
            .cmp(&rec_a.wins)
            .then_with(|| rec_b.set_diff().cmp(&rec_a.set_diff()))
            .then_with(|| rec_b.game_diff().cmp(&rec_a.game_diff()))
            .then_with(|| head_to_head_order(&head_to_head, *team_a, *team_b))
            .then_with(|| team_a.cmp(team_b))
    });
    order
}

fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b { (a, b) } else { (b, a) }
}

fn head_to_head_order(
    head_to_head: &HashMap<(Uuid, Uuid), Uuid>,
    team_a: Uuid,
    team_b: Uuid,
) -> Ordering {
    match head_to_head.get(&pair_key(team_a, team_b)) {
        Some(winner) if *winner == team_a => Ordering::Less,
        Some(winner) if *winner == team_b => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
