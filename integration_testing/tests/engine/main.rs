// integration suite of the engine operations against the port fakes

mod adjudication;
mod concurrency;
mod fixture;
mod idempotency;
mod progression;
mod sweep;

use engine_core::{Engine, FixtureConfig, FixtureSummary, Match, ResultReport, SetScore};
use integration_testing::{FakeStore, SeededTournament};

/// the scenario config used across the suites: 8 teams, 2 groups of 4
pub fn two_group_config() -> FixtureConfig {
    FixtureConfig {
        groups_count: 2,
        ..FixtureConfig::default()
    }
}

pub async fn generate_default_fixture(
    engine: &Engine,
    seed: &SeededTournament,
) -> FixtureSummary {
    engine
        .generate_fixture(&seed.admin_ctx(), seed.tournament_id, Some(two_group_config()))
        .await
        .expect("fixture generation should succeed")
}

pub fn stored_matches(store: &FakeStore, seed: &SeededTournament) -> Vec<Match> {
    let mut matches: Vec<Match> = store
        .snapshot()
        .matches
        .into_values()
        .filter(|m| m.tournament_id == seed.tournament_id)
        .collect();
    matches.sort_by_key(|m| (m.round_number, m.match_number));
    matches
}

pub fn group_matches(store: &FakeStore, seed: &SeededTournament) -> Vec<Match> {
    stored_matches(store, seed)
        .into_iter()
        .filter(|m| m.is_group_stage())
        .collect()
}

pub fn playoff_matches(store: &FakeStore, seed: &SeededTournament) -> Vec<Match> {
    stored_matches(store, seed)
        .into_iter()
        .filter(|m| m.is_playoff())
        .collect()
}

/// two straight sets from the perspective of the match winner
pub fn sets_won_by_team1(winner_is_team1: bool) -> Vec<SetScore> {
    if winner_is_team1 {
        vec![SetScore::new(1, 6, 2), SetScore::new(2, 6, 3)]
    } else {
        vec![SetScore::new(1, 2, 6), SetScore::new(2, 3, 6)]
    }
}

/// Admin-reports every open group match; the better seeded team always wins,
/// which makes the standings of every group the seed order.
pub async fn finish_group_stage(engine: &Engine, store: &FakeStore, seed: &SeededTournament) {
    let seed_position = |team: uuid::Uuid| {
        seed.team_ids
            .iter()
            .position(|id| *id == team)
            .expect("team belongs to the seeded roster")
    };
    for m in group_matches(store, seed) {
        if m.status.is_terminal() {
            continue;
        }
        let team1 = m.team1_id.unwrap();
        let team2 = m.team2_id.unwrap();
        let winner_is_team1 = seed_position(team1) < seed_position(team2);
        let winner = if winner_is_team1 { team1 } else { team2 };
        engine
            .report_result(
                &seed.admin_ctx(),
                ResultReport {
                    match_id: m.id,
                    sets: sets_won_by_team1(winner_is_team1),
                    winner_team_id: winner,
                    duration_minutes: Some(55),
                    notes: None,
                },
                None,
            )
            .await
            .expect("admin report should finish the match");
    }
}
