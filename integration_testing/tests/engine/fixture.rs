// fixture generation suite

use crate::{generate_default_fixture, group_matches, playoff_matches, stored_matches, two_group_config};
use chrono::{Duration, NaiveDate};
use engine_core::{FixtureConfig, MatchStatus, TournamentStatus};
use integration_testing::{make_engine_with_fakes, seed_tournament};
use std::collections::HashMap;
use uuid::Uuid;

/// 1) scenario: 8 teams, 2 groups of 4, 2 advance -> 12 + 3 matches
#[tokio::test]
async fn given_eight_teams_when_generating_then_twelve_group_and_three_playoff_matches() {
    let (engine, store, _notifier, audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);

    let summary = generate_default_fixture(&engine, &seed).await;

    assert_eq!(summary.total_matches, 15);
    assert_eq!(summary.group_stage.matches_count, 12);
    assert_eq!(summary.playoff_stage.matches_count, 3);
    assert_eq!(summary.playoff_stage.rounds, 2);
    assert_eq!(
        summary
            .group_stage
            .groups
            .iter()
            .map(|g| g.letter)
            .collect::<Vec<_>>(),
        ['A', 'B']
    );
    // snake seeding: group A takes seeds 1, 4, 5, 8
    assert_eq!(
        summary.group_stage.groups[0].team_ids,
        [
            seed.team_ids[0],
            seed.team_ids[3],
            seed.team_ids[4],
            seed.team_ids[7]
        ]
    );

    // schedule: 8 matches fit the first day, 4 spill to the second
    assert_eq!(summary.schedule.start_date, seed.start_date);
    assert_eq!(
        summary.schedule.end_date,
        NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()
    );
    assert_eq!(summary.schedule.days, 2);

    let tournament = store.snapshot().tournaments[&seed.tournament_id].clone();
    assert_eq!(tournament.status, TournamentStatus::InProgress);
    assert!(tournament.fixture_generated_at.is_some());

    let audit_events = audit.recorded();
    assert_eq!(audit_events.len(), 1);
    assert_eq!(audit_events[0].action, "fixture.generated");
}

#[tokio::test]
async fn given_generated_fixture_then_playoff_shells_are_wired_and_unscheduled() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;

    let playoffs = playoff_matches(&store, &seed);
    assert_eq!(playoffs.len(), 3);
    let semis: Vec<_> = playoffs
        .iter()
        .filter(|m| m.round_name == "Semifinales")
        .collect();
    let final_match = playoffs
        .iter()
        .find(|m| m.round_name == "Final")
        .expect("a final exists");

    for semi in &semis {
        assert_eq!(semi.next_match_id, Some(final_match.id));
        assert!(semi.team1_id.is_none() && semi.team2_id.is_none());
        assert!(semi.scheduled_at.is_none());
        assert_eq!(semi.status, MatchStatus::Scheduled);
    }
    assert!(final_match.next_match_id.is_none());

    // bracket positions follow the documented convention
    let positions: Vec<&str> = playoffs.iter().map(|m| m.bracket_position.as_str()).collect();
    assert!(positions.contains(&"PO-R1-M1"));
    assert!(positions.contains(&"PO-R1-M2"));
    assert!(positions.contains(&"PO-R2-M1"));
}

/// every pair of one group meets exactly once, and nobody plays itself
#[tokio::test]
async fn given_generated_fixture_then_each_group_pair_meets_exactly_once() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    let summary = generate_default_fixture(&engine, &seed).await;

    for group in &summary.group_stage.groups {
        let in_group: Vec<_> = group_matches(&store, &seed)
            .into_iter()
            .filter(|m| m.bracket_position.starts_with(&format!("G{}", group.letter)))
            .collect();
        assert_eq!(in_group.len(), 6, "C(4,2) pairings");

        let mut seen_pairs = Vec::new();
        let mut appearances: HashMap<Uuid, usize> = HashMap::new();
        for m in &in_group {
            let (a, b) = (m.team1_id.unwrap(), m.team2_id.unwrap());
            assert_ne!(a, b, "no team plays itself");
            let pair = (a.min(b), a.max(b));
            assert!(!seen_pairs.contains(&pair), "pair repeated: {pair:?}");
            seen_pairs.push(pair);
            *appearances.entry(a).or_default() += 1;
            *appearances.entry(b).or_default() += 1;
        }
        for team in &group.team_ids {
            assert_eq!(appearances[team], 3, "each team plays group size - 1");
        }
    }
}

/// no two matches of one team closer than the configured rest
#[tokio::test]
async fn given_generated_schedule_then_rest_between_matches_holds() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;

    let config = FixtureConfig::default();
    for team in &seed.team_ids {
        let mut times: Vec<_> = group_matches(&store, &seed)
            .into_iter()
            .filter(|m| m.involves(*team))
            .map(|m| m.scheduled_at.expect("group matches are scheduled"))
            .collect();
        times.sort();
        for window in times.windows(2) {
            let gap = window[1] - (window[0] + Duration::minutes(60));
            assert!(
                gap >= Duration::minutes(config.rest_between_matches as i64),
                "team {team} rests only {gap}"
            );
        }
    }
}

#[tokio::test]
async fn given_existing_fixture_when_regenerating_then_it_is_replaced_not_duplicated() {
    let (engine, store, _notifier, audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let first_ids: Vec<_> = stored_matches(&store, &seed).iter().map(|m| m.id).collect();

    generate_default_fixture(&engine, &seed).await;

    let regenerated = stored_matches(&store, &seed);
    assert_eq!(regenerated.len(), 15, "old fixture deleted, not appended");
    assert!(regenerated.iter().all(|m| !first_ids.contains(&m.id)));

    let second_audit = &audit.recorded()[1];
    assert_eq!(second_audit.data["deleted_matches"], 15);
}

#[tokio::test]
async fn given_player_caller_when_generating_then_forbidden() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);

    let ctx = seed.player_ctx(seed.team_ids[0]);
    let err = engine
        .generate_fixture(&ctx, seed.tournament_id, None)
        .await
        .expect_err("players cannot generate fixtures");
    assert_eq!(err.kind(), "forbidden");
    assert!(stored_matches(&store, &seed).is_empty(), "nothing persisted");
}

#[tokio::test]
async fn given_unknown_tournament_when_generating_then_not_found() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);

    let err = engine
        .generate_fixture(&seed.admin_ctx(), Uuid::new_v4(), None)
        .await
        .expect_err("unknown id");
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn given_draft_tournament_when_generating_then_conflict() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    store.seed(|state| {
        state
            .tournaments
            .get_mut(&seed.tournament_id)
            .unwrap()
            .status = TournamentStatus::Draft;
    });

    let err = engine
        .generate_fixture(&seed.admin_ctx(), seed.tournament_id, None)
        .await
        .expect_err("draft tournaments have no fixture");
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn given_too_small_roster_when_generating_then_conflict() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 3);

    let err = engine
        .generate_fixture(&seed.admin_ctx(), seed.tournament_id, None)
        .await
        .expect_err("3 confirmed teams under min_teams=4");
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn given_out_of_range_config_when_generating_then_validation() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);

    let config = FixtureConfig {
        teams_per_group: 9,
        ..two_group_config()
    };
    let err = engine
        .generate_fixture(&seed.admin_ctx(), seed.tournament_id, Some(config))
        .await
        .expect_err("teams_per_group over 8");
    assert_eq!(err.kind(), "validation");
}
