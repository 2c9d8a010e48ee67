// group stage closing and bracket progression suite

use crate::{
    finish_group_stage, generate_default_fixture, playoff_matches, sets_won_by_team1,
    stored_matches,
};
use chrono::{NaiveDate, TimeZone, Utc};
use engine_core::{FixtureConfig, Match, MatchStatus, ResultReport, playoff_position};
use integration_testing::{make_engine_with_fakes, seed_tournament};

#[tokio::test]
async fn given_finished_groups_when_closing_then_semifinals_are_cross_seeded() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    finish_group_stage(&engine, &store, &seed).await;

    let summary = engine
        .close_group_stage(&seed.admin_ctx(), seed.tournament_id)
        .await
        .expect("all group matches are finished");

    // seed order held in every group, so the advancing list is
    // [A1, B1, A2, B2]
    assert_eq!(
        summary.advancing,
        [
            seed.team_ids[0],
            seed.team_ids[1],
            seed.team_ids[3],
            seed.team_ids[2]
        ]
    );
    assert_eq!(summary.matches_seeded, 2);
    assert_eq!(summary.byes, 0);

    let playoffs = playoff_matches(&store, &seed);
    let semi1 = playoffs
        .iter()
        .find(|m| m.bracket_position == "PO-R1-M1")
        .unwrap();
    let semi2 = playoffs
        .iter()
        .find(|m| m.bracket_position == "PO-R1-M2")
        .unwrap();
    // group A winner meets group B runner-up and vice versa
    assert_eq!(semi1.team1_id, Some(seed.team_ids[0]));
    assert_eq!(semi1.team2_id, Some(seed.team_ids[2]));
    assert_eq!(semi2.team1_id, Some(seed.team_ids[1]));
    assert_eq!(semi2.team2_id, Some(seed.team_ids[3]));

    // one idle day after the two group days
    let playoff_day = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
    assert_eq!(
        semi1.scheduled_at,
        Some(Utc.from_utc_datetime(&playoff_day.and_hms_opt(9, 0, 0).unwrap()))
    );
    assert_eq!(
        semi2.scheduled_at,
        Some(Utc.from_utc_datetime(&playoff_day.and_hms_opt(10, 15, 0).unwrap()))
    );
}

#[tokio::test]
async fn given_open_group_matches_when_closing_then_conflict() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;

    let err = engine
        .close_group_stage(&seed.admin_ctx(), seed.tournament_id)
        .await
        .expect_err("nothing has been played");
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn given_closed_stage_when_closing_again_then_conflict() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    finish_group_stage(&engine, &store, &seed).await;
    engine
        .close_group_stage(&seed.admin_ctx(), seed.tournament_id)
        .await
        .unwrap();

    let err = engine
        .close_group_stage(&seed.admin_ctx(), seed.tournament_id)
        .await
        .expect_err("bracket already seeded");
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn given_seeded_bracket_when_semifinals_finish_then_final_resolves() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    finish_group_stage(&engine, &store, &seed).await;
    engine
        .close_group_stage(&seed.admin_ctx(), seed.tournament_id)
        .await
        .unwrap();

    for position in ["PO-R1-M1", "PO-R1-M2"] {
        let semi = playoff_matches(&store, &seed)
            .into_iter()
            .find(|m| m.bracket_position == position)
            .unwrap();
        engine
            .report_result(
                &seed.admin_ctx(),
                ResultReport {
                    match_id: semi.id,
                    sets: sets_won_by_team1(true),
                    winner_team_id: semi.team1_id.unwrap(),
                    duration_minutes: None,
                    notes: None,
                },
                None,
            )
            .await
            .expect("semifinal report");
    }

    let final_match = playoff_matches(&store, &seed)
        .into_iter()
        .find(|m| m.bracket_position == "PO-R2-M1")
        .unwrap();
    // slots fill in the order of the feeders' bracket position strings
    assert_eq!(final_match.team1_id, Some(seed.team_ids[0]));
    assert_eq!(final_match.team2_id, Some(seed.team_ids[1]));
    assert!(final_match.scheduled_at.is_some(), "final got a start time");

    engine
        .report_result(
            &seed.admin_ctx(),
            ResultReport {
                match_id: final_match.id,
                sets: sets_won_by_team1(true),
                winner_team_id: final_match.team1_id.unwrap(),
                duration_minutes: None,
                notes: None,
            },
            None,
        )
        .await
        .expect("final report");
    let finished = stored_matches(&store, &seed)
        .into_iter()
        .find(|m| m.bracket_position == "PO-R2-M1")
        .unwrap();
    assert_eq!(finished.status, MatchStatus::Finished);
    assert_eq!(finished.winner_id, Some(seed.team_ids[0]));
}

#[tokio::test]
async fn given_six_advancing_teams_then_top_two_seeds_receive_byes() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 12);
    let config = FixtureConfig {
        groups_count: 3,
        ..FixtureConfig::default()
    };
    engine
        .generate_fixture(&seed.admin_ctx(), seed.tournament_id, Some(config))
        .await
        .expect("12 teams over 3 groups");
    finish_group_stage(&engine, &store, &seed).await;

    let summary = engine
        .close_group_stage(&seed.admin_ctx(), seed.tournament_id)
        .await
        .expect("groups finished");

    // 3 groups x 2 advancing = 6 teams in a bracket of 8
    assert_eq!(summary.advancing.len(), 6);
    assert_eq!(summary.byes, 2);
    assert_eq!(summary.matches_seeded, 2);

    let playoffs = playoff_matches(&store, &seed);
    let quarter1 = playoffs
        .iter()
        .find(|m| m.bracket_position == "PO-R1-M1")
        .unwrap();
    assert_eq!(quarter1.status, MatchStatus::Walkover);
    assert_eq!(quarter1.winner_id, Some(summary.advancing[0]));

    // the bye winners already sit in the semifinals
    let semi1 = playoffs
        .iter()
        .find(|m| m.bracket_position == "PO-R2-M1")
        .unwrap();
    assert_eq!(semi1.team1_id, Some(summary.advancing[0]));
    let semi2 = playoffs
        .iter()
        .find(|m| m.bracket_position == "PO-R2-M2")
        .unwrap();
    assert_eq!(semi2.team1_id, Some(summary.advancing[1]));
}

/// With two-digit match numbers the position strings no longer sort like the
/// numbers do ("PO-R1-M10" < "PO-R1-M9"), and the string order decides.
#[tokio::test]
async fn given_wide_bracket_then_slots_follow_bracket_position_order() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);

    let downstream = Match::playoff(
        seed.tenant_id,
        seed.tournament_id,
        2,
        "Ronda de 16".to_string(),
        5,
        playoff_position(2, 5),
    );
    let mut match9 = Match::playoff(
        seed.tenant_id,
        seed.tournament_id,
        1,
        "Ronda de 32".to_string(),
        9,
        playoff_position(1, 9),
    );
    match9.team1_id = Some(seed.team_ids[0]);
    match9.team2_id = Some(seed.team_ids[1]);
    match9.next_match_id = Some(downstream.id);
    let mut match10 = Match::playoff(
        seed.tenant_id,
        seed.tournament_id,
        1,
        "Ronda de 32".to_string(),
        10,
        playoff_position(1, 10),
    );
    match10.team1_id = Some(seed.team_ids[2]);
    match10.team2_id = Some(seed.team_ids[3]);
    match10.next_match_id = Some(downstream.id);
    store.seed(|state| {
        for m in [downstream.clone(), match9.clone(), match10.clone()] {
            state.matches.insert(m.id, m);
        }
    });

    // match 9 finishes first, but its position sorts second -> team2 slot
    engine
        .report_result(
            &seed.admin_ctx(),
            ResultReport {
                match_id: match9.id,
                sets: sets_won_by_team1(true),
                winner_team_id: seed.team_ids[0],
                duration_minutes: None,
                notes: None,
            },
            None,
        )
        .await
        .expect("report on match 9");
    let stored = store.snapshot().matches[&downstream.id].clone();
    assert!(stored.team1_id.is_none());
    assert_eq!(stored.team2_id, Some(seed.team_ids[0]));

    // match 10 sorts first and takes the team1 slot
    engine
        .report_result(
            &seed.admin_ctx(),
            ResultReport {
                match_id: match10.id,
                sets: sets_won_by_team1(true),
                winner_team_id: seed.team_ids[2],
                duration_minutes: None,
                notes: None,
            },
            None,
        )
        .await
        .expect("report on match 10");
    let stored = store.snapshot().matches[&downstream.id].clone();
    assert_eq!(stored.team1_id, Some(seed.team_ids[2]));
    assert_eq!(stored.team2_id, Some(seed.team_ids[0]));
}

#[tokio::test]
async fn given_player_caller_when_closing_then_forbidden() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;

    let err = engine
        .close_group_stage(&seed.player_ctx(seed.team_ids[0]), seed.tournament_id)
        .await
        .expect_err("players cannot close the stage");
    assert_eq!(err.kind(), "forbidden");
}
