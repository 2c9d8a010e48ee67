// concurrency suite: racing reporters serialize on the match lock

use crate::{generate_default_fixture, group_matches, sets_won_by_team1};
use engine_core::ResultReport;
use integration_testing::{make_engine_with_fakes, seed_tournament};
use std::sync::Arc;

/// 5) property: two concurrent reports on one match, exactly one wins
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_two_concurrent_reporters_then_exactly_one_succeeds() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let m = group_matches(&store, &seed).remove(0);

    let engine = Arc::new(engine);
    let ctx1 = seed.player_ctx(m.team1_id.unwrap());
    let ctx2 = seed.player_ctx(m.team2_id.unwrap());
    let report1 = ResultReport {
        match_id: m.id,
        sets: sets_won_by_team1(true),
        winner_team_id: m.team1_id.unwrap(),
        duration_minutes: None,
        notes: None,
    };
    let report2 = ResultReport {
        match_id: m.id,
        sets: sets_won_by_team1(false),
        winner_team_id: m.team2_id.unwrap(),
        duration_minutes: None,
        notes: None,
    };

    let task1 = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.report_result(&ctx1, report1, None).await })
    };
    let task2 = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.report_result(&ctx2, report2, None).await })
    };
    let (outcome1, outcome2) = futures_util::future::join(task1, task2).await;
    let outcome1 = outcome1.expect("task 1 did not panic");
    let outcome2 = outcome2.expect("task 2 did not panic");

    let successes = [&outcome1, &outcome2]
        .iter()
        .filter(|outcome| outcome.is_ok())
        .count();
    assert_eq!(successes, 1, "exactly one reporter wins the lock");

    let loser = if outcome1.is_err() { outcome1 } else { outcome2 };
    assert_eq!(loser.unwrap_err().kind(), "conflict");

    // one pending result with one reporter persisted
    let stored = store.snapshot().matches[&m.id].clone();
    let pending = stored.pending_result.expect("the winning report parked");
    assert!(
        pending.reporter_team_id == m.team1_id.unwrap()
            || pending.reporter_team_id == m.team2_id.unwrap()
    );
    assert_eq!(store.snapshot().set_results[&m.id].len(), 2);
}

/// repeated runs keep the invariant regardless of interleaving
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_many_racing_pairs_then_each_match_gets_one_pending_result() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let engine = Arc::new(engine);

    for m in group_matches(&store, &seed).into_iter().take(4) {
        let ctx1 = seed.player_ctx(m.team1_id.unwrap());
        let ctx2 = seed.second_player_ctx(m.team2_id.unwrap());
        let build = |winner_is_team1: bool| ResultReport {
            match_id: m.id,
            sets: sets_won_by_team1(winner_is_team1),
            winner_team_id: if winner_is_team1 {
                m.team1_id.unwrap()
            } else {
                m.team2_id.unwrap()
            },
            duration_minutes: None,
            notes: None,
        };
        let report1 = build(true);
        let report2 = build(false);

        let task1 = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.report_result(&ctx1, report1, None).await })
        };
        let task2 = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.report_result(&ctx2, report2, None).await })
        };
        let outcomes = [
            task1.await.expect("no panic"),
            task2.await.expect("no panic"),
        ];
        assert_eq!(
            outcomes.iter().filter(|outcome| outcome.is_ok()).count(),
            1,
            "match {}",
            m.bracket_position
        );
    }
}
