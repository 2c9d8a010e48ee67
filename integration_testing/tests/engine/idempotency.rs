// idempotency replay suite

use crate::{generate_default_fixture, group_matches, sets_won_by_team1};
use engine_core::ResultReport;
use integration_testing::{make_engine_with_fakes, seed_tournament};

/// 6) scenario: the same report twice under one key is one state transition
#[tokio::test]
async fn given_same_key_when_reporting_twice_then_second_call_replays_verbatim() {
    let (engine, store, notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let m = group_matches(&store, &seed).remove(0);
    let ctx = seed.player_ctx(m.team1_id.unwrap());
    let report = ResultReport {
        match_id: m.id,
        sets: sets_won_by_team1(true),
        winner_team_id: m.team1_id.unwrap(),
        duration_minutes: Some(65),
        notes: Some("pista 2".to_string()),
    };

    let first = engine
        .report_result(&ctx, report.clone(), Some("k1"))
        .await
        .expect("first call succeeds");
    let second = engine
        .report_result(&ctx, report, Some("k1"))
        .await
        .expect("replay returns the stored response");

    assert_eq!(first, second, "responses are identical");
    // exactly one state transition happened
    assert_eq!(store.snapshot().set_results[&m.id].len(), 2);
    assert_eq!(notifier.sent().len(), 1, "no duplicate notification");
}

#[tokio::test]
async fn given_fresh_key_when_match_already_pending_then_conflict() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let m = group_matches(&store, &seed).remove(0);
    let ctx = seed.player_ctx(m.team1_id.unwrap());
    let report = ResultReport {
        match_id: m.id,
        sets: sets_won_by_team1(true),
        winner_team_id: m.team1_id.unwrap(),
        duration_minutes: None,
        notes: None,
    };

    engine
        .report_result(&ctx, report.clone(), Some("k1"))
        .await
        .unwrap();
    let err = engine
        .report_result(&ctx, report, Some("k2"))
        .await
        .expect_err("a new key is a new request and hits the pending state");
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn given_expired_record_when_reporting_then_key_is_not_replayed() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let m = group_matches(&store, &seed).remove(0);
    let ctx = seed.player_ctx(m.team1_id.unwrap());
    let report = ResultReport {
        match_id: m.id,
        sets: sets_won_by_team1(true),
        winner_team_id: m.team1_id.unwrap(),
        duration_minutes: None,
        notes: None,
    };

    engine
        .report_result(&ctx, report.clone(), Some("k1"))
        .await
        .unwrap();
    // age the record past its ttl
    store.seed(|state| {
        for record in state.idempotency.values_mut() {
            record.expires_at = record.expires_at - chrono::Duration::hours(48);
        }
    });

    let err = engine
        .report_result(&ctx, report, Some("k1"))
        .await
        .expect_err("expired keys fall through to the state machine");
    assert_eq!(err.kind(), "conflict");
}
