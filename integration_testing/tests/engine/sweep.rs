// auto confirmation sweep suite

use crate::{generate_default_fixture, group_matches, sets_won_by_team1};
use chrono::Duration;
use engine_core::{MatchStatus, NotificationKind, ResultReport};
use integration_testing::{make_engine_with_fakes, seed_tournament};
use uuid::Uuid;

#[tokio::test]
async fn given_expired_pending_result_when_sweeping_then_it_confirms_as_the_system() {
    let (engine, store, notifier, audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let m = group_matches(&store, &seed).remove(0);
    let reporter_team = m.team1_id.unwrap();
    engine
        .report_result(
            &seed.player_ctx(reporter_team),
            ResultReport {
                match_id: m.id,
                sets: sets_won_by_team1(true),
                winner_team_id: reporter_team,
                duration_minutes: None,
                notes: None,
            },
            None,
        )
        .await
        .unwrap();

    // 25 hours later the 24 hour window has passed
    let now = seed.morning_of_start() + Duration::hours(25);
    let confirmed = engine.auto_confirm_expired(now).await.expect("sweep runs");
    assert_eq!(confirmed, 1);

    let stored = store.snapshot().matches[&m.id].clone();
    assert_eq!(stored.status, MatchStatus::Finished);
    assert_eq!(stored.winner_id, Some(reporter_team));
    assert!(stored.pending_result.is_none());
    // recorded exactly like an accept, with the system identity
    assert_eq!(
        stored.settings["result_confirmed_by"],
        serde_json::json!(Uuid::nil().to_string())
    );

    let kinds: Vec<_> = notifier.sent().iter().map(|n| n.kind).collect();
    assert!(kinds.contains(&NotificationKind::ResultConfirmed));
    assert!(
        audit
            .recorded()
            .iter()
            .any(|event| event.action == "result.auto_confirmed" && event.actor.is_nil())
    );
}

#[tokio::test]
async fn given_fresh_pending_result_when_sweeping_then_nothing_happens() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let m = group_matches(&store, &seed).remove(0);
    engine
        .report_result(
            &seed.player_ctx(m.team1_id.unwrap()),
            ResultReport {
                match_id: m.id,
                sets: sets_won_by_team1(true),
                winner_team_id: m.team1_id.unwrap(),
                duration_minutes: None,
                notes: None,
            },
            None,
        )
        .await
        .unwrap();

    // only two hours in, well inside the window
    let now = seed.morning_of_start() + Duration::hours(2);
    let confirmed = engine.auto_confirm_expired(now).await.unwrap();
    assert_eq!(confirmed, 0);
    assert_eq!(
        store.snapshot().matches[&m.id].status,
        MatchStatus::InProgress
    );
}

#[tokio::test]
async fn given_repeated_sweep_then_second_run_is_a_no_op() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let m = group_matches(&store, &seed).remove(0);
    engine
        .report_result(
            &seed.player_ctx(m.team1_id.unwrap()),
            ResultReport {
                match_id: m.id,
                sets: sets_won_by_team1(true),
                winner_team_id: m.team1_id.unwrap(),
                duration_minutes: None,
                notes: None,
            },
            None,
        )
        .await
        .unwrap();

    let now = seed.morning_of_start() + Duration::hours(30);
    assert_eq!(engine.auto_confirm_expired(now).await.unwrap(), 1);
    assert_eq!(engine.auto_confirm_expired(now).await.unwrap(), 0);
}
