// incident adjudication suite

use crate::{generate_default_fixture, group_matches, sets_won_by_team1};
use chrono::{TimeZone, Utc};
use engine_core::{
    EntryStatus, Incident, IncidentKind, IncidentSeverity, MatchStatus, NotificationKind,
    ResolutionAction, ResolutionStatus, ResultReport,
};
use integration_testing::{FakeStore, SeededTournament, make_engine_with_fakes, seed_tournament};
use uuid::Uuid;

const NOTES: &str = "revisado con el juez de pista, sin mas consecuencias";

/// incident seeded directly, as the platform's incident intake would
fn seed_incident(
    store: &FakeStore,
    seed: &SeededTournament,
    kind: IncidentKind,
    match_id: Option<Uuid>,
    affected_team_id: Option<Uuid>,
) -> Uuid {
    let incident = Incident {
        id: Uuid::new_v4(),
        tenant_id: seed.tenant_id,
        tournament_id: Some(seed.tournament_id),
        match_id,
        affected_team_id,
        kind,
        severity: IncidentSeverity::High,
        title: "Incidencia operativa".to_string(),
        description: "reportada durante la jornada".to_string(),
        reported_by: seed.admin_profile,
        created_at: Utc::now(),
        data: serde_json::json!({}),
        resolved_by: None,
        resolved_at: None,
        resolution_notes: None,
    };
    let id = incident.id;
    store.seed(|state| {
        state.incidents.insert(id, incident);
    });
    id
}

/// dispute created through the real report+dispute flow
async fn disputed_incident(
    engine: &engine_core::Engine,
    store: &FakeStore,
    seed: &SeededTournament,
) -> (Uuid, engine_core::Match) {
    generate_default_fixture(engine, seed).await;
    let m = group_matches(store, seed).remove(0);
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
    let response = engine
        .accept_result(
            &seed.player_ctx(m.team2_id.unwrap()),
            m.id,
            false,
            Some("we never played the second set"),
        )
        .await
        .unwrap();
    (response.incident_id.unwrap(), m)
}

/// 7) property: resolving twice is a no-op with the original markers
#[tokio::test]
async fn given_resolved_incident_when_resolving_again_then_already_resolved() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    let (incident_id, _m) = disputed_incident(&engine, &store, &seed).await;

    let first = engine
        .resolve_incident(&seed.admin_ctx(), incident_id, NOTES, ResolutionAction::Dismiss)
        .await
        .expect("first resolution");
    assert_eq!(first.status, ResolutionStatus::Resolved);

    let second = engine
        .resolve_incident(
            &seed.admin_ctx(),
            incident_id,
            "completely different notes this time",
            ResolutionAction::Disqualify,
        )
        .await
        .expect("idempotent replay");
    assert_eq!(second.status, ResolutionStatus::AlreadyResolved);
    assert_eq!(second.resolved_at, first.resolved_at);
    assert_eq!(second.resolved_by, first.resolved_by);
    assert_eq!(second.notifications_sent, 0);

    // the replay wins even over notes that would fail validation
    let third = engine
        .resolve_incident(&seed.admin_ctx(), incident_id, "short", ResolutionAction::Dismiss)
        .await
        .expect("a retry with bad notes is still the no-op replay");
    assert_eq!(third.status, ResolutionStatus::AlreadyResolved);
    assert_eq!(third.resolved_at, first.resolved_at);

    // the stored incident kept the first resolution
    let incident = store.snapshot().incidents[&incident_id].clone();
    assert!(incident.resolution_notes.unwrap().starts_with("[DISMISS]"));
}

#[tokio::test]
async fn given_dismiss_then_incident_resolved_and_union_notified() {
    let (engine, store, notifier, audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    let (incident_id, m) = disputed_incident(&engine, &store, &seed).await;

    let summary = engine
        .resolve_incident(&seed.admin_ctx(), incident_id, NOTES, ResolutionAction::Dismiss)
        .await
        .unwrap();

    let resolved: Vec<_> = notifier
        .sent()
        .into_iter()
        .filter(|n| n.kind == NotificationKind::IncidentResolved)
        .collect();
    assert_eq!(resolved.len(), 1, "a single incident_resolved record");
    // union: reporter of the dispute plus both teams of the linked match
    let recipients = &resolved[0].recipients;
    assert_eq!(summary.notifications_sent as usize, recipients.len());
    for team in [m.team1_id.unwrap(), m.team2_id.unwrap()] {
        for player in &seed.players[&team] {
            assert!(recipients.contains(player));
        }
    }
    let unique: std::collections::HashSet<_> = recipients.iter().collect();
    assert_eq!(unique.len(), recipients.len(), "recipients deduplicated");

    assert!(
        audit
            .recorded()
            .iter()
            .any(|event| event.action == "incident.resolved")
    );
}

#[tokio::test]
async fn given_warn_then_warning_lands_on_the_team() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let team = seed.team_ids[2];
    let incident_id = seed_incident(&store, &seed, IncidentKind::Misconduct, None, Some(team));

    engine
        .resolve_incident(&seed.admin_ctx(), incident_id, NOTES, ResolutionAction::Warn)
        .await
        .expect("warn resolution");

    let warnings = store.snapshot().warnings[&team].clone();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].incident_id, incident_id);
    assert_eq!(warnings[0].reason, NOTES);
}

/// 8) property: disqualification turns the open linked match into a walkover
#[tokio::test]
async fn given_disqualify_then_entry_dropped_and_open_match_walks_over() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let m = group_matches(&store, &seed).remove(0);
    let dq_team = m.team2_id.unwrap();
    let incident_id = seed_incident(
        &store,
        &seed,
        IncidentKind::NoShow,
        Some(m.id),
        Some(dq_team),
    );

    engine
        .resolve_incident(
            &seed.admin_ctx(),
            incident_id,
            NOTES,
            ResolutionAction::Disqualify,
        )
        .await
        .expect("disqualify resolution");

    let state = store.snapshot();
    let entry = state
        .entries
        .iter()
        .find(|e| e.team_id == dq_team)
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Disqualified);

    let stored = state.matches[&m.id].clone();
    assert_eq!(stored.status, MatchStatus::Walkover);
    assert_eq!(stored.winner_id, m.team1_id);
    assert_eq!(stored.loser_id, Some(dq_team));

    // the disqualified team cannot win any of its remaining matches
    let other = group_matches(&store, &seed)
        .into_iter()
        .find(|other| other.id != m.id && other.involves(dq_team))
        .expect("the team has more group matches");
    let err = engine
        .report_result(
            &seed.admin_ctx(),
            ResultReport {
                match_id: other.id,
                sets: sets_won_by_team1(other.team1_id == Some(dq_team)),
                winner_team_id: dq_team,
                duration_minutes: None,
                notes: None,
            },
            None,
        )
        .await
        .expect_err("disqualified teams cannot be winners");
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn given_reschedule_then_match_postpones_and_history_is_kept() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    generate_default_fixture(&engine, &seed).await;
    let m = group_matches(&store, &seed).remove(0);
    let incident_id = seed_incident(&store, &seed, IncidentKind::Weather, Some(m.id), None);
    let new_slot = Utc.with_ymd_and_hms(2025, 3, 3, 18, 0, 0).unwrap();

    engine
        .resolve_incident(
            &seed.admin_ctx(),
            incident_id,
            NOTES,
            ResolutionAction::Reschedule {
                reschedule_to: Some(new_slot),
            },
        )
        .await
        .expect("reschedule resolution");

    let stored = store.snapshot().matches[&m.id].clone();
    assert_eq!(stored.status, MatchStatus::Postponed);
    assert_eq!(stored.scheduled_at, Some(new_slot));
    let history = stored.settings["reschedule_history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["from"], serde_json::json!(m.scheduled_at));
}

/// 4) scenario: admin overrides a disputed result with video evidence
#[tokio::test]
async fn given_override_then_match_finishes_for_the_named_winner() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    let (incident_id, m) = disputed_incident(&engine, &store, &seed).await;
    let team_b = m.team2_id.unwrap();

    let summary = engine
        .resolve_incident(
            &seed.admin_ctx(),
            incident_id,
            "video evidence shows B won 6-2 6-3",
            ResolutionAction::OverrideResult {
                override_winner_id: team_b,
            },
        )
        .await
        .expect("override resolution");
    assert_eq!(summary.action, "override_result");

    let stored = store.snapshot().matches[&m.id].clone();
    assert_eq!(stored.status, MatchStatus::Finished);
    assert_eq!(stored.winner_id, Some(team_b));
    assert!(stored.pending_result.is_none(), "pending cleared");
    let archive = &stored.settings["admin_override"];
    assert_eq!(
        archive["previous_pending_result"]["winner_id"],
        serde_json::json!(m.team1_id.unwrap())
    );

    // a second override on the same match is terminal
    let second_incident =
        seed_incident(&store, &seed, IncidentKind::Dispute, Some(m.id), None);
    let err = engine
        .resolve_incident(
            &seed.admin_ctx(),
            second_incident,
            "trying to flip the result once more",
            ResolutionAction::OverrideResult {
                override_winner_id: m.team1_id.unwrap(),
            },
        )
        .await
        .expect_err("overrides cannot stack");
    assert_eq!(err.kind(), "conflict");
}

#[tokio::test]
async fn given_invalid_inputs_then_the_matching_error_kinds_surface() {
    let (engine, store, _notifier, _audit) = make_engine_with_fakes();
    let seed = seed_tournament(&store, 8);
    let (incident_id, _m) = disputed_incident(&engine, &store, &seed).await;

    let err = engine
        .resolve_incident(&seed.admin_ctx(), incident_id, "short", ResolutionAction::Dismiss)
        .await
        .expect_err("notes under 10 characters");
    assert_eq!(err.kind(), "validation");

    let err = engine
        .resolve_incident(
            &seed.player_ctx(seed.team_ids[0]),
            incident_id,
            NOTES,
            ResolutionAction::Dismiss,
        )
        .await
        .expect_err("players cannot adjudicate");
    assert_eq!(err.kind(), "forbidden");

    let err = engine
        .resolve_incident(
            &seed.admin_ctx(),
            incident_id,
            NOTES,
            ResolutionAction::OverrideResult {
                override_winner_id: Uuid::new_v4(),
            },
        )
        .await
        .expect_err("winner must belong to the linked match");
    assert_eq!(err.kind(), "validation");

    let err = engine
        .resolve_incident(&seed.admin_ctx(), Uuid::new_v4(), NOTES, ResolutionAction::Dismiss)
        .await
        .expect_err("unknown incident");
    assert_eq!(err.kind(), "not_found");
}
