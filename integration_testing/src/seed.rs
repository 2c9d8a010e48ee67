//! canonical seeded tournament used by the integration suites

use crate::FakeStore;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use engine_core::{Entry, EntryStatus, RequestContext, Role, Tournament, TournamentStatus};
use std::collections::HashMap;
use uuid::Uuid;

pub struct SeededTournament {
    pub tenant_id: Uuid,
    pub tournament_id: Uuid,
    /// team ids in seed order (seed 1 first)
    pub team_ids: Vec<Uuid>,
    /// team -> its two player profiles
    pub players: HashMap<Uuid, Vec<Uuid>>,
    pub admin_profile: Uuid,
    pub start_date: NaiveDate,
}

impl SeededTournament {
    /// context of the club admin, pinned to the morning of the start date
    pub fn admin_ctx(&self) -> RequestContext {
        RequestContext::new(self.tenant_id, self.admin_profile, Uuid::new_v4(), Role::Admin)
            .at(self.morning_of_start())
    }

    /// context of the first player of the given team
    pub fn player_ctx(&self, team_id: Uuid) -> RequestContext {
        let profile = self.players[&team_id][0];
        RequestContext::new(self.tenant_id, profile, Uuid::new_v4(), Role::Player)
            .at(self.morning_of_start())
    }

    /// context of the second player of the given team
    pub fn second_player_ctx(&self, team_id: Uuid) -> RequestContext {
        let profile = self.players[&team_id][1];
        RequestContext::new(self.tenant_id, profile, Uuid::new_v4(), Role::Player)
            .at(self.morning_of_start())
    }

    /// context of a tenant user belonging to no team
    pub fn outsider_ctx(&self) -> RequestContext {
        RequestContext::new(self.tenant_id, Uuid::new_v4(), Uuid::new_v4(), Role::Player)
            .at(self.morning_of_start())
    }

    pub fn morning_of_start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.start_date.and_hms_opt(8, 0, 0).unwrap())
    }
}

/// Seed a registration-closed tournament with `team_count` confirmed teams of
/// two players each, seeds 1..=team_count, one tenant admin, best of three
/// sets with six games. The start date is 2025-03-01.
pub fn seed_tournament(store: &FakeStore, team_count: usize) -> SeededTournament {
    let tenant_id = Uuid::new_v4();
    let tournament_id = Uuid::new_v4();
    let admin_profile = Uuid::new_v4();
    let start_date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    let mut team_ids = Vec::with_capacity(team_count);
    let mut players = HashMap::new();
    store.seed(|state| {
        state.tournaments.insert(
            tournament_id,
            Tournament {
                id: tournament_id,
                tenant_id,
                name: "Open de Primavera".to_string(),
                status: TournamentStatus::RegistrationClosed,
                sets_to_win: 2,
                games_per_set: 6,
                min_teams: 4,
                max_teams: 32,
                start_date,
                settings: serde_json::json!({}),
                fixture_generated_at: None,
                fixture_generated_by: None,
            },
        );
        state.tenant_admins.insert(tenant_id, vec![admin_profile]);

        let confirmed_base = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();
        for index in 0..team_count {
            let team_id = Uuid::new_v4();
            let members = vec![Uuid::new_v4(), Uuid::new_v4()];
            state.team_members.insert(team_id, members.clone());
            state.entries.push(Entry {
                id: Uuid::new_v4(),
                tenant_id,
                tournament_id,
                team_id,
                seed: Some(index as u32 + 1),
                status: EntryStatus::Confirmed,
                confirmed_at: Some(confirmed_base + chrono::Duration::hours(index as i64)),
            });
            team_ids.push(team_id);
            players.insert(team_id, members);
        }
    });

    SeededTournament {
        tenant_id,
        tournament_id,
        team_ids,
        players,
        admin_profile,
        start_date,
    }
}
