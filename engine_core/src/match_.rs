// match of a tournament fixture

use chrono::{DateTime, Utc};
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// status of match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// scheduled
    #[default]
    Scheduled,
    /// called
    Called,
    /// in_progress
    InProgress,
    /// finished
    Finished,
    /// walkover
    Walkover,
    /// cancelled
    Cancelled,
    /// postponed
    Postponed,
}

impl TryFrom<&str> for MatchStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "called" => Ok(MatchStatus::Called),
            "in_progress" => Ok(MatchStatus::InProgress),
            "finished" => Ok(MatchStatus::Finished),
            "walkover" => Ok(MatchStatus::Walkover),
            "cancelled" => Ok(MatchStatus::Cancelled),
            "postponed" => Ok(MatchStatus::Postponed),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

impl MatchStatus {
    /// terminal states never accept further reports
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchStatus::Finished | MatchStatus::Walkover | MatchStatus::Cancelled
        )
    }
}

/// one set of a match result
///
/// Games are counted per team; a 7-6 set additionally carries the tiebreak
/// points of both teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub set_number: u32,
    pub team1_games: u32,
    pub team2_games: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiebreak_team1: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiebreak_team2: Option<u32>,
}

impl SetScore {
    pub fn new(set_number: u32, team1_games: u32, team2_games: u32) -> Self {
        SetScore {
            set_number,
            team1_games,
            team2_games,
            tiebreak_team1: None,
            tiebreak_team2: None,
        }
    }

    pub fn with_tiebreak(mut self, team1: u32, team2: u32) -> Self {
        self.tiebreak_team1 = Some(team1);
        self.tiebreak_team2 = Some(team2);
        self
    }
}

/// status of a pending result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PendingResultStatus {
    /// pending_confirmation
    PendingConfirmation,
    /// disputed
    Disputed,
    /// confirmed
    Confirmed,
}

/// A reported but not yet confirmed outcome, embedded in the match until the
/// opposing team accepts or disputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResult {
    /// profile of the reporting player
    pub reported_by: Uuid,
    /// team the reporter plays for; its opponent must confirm
    pub reporter_team_id: Uuid,
    pub reported_at: DateTime<Utc>,
    pub winner_id: Uuid,
    pub loser_id: Uuid,
    pub sets: Vec<SetScore>,
    pub status: PendingResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_by: Option<Uuid>,
}

/// match of a tournament
///
/// Matches are created only by fixture generation and are owned by their
/// tournament. `next_match_id` is a relation into the same fixture, not
/// ownership: the winner of this match is promoted into the referenced match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tournament_id: Uuid,
    /// round within the whole fixture; playoff rounds continue the group
    /// stage numbering so the pair (round_number, match_number) stays unique
    pub round_number: u32,
    pub round_name: String,
    pub match_number: u32,
    /// human readable location within the phase, see [`group_position`] and
    /// [`playoff_position`]
    pub bracket_position: String,
    pub team1_id: Option<Uuid>,
    pub team2_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: MatchStatus,
    pub winner_id: Option<Uuid>,
    pub loser_id: Option<Uuid>,
    pub next_match_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_result: Option<PendingResult>,
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
    /// free form per match settings document (reschedule history, override
    /// archive)
    pub settings: serde_json::Value,
}

impl Match {
    fn shell(
        tenant_id: Uuid,
        tournament_id: Uuid,
        round_number: u32,
        round_name: String,
        match_number: u32,
        bracket_position: String,
    ) -> Self {
        Match {
            id: Uuid::new_v4(),
            tenant_id,
            tournament_id,
            round_number,
            round_name,
            match_number,
            bracket_position,
            team1_id: None,
            team2_id: None,
            scheduled_at: None,
            status: MatchStatus::Scheduled,
            winner_id: None,
            loser_id: None,
            next_match_id: None,
            pending_result: None,
            duration_minutes: None,
            notes: None,
            finished_at: None,
            settings: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// group stage match with both teams known at creation
    #[allow(clippy::too_many_arguments)]
    pub fn group_stage(
        tenant_id: Uuid,
        tournament_id: Uuid,
        round_number: u32,
        round_name: String,
        match_number: u32,
        bracket_position: String,
        team1_id: Uuid,
        team2_id: Uuid,
    ) -> Self {
        let mut m = Match::shell(
            tenant_id,
            tournament_id,
            round_number,
            round_name,
            match_number,
            bracket_position,
        );
        m.team1_id = Some(team1_id);
        m.team2_id = Some(team2_id);
        m
    }

    /// playoff shell; teams resolve once the feeders finish
    pub fn playoff(
        tenant_id: Uuid,
        tournament_id: Uuid,
        round_number: u32,
        round_name: String,
        match_number: u32,
        bracket_position: String,
    ) -> Self {
        Match::shell(
            tenant_id,
            tournament_id,
            round_number,
            round_name,
            match_number,
            bracket_position,
        )
    }

    pub fn is_group_stage(&self) -> bool {
        self.bracket_position.starts_with('G')
    }

    pub fn is_playoff(&self) -> bool {
        self.bracket_position.starts_with("PO-")
    }

    pub fn involves(&self, team_id: Uuid) -> bool {
        self.team1_id == Some(team_id) || self.team2_id == Some(team_id)
    }

    pub fn teams_resolved(&self) -> bool {
        self.team1_id.is_some() && self.team2_id.is_some()
    }

    pub fn opponent_of(&self, team_id: Uuid) -> Option<Uuid> {
        if self.team1_id == Some(team_id) {
            self.team2_id
        } else if self.team2_id == Some(team_id) {
            self.team1_id
        } else {
            None
        }
    }

    // --- transitions ---

    /// Finish with the given winner; the caller has validated the winner is
    /// one of the two teams. Clears any pending result.
    pub fn finish(&mut self, winner_id: Uuid, at: DateTime<Utc>) {
        self.winner_id = Some(winner_id);
        self.loser_id = self.opponent_of(winner_id);
        self.status = MatchStatus::Finished;
        self.finished_at = Some(at);
        self.pending_result = None;
    }

    /// Administrative walkover: the loser did not play.
    pub fn walkover(&mut self, winner_id: Uuid, loser_id: Option<Uuid>, at: DateTime<Utc>) {
        self.winner_id = Some(winner_id);
        self.loser_id = loser_id;
        self.status = MatchStatus::Walkover;
        self.finished_at = Some(at);
        self.pending_result = None;
    }

    fn settings_object_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        if !self.settings.is_object() {
            self.settings = serde_json::Value::Object(serde_json::Map::new());
        }
        self.settings
            .as_object_mut()
            .expect("settings was just coerced to an object")
    }

    /// Append one reschedule record to the match settings.
    pub fn record_reschedule(
        &mut self,
        to: Option<DateTime<Utc>>,
        reason: &str,
        by: Uuid,
        at: DateTime<Utc>,
    ) {
        let record = serde_json::json!({
            "from": self.scheduled_at,
            "to": to,
            "reason": reason,
            "by": by,
            "at": at,
        });
        let history = self
            .settings_object_mut()
            .entry("reschedule_history")
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if let Some(entries) = history.as_array_mut() {
            entries.push(record);
        }
    }

    /// Archive the state an admin override replaced. A match carrying this
    /// archive cannot be overridden again.
    pub fn archive_override(
        &mut self,
        previous: Option<&PendingResult>,
        by: Uuid,
        at: DateTime<Utc>,
    ) {
        let archived = serde_json::json!({
            "previous_pending_result": previous,
            "previous_winner_id": self.winner_id,
            "overridden_by": by,
            "overridden_at": at,
        });
        self.settings_object_mut()
            .insert("admin_override".to_string(), archived);
    }

    pub fn has_admin_override(&self) -> bool {
        self.settings.get("admin_override").is_some()
    }

    /// Who confirmed the finished result; the nil uuid denotes the system
    /// identity of the auto confirmation sweep.
    pub fn stamp_confirmed_by(&mut self, by: Uuid) {
        self.settings_object_mut().insert(
            "result_confirmed_by".to_string(),
            serde_json::Value::String(by.to_string()),
        );
    }
}

/// Bracket position of a group stage match: `G<letter>-R<round>-M<i>v<j>`
/// with i and j the 1-based seats of the teams within their group.
pub fn group_position(letter: char, round: u32, seat1: u32, seat2: u32) -> String {
    format!("G{letter}-R{round}-M{seat1}v{seat2}")
}

/// Bracket position of a playoff match: `PO-R<round>-M<n>` with the playoff
/// local round (1 = first playoff round).
pub fn playoff_position(round: u32, number: u32) -> String {
    format!("PO-R{round}-M{number}")
}
