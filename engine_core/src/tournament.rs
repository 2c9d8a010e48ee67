// tournament aggregate

use crate::{
    FixtureConfig,
    utils::validation::{FieldError, ValidationErrors, ValidationResult},
};
use chrono::{DateTime, NaiveDate, Utc};
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// status of tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// draft
    #[default]
    Draft,
    /// registration_open
    RegistrationOpen,
    /// registration_closed
    RegistrationClosed,
    /// in_progress
    InProgress,
    /// finished
    Finished,
    /// cancelled
    Cancelled,
}

impl TryFrom<&str> for TournamentStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "draft" => Ok(TournamentStatus::Draft),
            "registration_open" => Ok(TournamentStatus::RegistrationOpen),
            "registration_closed" => Ok(TournamentStatus::RegistrationClosed),
            "in_progress" => Ok(TournamentStatus::InProgress),
            "finished" => Ok(TournamentStatus::Finished),
            "cancelled" => Ok(TournamentStatus::Cancelled),
            other => Err(format!("unknown tournament status: {other}")),
        }
    }
}

impl TournamentStatus {
    /// fixture generation is only legal from these states; regeneration while
    /// in progress replaces the previous fixture
    pub fn allows_fixture_generation(&self) -> bool {
        matches!(
            self,
            TournamentStatus::RegistrationClosed | TournamentStatus::InProgress
        )
    }
}

/// scoring rules every match of a tournament is validated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    /// sets a team must win to take the match, typically 2 or 3
    pub sets_to_win: u32,
    /// games a team must reach to take a set, typically 6
    pub games_per_set: u32,
}

/// tournament of one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub status: TournamentStatus,
    pub sets_to_win: u32,
    pub games_per_set: u32,
    pub min_teams: u32,
    pub max_teams: u32,
    pub start_date: NaiveDate,
    /// free form per tournament settings document
    pub settings: serde_json::Value,
    pub fixture_generated_at: Option<DateTime<Utc>>,
    pub fixture_generated_by: Option<Uuid>,
}

impl Tournament {
    pub fn rules(&self) -> MatchRules {
        MatchRules {
            sets_to_win: self.sets_to_win,
            games_per_set: self.games_per_set,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let mut errs = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errs.add(FieldError::required("name"));
        }
        if self.sets_to_win == 0 {
            errs.add(FieldError::new("sets_to_win", "out_of_range").with_message("must be positive"));
        }
        if self.games_per_set == 0 {
            errs.add(
                FieldError::new("games_per_set", "out_of_range").with_message("must be positive"),
            );
        }
        if self.min_teams < 2 {
            errs.add(
                FieldError::new("min_teams", "out_of_range").with_message("at least 2 teams"),
            );
        }
        if self.max_teams < self.min_teams {
            errs.add(
                FieldError::new("max_teams", "out_of_range")
                    .with_message("must not be below min_teams"),
            );
        }
        errs.into_result()
    }

    // --- settings document helpers ---

    fn settings_object_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        if !self.settings.is_object() {
            self.settings = serde_json::Value::Object(serde_json::Map::new());
        }
        self.settings
            .as_object_mut()
            .expect("settings was just coerced to an object")
    }

    /// Remember which config the fixture was generated with; the bracket
    /// advancer reuses it when rescheduling downstream matches.
    pub fn remember_fixture_config(&mut self, config: &FixtureConfig) {
        if let Ok(value) = serde_json::to_value(config) {
            self.settings_object_mut()
                .insert("fixture_config".to_string(), value);
        }
    }

    pub fn stored_fixture_config(&self) -> Option<FixtureConfig> {
        let value = self.settings.get("fixture_config")?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn stamp_group_stage_closed(&mut self, at: DateTime<Utc>) {
        self.settings_object_mut().insert(
            "group_stage_closed_at".to_string(),
            serde_json::Value::String(at.to_rfc3339()),
        );
    }

    pub fn group_stage_closed(&self) -> bool {
        self.settings.get("group_stage_closed_at").is_some()
    }
}
