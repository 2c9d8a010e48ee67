// temporal scheduling of fixture matches

use crate::{
    Match,
    utils::validation::{FieldError, ValidationErrors, ValidationResult},
};
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// serde helper: wall clock times travel as "HH:MM" strings
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(D::Error::custom)
    }
}

/// Recognized fixture options. Every field defaults, so a missing config
/// block schedules with the club standard values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// 0 derives the count from the roster and `teams_per_group`
    pub groups_count: u32,
    pub teams_per_group: u32,
    pub teams_advance_per_group: u32,
    pub match_duration_minutes: u32,
    pub matches_per_day: u32,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// minimum minutes between two matches of the same team
    pub rest_between_matches: u32,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        FixtureConfig {
            groups_count: 0,
            teams_per_group: 4,
            teams_advance_per_group: 2,
            match_duration_minutes: 60,
            matches_per_day: 8,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 is a valid time"),
            end_time: NaiveTime::from_hms_opt(22, 0, 0).expect("22:00 is a valid time"),
            rest_between_matches: 15,
        }
    }
}

impl FixtureConfig {
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errs = ValidationErrors::new();
        if !(3..=8).contains(&self.teams_per_group) {
            errs.add(FieldError::out_of_range("teams_per_group", 3, 8));
        }
        if !(1..=4).contains(&self.teams_advance_per_group) {
            errs.add(FieldError::out_of_range("teams_advance_per_group", 1, 4));
        }
        if self.teams_advance_per_group >= self.teams_per_group {
            errs.add(
                FieldError::new("teams_advance_per_group", "out_of_range")
                    .with_message("cannot advance a whole group"),
            );
        }
        if !(30..=180).contains(&self.match_duration_minutes) {
            errs.add(FieldError::out_of_range("match_duration_minutes", 30, 180));
        }
        if !(1..=20).contains(&self.matches_per_day) {
            errs.add(FieldError::out_of_range("matches_per_day", 1, 20));
        }
        if !(0..=60).contains(&self.rest_between_matches) {
            errs.add(FieldError::out_of_range("rest_between_matches", 0, 60));
        }
        if self.end_time <= self.start_time {
            errs.add(
                FieldError::new("end_time", "out_of_range")
                    .with_message("day must end after it starts"),
            );
        } else if self.slots_per_day() == 0 {
            errs.add(
                FieldError::new("end_time", "out_of_range")
                    .with_message("day window is shorter than one match slot"),
            );
        }
        errs.into_result()
    }

    pub fn match_duration(&self) -> Duration {
        Duration::minutes(self.match_duration_minutes as i64)
    }

    pub fn rest(&self) -> Duration {
        Duration::minutes(self.rest_between_matches as i64)
    }

    /// a slot is one match plus the rest that follows it
    pub fn slot_duration(&self) -> Duration {
        self.match_duration() + self.rest()
    }

    pub fn slots_per_day(&self) -> u32 {
        let window = self.end_time - self.start_time;
        let slot = self.slot_duration().num_minutes();
        if slot <= 0 {
            return 0;
        }
        (window.num_minutes() / slot).max(0) as u32
    }

    /// the day cap and the day window both bound the daily match count
    pub fn matches_scheduled_per_day(&self) -> u32 {
        self.matches_per_day.min(self.slots_per_day())
    }

    pub fn effective_group_count(&self, team_count: usize) -> usize {
        if self.groups_count > 0 {
            self.groups_count as usize
        } else {
            (team_count / self.teams_per_group as usize).max(1)
        }
    }
}

/// Start instant of a slot on the configured day grid.
fn slot_start(config: &FixtureConfig, start_date: NaiveDate, day: u32, slot: u32) -> DateTime<Utc> {
    let date = start_date
        .checked_add_days(Days::new(day as u64))
        .unwrap_or(start_date);
    date.and_time(config.start_time).and_utc() + config.slot_duration() * slot as i32
}

/// Walks fixture matches in order and assigns wall clock start times obeying
/// the day window, the per day cap, and each team's rest.
pub struct Scheduler<'a> {
    config: &'a FixtureConfig,
    start_date: NaiveDate,
    day: u32,
    slot: u32,
    last_match_end: HashMap<Uuid, DateTime<Utc>>,
}

impl<'a> Scheduler<'a> {
    pub fn new(config: &'a FixtureConfig, start_date: NaiveDate) -> Self {
        Scheduler {
            config,
            start_date,
            day: 0,
            slot: 0,
            last_match_end: HashMap::new(),
        }
    }

    fn rest_satisfied(&self, team: Option<Uuid>, at: DateTime<Utc>) -> bool {
        let Some(team) = team else {
            return true;
        };
        match self.last_match_end.get(&team) {
            None => true,
            Some(end) => at - *end >= self.config.rest(),
        }
    }

    /// Assign the next admissible slot to a match between the two teams.
    /// A blocked slot moves the cursor to the next slot, then to the next
    /// day; rest is bounded well below the day window, so this terminates.
    pub fn place(&mut self, team1: Option<Uuid>, team2: Option<Uuid>) -> DateTime<Utc> {
        let per_day = self.config.matches_scheduled_per_day().max(1);
        loop {
            if self.slot >= per_day {
                self.day += 1;
                self.slot = 0;
            }
            let at = slot_start(self.config, self.start_date, self.day, self.slot);
            if self.rest_satisfied(team1, at) && self.rest_satisfied(team2, at) {
                let end = at + self.config.match_duration();
                if let Some(team) = team1 {
                    self.last_match_end.insert(team, end);
                }
                if let Some(team) = team2 {
                    self.last_match_end.insert(team, end);
                }
                self.slot += 1;
                return at;
            }
            self.slot += 1;
        }
    }

    /// Schedule a run of matches in order.
    pub fn schedule(&mut self, matches: &mut [Match]) {
        for m in matches {
            m.scheduled_at = Some(self.place(m.team1_id, m.team2_id));
        }
    }

    /// One idle day between the group stage and the playoffs; rest bookkeeping
    /// does not carry across it.
    pub fn break_between_phases(&mut self) {
        if self.slot > 0 {
            self.day += 1;
            self.slot = 0;
        }
        self.day += 1;
        self.last_match_end.clear();
    }
}

/// First admissible slot at or after `earliest` on the configured day grid,
/// honouring the rest constraint against the given last match ends. Used when
/// the bracket advancer (re)schedules a downstream match.
pub fn next_slot_after(
    config: &FixtureConfig,
    start_date: NaiveDate,
    earliest: DateTime<Utc>,
    last_ends: &[DateTime<Utc>],
) -> DateTime<Utc> {
    let mut day = (earliest.date_naive() - start_date).num_days().max(0) as u32;
    let per_day = config.matches_scheduled_per_day().max(1);
    loop {
        for slot in 0..per_day {
            let at = slot_start(config, start_date, day, slot);
            if at < earliest {
                continue;
            }
            if last_ends.iter().all(|end| at - *end >= config.rest()) {
                return at;
            }
        }
        day += 1;
    }
}
