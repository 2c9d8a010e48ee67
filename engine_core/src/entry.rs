// enrolment of a team in a tournament

use chrono::{DateTime, Utc};
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// status of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// pending_payment
    #[default]
    PendingPayment,
    /// confirmed
    Confirmed,
    /// withdrawn
    Withdrawn,
    /// disqualified
    Disqualified,
}

impl TryFrom<&str> for EntryStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending_payment" => Ok(EntryStatus::PendingPayment),
            "confirmed" => Ok(EntryStatus::Confirmed),
            "withdrawn" => Ok(EntryStatus::Withdrawn),
            "disqualified" => Ok(EntryStatus::Disqualified),
            other => Err(format!("unknown entry status: {other}")),
        }
    }
}

/// enrolment of one team in one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tournament_id: Uuid,
    pub team_id: Uuid,
    /// optional seeding position, smaller is stronger, None sorts last
    pub seed: Option<u32>,
    pub status: EntryStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn is_confirmed(&self) -> bool {
        self.status == EntryStatus::Confirmed
    }
}
