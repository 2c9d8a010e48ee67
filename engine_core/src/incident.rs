// operational incidents and their resolution actions

use chrono::{DateTime, Utc};
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// type of incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    /// injury
    Injury,
    /// no_show
    NoShow,
    /// dispute
    Dispute,
    /// weather
    Weather,
    /// equipment
    Equipment,
    /// misconduct
    Misconduct,
    /// other
    Other,
}

impl TryFrom<&str> for IncidentKind {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "injury" => Ok(IncidentKind::Injury),
            "no_show" => Ok(IncidentKind::NoShow),
            "dispute" => Ok(IncidentKind::Dispute),
            "weather" => Ok(IncidentKind::Weather),
            "equipment" => Ok(IncidentKind::Equipment),
            "misconduct" => Ok(IncidentKind::Misconduct),
            "other" => Ok(IncidentKind::Other),
            other => Err(format!("unknown incident kind: {other}")),
        }
    }
}

/// severity of incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    /// low
    Low,
    /// medium
    Medium,
    /// high
    High,
    /// critical
    Critical,
}

impl TryFrom<&str> for IncidentSeverity {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "low" => Ok(IncidentSeverity::Low),
            "medium" => Ok(IncidentSeverity::Medium),
            "high" => Ok(IncidentSeverity::High),
            "critical" => Ok(IncidentSeverity::Critical),
            other => Err(format!("unknown incident severity: {other}")),
        }
    }
}

/// operational incident raised during a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tournament_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub affected_team_id: Option<Uuid>,
    pub kind: IncidentKind,
    pub severity: IncidentSeverity,
    pub title: String,
    pub description: String,
    /// tenant user who raised the incident
    pub reported_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// structured payload, e.g. the reported sets of a dispute
    pub data: serde_json::Value,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
}

impl Incident {
    /// Incident opened automatically when a pending result is disputed.
    #[allow(clippy::too_many_arguments)]
    pub fn dispute(
        tenant_id: Uuid,
        tournament_id: Uuid,
        match_id: Uuid,
        bracket_position: &str,
        reason: &str,
        reported_sets: serde_json::Value,
        reported_by: Uuid,
        at: DateTime<Utc>,
    ) -> Self {
        Incident {
            id: Uuid::new_v4(),
            tenant_id,
            tournament_id: Some(tournament_id),
            match_id: Some(match_id),
            affected_team_id: None,
            kind: IncidentKind::Dispute,
            severity: IncidentSeverity::Medium,
            title: format!("Resultado en disputa: {bracket_position}"),
            description: reason.to_string(),
            reported_by,
            created_at: at,
            data: reported_sets,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
        }
    }

    /// resolved incidents are immutable
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some() && self.resolved_by.is_some()
    }

    pub fn resolve(&mut self, by: Uuid, at: DateTime<Utc>, notes: String) {
        self.resolved_by = Some(by);
        self.resolved_at = Some(at);
        self.resolution_notes = Some(notes);
    }
}

/// Resolution action an admin takes on an incident, with the arguments the
/// action requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResolutionAction {
    /// close the incident without further effect
    Dismiss,
    /// append a warning to the affected team
    Warn,
    /// disqualify the affected team from the tournament
    Disqualify,
    /// postpone the linked match, optionally to a new time
    Reschedule {
        #[serde(default)]
        reschedule_to: Option<DateTime<Utc>>,
    },
    /// decide the linked match by admin fiat
    OverrideResult { override_winner_id: Uuid },
}

impl ResolutionAction {
    /// snake_case name used on the wire and in audit rows
    pub fn slug(&self) -> &'static str {
        match self {
            ResolutionAction::Dismiss => "dismiss",
            ResolutionAction::Warn => "warn",
            ResolutionAction::Disqualify => "disqualify",
            ResolutionAction::Reschedule { .. } => "reschedule",
            ResolutionAction::OverrideResult { .. } => "override_result",
        }
    }

    /// upper case tag prefixed to the stored resolution notes
    pub fn tag(&self) -> &'static str {
        match self {
            ResolutionAction::Dismiss => "DISMISS",
            ResolutionAction::Warn => "WARN",
            ResolutionAction::Disqualify => "DISQUALIFY",
            ResolutionAction::Reschedule { .. } => "RESCHEDULE",
            ResolutionAction::OverrideResult { .. } => "OVERRIDE_RESULT",
        }
    }
}
