// teams and their members

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// team of two players enrolled through entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// id of team
    pub id: Uuid,
    /// tenant owning the team
    pub tenant_id: Uuid,
    /// name of team
    pub name: String,
}

/// warning issued to a team during incident adjudication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamWarning {
    /// incident the warning stems from
    pub incident_id: Uuid,
    /// verbatim resolution reason
    pub reason: String,
    pub issued_at: DateTime<Utc>,
    /// tenant user of the adjudicating admin
    pub issued_by: Uuid,
}
