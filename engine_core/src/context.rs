// per request ambient context

use chrono::{DateTime, Utc};
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// role of the caller within its tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// owner
    Owner,
    /// admin
    Admin,
    /// player
    #[default]
    Player,
}

impl Role {
    /// owners and admins share the administrative privileges of the engine
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "owner" => Role::Owner,
            "admin" => Role::Admin,
            _ => Role::Player, // default
        }
    }
}

/// Ambient request context. The gateway authenticates the caller and resolves
/// tenant membership before the engine is invoked; the engine itself never
/// sees credentials. `now` is frozen when the context is built so that every
/// timestamp written by one operation is identical.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub tenant_id: Uuid,
    pub profile_id: Uuid,
    pub tenant_user_id: Uuid,
    pub role: Role,
    now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(tenant_id: Uuid, profile_id: Uuid, tenant_user_id: Uuid, role: Role) -> Self {
        RequestContext {
            request_id: Uuid::new_v4(),
            tenant_id,
            profile_id,
            tenant_user_id,
            role,
            now: Utc::now(),
        }
    }

    /// Context for actions performed by the system itself, e.g. the
    /// auto confirmation sweep. Identified by the nil profile.
    pub fn system(tenant_id: Uuid) -> Self {
        RequestContext {
            request_id: Uuid::new_v4(),
            tenant_id,
            profile_id: Uuid::nil(),
            tenant_user_id: Uuid::nil(),
            role: Role::Admin,
            now: Utc::now(),
        }
    }

    /// Pin `now` to a fixed instant.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_system(&self) -> bool {
        self.profile_id.is_nil()
    }
}
