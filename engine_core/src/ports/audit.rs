// audit sink port

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One audit row. The sink schema beyond this envelope is opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub tenant_id: Uuid,
    pub request_id: Uuid,
    /// tenant user performing the write
    pub actor: Uuid,
    /// e.g. "fixture.generated", "result.reported"
    pub action: String,
    pub entity: String,
    pub entity_id: Uuid,
    pub data: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Error)]
pub enum AuditError {
    /// sink failure
    #[error("audit sink failure: {0}")]
    Sink(String),
}

/// audit sink port trait
#[async_trait]
pub trait AuditSinkPort: Send + Sync {
    /// Append one row. Best effort like notifications.
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}
