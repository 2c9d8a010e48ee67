// notification queue port

use async_trait::async_trait;
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// kind of notification event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// result_reported
    ResultReported,
    /// result_pending_confirmation
    ResultPendingConfirmation,
    /// result_confirmed
    ResultConfirmed,
    /// result_disputed
    ResultDisputed,
    /// incident_resolved
    IncidentResolved,
}

/// One record appended to the notification queue. Delivery happens outside
/// the core; producers never read the queue back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub tenant_id: Uuid,
    pub kind: NotificationKind,
    /// deduplicated profile ids
    pub recipients: Vec<Uuid>,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Error)]
pub enum NotifyError {
    /// queue failure
    #[error("notification queue failure: {0}")]
    Queue(String),
}

/// notification queue port trait
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Append one record. Emission is best effort: callers log failures and
    /// never fail the primary operation over them.
    async fn publish(&self, notification: Notification) -> Result<(), NotifyError>;
}
