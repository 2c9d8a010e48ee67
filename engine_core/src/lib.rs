// contains the tournament engine core

mod adjudication;
mod advance;
mod config;
mod context;
mod draw;
mod entry;
mod errors;
mod fixture;
mod incident;
mod match_;
mod ports;
mod progression;
mod results;
mod schedule;
mod scoring;
mod standings;
mod team;
mod tournament;
pub mod utils;

pub use adjudication::*;
pub use config::*;
pub use context::*;
pub use draw::*;
pub use entry::*;
pub use errors::*;
pub use fixture::*;
pub use incident::*;
pub use match_::*;
pub use ports::*;
pub use progression::*;
pub use results::*;
pub use schedule::*;
pub use scoring::*;
pub use standings::*;
pub use team::*;
pub use tournament::*;

use std::sync::Arc;
use tracing::warn;

/// The tournament engine core.
///
/// The engine executes the write operations of the platform (fixture
/// generation, result reporting and confirmation, incident adjudication,
/// group stage closing, the auto confirmation sweep) against the ports it is
/// built with:
/// - the store: serializable transactions and row locks over all shared state
/// - the notification queue: append-only, consumed by delivery downstream
/// - the audit sink: append-only, one row per write
///
/// The gateway constructs one `Engine` at startup and calls it with a fresh
/// [`RequestContext`] per request. Notifications and audit rows are emitted
/// after commit and are best effort: a failure there logs a warning and never
/// rolls back the primary operation.
pub struct Engine {
    pub store: Arc<dyn StorePort>,
    pub notifications: Arc<dyn NotificationPort>,
    pub audit: Arc<dyn AuditSinkPort>,
    pub config: EngineConfig,
}

impl Engine {
    pub(crate) async fn publish_notification(&self, notification: Notification) {
        if let Err(error) = self.notifications.publish(notification).await {
            warn!(error = %error, "notification_publish_failed");
        }
    }

    pub(crate) async fn record_audit(&self, event: AuditEvent) {
        if let Err(error) = self.audit.record(event).await {
            warn!(error = %error, "audit_record_failed");
        }
    }
}

pub struct NoStore {}
pub struct NoNotify {}
pub struct NoAudit {}

pub struct DynStore(Arc<dyn StorePort>);
pub struct DynNotify(Arc<dyn NotificationPort>);
pub struct DynAudit(Arc<dyn AuditSinkPort>);

/// Builder forcing all three ports to be present before an engine exists.
pub struct EngineBuilder<S, N, A> {
    state_store: S,
    state_notify: N,
    state_audit: A,
    config: EngineConfig,
}

impl EngineBuilder<NoStore, NoNotify, NoAudit> {
    pub fn new() -> Self {
        EngineBuilder {
            state_store: NoStore {},
            state_notify: NoNotify {},
            state_audit: NoAudit {},
            config: EngineConfig::default(),
        }
    }
}

impl Default for EngineBuilder<NoStore, NoNotify, NoAudit> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N, A> EngineBuilder<S, N, A> {
    pub fn set_store(self, store: Arc<dyn StorePort>) -> EngineBuilder<DynStore, N, A> {
        EngineBuilder {
            state_store: DynStore(store),
            state_notify: self.state_notify,
            state_audit: self.state_audit,
            config: self.config,
        }
    }

    pub fn set_notifications(
        self,
        notifications: Arc<dyn NotificationPort>,
    ) -> EngineBuilder<S, DynNotify, A> {
        EngineBuilder {
            state_store: self.state_store,
            state_notify: DynNotify(notifications),
            state_audit: self.state_audit,
            config: self.config,
        }
    }

    pub fn set_audit(self, audit: Arc<dyn AuditSinkPort>) -> EngineBuilder<S, N, DynAudit> {
        EngineBuilder {
            state_store: self.state_store,
            state_notify: self.state_notify,
            state_audit: DynAudit(audit),
            config: self.config,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

impl EngineBuilder<DynStore, DynNotify, DynAudit> {
    pub fn build(self) -> Engine {
        Engine {
            store: self.state_store.0,
            notifications: self.state_notify.0,
            audit: self.state_audit.0,
            config: self.config,
        }
    }
}
