// engine wide configuration

use std::env;

/// Tuning knobs of the engine. Values come from the environment where set,
/// with the documented defaults otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// hours a pending result may wait before the maintenance sweep
    /// confirms it on behalf of the silent opponent
    pub confirmation_window_hours: u32,
    /// hours a stored idempotency response stays authoritative
    pub idempotency_ttl_hours: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            confirmation_window_hours: 24,
            idempotency_ttl_hours: 24,
        }
    }
}

impl EngineConfig {
    /// Reads overrides from `ENGINE_CONFIRMATION_WINDOW_HOURS` and
    /// `ENGINE_IDEMPOTENCY_TTL_HOURS`. Unparsable values fall back to the
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();
        if let Ok(raw) = env::var("ENGINE_CONFIRMATION_WINDOW_HOURS")
            && let Ok(hours) = raw.parse()
        {
            config.confirmation_window_hours = hours;
        }
        if let Ok(raw) = env::var("ENGINE_IDEMPOTENCY_TTL_HOURS")
            && let Ok(hours) = raw.parse()
        {
            config.idempotency_ttl_hours = hours;
        }
        config
    }
}
