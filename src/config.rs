//! Simulator configuration.
//!
//! Plain data with sensible defaults; every field can be overridden with a
//! `with_*` setter, and with the `serialize` feature the whole struct can
//! be loaded from JSON.

use crate::error::{DualError, DualResult};

/// Default hard cap on rounds per `run_to_quiescence` call.
pub const DEFAULT_MAX_ROUNDS: u64 = 100;

/// What to do with a topology change that touches an ACTIVE router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "snake_case"))]
pub enum ActiveChangePolicy {
    /// Return an error and leave the topology untouched.
    #[default]
    Reject,
    /// Queue the change; apply it at the end of the first round after
    /// which both endpoints are PASSIVE.
    Defer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct SimConfig {
    /// Hard bound on rounds per run. Reaching it with messages still
    /// pending is reported as non-convergence.
    pub max_rounds: u64,
    pub active_change_policy: ActiveChangePolicy,
    /// Record every delivery in the simulator's trace.
    pub record_trace: bool,
}

impl SimConfig {
    pub fn new() -> Self {
        SimConfig {
            max_rounds: DEFAULT_MAX_ROUNDS,
            active_change_policy: ActiveChangePolicy::Reject,
            record_trace: true,
        }
    }

    /// Defaults, except that changes touching ACTIVE routers are deferred.
    pub fn deferred() -> Self {
        SimConfig::new().with_active_change_policy(ActiveChangePolicy::Defer)
    }

    pub fn with_max_rounds(mut self, max_rounds: u64) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_active_change_policy(mut self, policy: ActiveChangePolicy) -> Self {
        self.active_change_policy = policy;
        self
    }

    pub fn with_trace(mut self, record: bool) -> Self {
        self.record_trace = record;
        self
    }

    pub fn validate(&self) -> DualResult<()> {
        if self.max_rounds == 0 {
            return Err(DualError::InvalidConfig("max_rounds must be at least 1".into()));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take
    /// their defaults.
    #[cfg(feature = "serialize")]
    pub fn from_json(json: &str) -> DualResult<Self> {
        let config: SimConfig =
            serde_json::from_str(json).map_err(|e| DualError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}
