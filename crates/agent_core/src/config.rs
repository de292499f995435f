//! Tunable parameters collected in one place, loadable from a RON file.
//!
//! Every field here shadows a constant that used to live next to the
//! code it tuned; the constant still provides the default so a caller
//! that never touches configuration sees identical behavior.

use crate::error::{AgentError, AgentResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for a running agent. Deserializes from RON;
/// any field omitted from a config file falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub pathfinder: PathfinderConfig,
    pub scheduler: SchedulerConfig,
    pub mine_planner: MinePlannerConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Tiles per tick a walking player covers; mirrors [`crate::action::WALKING_SPEED`].
    pub walking_speed: f64,
    /// Heuristic overestimate factor; mirrors [`crate::pathfinder::OVERESTIMATE`].
    pub overestimate: f64,
    /// Default capacity of the LRU path cache a fresh world is built with.
    pub path_cache_capacity: usize,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            walking_speed: crate::action::WALKING_SPEED,
            overestimate: crate::pathfinder::OVERESTIMATE,
            path_cache_capacity: crate::bootstrap::DEFAULT_PATH_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds a lower-priority task may delay a higher-priority one
    /// before the scheduler treats the inversion as a feasibility
    /// failure; mirrors [`crate::scheduler::PRIORITY_INVERSION_GRACE_SECONDS`].
    pub priority_inversion_grace_seconds: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { priority_inversion_grace_seconds: crate::scheduler::PRIORITY_INVERSION_GRACE_SECONDS }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinePlannerConfig {
    /// Default miners-per-belt-side bound used when a caller doesn't
    /// specify one explicitly in a `MinePlanRequest`.
    pub default_side_max: u32,
}

impl Default for MinePlannerConfig {
    fn default() -> Self {
        Self { default_side_max: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Ticks a tentatively-removed entity is held in limbo before being
    /// dropped for good; mirrors `telemetry`'s `PENDING_TIMEOUT_TICKS`.
    pub pending_timeout_ticks: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { pending_timeout_ticks: 10 }
    }
}

impl AgentConfig {
    pub fn from_ron_str(text: &str) -> AgentResult<Self> {
        ron::from_str(text).map_err(AgentError::Config)
    }

    pub fn to_ron_string(&self) -> AgentResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| AgentError::Invariant(format!("failed to serialize config: {e}")))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> AgentResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AgentError::Invariant(format!("failed to read config {:?}: {e}", path.as_ref())))?;
        Self::from_ron_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_ron() {
        let config = AgentConfig::default();
        let text = config.to_ron_string().unwrap();
        let parsed = AgentConfig::from_ron_str(&text).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn partial_ron_fills_in_defaults() {
        let parsed = AgentConfig::from_ron_str("(scheduler: (priority_inversion_grace_seconds: 30.0))").unwrap();
        assert_eq!(parsed.scheduler.priority_inversion_grace_seconds, 30.0);
        assert_eq!(parsed.pathfinder.overestimate, PathfinderConfig::default().overestimate);
    }
}
