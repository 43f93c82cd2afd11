//! Match tuning.
//!
//! `MatchConfig::default()` reproduces the standard 7-minute match. A server
//! may load overrides from JSON; every field falls back to its default when
//! omitted.

use serde::{Deserialize, Serialize};

use crate::constants::{fixing, timing, world};

/// Per-match tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchConfig {
    pub duration_secs: u32,
    pub tick_interval_ms: u64,
    pub interact_range: f32,
    pub tool_respawn_ms: u64,
    pub helper_remaining_factor: f64,
    pub move_cancel_threshold_sq: f32,
    /// Timed door/hatch lockouts. `None` disables them.
    pub lockouts: Option<LockoutConfig>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            duration_secs: timing::MATCH_DURATION_SECS,
            tick_interval_ms: timing::TICK_INTERVAL_MS,
            interact_range: world::INTERACT_RANGE,
            tool_respawn_ms: timing::TOOL_RESPAWN_MS,
            helper_remaining_factor: fixing::HELPER_REMAINING_FACTOR,
            move_cancel_threshold_sq: world::MOVE_CANCEL_THRESHOLD_SQ,
            lockouts: None,
        }
    }
}

impl MatchConfig {
    pub fn interact_range_sq(&self) -> f32 {
        self.interact_range * self.interact_range
    }
}

/// Timed lockout schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LockoutConfig {
    pub interval_ms: u64,
    pub duration_ms: u64,
    /// Probability that a lockout targets a door rather than a hatch.
    pub door_chance: f64,
    pub door_ids: Vec<String>,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            interval_ms: 90_000,
            duration_ms: 10_000,
            door_chance: 0.7,
            door_ids: [
                "door-bridge",
                "door-port",
                "door-starboard",
                "door-engine",
                "door-fore-storage",
                "door-aft-storage",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
