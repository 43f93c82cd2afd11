//! Game constants: timing, world geometry, spawn jitter, and the scoring ladder.
//!
//! Plain numeric constants with no runtime dependency. Values that a
//! deployment may want to tune also appear as defaults in
//! [`crate::config::MatchConfig`].

pub mod timing {
    /// Length of one match in seconds (7 minutes).
    pub const MATCH_DURATION_SECS: u32 = 420;
    /// Authoritative tick period.
    pub const TICK_INTERVAL_MS: u64 = 1_000;
    /// Per-kind instrument respawn cooldown.
    pub const TOOL_RESPAWN_MS: u64 = 30_000;
}

pub mod phases {
    /// Remaining seconds above which the match is in the early phase.
    pub const EARLY_ABOVE_SECS: u32 = 300;
    /// Remaining seconds above which the match is in the mid phase.
    pub const MID_ABOVE_SECS: u32 = 150;
    /// Remaining seconds above which the match is in the crisis phase.
    pub const CRISIS_ABOVE_SECS: u32 = 30;
}

pub mod world {
    pub const WIDTH: f32 = 3200.0;
    pub const HEIGHT: f32 = 2400.0;
    /// Interaction radius for fixing, pickups, and hatches.
    pub const INTERACT_RANGE: f32 = 60.0;
    /// Squared distance a move must exceed to count as leaving a repair.
    pub const MOVE_CANCEL_THRESHOLD_SQ: f32 = 1.0;
    /// Issue positions are jittered by up to this much on each axis.
    pub const ISSUE_JITTER: f32 = 30.0;
    /// Instrument positions are jittered by up to this much on each axis.
    pub const TOOL_JITTER: f32 = 20.0;
}

pub mod stability {
    pub const MAX: f64 = 100.0;
    pub const MIN: f64 = 0.0;
}

pub mod fixing {
    /// Remaining fix time is multiplied by this when a helper joins.
    pub const HELPER_REMAINING_FACTOR: f64 = 0.6;
}

pub mod scoring {
    pub const POINTS_PER_FIX: i64 = 2;
    /// (minimum score, stars), highest first.
    pub const STAR_LADDER: [(i64, u8); 4] = [(500, 5), (400, 4), (300, 3), (150, 2)];
}
