//! Pure match simulation for Aether Spire.
//!
//! This crate contains all game logic that is independent of any network
//! transport or async runtime. Every operation takes an explicit `now_ms`
//! timestamp, so a match advanced with the same seed and the same sequence
//! of timestamps always produces the same trajectory.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Match tuning (duration, radius, cooldowns, lockouts) |
//! | [`constants`] | Timing, world size, jitter and scoring constants |
//! | [`error`] | Rejection reasons for player intents |
//! | [`fix`] | Fix coordinator: start, join, abandon, complete |
//! | [`intents`] | Tool pickup, hatch transit, door toggles, location pings |
//! | [`issues`] | Issue definitions table and the age-based damage curve |
//! | [`lockout`] | Timed door/hatch lockouts |
//! | [`map`] | Spawn zones and hatch portals for both layers |
//! | [`players`] | Player roster, movement, and fix-progress views |
//! | [`rng`] | Seeded Mulberry32 stream shared by every spawn decision |
//! | [`runtime`] | `MatchRuntime` and the fixed-order 1 Hz tick |
//! | [`score`] | Final score and star rating |
//! | [`spawn`] | Issue and instrument spawn policy |
//! | [`state`] | Wire-visible game state types |

pub mod config;
pub mod constants;
pub mod error;
pub mod fix;
pub mod intents;
pub mod issues;
pub mod lockout;
pub mod map;
pub mod players;
pub mod rng;
pub mod runtime;
pub mod score;
pub mod spawn;
pub mod state;

pub use config::{LockoutConfig, MatchConfig};
pub use error::{FixError, IntentError};
pub use fix::{FixProgress, ToolChoice};
pub use players::{PlayerFixView, PlayerState, PlayerView};
pub use rng::MatchRng;
pub use runtime::{phase_for_time, MatchRuntime};
pub use score::{calculate_score, ScoreCard};
pub use state::{
    GameState, GroundInstrument, Hatch, Issue, IssueKind, IssueStatus, Layer, Lockout,
    LockoutKind, Phase, Point, ToolKind,
};
