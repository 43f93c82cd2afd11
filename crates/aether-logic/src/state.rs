//! Wire-visible game state.
//!
//! These types serialize to the JSON shape clients render from: camelCase
//! fields, snake_case enum values. `GameState` is sent whole in every
//! snapshot.

use serde::{Deserialize, Serialize};

/// Kind of malfunction. Each kind maps to a fixed definition in
/// [`crate::issues::definition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    PressureSurge,
    CoolantLeak,
    MechanicalDrift,
    CapacitorOverload,
    FrictionFire,
    ControlCorruption,
}

impl IssueKind {
    pub const ALL: [IssueKind; 6] = [
        IssueKind::PressureSurge,
        IssueKind::CoolantLeak,
        IssueKind::MechanicalDrift,
        IssueKind::CapacitorOverload,
        IssueKind::FrictionFire,
        IssueKind::ControlCorruption,
    ];
}

/// Consumable instrument kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    ArcaneConduit,
    GearWrench,
    ThermalRegulator,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::ArcaneConduit,
        ToolKind::GearWrench,
        ToolKind::ThermalRegulator,
    ];
}

/// One of the two parallel playfields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Deck,
    Cargo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Early,
    Mid,
    Crisis,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Active,
    InProgress,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, x: f32, y: f32) -> f32 {
        let dx = x - self.x;
        let dy = y - self.y;
        dx * dx + dy * dy
    }
}

/// A live repair task.
///
/// Fix times, required tool, and reward are copied from the definition
/// table at spawn, so later table edits never affect an issue in flight.
/// `fix_started_at`/`fix_duration_ms` are set exactly while the issue is
/// `InProgress` and are the single source of truth for every fixer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub x: f32,
    pub y: f32,
    pub layer: Layer,
    pub spawn_time: u64,
    /// Seconds.
    pub base_fix_time: u32,
    /// Seconds.
    pub fix_time_with_tool: u32,
    pub required_tool: ToolKind,
    pub stability_reward: f64,
    pub status: IssueStatus,
    pub required_players: u32,
    pub fixing_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_duration_ms: Option<f64>,
}

impl Issue {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Milliseconds since the authoritative fix start, or `None` when idle.
    pub fn fix_elapsed_ms(&self, now_ms: u64) -> Option<u64> {
        self.fix_started_at.map(|start| now_ms.saturating_sub(start))
    }

    /// Whether the authoritative fix duration has fully elapsed.
    pub fn fix_complete_at(&self, now_ms: u64) -> bool {
        match (self.fix_elapsed_ms(now_ms), self.fix_duration_ms) {
            (Some(elapsed), Some(duration)) => elapsed as f64 >= duration,
            _ => false,
        }
    }

    /// Drop `player_id` from the fixers. Returns `true` if that emptied the
    /// list and the issue reverted to `Active`.
    pub(crate) fn remove_fixer(&mut self, player_id: &str) -> bool {
        self.fixing_by.retain(|id| id != player_id);
        if self.fixing_by.is_empty() && self.status == IssueStatus::InProgress {
            self.status = IssueStatus::Active;
            self.fix_started_at = None;
            self.fix_duration_ms = None;
            return true;
        }
        false
    }
}

/// An instrument lying in the world awaiting pickup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundInstrument {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub x: f32,
    pub y: f32,
    pub layer: Layer,
    pub spawn_time: u64,
}

/// A portal between the two layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hatch {
    pub id: String,
    pub layer_a: Layer,
    pub pos_a: Point,
    pub layer_b: Layer,
    pub pos_b: Point,
}

impl Hatch {
    /// The side a player on `layer` enters from, and the side they exit to.
    pub fn sides_from(&self, layer: Layer) -> Option<((Layer, Point), (Layer, Point))> {
        if layer == self.layer_a {
            Some(((self.layer_a, self.pos_a), (self.layer_b, self.pos_b)))
        } else if layer == self.layer_b {
            Some(((self.layer_b, self.pos_b), (self.layer_a, self.pos_a)))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutKind {
    Door,
    Hatch,
}

/// A temporary lock on a door or hatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockout {
    pub id: String,
    pub kind: LockoutKind,
    pub ends_at: u64,
}

/// Everything a client needs to render the match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub match_id: String,
    pub seed: u32,
    pub phase: Phase,
    pub time_remaining_sec: u32,
    pub next_tick_at: u64,
    pub stability: f64,
    pub issues: Vec<Issue>,
    pub team_inventory: Vec<ToolKind>,
    pub ground_instruments: Vec<GroundInstrument>,
    pub hatches: Vec<Hatch>,
    pub lockouts: Vec<Lockout>,
    pub issues_fixed: u32,
    pub game_over: bool,
    pub won: bool,
}

impl GameState {
    pub fn issue(&self, issue_id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == issue_id)
    }

    pub fn issue_mut(&mut self, issue_id: &str) -> Option<&mut Issue> {
        self.issues.iter_mut().find(|i| i.id == issue_id)
    }

    pub fn active_issue_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.status == IssueStatus::Active)
            .count()
    }
}
