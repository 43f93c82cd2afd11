//! Spawn policy for issues and ground instruments.
//!
//! Every random choice goes through the match's [`MatchRng`] in a fixed
//! order, so a seed plus a sequence of tick times fully determines where and
//! when things appear.

use crate::constants::world;
use crate::issues::definition;
use crate::map::pick_zone;
use crate::rng::MatchRng;
use crate::state::{GroundInstrument, Issue, IssueKind, IssueStatus, Layer, ToolKind};

/// Seconds between issue spawns for a given head count.
pub fn spawn_interval_secs(player_count: u32) -> u32 {
    match player_count {
        0 | 1 => 40,
        2 => 25,
        3 => 17,
        _ => 12,
    }
}

/// Whether an issue spawn is due.
pub fn issue_spawn_due(last_spawn_ms: u64, now_ms: u64, player_count: u32) -> bool {
    let interval_ms = spawn_interval_secs(player_count) as u64 * 1000;
    now_ms.saturating_sub(last_spawn_ms) >= interval_ms
}

/// Whether an instrument of `kind` may respawn: its cooldown has passed and
/// the team has none of that kind on the ground or in inventory.
pub fn tool_respawn_eligible(
    kind: ToolKind,
    last_spawn_ms: u64,
    now_ms: u64,
    cooldown_ms: u64,
    ground: &[GroundInstrument],
    inventory: &[ToolKind],
) -> bool {
    now_ms.saturating_sub(last_spawn_ms) >= cooldown_ms
        && !ground.iter().any(|g| g.kind == kind)
        && !inventory.contains(&kind)
}

/// Where and what to spawn.
pub trait SpawnPolicy {
    /// Layer for the next issue.
    fn issue_layer(&self, rng: &mut MatchRng) -> Layer;

    /// Build a fresh `Active` issue on `layer`.
    fn create_issue(&self, rng: &mut MatchRng, id: String, layer: Layer, now_ms: u64) -> Issue;

    /// Layer for a respawning instrument.
    fn instrument_layer(&self, rng: &mut MatchRng) -> Layer;

    /// Build a ground instrument of `kind` on `layer`.
    fn create_instrument(
        &self,
        rng: &mut MatchRng,
        id: String,
        kind: ToolKind,
        layer: Layer,
        now_ms: u64,
    ) -> GroundInstrument;
}

/// Default policy: weighted layer coin-flips, uniform kind and zone.
#[derive(Debug, Clone, Copy)]
pub struct WeightedSpawn {
    pub issue_deck_weight: f64,
    pub instrument_deck_weight: f64,
}

impl Default for WeightedSpawn {
    fn default() -> Self {
        Self {
            issue_deck_weight: 0.6,
            instrument_deck_weight: 0.7,
        }
    }
}

impl SpawnPolicy for WeightedSpawn {
    fn issue_layer(&self, rng: &mut MatchRng) -> Layer {
        if rng.chance(self.issue_deck_weight) {
            Layer::Deck
        } else {
            Layer::Cargo
        }
    }

    fn create_issue(&self, rng: &mut MatchRng, id: String, layer: Layer, now_ms: u64) -> Issue {
        let kind = IssueKind::ALL[rng.pick_index(IssueKind::ALL.len())];
        let def = definition(kind);
        let zone = pick_zone(rng, layer);
        let x = zone.x + rng.jitter(world::ISSUE_JITTER);
        let y = zone.y + rng.jitter(world::ISSUE_JITTER);

        Issue {
            id,
            kind,
            x,
            y,
            layer,
            spawn_time: now_ms,
            base_fix_time: def.base_fix_secs,
            fix_time_with_tool: def.tool_fix_secs,
            required_tool: def.required_tool,
            stability_reward: def.stability_reward,
            status: IssueStatus::Active,
            required_players: 1,
            fixing_by: Vec::new(),
            fix_started_at: None,
            fix_duration_ms: None,
        }
    }

    fn instrument_layer(&self, rng: &mut MatchRng) -> Layer {
        if rng.chance(self.instrument_deck_weight) {
            Layer::Deck
        } else {
            Layer::Cargo
        }
    }

    fn create_instrument(
        &self,
        rng: &mut MatchRng,
        id: String,
        kind: ToolKind,
        layer: Layer,
        now_ms: u64,
    ) -> GroundInstrument {
        let zone = pick_zone(rng, layer);
        GroundInstrument {
            id,
            kind,
            x: zone.x + rng.jitter(world::TOOL_JITTER),
            y: zone.y + rng.jitter(world::TOOL_JITTER),
            layer,
            spawn_time: now_ms,
        }
    }
}
