//! Player intents besides fixing: tool pickup, hatch transit, doors, and
//! location pings.

use serde::{Deserialize, Serialize};

use crate::error::IntentError;
use crate::runtime::MatchRuntime;
use crate::state::{Layer, ToolKind};

/// Result of a successful hatch transit, unicast back to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HatchTransit {
    pub player_id: String,
    pub hatch_id: String,
    pub to_layer: Layer,
    pub to_x: f32,
    pub to_y: f32,
    #[serde(skip)]
    pub fix_cancelled: bool,
}

/// A "look here" marker relayed to every client in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPing {
    pub player_id: String,
    pub player_name: String,
    pub x: f32,
    pub y: f32,
    pub layer: Layer,
    pub timestamp: u64,
}

impl MatchRuntime {
    /// Move a ground instrument into the team inventory.
    pub fn pickup_tool(
        &mut self,
        player_id: &str,
        instrument_id: &str,
    ) -> Result<ToolKind, IntentError> {
        if self.state.game_over {
            return Err(IntentError::MatchOver);
        }
        let player = self
            .players
            .get(player_id)
            .ok_or_else(|| IntentError::UnknownPlayer(player_id.to_string()))?;
        let idx = self
            .state
            .ground_instruments
            .iter()
            .position(|g| g.id == instrument_id)
            .ok_or_else(|| IntentError::UnknownInstrument(instrument_id.to_string()))?;
        let instrument = &self.state.ground_instruments[idx];
        if player.layer != instrument.layer {
            return Err(IntentError::WrongLayer(instrument_id.to_string()));
        }
        let dx = instrument.x - player.x;
        let dy = instrument.y - player.y;
        if dx * dx + dy * dy > self.config.interact_range_sq() {
            return Err(IntentError::OutOfRange(instrument_id.to_string()));
        }

        let instrument = self.state.ground_instruments.remove(idx);
        self.state.team_inventory.push(instrument.kind);
        log::debug!(
            "match {}: {} picked up {:?}",
            self.state.match_id,
            player_id,
            instrument.kind
        );
        Ok(instrument.kind)
    }

    /// Climb through a hatch to the other layer.
    pub fn use_hatch(
        &mut self,
        player_id: &str,
        hatch_id: &str,
        now_ms: u64,
    ) -> Result<HatchTransit, IntentError> {
        if self.state.game_over {
            return Err(IntentError::MatchOver);
        }
        let player = self
            .players
            .get(player_id)
            .ok_or_else(|| IntentError::UnknownPlayer(player_id.to_string()))?;
        let hatch = self
            .state
            .hatches
            .iter()
            .find(|h| h.id == hatch_id)
            .ok_or_else(|| IntentError::UnknownHatch(hatch_id.to_string()))?;
        let ((_, entry), (to_layer, exit)) = hatch
            .sides_from(player.layer)
            .ok_or_else(|| IntentError::WrongLayer(hatch_id.to_string()))?;
        if entry.distance_sq(player.x, player.y) > self.config.interact_range_sq() {
            return Err(IntentError::OutOfRange(hatch_id.to_string()));
        }
        if self.is_locked(hatch_id, now_ms) {
            return Err(IntentError::Locked(hatch_id.to_string()));
        }

        let fix_cancelled = self.fix_progress.contains_key(player_id)
            && self.abandon_fix_unless_elapsed(player_id, now_ms);
        if let Some(player) = self.players.get_mut(player_id) {
            player.layer = to_layer;
            player.x = exit.x;
            player.y = exit.y;
        }
        Ok(HatchTransit {
            player_id: player_id.to_string(),
            hatch_id: hatch_id.to_string(),
            to_layer,
            to_x: exit.x,
            to_y: exit.y,
            fix_cancelled,
        })
    }

    /// Open or close a door.
    pub fn set_door(&mut self, door_id: &str, open: bool, now_ms: u64) -> Result<(), IntentError> {
        if self.is_locked(door_id, now_ms) {
            return Err(IntentError::Locked(door_id.to_string()));
        }
        self.doors.insert(door_id.to_string(), open);
        Ok(())
    }

    /// Door id to open flag, for `doors` broadcasts.
    pub fn doors(&self) -> &std::collections::BTreeMap<String, bool> {
        &self.doors
    }

    /// Build a location ping. When `layer` is omitted the player's own layer
    /// is used; unknown players ping from the deck under their id.
    pub fn location_ping(
        &self,
        player_id: &str,
        x: f32,
        y: f32,
        layer: Option<Layer>,
        now_ms: u64,
    ) -> LocationPing {
        let player = self.players.get(player_id);
        LocationPing {
            player_id: player_id.to_string(),
            player_name: player
                .map(|p| p.name.clone())
                .unwrap_or_else(|| player_id.to_string()),
            x,
            y,
            layer: layer
                .or_else(|| player.map(|p| p.layer))
                .unwrap_or(Layer::Deck),
            timestamp: now_ms,
        }
    }
}
