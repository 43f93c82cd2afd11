//! Player roster, movement, and the per-player view sent in `players`
//! broadcasts.

use serde::{Deserialize, Serialize};

use crate::runtime::MatchRuntime;
use crate::state::Layer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub player_id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub layer: Layer,
}

impl PlayerState {
    fn new(player_id: &str, name: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            name: name.to_string(),
            x: 0.0,
            y: 0.0,
            layer: Layer::Deck,
        }
    }
}

/// Fix progress as rendered by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerFixView {
    pub issue_id: String,
    /// 0.0 to 1.0.
    pub progress: f64,
    pub start_time: u64,
    pub duration_ms: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    #[serde(flatten)]
    pub player: PlayerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_progress: Option<PlayerFixView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub moved: bool,
    pub fix_cancelled: bool,
}

impl MatchRuntime {
    /// Register a player, or rename one already known.
    pub fn join_player(&mut self, player_id: &str, name: &str) -> &PlayerState {
        let player = self
            .players
            .entry(player_id.to_string())
            .or_insert_with(|| PlayerState::new(player_id, name));
        player.name = name.to_string();
        player
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.get(player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    /// Move a player. An unknown id registers a new player under its own id.
    /// Leaving the current position by more than the cancel threshold
    /// abandons any repair in progress.
    pub fn move_player(&mut self, player_id: &str, x: f32, y: f32, now_ms: u64) -> MoveOutcome {
        let threshold = self.config.move_cancel_threshold_sq;
        let player = self
            .players
            .entry(player_id.to_string())
            .or_insert_with(|| PlayerState::new(player_id, player_id));
        let dx = x - player.x;
        let dy = y - player.y;
        let moved_far = dx * dx + dy * dy > threshold;
        player.x = x;
        player.y = y;

        let fix_cancelled = moved_far
            && self.fix_progress.contains_key(player_id)
            && self.abandon_fix_unless_elapsed(player_id, now_ms);
        MoveOutcome {
            moved: true,
            fix_cancelled,
        }
    }

    /// Drop a player entirely, abandoning their repair first.
    pub fn remove_player(&mut self, player_id: &str, now_ms: u64) -> Option<PlayerState> {
        if !self.abandon_fix_unless_elapsed(player_id, now_ms) {
            // Completion pending: the next tick still credits the repair,
            // only the progress entry goes.
            self.fix_progress.remove(player_id);
        }
        self.players.remove(player_id)
    }

    pub fn set_player_count(&mut self, count: u32) {
        self.player_count = count;
    }

    /// Roster with fix progress read from the authoritative issue timing.
    pub fn player_views(&self, now_ms: u64) -> Vec<PlayerView> {
        self.players
            .values()
            .map(|player| PlayerView {
                player: player.clone(),
                fix_progress: self.fix_view(&player.player_id, now_ms),
            })
            .collect()
    }

    fn fix_view(&self, player_id: &str, now_ms: u64) -> Option<PlayerFixView> {
        let progress = self.fix_progress.get(player_id)?;
        let issue = self.state.issue(&progress.issue_id);
        let start_time = issue
            .and_then(|i| i.fix_started_at)
            .unwrap_or(progress.started_at);
        let duration_ms = issue
            .and_then(|i| i.fix_duration_ms)
            .unwrap_or(progress.duration_ms);

        let fraction = if duration_ms > 0.0 {
            (now_ms.saturating_sub(start_time) as f64 / duration_ms).min(1.0)
        } else {
            1.0
        };
        let secs = (duration_ms / 1000.0).ceil() as u64;
        let label = match progress.tool_used {
            Some(_) => format!("Fixing with tool ({secs}s)"),
            None => format!("Fixing manually ({secs}s)"),
        };
        Some(PlayerFixView {
            issue_id: progress.issue_id.clone(),
            progress: fraction,
            start_time,
            duration_ms,
            label,
        })
    }
}
