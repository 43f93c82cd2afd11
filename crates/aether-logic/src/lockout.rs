//! Timed door and hatch lockouts.

use crate::runtime::MatchRuntime;
use crate::state::{Lockout, LockoutKind};

impl MatchRuntime {
    /// Whether the door or hatch `id` is currently locked.
    pub fn is_locked(&self, id: &str, now_ms: u64) -> bool {
        self.state
            .lockouts
            .iter()
            .any(|l| l.id == id && l.ends_at > now_ms)
    }

    /// Expire finished lockouts and start a new one when the interval has
    /// elapsed. Does nothing, and draws nothing, when lockouts are disabled.
    pub(crate) fn update_lockouts(&mut self, now_ms: u64) -> Option<Lockout> {
        let config = self.config.lockouts.as_ref()?;
        self.state.lockouts.retain(|l| l.ends_at > now_ms);

        if now_ms.saturating_sub(self.last_lockout_at) < config.interval_ms {
            return None;
        }
        self.last_lockout_at = now_ms;

        let door = self.rng.chance(config.door_chance);
        let (id, kind) = if door && !config.door_ids.is_empty() {
            let idx = self.rng.pick_index(config.door_ids.len());
            (config.door_ids[idx].clone(), LockoutKind::Door)
        } else if !self.state.hatches.is_empty() {
            let idx = self.rng.pick_index(self.state.hatches.len());
            (self.state.hatches[idx].id.clone(), LockoutKind::Hatch)
        } else {
            return None;
        };

        let lockout = Lockout {
            id,
            kind,
            ends_at: now_ms + config.duration_ms,
        };
        log::info!(
            "match {}: {:?} {} locked until {}",
            self.state.match_id,
            lockout.kind,
            lockout.id,
            lockout.ends_at
        );
        self.state.lockouts.push(lockout.clone());
        Some(lockout)
    }
}
