//! Per-room tick task.
//!
//! The task holds only a `Weak` to its room, so it winds down on its own
//! once the room is gone; the room's [`TickHandle`] aborts it on drop
//! regardless.

use std::sync::{Arc, Weak};
use std::time::Duration;

use aether_logic::MatchRuntime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::clock::Clock;
use crate::protocol::ServerMessage;
use crate::rooms::Room;

/// Owned handle to a running tick task. Dropping it stops the task.
#[derive(Debug)]
pub struct TickHandle {
    task: JoinHandle<()>,
}

impl TickHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Whether the loop should keep ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

pub fn spawn_ticker(
    room: Weak<Mutex<Room>>,
    clock: Arc<dyn Clock>,
    period: Duration,
) -> TickHandle {
    let task = tokio::spawn(async move {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first interval tick fires immediately; the match starts a
        // full period later.
        ticks.tick().await;
        loop {
            ticks.tick().await;
            let Some(handle) = room.upgrade() else {
                break;
            };
            let mut guard = handle.lock().await;
            if tick_room(&mut guard, clock.now_ms()) == TickFlow::Stop {
                log::debug!("room {}: tick loop finished", guard.code);
                break;
            }
        }
    });
    TickHandle { task }
}

/// One tick of a room: advance the match, broadcast the result, and send
/// `game_over` the first time the match ends.
pub fn tick_room(room: &mut Room, now_ms: u64) -> TickFlow {
    // The persistent match idles while nobody is connected.
    if room.persistent && room.clients.is_empty() {
        return TickFlow::Continue;
    }
    let Some(runtime) = room.runtime.as_mut() else {
        return TickFlow::Continue;
    };
    if runtime.tick(now_ms).is_some() {
        let snapshot = ServerMessage::Snapshot {
            state: runtime.state.clone(),
        };
        let players = ServerMessage::Players {
            players: runtime.player_views(now_ms),
        };
        room.broadcast(&snapshot);
        room.broadcast(&players);
    }

    let over = room.runtime.as_ref().map(MatchRuntime::is_over).unwrap_or(false);
    if !over {
        return TickFlow::Continue;
    }
    if !room.game_over_sent {
        room.game_over_sent = true;
        if let Some(msg) = room.runtime.as_ref().map(game_over_message) {
            log::info!("room {}: game over", room.code);
            room.broadcast(&msg);
        }
    }
    if room.persistent {
        room.restart_match(now_ms);
        TickFlow::Continue
    } else {
        TickFlow::Stop
    }
}

pub fn game_over_message(runtime: &MatchRuntime) -> ServerMessage {
    let card = runtime.score();
    ServerMessage::GameOver {
        won: runtime.state.won,
        score: card.score,
        stars: card.stars,
        issues_fixed: runtime.state.issues_fixed,
        final_stability: runtime.state.stability.round(),
        time_survived: card.time_survived,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_logic::MatchConfig;

    #[test]
    fn test_game_over_reports_rounded_stability() {
        let mut runtime = MatchRuntime::new("m", 1, MatchConfig::default(), 0);
        runtime.state.stability = 75.6;
        runtime.state.time_remaining_sec = 0;
        runtime.state.game_over = true;
        runtime.state.won = true;
        match game_over_message(&runtime) {
            ServerMessage::GameOver {
                final_stability,
                score,
                ..
            } => {
                assert_eq!(final_stability, 76.0);
                assert_eq!(score, runtime.score().score);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
