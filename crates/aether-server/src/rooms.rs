//! Room registry and lifecycle.
//!
//! Rooms are keyed by a 4-character code in a `DashMap`. Each room sits
//! behind its own `tokio::sync::Mutex`; the registry never holds a map guard
//! while waiting on a room lock.

use std::sync::Arc;
use std::time::Duration;

use aether_logic::{MatchConfig, MatchRuntime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::protocol::{RoomPlayer, ServerMessage};
use crate::ticker::{spawn_ticker, TickHandle};

/// Room code alphabet: no `I`, `O`, `0`, or `1`.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LEN: usize = 4;
/// Code of the persistent room used by clients that never join one.
pub const LEGACY_ROOM_CODE: &str = "LOCAL";

const MAX_CODE_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(String),
    #[error("room {0} has already started")]
    GameStarted(String),
    #[error("room {0} is full")]
    RoomFull(String),
    #[error("only the host can start the game")]
    NotHost,
    #[error("no free room code available")]
    NoFreeCode,
}

impl RoomError {
    /// Code sent in `room_error`.
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::NotFound(_) => "ROOM_NOT_FOUND",
            RoomError::GameStarted(_) => "GAME_STARTED",
            RoomError::RoomFull(_) => "ROOM_FULL",
            RoomError::NotHost => "NOT_HOST",
            RoomError::NoFreeCode => "ROOM_UNAVAILABLE",
        }
    }

    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::RoomError {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// A connected client as seen by its room.
#[derive(Debug, Clone)]
pub struct RoomClient {
    pub player_id: String,
    pub name: String,
    pub tx: Outbox,
}

#[derive(Debug)]
pub struct Room {
    pub code: String,
    pub host_id: String,
    /// Join order; the earliest remaining client inherits host.
    pub clients: Vec<RoomClient>,
    pub runtime: Option<MatchRuntime>,
    pub started: bool,
    /// Never deleted, restarts its match after game over.
    pub persistent: bool,
    pub(crate) game_over_sent: bool,
    /// Set under the lock when the room is torn down. A caller that fetched
    /// the handle before removal must treat the room as gone.
    pub(crate) closed: bool,
    pub(crate) ticker: Option<TickHandle>,
    match_config: MatchConfig,
}

impl Room {
    fn new(code: String, host_id: String, match_config: MatchConfig) -> Self {
        Self {
            code,
            host_id,
            clients: Vec::new(),
            runtime: None,
            started: false,
            persistent: false,
            game_over_sent: false,
            closed: false,
            ticker: None,
            match_config,
        }
    }

    pub fn roster(&self) -> Vec<RoomPlayer> {
        self.clients
            .iter()
            .map(|c| RoomPlayer {
                player_id: c.player_id.clone(),
                name: c.name.clone(),
                is_host: c.player_id == self.host_id,
            })
            .collect()
    }

    pub fn has_client(&self, player_id: &str) -> bool {
        self.clients.iter().any(|c| c.player_id == player_id)
    }

    /// Send to every client. Closed channels are skipped; their owners are
    /// cleaned up by the disconnect path.
    pub fn broadcast(&self, msg: &ServerMessage) {
        for client in &self.clients {
            let _ = client.tx.send(msg.clone());
        }
    }

    pub fn send_to(&self, player_id: &str, msg: ServerMessage) {
        if let Some(client) = self.clients.iter().find(|c| c.player_id == player_id) {
            let _ = client.tx.send(msg);
        }
    }

    pub fn update_message(&self) -> ServerMessage {
        ServerMessage::RoomUpdate {
            room_code: self.code.clone(),
            players: self.roster(),
        }
    }

    /// Add a client, or refresh the channel and name of one already present.
    fn upsert_client(&mut self, client: RoomClient) {
        match self.clients.iter_mut().find(|c| c.player_id == client.player_id) {
            Some(existing) => *existing = client,
            None => self.clients.push(client),
        }
    }

    fn sync_player_count(&mut self) {
        let count = self.clients.len() as u32;
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.set_player_count(count);
        }
    }

    /// Replace the match with a fresh one holding the current roster.
    pub(crate) fn restart_match(&mut self, now_ms: u64) {
        let seed: u32 = rand::thread_rng().gen();
        let mut runtime = MatchRuntime::new(
            format!("{}-{}", self.code, now_ms),
            seed,
            self.match_config.clone(),
            now_ms,
        );
        for client in &self.clients {
            runtime.join_player(&client.player_id, &client.name);
        }
        runtime.set_player_count(self.clients.len() as u32);
        log::info!("room {}: match {} started (seed {})", self.code, runtime.state.match_id, seed);
        self.runtime = Some(runtime);
        self.game_over_sent = false;
    }
}

/// All live rooms.
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Mutex<Room>>>,
    config: ServerConfig,
    clock: Arc<dyn Clock>,
}

impl RoomRegistry {
    pub fn new(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Look up a room. Codes are case-insensitive.
    pub fn get(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms
            .get(&code.to_ascii_uppercase())
            .map(|r| r.value().clone())
    }

    /// Create a room with `player_id` as host and reply `room_created`.
    pub async fn create_room(
        &self,
        player_id: &str,
        player_name: &str,
        tx: Outbox,
    ) -> Result<Arc<Mutex<Room>>, RoomError> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code(&mut rng);
            if let Entry::Vacant(slot) = self.rooms.entry(code.clone()) {
                let mut room = Room::new(
                    code.clone(),
                    player_id.to_string(),
                    self.config.match_config.clone(),
                );
                room.upsert_client(RoomClient {
                    player_id: player_id.to_string(),
                    name: player_name.to_string(),
                    tx,
                });
                room.send_to(
                    player_id,
                    ServerMessage::RoomCreated {
                        room_code: code.clone(),
                        players: room.roster(),
                    },
                );
                let room = Arc::new(Mutex::new(room));
                slot.insert(room.clone());
                log::info!("room {} created by {}", code, player_id);
                return Ok(room);
            }
        }
        Err(RoomError::NoFreeCode)
    }

    /// Join a lobby. Replies `room_joined` and broadcasts `room_update`.
    pub async fn join_room(
        &self,
        code: &str,
        player_id: &str,
        player_name: &str,
        tx: Outbox,
    ) -> Result<Arc<Mutex<Room>>, RoomError> {
        let code = code.to_ascii_uppercase();
        let handle = self.get(&code).ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let mut room = handle.lock().await;
        if room.persistent || room.closed {
            return Err(RoomError::NotFound(code));
        }
        if room.started {
            return Err(RoomError::GameStarted(code));
        }
        if !room.has_client(player_id) && room.clients.len() >= self.config.max_room_players {
            return Err(RoomError::RoomFull(code));
        }
        room.upsert_client(RoomClient {
            player_id: player_id.to_string(),
            name: player_name.to_string(),
            tx,
        });
        room.send_to(
            player_id,
            ServerMessage::RoomJoined {
                room_code: code.clone(),
                players: room.roster(),
            },
        );
        let update = room.update_message();
        room.broadcast(&update);
        log::info!("room {}: {} joined ({} players)", code, player_id, room.clients.len());
        drop(room);
        Ok(handle)
    }

    /// Start the room's match. Host only, once.
    pub async fn start_game(&self, code: &str, player_id: &str) -> Result<(), RoomError> {
        let code = code.to_ascii_uppercase();
        let handle = self.get(&code).ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let mut room = handle.lock().await;
        if room.closed {
            return Err(RoomError::NotFound(code));
        }
        if room.host_id != player_id {
            return Err(RoomError::NotHost);
        }
        if room.started {
            return Err(RoomError::GameStarted(code));
        }
        room.started = true;
        room.restart_match(self.clock.now_ms());
        room.broadcast(&ServerMessage::GameStarting {
            room_code: code.clone(),
        });
        if let Some(runtime) = room.runtime.as_ref() {
            let snapshot = ServerMessage::Snapshot {
                state: runtime.state.clone(),
            };
            room.broadcast(&snapshot);
        }
        room.ticker = Some(self.spawn_room_ticker(&handle));
        Ok(())
    }

    /// Remove a client from a room: abandon their fix, drop them from the
    /// roster, and either delete the room or tell the survivors.
    pub async fn disconnect(&self, code: &str, player_id: &str) {
        let Some(handle) = self.get(code) else {
            return;
        };
        let now = self.clock.now_ms();
        let mut room = handle.lock().await;
        let in_match = room
            .runtime
            .as_ref()
            .and_then(|r| r.player(player_id))
            .is_some();
        if !room.has_client(player_id) && !in_match {
            return;
        }
        if let Some(runtime) = room.runtime.as_mut() {
            runtime.remove_player(player_id, now);
        }
        room.clients.retain(|c| c.player_id != player_id);
        room.sync_player_count();

        if room.clients.is_empty() && !room.persistent {
            room.closed = true;
            room.ticker.take();
            self.rooms.remove(&room.code);
            log::info!("room {} deleted", room.code);
            return;
        }
        if room.host_id == player_id {
            if let Some(next) = room.clients.first().map(|c| c.player_id.clone()) {
                log::info!("room {}: host passed to {}", room.code, next);
                room.host_id = next;
            }
        }
        let update = room.update_message();
        room.broadcast(&update);
        if let Some(runtime) = room.runtime.as_ref() {
            let players = ServerMessage::Players {
                players: runtime.player_views(now),
            };
            room.broadcast(&players);
        }
    }

    /// The persistent legacy room, created and started on first use.
    /// `None` when disabled by config.
    pub fn legacy_room(&self) -> Option<Arc<Mutex<Room>>> {
        if !self.config.legacy_match {
            return None;
        }
        match self.rooms.entry(LEGACY_ROOM_CODE.to_string()) {
            Entry::Occupied(slot) => Some(slot.get().clone()),
            Entry::Vacant(slot) => {
                let mut room = Room::new(
                    LEGACY_ROOM_CODE.to_string(),
                    String::new(),
                    self.config.match_config.clone(),
                );
                room.persistent = true;
                room.started = true;
                room.restart_match(self.clock.now_ms());
                let handle = Arc::new(Mutex::new(room));
                let ticker = self.spawn_room_ticker(&handle);
                // Fresh and unshared, so the lock is free.
                if let Ok(mut room) = handle.try_lock() {
                    room.ticker = Some(ticker);
                }
                slot.insert(handle.clone());
                Some(handle)
            }
        }
    }

    /// Add a client to the legacy room's broadcast list.
    pub async fn join_legacy(
        &self,
        player_id: &str,
        name: &str,
        tx: Outbox,
    ) -> Option<Arc<Mutex<Room>>> {
        let handle = self.legacy_room()?;
        let mut room = handle.lock().await;
        room.upsert_client(RoomClient {
            player_id: player_id.to_string(),
            name: name.to_string(),
            tx,
        });
        if room.host_id.is_empty() {
            room.host_id = player_id.to_string();
        }
        room.sync_player_count();
        drop(room);
        Some(handle)
    }

    fn spawn_room_ticker(&self, handle: &Arc<Mutex<Room>>) -> TickHandle {
        let period = Duration::from_millis(self.config.match_config.tick_interval_ms.max(1));
        spawn_ticker(Arc::downgrade(handle), self.clock.clone(), period)
    }
}

pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
