//! Intent dispatch.
//!
//! Lobby intents go through the [`RoomRegistry`]. Match intents lock the
//! client's room, apply to its [`MatchRuntime`], and broadcast what changed.
//! Rejected match intents are logged at debug level and otherwise dropped.

use std::sync::Arc;

use aether_logic::MatchRuntime;
use tokio::sync::Mutex;

use crate::protocol::{parse_client_message, ClientMessage, DoorState, ServerMessage};
use crate::rooms::{Outbox, Room, RoomRegistry, LEGACY_ROOM_CODE};

/// Per-connection state.
#[derive(Debug)]
pub struct ClientContext {
    pub player_id: Option<String>,
    pub room_code: Option<String>,
    pub tx: Outbox,
}

impl ClientContext {
    pub fn new(tx: Outbox) -> Self {
        Self {
            player_id: None,
            room_code: None,
            tx,
        }
    }

    fn reply(&self, msg: ServerMessage) {
        let _ = self.tx.send(msg);
    }
}

#[derive(Clone)]
pub struct Handler {
    registry: Arc<RoomRegistry>,
}

impl Handler {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Decode and handle one raw line.
    pub async fn handle_line(&self, ctx: &mut ClientContext, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match parse_client_message(line) {
            Ok(msg) => self.handle_message(ctx, msg).await,
            Err(err) => {
                log::debug!("rejected line: {}", err);
                ctx.reply(err.to_message());
            }
        }
    }

    pub async fn handle_message(&self, ctx: &mut ClientContext, msg: ClientMessage) {
        match msg {
            ClientMessage::CreateRoom {
                player_id,
                player_name,
            } => {
                self.leave_current(ctx).await;
                match self
                    .registry
                    .create_room(&player_id, &player_name, ctx.tx.clone())
                    .await
                {
                    Ok(room) => {
                        ctx.room_code = Some(room.lock().await.code.clone());
                        ctx.player_id = Some(player_id);
                    }
                    Err(err) => ctx.reply(err.to_message()),
                }
            }
            ClientMessage::JoinRoom {
                room_code,
                player_id,
                player_name,
            } => {
                if ctx.room_code.as_deref().map(str::to_ascii_uppercase)
                    != Some(room_code.to_ascii_uppercase())
                {
                    self.leave_current(ctx).await;
                }
                match self
                    .registry
                    .join_room(&room_code, &player_id, &player_name, ctx.tx.clone())
                    .await
                {
                    Ok(_) => {
                        ctx.room_code = Some(room_code.to_ascii_uppercase());
                        ctx.player_id = Some(player_id);
                    }
                    Err(err) => ctx.reply(err.to_message()),
                }
            }
            ClientMessage::StartGame {
                room_code,
                player_id,
            } => {
                if let Err(err) = self.registry.start_game(&room_code, &player_id).await {
                    ctx.reply(err.to_message());
                }
            }
            ClientMessage::Ping { sent_at } => ctx.reply(ServerMessage::Pong {
                sent_at,
                server_time: self.registry.now_ms(),
            }),
            ClientMessage::Join { player_id, name } => self.join(ctx, player_id, name).await,
            other => self.handle_match_intent(ctx, other).await,
        }
    }

    /// Register in the current room's match, or in the legacy match when the
    /// client has no room.
    async fn join(&self, ctx: &mut ClientContext, player_id: String, name: String) {
        let handle = match ctx.room_code.as_deref() {
            Some(code) => self.registry.get(code),
            None => {
                let handle = self
                    .registry
                    .join_legacy(&player_id, &name, ctx.tx.clone())
                    .await;
                if handle.is_some() {
                    ctx.room_code = Some(LEGACY_ROOM_CODE.to_string());
                }
                handle
            }
        };
        let Some(handle) = handle else {
            ctx.reply(ServerMessage::error("ROOM_NOT_FOUND", "no room to join"));
            return;
        };
        ctx.player_id = Some(player_id.clone());

        let now = self.registry.now_ms();
        let mut room = handle.lock().await;
        let Some(runtime) = room.runtime.as_mut() else {
            log::debug!("join from {} before the match started", player_id);
            return;
        };
        runtime.join_player(&player_id, &name);
        let outgoing = [
            players_message(runtime, now),
            doors_message(runtime),
            snapshot_message(runtime),
        ];
        for msg in &outgoing {
            room.broadcast(msg);
        }
    }

    async fn handle_match_intent(&self, ctx: &mut ClientContext, msg: ClientMessage) {
        let Some(handle) = self.match_room(ctx) else {
            ctx.reply(ServerMessage::error("ROOM_NOT_FOUND", "not in a room"));
            return;
        };
        let now = self.registry.now_ms();
        let mut room = handle.lock().await;
        if room.runtime.is_none() {
            log::debug!("room {}: intent before game start dropped", room.code);
            return;
        }
        apply_match_intent(&mut room, ctx, msg, now);
    }

    /// The room whose match this client's intents act on.
    fn match_room(&self, ctx: &ClientContext) -> Option<Arc<Mutex<Room>>> {
        match ctx.room_code.as_deref() {
            Some(code) => self.registry.get(code),
            None => self.registry.legacy_room(),
        }
    }

    async fn leave_current(&self, ctx: &mut ClientContext) {
        if let (Some(code), Some(player_id)) = (ctx.room_code.take(), ctx.player_id.as_deref()) {
            self.registry.disconnect(&code, player_id).await;
        }
    }

    /// Connection closed: run the same cleanup as leaving.
    pub async fn disconnect(&self, ctx: &mut ClientContext) {
        self.leave_current(ctx).await;
        ctx.player_id = None;
    }
}

fn players_message(runtime: &MatchRuntime, now_ms: u64) -> ServerMessage {
    ServerMessage::Players {
        players: runtime.player_views(now_ms),
    }
}

fn doors_message(runtime: &MatchRuntime) -> ServerMessage {
    ServerMessage::Doors {
        doors: DoorState::list(runtime.doors()),
    }
}

fn snapshot_message(runtime: &MatchRuntime) -> ServerMessage {
    ServerMessage::Snapshot {
        state: runtime.state.clone(),
    }
}

/// Apply one match intent to a locked room. Runs entirely under the room
/// lock with no awaits.
fn apply_match_intent(room: &mut Room, ctx: &ClientContext, msg: ClientMessage, now: u64) {
    let code = room.code.clone();
    let Some(runtime) = room.runtime.as_mut() else {
        return;
    };
    let mut outgoing: Vec<ServerMessage> = Vec::new();

    match msg {
        ClientMessage::Move { player_id, x, y } => {
            let outcome = runtime.move_player(&player_id, x, y, now);
            if outcome.fix_cancelled {
                outgoing.push(snapshot_message(runtime));
            }
            outgoing.push(players_message(runtime, now));
        }
        ClientMessage::Door { door_id, open } => match runtime.set_door(&door_id, open, now) {
            Ok(()) => outgoing.push(doors_message(runtime)),
            Err(err) => log::debug!("room {}: door rejected: {}", code, err),
        },
        ClientMessage::StartFix {
            player_id,
            issue_id,
            tool_choice,
        } => match runtime.start_fix(&player_id, &issue_id, tool_choice, now) {
            Ok(_) => {
                outgoing.push(snapshot_message(runtime));
                outgoing.push(players_message(runtime, now));
            }
            Err(err) => {
                log::debug!("room {}: start_fix from {} rejected: {}", code, player_id, err)
            }
        },
        ClientMessage::CancelFix { player_id } => match runtime.cancel_fix(&player_id, now) {
            Ok(()) => {
                outgoing.push(snapshot_message(runtime));
                outgoing.push(players_message(runtime, now));
            }
            Err(err) => {
                log::debug!("room {}: cancel_fix from {} rejected: {}", code, player_id, err)
            }
        },
        ClientMessage::PickupTool {
            player_id,
            instrument_id,
        } => match runtime.pickup_tool(&player_id, &instrument_id) {
            Ok(_) => outgoing.push(snapshot_message(runtime)),
            Err(err) => log::debug!("room {}: pickup from {} rejected: {}", code, player_id, err),
        },
        ClientMessage::PingLocation {
            player_id,
            x,
            y,
            layer,
        } => {
            let ping = runtime.location_ping(&player_id, x, y, layer, now);
            outgoing.push(ServerMessage::PingLocation(ping));
        }
        ClientMessage::UseHatch {
            player_id,
            hatch_id,
        } => match runtime.use_hatch(&player_id, &hatch_id, now) {
            Ok(transit) => {
                if transit.fix_cancelled {
                    outgoing.push(snapshot_message(runtime));
                }
                outgoing.push(players_message(runtime, now));
                ctx.reply(ServerMessage::ServerHatch(transit));
            }
            Err(err) => log::debug!("room {}: hatch from {} rejected: {}", code, player_id, err),
        },
        other => log::debug!("room {}: {:?} is not a match intent", code, other),
    }

    for msg in &outgoing {
        room.broadcast(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ServerConfig;
    use aether_logic::{Layer, ToolKind};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    struct Client {
        ctx: ClientContext,
        rx: UnboundedReceiver<ServerMessage>,
    }

    impl Client {
        fn new() -> Self {
            let (tx, rx) = unbounded_channel();
            Self {
                ctx: ClientContext::new(tx),
                rx,
            }
        }

        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg);
            }
            out
        }
    }

    fn handler() -> (Handler, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(5_000));
        let registry = Arc::new(RoomRegistry::new(ServerConfig::default(), clock.clone()));
        (Handler::new(registry), clock)
    }

    #[tokio::test]
    async fn test_bad_json_and_unknown() {
        let (h, _) = handler();
        let mut c = Client::new();
        h.handle_line(&mut c.ctx, "{{{").await;
        h.handle_line(&mut c.ctx, r#"{"type":"teleport"}"#).await;
        let msgs = c.drain();
        assert!(matches!(&msgs[0], ServerMessage::Error { code, .. } if code == "BAD_JSON"));
        assert!(matches!(&msgs[1], ServerMessage::Error { code, .. } if code == "UNKNOWN"));
        assert!(h.registry().is_empty());
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (h, clock) = handler();
        clock.set(9_999);
        let mut c = Client::new();
        h.handle_line(&mut c.ctx, r#"{"type":"ping","sentAt":1234}"#).await;
        assert_eq!(
            c.drain(),
            vec![ServerMessage::Pong {
                sent_at: 1234,
                server_time: 9_999
            }]
        );
    }

    #[tokio::test]
    async fn test_room_error_reply() {
        let (h, _) = handler();
        let mut c = Client::new();
        h.handle_line(
            &mut c.ctx,
            r#"{"type":"join_room","roomCode":"QQQQ","playerId":"p","playerName":"P"}"#,
        )
        .await;
        assert!(matches!(
            &c.drain()[..],
            [ServerMessage::RoomError { code, .. }] if code == "ROOM_NOT_FOUND"
        ));
        assert!(c.ctx.room_code.is_none());
    }

    #[tokio::test]
    async fn test_room_flow_to_pickup() {
        let (h, clock) = handler();
        let mut host = Client::new();
        h.handle_line(
            &mut host.ctx,
            r#"{"type":"create_room","playerId":"h","playerName":"Hana"}"#,
        )
        .await;
        let code = host.ctx.room_code.clone().unwrap();
        h.handle_line(
            &mut host.ctx,
            &format!(r#"{{"type":"start_game","roomCode":"{code}","playerId":"h"}}"#),
        )
        .await;
        host.drain();

        // Put an instrument and the host side by side, then pick it up.
        let handle = h.registry().get(&code).unwrap();
        let (inst_id, x, y) = {
            let mut room = handle.lock().await;
            room.ticker.take();
            let runtime = room.runtime.as_mut().unwrap();
            let inst = runtime.state.ground_instruments[0].clone();
            (inst.id, inst.x, inst.y)
        };
        h.handle_message(
            &mut host.ctx,
            ClientMessage::Move {
                player_id: "h".into(),
                x,
                y,
            },
        )
        .await;
        clock.advance(100);
        h.handle_message(
            &mut host.ctx,
            ClientMessage::PickupTool {
                player_id: "h".into(),
                instrument_id: inst_id,
            },
        )
        .await;

        let room = handle.lock().await;
        let runtime = room.runtime.as_ref().unwrap();
        assert_eq!(runtime.state.team_inventory.len(), 1);
        drop(room);
        let msgs = host.drain();
        assert!(msgs.iter().any(|m| matches!(m, ServerMessage::Players { .. })));
        assert!(msgs.iter().any(
            |m| matches!(m, ServerMessage::Snapshot { state } if state.team_inventory.len() == 1)
        ));
    }

    #[tokio::test]
    async fn test_join_refreshes_whole_room() {
        let (h, _) = handler();
        let mut a = Client::new();
        let mut b = Client::new();
        h.handle_line(&mut a.ctx, r#"{"type":"join","playerId":"a","name":"A"}"#)
            .await;
        a.drain();
        h.handle_line(&mut b.ctx, r#"{"type":"join","playerId":"b","name":"B"}"#)
            .await;

        for msgs in [a.drain(), b.drain()] {
            match &msgs[..] {
                [
                    ServerMessage::Players { players },
                    ServerMessage::Doors { doors },
                    ServerMessage::Snapshot { .. },
                ] => {
                    assert_eq!(players.len(), 2);
                    assert!(doors.is_empty());
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_hatch_unicast_only_to_sender() {
        let (h, _) = handler();
        let mut a = Client::new();
        let mut b = Client::new();
        h.handle_line(&mut a.ctx, r#"{"type":"join","playerId":"a","name":"A"}"#)
            .await;
        h.handle_line(&mut b.ctx, r#"{"type":"join","playerId":"b","name":"B"}"#)
            .await;
        assert_eq!(a.ctx.room_code.as_deref(), Some(LEGACY_ROOM_CODE));
        h.handle_message(
            &mut a.ctx,
            ClientMessage::Move {
                player_id: "a".into(),
                x: 1600.0,
                y: 1700.0,
            },
        )
        .await;
        a.drain();
        b.drain();

        h.handle_line(
            &mut a.ctx,
            r#"{"type":"use_hatch","playerId":"a","hatchId":"hatch-aft"}"#,
        )
        .await;
        let to_a = a.drain();
        let to_b = b.drain();
        assert!(to_a.iter().any(|m| matches!(
            m,
            ServerMessage::ServerHatch(t) if t.to_layer == Layer::Cargo && t.to_y == 1600.0
        )));
        assert!(!to_b.iter().any(|m| matches!(m, ServerMessage::ServerHatch(_))));
        assert!(to_b.iter().any(|m| matches!(m, ServerMessage::Players { .. })));
    }

    #[tokio::test]
    async fn test_rejected_intent_is_silent() {
        let (h, _) = handler();
        let mut a = Client::new();
        h.handle_line(&mut a.ctx, r#"{"type":"join","playerId":"a","name":"A"}"#)
            .await;
        a.drain();
        h.handle_line(
            &mut a.ctx,
            r#"{"type":"start_fix","playerId":"a","issueId":"issue_404","toolChoice":"gear_wrench"}"#,
        )
        .await;
        assert!(a.drain().is_empty());
        let handle = h.registry().legacy_room().unwrap();
        let room = handle.lock().await;
        assert!(!room
            .runtime
            .as_ref()
            .unwrap()
            .state
            .team_inventory
            .contains(&ToolKind::GearWrench));
    }

    #[tokio::test]
    async fn test_disconnect_leaves_room() {
        let (h, _) = handler();
        let mut host = Client::new();
        h.handle_line(
            &mut host.ctx,
            r#"{"type":"create_room","playerId":"h","playerName":"H"}"#,
        )
        .await;
        let code = host.ctx.room_code.clone().unwrap();
        h.disconnect(&mut host.ctx).await;
        assert!(h.registry().get(&code).is_none());
        assert!(host.ctx.room_code.is_none());
    }
}
