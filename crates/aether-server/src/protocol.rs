//! Wire messages.
//!
//! Every message is a JSON object tagged by `type` with camelCase fields.
//! Unknown extra fields (`matchId`, client timestamps) are ignored.

use std::collections::BTreeMap;

use aether_logic::intents::{HatchTransit, LocationPing};
use aether_logic::{GameState, Layer, PlayerView, ToolChoice};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    CreateRoom { player_id: String, player_name: String },
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_code: String,
        player_id: String,
        player_name: String,
    },
    #[serde(rename_all = "camelCase")]
    StartGame { room_code: String, player_id: String },
    #[serde(rename_all = "camelCase")]
    Join { player_id: String, name: String },
    #[serde(rename_all = "camelCase")]
    Move { player_id: String, x: f32, y: f32 },
    #[serde(rename_all = "camelCase")]
    Door { door_id: String, open: bool },
    #[serde(rename_all = "camelCase")]
    StartFix {
        player_id: String,
        issue_id: String,
        #[serde(default)]
        tool_choice: ToolChoice,
    },
    #[serde(rename_all = "camelCase")]
    CancelFix { player_id: String },
    #[serde(rename_all = "camelCase")]
    PickupTool {
        player_id: String,
        instrument_id: String,
    },
    #[serde(rename_all = "camelCase")]
    PingLocation {
        player_id: String,
        x: f32,
        y: f32,
        #[serde(default)]
        layer: Option<Layer>,
    },
    #[serde(rename_all = "camelCase")]
    UseHatch { player_id: String, hatch_id: String },
    #[serde(rename_all = "camelCase")]
    Ping {
        #[serde(default)]
        sent_at: u64,
    },
}

/// One entry of a `doors` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorState {
    pub id: String,
    pub open: bool,
}

impl DoorState {
    pub fn list(doors: &BTreeMap<String, bool>) -> Vec<DoorState> {
        doors
            .iter()
            .map(|(id, open)| DoorState {
                id: id.clone(),
                open: *open,
            })
            .collect()
    }
}

/// Lobby roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPlayer {
    pub player_id: String,
    pub name: String,
    pub is_host: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot {
        state: GameState,
    },
    Players {
        players: Vec<PlayerView>,
    },
    Doors {
        doors: Vec<DoorState>,
    },
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_code: String,
        players: Vec<RoomPlayer>,
    },
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_code: String,
        players: Vec<RoomPlayer>,
    },
    #[serde(rename_all = "camelCase")]
    RoomUpdate {
        room_code: String,
        players: Vec<RoomPlayer>,
    },
    RoomError {
        code: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    GameStarting {
        room_code: String,
    },
    #[serde(rename_all = "camelCase")]
    GameOver {
        won: bool,
        score: i64,
        stars: u8,
        issues_fixed: u32,
        final_stability: f64,
        time_survived: u32,
    },
    PingLocation(LocationPing),
    ServerHatch(HatchTransit),
    #[serde(rename_all = "camelCase")]
    Pong {
        sent_at: u64,
        server_time: u64,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not JSON at all.
    #[error("malformed JSON: {0}")]
    BadJson(#[source] serde_json::Error),
    /// JSON, but not a recognized intent.
    #[error("unrecognized message: {0}")]
    Unknown(#[source] serde_json::Error),
}

impl ProtocolError {
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::BadJson(_) => "BAD_JSON",
            ProtocolError::Unknown(_) => "UNKNOWN",
        }
    }

    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::error(self.code(), self.to_string())
    }
}

/// Decode one inbound line.
pub fn parse_client_message(line: &str) -> Result<ClientMessage, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(ProtocolError::BadJson)?;
    serde_json::from_value(value).map_err(ProtocolError::Unknown)
}

pub fn encode(msg: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_fix() {
        let msg = parse_client_message(
            r#"{"type":"start_fix","playerId":"p1","issueId":"issue_3","toolChoice":"gear_wrench","matchId":"m"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::StartFix {
                player_id: "p1".into(),
                issue_id: "issue_3".into(),
                tool_choice: ToolChoice::GearWrench,
            }
        );
    }

    #[test]
    fn test_parse_defaults() {
        let msg =
            parse_client_message(r#"{"type":"start_fix","playerId":"p","issueId":"i"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::StartFix { tool_choice: ToolChoice::Default, .. }
        ));
        let msg = parse_client_message(r#"{"type":"ping_location","playerId":"p","x":1,"y":2}"#)
            .unwrap();
        assert!(matches!(msg, ClientMessage::PingLocation { layer: None, .. }));
    }

    #[test]
    fn test_bad_json_vs_unknown() {
        let err = parse_client_message("{not json").unwrap_err();
        assert_eq!(err.code(), "BAD_JSON");
        let err = parse_client_message(r#"{"type":"dance","playerId":"p"}"#).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN");
        let err = parse_client_message(r#"{"type":"move","playerId":"p"}"#).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN");
    }

    #[test]
    fn test_outbound_shapes() {
        let json = serde_json::to_value(ServerMessage::Pong {
            sent_at: 5,
            server_time: 9,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type":"pong","sentAt":5,"serverTime":9}));

        let json = serde_json::to_value(ServerMessage::RoomUpdate {
            room_code: "ABCD".into(),
            players: vec![RoomPlayer {
                player_id: "p".into(),
                name: "P".into(),
                is_host: true,
            }],
        })
        .unwrap();
        assert_eq!(json["type"], "room_update");
        assert_eq!(json["roomCode"], "ABCD");
        assert_eq!(json["players"][0]["isHost"], true);

        let json = serde_json::to_value(ServerMessage::ServerHatch(HatchTransit {
            player_id: "p".into(),
            hatch_id: "hatch-aft".into(),
            to_layer: Layer::Cargo,
            to_x: 1600.0,
            to_y: 1600.0,
            fix_cancelled: true,
        }))
        .unwrap();
        assert_eq!(json["type"], "server_hatch");
        assert_eq!(json["toLayer"], "cargo");
        assert!(json.get("fixCancelled").is_none());
    }

    #[test]
    fn test_doors_are_a_list() {
        let mut doors = BTreeMap::new();
        doors.insert("door-port".to_string(), true);
        doors.insert("door-aft".to_string(), false);
        let json = serde_json::to_value(ServerMessage::Doors {
            doors: DoorState::list(&doors),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "doors",
                "doors": [
                    {"id": "door-aft", "open": false},
                    {"id": "door-port", "open": true}
                ]
            })
        );
    }

    #[test]
    fn test_game_over_fields() {
        let json = serde_json::to_value(ServerMessage::GameOver {
            won: true,
            score: 395,
            stars: 4,
            issues_fixed: 10,
            final_stability: 75.4,
            time_survived: 300,
        })
        .unwrap();
        assert_eq!(json["issuesFixed"], 10);
        assert_eq!(json["finalStability"], 75.4);
        assert_eq!(json["timeSurvived"], 300);
    }
}
