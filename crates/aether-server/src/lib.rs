//! Aether Spire room host.
//!
//! Hosts many independent matches. Each room owns one
//! [`aether_logic::MatchRuntime`] behind a `tokio::sync::Mutex`; intents and
//! ticks lock the room, apply their whole mutation, and release it.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`clock`] | Wall-clock abstraction so tests can pin time |
//! | [`config`] | `ServerConfig` loaded from a JSON file and env vars |
//! | [`handler`] | Dispatch of decoded intents to rooms and matches |
//! | [`net`] | Newline-delimited JSON over TCP |
//! | [`protocol`] | Inbound and outbound message types |
//! | [`rooms`] | Room registry: create, join, start, disconnect |
//! | [`ticker`] | Per-room 1 Hz tick task and its abort-on-drop handle |

pub mod clock;
pub mod config;
pub mod handler;
pub mod net;
pub mod protocol;
pub mod rooms;
pub mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ServerConfig};
pub use handler::{ClientContext, Handler};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use rooms::{Room, RoomError, RoomRegistry};
