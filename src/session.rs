//! WebSocket room server pairing two players per room

mod actor;
mod coordinator;
mod messages;
mod registry;
mod room;
mod server;
mod types;

pub use actor::CoordinatorHandle;
pub use coordinator::{Coordinator, JoinAck, MoveRequest};
pub use messages::{ClientMessage, OPPONENT_LEFT_MESSAGE, ServerMessage};
pub use registry::Registry;
pub use room::{ROOM_CAPACITY, Room};
pub use server::SessionServer;
pub use types::{ConnId, MoveRejection, OutboundMessage, RoomId, SessionError};
