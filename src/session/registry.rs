use std::collections::HashMap;

use tracing::info;

use super::room::Room;
use super::types::{ConnId, RoomId};

/// Room table plus the connection → room index.
///
/// Owned by the coordinator; never shared across tasks.
#[derive(Debug, Default)]
pub struct Registry {
    rooms: HashMap<RoomId, Room>,
    conn_rooms: HashMap<ConnId, RoomId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing room, or a fresh one with an empty board and X to move
    pub fn get_or_create(&mut self, id: &RoomId) -> &mut Room {
        self.rooms.entry(id.clone()).or_insert_with(|| {
            info!("Room created: {}", id);
            Room::new(id.clone())
        })
    }

    pub fn get(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn get_mut(&mut self, id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    /// Delete a room; no-op if absent
    pub fn remove(&mut self, id: &RoomId) -> Option<Room> {
        let room = self.rooms.remove(id);
        if room.is_some() {
            info!("Room {} removed", id);
        }
        room
    }

    pub fn contains(&self, id: &RoomId) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn bind(&mut self, conn: ConnId, id: RoomId) {
        self.conn_rooms.insert(conn, id);
    }

    pub fn unbind(&mut self, conn: ConnId) -> Option<RoomId> {
        self.conn_rooms.remove(&conn)
    }

    pub fn room_of(&self, conn: ConnId) -> Option<&RoomId> {
        self.conn_rooms.get(&conn)
    }

    /// Room joined by `conn`, if it still exists
    pub fn room_for(&mut self, conn: ConnId) -> Option<&mut Room> {
        let id = self.conn_rooms.get(&conn)?;
        self.rooms.get_mut(id)
    }
}
