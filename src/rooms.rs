use dashmap::DashMap;

use crate::types::call::RoomId;

/// Membership lookup backed by the client's room store.
pub trait RoomDirectory: Send + Sync {
    /// Number of joined members, or `None` when the room is unknown.
    fn joined_member_count(&self, room_id: &RoomId) -> Option<usize>;
}

/// Room directory kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRooms {
    rooms: DashMap<RoomId, usize>,
}

impl InMemoryRooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_joined_members(&self, room_id: impl Into<RoomId>, count: usize) {
        self.rooms.insert(room_id.into(), count);
    }

    pub fn remove(&self, room_id: &RoomId) -> bool {
        self.rooms.remove(room_id).is_some()
    }
}

impl RoomDirectory for InMemoryRooms {
    fn joined_member_count(&self, room_id: &RoomId) -> Option<usize> {
        self.rooms.get(room_id).map(|count| *count)
    }
}
