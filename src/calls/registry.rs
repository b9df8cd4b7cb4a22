use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use super::transport::CallSession;
use crate::types::call::{CallStatus, RoomId, TransportState};

/// A registered call: the transport session plus the UI status the
/// coordinator last derived for it.
#[derive(Clone)]
pub struct Call {
    session: Arc<dyn CallSession>,
    status: CallStatus,
}

impl Call {
    pub(crate) fn new(session: Arc<dyn CallSession>, status: CallStatus) -> Self {
        Self { session, status }
    }

    pub fn session(&self) -> &Arc<dyn CallSession> {
        &self.session
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn room_id(&self) -> &RoomId {
        self.session.room_id()
    }

    pub fn call_id(&self) -> &str {
        self.session.call_id()
    }

    /// A call is live until either its UI status or its transport reaches the end.
    pub fn is_live(&self) -> bool {
        !self.status.is_terminal() && self.session.state() != TransportState::Ended
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("call_id", &self.session.call_id())
            .field("room_id", self.session.room_id())
            .field("status", &self.status)
            .field("transport_state", &self.session.state())
            .finish()
    }
}

/// Active calls indexed by room. Only the coordinator writes to it.
///
/// Guards into the map are never held across calls into a session, since
/// sessions may re-enter the coordinator synchronously.
#[derive(Default)]
pub struct CallRegistry {
    calls: DashMap<RoomId, Call>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, room_id: &RoomId) -> Option<Call> {
        self.calls.get(room_id).map(|call| call.clone())
    }

    pub fn has_live_call(&self, room_id: &RoomId) -> bool {
        self.get(room_id).is_some_and(|call| call.is_live())
    }

    /// Whether events from `call_id` may still write to the room's slot: the
    /// slot is empty or holds that very call.
    pub fn accepts_events_from(&self, room_id: &RoomId, call_id: &str) -> bool {
        self.get(room_id)
            .is_none_or(|call| call.call_id() == call_id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub(crate) fn store(&self, room_id: RoomId, call: Option<Call>) {
        match call {
            Some(call) => {
                self.calls.insert(room_id, call);
            }
            None => {
                self.calls.remove(&room_id);
            }
        }
    }
}

impl fmt::Debug for CallRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRegistry")
            .field("calls", &self.calls.len())
            .finish()
    }
}
