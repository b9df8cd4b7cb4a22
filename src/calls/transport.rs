//! Seam to the signaling library that owns the actual call sessions.
//!
//! The coordinator never negotiates media itself. It drives sessions through
//! [`CallSession`] and learns about progress through [`CallEventListener`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::call::{HangupParty, HangupReason, RoomId, TransportState};

/// Opaque reference to a view-layer element that renders or captures media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaSink(pub String);

impl MediaSink {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Event emitted by a transport session.
#[derive(Debug)]
pub enum CallEvent {
    /// The session failed; the payload carries the transport's error chain.
    Error(anyhow::Error),
    Hangup,
    StateChanged {
        new: TransportState,
        old: TransportState,
    },
}

pub trait CallEventListener: Send + Sync {
    fn on_call_event(&self, event: &CallEvent);
}

/// One signaling/media session, owned by the transport library.
pub trait CallSession: Send + Sync {
    fn call_id(&self) -> &str;

    fn room_id(&self) -> &RoomId;

    fn state(&self) -> TransportState;

    /// Only set once the call has ended.
    fn hangup_party(&self) -> Option<HangupParty>;

    /// Only set once the call has ended.
    fn hangup_reason(&self) -> Option<HangupReason>;

    fn place_voice_call(&self);

    fn place_video_call(&self, remote: Option<&MediaSink>, local: Option<&MediaSink>);

    fn answer(&self);

    fn hangup(&self, reason: Option<HangupReason>);

    /// Listeners stay attached for the lifetime of the session. Implementations
    /// may deliver events synchronously from inside `answer`/`hangup`.
    fn add_listener(&self, listener: Arc<dyn CallEventListener>);
}

/// Creates outbound sessions scoped to a room.
pub trait CallFactory: Send + Sync {
    /// Returns `None` when the transport cannot create calls (e.g. no media support).
    fn create_call(&self, room_id: &RoomId) -> Option<Arc<dyn CallSession>>;
}
