//! Call-related error types.

use thiserror::Error;

use crate::types::call::RoomId;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("room {0} does not exist")]
    UnknownRoom(RoomId),

    #[error("room {0} already has a call in progress")]
    AlreadyInCall(RoomId),

    #[error("room {room_id} has {count} joined members, calls need exactly {required}")]
    MemberCount {
        room_id: RoomId,
        count: usize,
        required: usize,
    },

    #[error("unknown call type: {0}")]
    UnknownCallType(String),

    #[error("transport cannot create a call in {0}")]
    CallUnsupported(RoomId),

    #[error("no call in room {0}")]
    NoCall(RoomId),

    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),
}
