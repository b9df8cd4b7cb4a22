use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::calls::CallError;

/// Identifier of the room (conversation) a call belongs to, e.g. `!abc:example.org`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Media kind requested by a `place_call` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    Voice,
    Video,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Video => "video",
        }
    }
}

impl FromStr for CallType {
    type Err = CallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(Self::Voice),
            "video" => Ok(Self::Video),
            other => Err(CallError::UnknownCallType(other.to_string())),
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a call as reported by the signaling library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Fledgling,
    WaitLocalMedia,
    CreateOffer,
    InviteSent,
    CreateAnswer,
    Connecting,
    Connected,
    Ringing,
    Ended,
}

impl TransportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fledgling => "fledgling",
            Self::WaitLocalMedia => "wait_local_media",
            Self::CreateOffer => "create_offer",
            Self::InviteSent => "invite_sent",
            Self::CreateAnswer => "create_answer",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Ringing => "ringing",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side terminated the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HangupParty {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HangupReason {
    InviteTimeout,
    IceFailed,
    UserHangup,
    Busy,
    Unknown(String),
}

impl From<&str> for HangupReason {
    fn from(reason: &str) -> Self {
        match reason {
            "invite_timeout" => Self::InviteTimeout,
            "ice_failed" => Self::IceFailed,
            "user_hangup" => Self::UserHangup,
            "busy" => Self::Busy,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl HangupReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InviteTimeout => "invite_timeout",
            Self::IceFailed => "ice_failed",
            Self::UserHangup => "user_hangup",
            Self::Busy => "busy",
            Self::Unknown(reason) => reason,
        }
    }
}

impl fmt::Display for HangupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse, UI-facing call status derived from transport transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Ringing,
    Ringback,
    Connected,
    Ended,
    Busy,
    StopRingback,
    StopRinging,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ringing => "ringing",
            Self::Ringback => "ringback",
            Self::Connected => "connected",
            Self::Ended => "ended",
            Self::Busy => "busy",
            Self::StopRingback => "stop_ringback",
            Self::StopRinging => "stop_ringing",
        }
    }

    /// `Ended` and `Busy` are the only states a call never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Busy)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_type_parsing() {
        assert_eq!("voice".parse::<CallType>().unwrap(), CallType::Voice);
        assert_eq!("video".parse::<CallType>().unwrap(), CallType::Video);

        let err = "hologram".parse::<CallType>().unwrap_err();
        assert!(matches!(err, CallError::UnknownCallType(ref t) if t == "hologram"));
    }

    #[test]
    fn test_hangup_reason_from_str() {
        assert_eq!(HangupReason::from("invite_timeout"), HangupReason::InviteTimeout);
        assert_eq!(HangupReason::from("busy"), HangupReason::Busy);

        let unknown = HangupReason::from("carrier_lost");
        assert_eq!(unknown, HangupReason::Unknown("carrier_lost".into()));
        assert_eq!(unknown.as_str(), "carrier_lost");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(CallStatus::Ended.is_terminal());
        assert!(CallStatus::Busy.is_terminal());
        assert!(!CallStatus::StopRingback.is_terminal());
        assert!(!CallStatus::Connected.is_terminal());
        assert_eq!(CallStatus::StopRinging.to_string(), "stop_ringing");
    }

    #[test]
    fn test_room_id_serializes_transparently() {
        let room = RoomId::from("!abc:example.org");
        assert_eq!(
            serde_json::to_string(&room).unwrap(),
            "\"!abc:example.org\""
        );
    }
}
