//! Projection of transport state changes onto the coarse UI call status.
//!
//! The rules form an ordered cascade: they are tried top to bottom and the
//! first one whose predicate holds decides the status and its side effects.
//! Keep the order intact when adding rules; `invite_sent -> ended` in
//! particular must reach the busy rule before the generic `stop_ringback` one,
//! and a ringing call that connects is `connected`, not `stop_ringing`.
//! Without the early `connected` rule and the `invite cancelled` rule those
//! transitions would fall through to `stop_ringing` and `stop_ringback`, which
//! is what older clients report for them.

use crate::types::call::{CallStatus, HangupParty, HangupReason, TransportState};
use crate::ui::AudioCue;

/// A transport `state` event together with the hangup metadata known at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub new: TransportState,
    pub old: TransportState,
    pub hangup_party: Option<HangupParty>,
    pub hangup_reason: Option<HangupReason>,
}

impl Transition {
    pub fn new(new: TransportState, old: TransportState) -> Self {
        Self {
            new,
            old,
            hangup_party: None,
            hangup_reason: None,
        }
    }

    pub fn with_hangup(mut self, party: HangupParty, reason: Option<HangupReason>) -> Self {
        self.hangup_party = Some(party);
        self.hangup_reason = reason;
        self
    }

    /// The remote side declined or never answered our invite.
    fn is_unanswered_invite(&self) -> bool {
        match self.hangup_party {
            Some(HangupParty::Remote) => true,
            Some(HangupParty::Local) => self.hangup_reason == Some(HangupReason::InviteTimeout),
            None => false,
        }
    }
}

/// Side effect attached to a derived status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Play(AudioCue),
    Pause(AudioCue),
    /// Tell the user the remote side failed to pick up.
    TimeoutDialog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derivation {
    pub rule: &'static str,
    pub status: CallStatus,
    pub effects: &'static [Effect],
}

struct Rule {
    applies: fn(&Transition) -> bool,
    derivation: Derivation,
}

const STOP_RINGBACK: &[Effect] = &[Effect::Pause(AudioCue::Ringback)];

const RULES: &[Rule] = &[
    Rule {
        applies: |t| t.new == TransportState::Ringing,
        derivation: Derivation {
            rule: "incoming ringing",
            status: CallStatus::Ringing,
            effects: STOP_RINGBACK,
        },
    },
    Rule {
        applies: |t| t.new == TransportState::InviteSent,
        derivation: Derivation {
            rule: "invite sent",
            status: CallStatus::Ringback,
            effects: &[Effect::Play(AudioCue::Ringback)],
        },
    },
    Rule {
        applies: |t| t.new == TransportState::Ended && t.old == TransportState::Connected,
        derivation: Derivation {
            rule: "connected call ended",
            status: CallStatus::Ended,
            effects: &[
                Effect::Pause(AudioCue::Ringback),
                Effect::Play(AudioCue::CallEnd),
            ],
        },
    },
    Rule {
        applies: |t| {
            t.new == TransportState::Ended
                && t.old == TransportState::InviteSent
                && t.is_unanswered_invite()
        },
        derivation: Derivation {
            rule: "invite unanswered",
            status: CallStatus::Busy,
            effects: &[
                Effect::Pause(AudioCue::Ringback),
                Effect::Play(AudioCue::Busy),
                Effect::TimeoutDialog,
            ],
        },
    },
    Rule {
        applies: |t| t.new == TransportState::Ended && t.old == TransportState::InviteSent,
        derivation: Derivation {
            rule: "invite cancelled",
            status: CallStatus::Ended,
            effects: STOP_RINGBACK,
        },
    },
    Rule {
        applies: |t| t.old == TransportState::InviteSent,
        derivation: Derivation {
            rule: "left invite_sent",
            status: CallStatus::StopRingback,
            effects: STOP_RINGBACK,
        },
    },
    Rule {
        applies: |t| t.new == TransportState::Connected,
        derivation: Derivation {
            rule: "connected",
            status: CallStatus::Connected,
            effects: STOP_RINGBACK,
        },
    },
    Rule {
        applies: |t| t.old == TransportState::Ringing,
        derivation: Derivation {
            rule: "left ringing",
            status: CallStatus::StopRinging,
            effects: STOP_RINGBACK,
        },
    },
];

/// Derive the UI status for a transport transition. `None` means the
/// transition has no UI meaning and the current status stays.
pub fn derive_status(transition: &Transition) -> Option<Derivation> {
    RULES
        .iter()
        .find(|rule| (rule.applies)(transition))
        .map(|rule| rule.derivation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransportState::*;

    fn status_of(t: Transition) -> Option<CallStatus> {
        derive_status(&t).map(|d| d.status)
    }

    #[test]
    fn test_ringing_wins_regardless_of_old_state() {
        let d = derive_status(&Transition::new(Ringing, InviteSent)).unwrap();
        assert_eq!(d.status, CallStatus::Ringing);
        assert_eq!(d.effects, &[Effect::Pause(AudioCue::Ringback)]);
    }

    #[test]
    fn test_invite_sent_starts_ringback() {
        let d = derive_status(&Transition::new(InviteSent, CreateOffer)).unwrap();
        assert_eq!(d.status, CallStatus::Ringback);
        assert_eq!(d.effects, &[Effect::Play(AudioCue::Ringback)]);
    }

    #[test]
    fn test_connected_call_ending_plays_call_end() {
        let d = derive_status(&Transition::new(Ended, Connected)).unwrap();
        assert_eq!(d.status, CallStatus::Ended);
        assert!(d.effects.contains(&Effect::Play(AudioCue::CallEnd)));
    }

    #[test]
    fn test_remote_hangup_during_invite_is_busy() {
        let t = Transition::new(Ended, InviteSent).with_hangup(HangupParty::Remote, None);
        let d = derive_status(&t).unwrap();
        assert_eq!(d.status, CallStatus::Busy);
        assert_eq!(
            d.effects,
            &[
                Effect::Pause(AudioCue::Ringback),
                Effect::Play(AudioCue::Busy),
                Effect::TimeoutDialog,
            ]
        );
    }

    #[test]
    fn test_local_invite_timeout_is_busy() {
        let t = Transition::new(Ended, InviteSent)
            .with_hangup(HangupParty::Local, Some(HangupReason::InviteTimeout));
        assert_eq!(status_of(t), Some(CallStatus::Busy));
    }

    #[test]
    fn test_local_cancel_during_invite_is_ended() {
        let t = Transition::new(Ended, InviteSent)
            .with_hangup(HangupParty::Local, Some(HangupReason::UserHangup));
        let d = derive_status(&t).unwrap();
        assert_eq!(d.status, CallStatus::Ended);
        assert!(!d.effects.contains(&Effect::TimeoutDialog));

        let no_reason = Transition::new(Ended, InviteSent).with_hangup(HangupParty::Local, None);
        assert_eq!(status_of(no_reason), Some(CallStatus::Ended));
    }

    #[test]
    fn test_leaving_invite_sent_stops_ringback() {
        assert_eq!(
            status_of(Transition::new(Connecting, InviteSent)),
            Some(CallStatus::StopRingback)
        );
        // Checked before the plain `connected` rule.
        assert_eq!(
            status_of(Transition::new(Connected, InviteSent)),
            Some(CallStatus::StopRingback)
        );
    }

    #[test]
    fn test_leaving_ringing_stops_ringing() {
        assert_eq!(
            status_of(Transition::new(CreateAnswer, Ringing)),
            Some(CallStatus::StopRinging)
        );
        assert_eq!(
            status_of(Transition::new(Ended, Ringing)),
            Some(CallStatus::StopRinging)
        );
    }

    #[test]
    fn test_connected_from_connecting_or_ringing() {
        assert_eq!(
            status_of(Transition::new(Connected, Connecting)),
            Some(CallStatus::Connected)
        );
        assert_eq!(
            status_of(Transition::new(Connected, Ringing)),
            Some(CallStatus::Connected)
        );
    }

    #[test]
    fn test_unmapped_transitions() {
        assert_eq!(status_of(Transition::new(Connecting, CreateAnswer)), None);
        assert_eq!(status_of(Transition::new(Ended, Connecting)), None);
        assert_eq!(status_of(Transition::new(WaitLocalMedia, Fledgling)), None);
    }
}
