//! In-process transport with a scripted remote peer.
//!
//! Sessions move through the same states a real signaling library reports
//! and deliver their events synchronously, which makes the coordinator
//! runnable without a network: the demo binary and the end-to-end tests use it.

use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::transport::{CallEvent, CallEventListener, CallFactory, CallSession, MediaSink};
use crate::types::call::{HangupParty, HangupReason, RoomId, TransportState};

/// What the simulated remote side does with an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerBehavior {
    #[default]
    Answer,
    Decline,
    /// Never answers; the invite stays pending until [`LoopbackCall::expire_invite`].
    Ignore,
}

#[derive(Debug)]
struct Inner {
    state: TransportState,
    hangup_party: Option<HangupParty>,
    hangup_reason: Option<HangupReason>,
}

pub struct LoopbackCall {
    call_id: String,
    room_id: RoomId,
    peer: PeerBehavior,
    inner: Mutex<Inner>,
    listeners: Mutex<Vec<Arc<dyn CallEventListener>>>,
}

impl LoopbackCall {
    pub fn new(call_id: impl Into<String>, room_id: RoomId, peer: PeerBehavior) -> Arc<Self> {
        Arc::new(Self {
            call_id: call_id.into(),
            room_id,
            peer,
            inner: Mutex::new(Inner {
                state: TransportState::Fledgling,
                hangup_party: None,
                hangup_reason: None,
            }),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// A call offered to us by the remote side, already ringing locally.
    pub fn incoming(call_id: impl Into<String>, room_id: RoomId) -> Arc<Self> {
        let call = Self::new(call_id, room_id, PeerBehavior::Answer);
        call.lock().state = TransportState::Ringing;
        call
    }

    /// Move to `new` and report it to every listener.
    pub fn transition(&self, new: TransportState) {
        let old = std::mem::replace(&mut self.lock().state, new);
        debug!("Loopback call {}: {} -> {}", self.call_id, old, new);
        self.emit(CallEvent::StateChanged { new, old });
    }

    /// End the call as `party` would, reporting `ended` and then `hangup`.
    /// Does nothing once the call has ended.
    pub fn terminate(&self, party: HangupParty, reason: HangupReason) {
        {
            let mut inner = self.lock();
            if inner.state == TransportState::Ended {
                return;
            }
            inner.hangup_party = Some(party);
            inner.hangup_reason = Some(reason);
        }
        self.transition(TransportState::Ended);
        self.emit(CallEvent::Hangup);
    }

    /// Give up on an unanswered invite.
    pub fn expire_invite(&self) {
        if self.state() == TransportState::InviteSent {
            self.terminate(HangupParty::Local, HangupReason::InviteTimeout);
        }
    }

    /// Report a transport failure.
    pub fn fail(&self, error: anyhow::Error) {
        self.emit(CallEvent::Error(error));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CallEvent) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.on_call_event(&event);
        }
    }

    fn place(&self) {
        if self.state() != TransportState::Fledgling {
            return;
        }
        self.transition(TransportState::WaitLocalMedia);
        self.transition(TransportState::CreateOffer);
        self.transition(TransportState::InviteSent);

        match self.peer {
            PeerBehavior::Answer => {
                self.transition(TransportState::Connecting);
                self.transition(TransportState::Connected);
            }
            PeerBehavior::Decline => self.terminate(HangupParty::Remote, HangupReason::UserHangup),
            PeerBehavior::Ignore => {}
        }
    }
}

impl CallSession for LoopbackCall {
    fn call_id(&self) -> &str {
        &self.call_id
    }

    fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn state(&self) -> TransportState {
        self.lock().state
    }

    fn hangup_party(&self) -> Option<HangupParty> {
        self.lock().hangup_party
    }

    fn hangup_reason(&self) -> Option<HangupReason> {
        self.lock().hangup_reason.clone()
    }

    fn place_voice_call(&self) {
        self.place();
    }

    fn place_video_call(&self, remote: Option<&MediaSink>, local: Option<&MediaSink>) {
        debug!(
            "Loopback video call {} rendering into {:?} / {:?}",
            self.call_id, remote, local
        );
        self.place();
    }

    fn answer(&self) {
        if self.state() == TransportState::Ringing {
            self.transition(TransportState::CreateAnswer);
            self.transition(TransportState::Connecting);
            self.transition(TransportState::Connected);
        }
    }

    fn hangup(&self, reason: Option<HangupReason>) {
        self.terminate(
            HangupParty::Local,
            reason.unwrap_or(HangupReason::UserHangup),
        );
    }

    fn add_listener(&self, listener: Arc<dyn CallEventListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }
}

/// Creates [`LoopbackCall`]s whose remote side behaves as configured.
#[derive(Default)]
pub struct LoopbackFactory {
    peer: Mutex<PeerBehavior>,
    next_id: AtomicU64,
    created: Mutex<Vec<Arc<LoopbackCall>>>,
}

impl LoopbackFactory {
    pub fn new(peer: PeerBehavior) -> Self {
        Self {
            peer: Mutex::new(peer),
            ..Default::default()
        }
    }

    pub fn set_peer(&self, peer: PeerBehavior) {
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner) = peer;
    }

    /// The most recently created call.
    pub fn last_call(&self) -> Option<Arc<LoopbackCall>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn created_count(&self) -> usize {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl CallFactory for LoopbackFactory {
    fn create_call(&self, room_id: &RoomId) -> Option<Arc<dyn CallSession>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let peer = *self.peer.lock().unwrap_or_else(PoisonError::into_inner);
        let call = LoopbackCall::new(format!("loopback-{}", id), room_id.clone(), peer);
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.clone());
        Some(call)
    }
}
