use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast;

use crate::calls::{CallSession, MediaSink};
use crate::types::call::RoomId;

// The size of the broadcast channel buffer.
const CHANNEL_CAPACITY: usize = 100;

/// Everything that travels over the dispatcher: commands for the call
/// coordinator and the notifications it publishes back.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    PlaceCall(PlaceCall),
    IncomingCall(IncomingCall),
    Hangup { room_id: RoomId },
    Answer { room_id: RoomId },
    /// The call in `room_id` changed; re-query the coordinator for its status.
    CallState { room_id: RoomId },
    /// Switch the active view to `room_id`.
    ViewRoom { room_id: RoomId },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaceCall(_) => "place_call",
            Self::IncomingCall(_) => "incoming_call",
            Self::Hangup { .. } => "hangup",
            Self::Answer { .. } => "answer",
            Self::CallState { .. } => "call_state",
            Self::ViewRoom { .. } => "view_room",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceCall {
    /// Raw media kind as sent by the view; only `voice` and `video` place a call.
    #[serde(rename = "type")]
    pub call_type: String,
    pub room_id: RoomId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_element: Option<MediaSink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_element: Option<MediaSink>,
}

impl PlaceCall {
    pub fn voice(room_id: impl Into<RoomId>) -> Self {
        Self {
            call_type: "voice".to_string(),
            room_id: room_id.into(),
            remote_element: None,
            local_element: None,
        }
    }

    pub fn video(room_id: impl Into<RoomId>, remote: MediaSink, local: MediaSink) -> Self {
        Self {
            call_type: "video".to_string(),
            room_id: room_id.into(),
            remote_element: Some(remote),
            local_element: Some(local),
        }
    }
}

/// A session the transport created for a call offered to us.
#[derive(Clone)]
pub struct IncomingCall {
    pub call: Arc<dyn CallSession>,
}

impl IncomingCall {
    pub fn new(call: Arc<dyn CallSession>) -> Self {
        Self { call }
    }
}

impl fmt::Debug for IncomingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingCall")
            .field("call_id", &self.call.call_id())
            .field("room_id", self.call.room_id())
            .finish()
    }
}

// The session itself is not data; describe it by its identifiers.
impl Serialize for IncomingCall {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("IncomingCall", 2)?;
        state.serialize_field("room_id", self.call.room_id())?;
        state.serialize_field("call_id", self.call.call_id())?;
        state.end()
    }
}

pub trait ActionHandler: Send + Sync {
    fn handle_action(&self, action: &Action);
}

/// Handle returned by [`Dispatcher::register`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchToken(u64);

/// Process-wide publish/subscribe channel between the views and the call coordinator.
///
/// Handlers run synchronously inside [`Dispatcher::dispatch`]. An action
/// dispatched from within a handler is queued and delivered once the current
/// action has reached every handler, so handlers always observe actions in
/// dispatch order. Queue subscribers get every action on a broadcast channel.
pub struct Dispatcher {
    handlers: RwLock<Vec<(DispatchToken, Arc<dyn ActionHandler>)>>,
    pending: Mutex<VecDeque<Action>>,
    dispatching: AtomicBool,
    next_token: AtomicU64,
    channel: broadcast::Sender<Action>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
            dispatching: AtomicBool::new(false),
            next_token: AtomicU64::new(1),
            channel: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn register(&self, handler: Arc<dyn ActionHandler>) -> DispatchToken {
        let token = DispatchToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((token, handler));
        token
    }

    pub fn unregister(&self, token: DispatchToken) -> bool {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(t, _)| *t != token);
        handlers.len() != before
    }

    /// Returns true if there are any handlers or queue subscribers.
    pub fn has_subscribers(&self) -> bool {
        self.channel.receiver_count() > 0
            || !self
                .handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        self.channel.subscribe()
    }

    pub fn dispatch(&self, action: Action) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(action);

        loop {
            if self.dispatching.swap(true, Ordering::AcqRel) {
                // Someone further up the stack is draining the queue.
                return;
            }
            {
                // Runs on unwind too: a panicking handler must not leave the
                // dispatcher stuck, and whatever it queued is dropped with it.
                let _draining = scopeguard::guard((), |()| {
                    if std::thread::panicking() {
                        self.pending
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .clear();
                    }
                    self.dispatching.store(false, Ordering::Release);
                });
                while let Some(action) = self.next_pending() {
                    self.deliver(&action);
                }
            }

            if self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
            {
                return;
            }
        }
    }

    fn next_pending(&self) -> Option<Action> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn deliver(&self, action: &Action) {
        // Snapshot so handlers may register or unregister while being called.
        let handlers: Vec<Arc<dyn ActionHandler>> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler.handle_action(action);
        }

        // No receivers is fine.
        let _ = self.channel.send(action.clone());
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field(
                "handlers",
                &self
                    .handlers
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len(),
            )
            .field("subscribers", &self.channel.receiver_count())
            .finish()
    }
}
