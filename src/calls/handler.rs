//! The call coordinator: dispatcher commands in, `call_state` notifications out.

use log::{debug, error, info, warn};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use super::error::CallError;
use super::registry::{Call, CallRegistry};
use super::state::{Effect, Transition, derive_status};
use super::transport::{CallEvent, CallEventListener, CallFactory, CallSession};
use crate::config::CallHandlerConfig;
use crate::rooms::RoomDirectory;
use crate::types::call::{CallStatus, CallType, HangupReason, RoomId};
use crate::types::events::{Action, ActionHandler, DispatchToken, Dispatcher, PlaceCall};
use crate::ui::{AudioCue, AudioPlayer, DialogPresenter, ErrorDialog, LogAudioPlayer, LogDialogPresenter};

/// Tracks at most one live call per room and keeps the views informed.
///
/// Commands arrive through [`ActionHandler::handle_action`]; commands for one
/// room are expected to arrive serially. Every status write is followed by
/// exactly one `call_state` notification for the room, and views read the
/// new status back with [`CallHandler::get_call`].
pub struct CallHandler {
    config: CallHandlerConfig,
    registry: CallRegistry,
    dispatcher: Arc<Dispatcher>,
    rooms: Arc<dyn RoomDirectory>,
    factory: Arc<dyn CallFactory>,
    audio: Arc<dyn AudioPlayer>,
    dialogs: Arc<dyn DialogPresenter>,
    me: Weak<CallHandler>,
    token: OnceLock<DispatchToken>,
}

impl CallHandler {
    pub fn builder() -> CallHandlerBuilder {
        CallHandlerBuilder::new()
    }

    /// The call registered for `room_id`, if any. Never has side effects.
    pub fn get_call(&self, room_id: &RoomId) -> Option<Call> {
        self.registry.get(room_id)
    }

    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CallHandlerConfig {
        &self.config
    }

    /// Stop receiving commands. Returns false if already detached.
    pub fn detach(&self) -> bool {
        self.token
            .get()
            .is_some_and(|token| self.dispatcher.unregister(*token))
    }

    fn place_call(&self, cmd: &PlaceCall) -> Result<(), CallError> {
        let room_id = &cmd.room_id;
        if self.registry.has_live_call(room_id) {
            return Err(CallError::AlreadyInCall(room_id.clone()));
        }

        let count = self
            .rooms
            .joined_member_count(room_id)
            .ok_or_else(|| CallError::UnknownRoom(room_id.clone()))?;
        let required = self.config.required_members;
        if count != required {
            let with = if count <= 1 {
                "yourself.".to_string()
            } else if count > required {
                format!("more than {} people.", required)
            } else {
                format!("fewer than {} people.", required)
            };
            self.dialogs.show_error(
                ErrorDialog::new(format!("You cannot place a call with {}", with))
                    .with_button(&self.config.dismiss_label),
            );
            return Err(CallError::MemberCount {
                room_id: room_id.clone(),
                count,
                required,
            });
        }

        info!("Place {} call in {}", cmd.call_type, room_id);
        let session = self
            .factory
            .create_call(room_id)
            .ok_or_else(|| CallError::CallUnsupported(room_id.clone()))?;
        self.attach_listener(&session);
        self.set_call_state(Some(&session), session.room_id(), CallStatus::Ringback);

        // An unknown type leaves the session registered but never placed.
        match cmd.call_type.parse::<CallType>()? {
            CallType::Voice => session.place_voice_call(),
            CallType::Video => session.place_video_call(
                cmd.remote_element.as_ref(),
                cmd.local_element.as_ref(),
            ),
        }
        Ok(())
    }

    fn incoming_call(&self, session: &Arc<dyn CallSession>) -> Result<(), CallError> {
        let room_id = session.room_id();
        if self.registry.has_live_call(room_id) {
            // The newer call loses.
            session.hangup(Some(HangupReason::Busy));
            return Err(CallError::AlreadyInCall(room_id.clone()));
        }

        self.attach_listener(session);
        self.set_call_state(Some(session), room_id, CallStatus::Ringing);
        Ok(())
    }

    fn hangup(&self, room_id: &RoomId) -> Result<(), CallError> {
        let call = self
            .registry
            .get(room_id)
            .ok_or_else(|| CallError::NoCall(room_id.clone()))?;

        call.session().hangup(None);
        // Unlike the transport-driven end, the slot is cleared here.
        self.set_call_state(None, room_id, CallStatus::Ended);
        Ok(())
    }

    fn answer(&self, room_id: &RoomId) -> Result<(), CallError> {
        let call = self
            .registry
            .get(room_id)
            .filter(Call::is_live)
            .ok_or_else(|| CallError::NoCall(room_id.clone()))?;

        call.session().answer();
        self.set_call_state(Some(call.session()), room_id, CallStatus::Connected);
        self.dispatcher.dispatch(Action::ViewRoom {
            room_id: room_id.clone(),
        });
        Ok(())
    }

    fn attach_listener(&self, session: &Arc<dyn CallSession>) {
        session.add_listener(Arc::new(SessionListener {
            handler: self.me.clone(),
            session: Arc::downgrade(session),
        }));
    }

    fn on_call_event(&self, session: &Arc<dyn CallSession>, event: &CallEvent) {
        let room_id = session.room_id();
        if !self.registry.accepts_events_from(room_id, session.call_id()) {
            debug!(
                "Ignoring {:?} from superseded call {} in {}",
                event,
                session.call_id(),
                room_id
            );
            return;
        }

        match event {
            CallEvent::Error(err) => {
                error!("Call error in {}: {:?}", room_id, err);
                session.hangup(None);
                self.set_call_state(None, room_id, CallStatus::Ended);
                self.apply_effects(&[Effect::Pause(AudioCue::Ringback)]);
            }
            CallEvent::Hangup => {
                self.set_call_state(None, room_id, CallStatus::Ended);
            }
            CallEvent::StateChanged { new, old } => {
                let transition = Transition {
                    new: *new,
                    old: *old,
                    hangup_party: session.hangup_party(),
                    hangup_reason: session.hangup_reason(),
                };
                match derive_status(&transition) {
                    Some(derived) => {
                        debug!("Transition {} -> {} matched '{}'", old, new, derived.rule);
                        self.set_call_state(Some(session), room_id, derived.status);
                        self.apply_effects(derived.effects);
                    }
                    None => debug!("No UI status for {} -> {} in {}", old, new, room_id),
                }
            }
        }
    }

    fn set_call_state(
        &self,
        session: Option<&Arc<dyn CallSession>>,
        room_id: &RoomId,
        status: CallStatus,
    ) {
        info!(
            "Call state in {} changed to {} ({})",
            room_id,
            status,
            session.map(|s| s.state().as_str()).unwrap_or("-")
        );
        self.registry.store(
            room_id.clone(),
            session.map(|s| Call::new(s.clone(), status)),
        );
        self.dispatcher.dispatch(Action::CallState {
            room_id: room_id.clone(),
        });
    }

    fn apply_effects(&self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::Play(cue) => self.audio.play(*cue),
                Effect::Pause(cue) => self.audio.pause(*cue),
                Effect::TimeoutDialog => self.dialogs.show_error(
                    ErrorDialog::new(&self.config.timeout_description)
                        .with_title(&self.config.timeout_title)
                        .with_button(&self.config.dismiss_label),
                ),
            }
        }
    }
}

impl ActionHandler for CallHandler {
    fn handle_action(&self, action: &Action) {
        let result = match action {
            Action::PlaceCall(cmd) => self.place_call(cmd),
            Action::IncomingCall(incoming) => self.incoming_call(&incoming.call),
            Action::Hangup { room_id } => self.hangup(room_id),
            Action::Answer { room_id } => self.answer(room_id),
            Action::CallState { .. } | Action::ViewRoom { .. } => Ok(()),
        };

        if let Err(e) = result {
            match e {
                CallError::AlreadyInCall(_) | CallError::NoCall(_) => {
                    info!("Ignoring {}: {}", action.name(), e)
                }
                CallError::MemberCount { .. } => warn!("Rejected {}: {}", action.name(), e),
                _ => error!("Failed to handle {}: {}", action.name(), e),
            }
        }
    }
}

impl fmt::Debug for CallHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallHandler")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("attached", &self.token.get().is_some())
            .finish()
    }
}

/// Forwards one session's events to the coordinator. Holds only weak
/// references: the session owns its listeners and the coordinator owns the session.
struct SessionListener {
    handler: Weak<CallHandler>,
    session: Weak<dyn CallSession>,
}

impl CallEventListener for SessionListener {
    fn on_call_event(&self, event: &CallEvent) {
        let (Some(handler), Some(session)) = (self.handler.upgrade(), self.session.upgrade())
        else {
            debug!("Dropping {:?}: call or handler already gone", event);
            return;
        };
        handler.on_call_event(&session, event);
    }
}

#[derive(Default)]
pub struct CallHandlerBuilder {
    config: Option<CallHandlerConfig>,
    rooms: Option<Arc<dyn RoomDirectory>>,
    factory: Option<Arc<dyn CallFactory>>,
    audio: Option<Arc<dyn AudioPlayer>>,
    dialogs: Option<Arc<dyn DialogPresenter>>,
}

impl CallHandlerBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CallHandlerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_rooms(mut self, rooms: Arc<dyn RoomDirectory>) -> Self {
        self.rooms = Some(rooms);
        self
    }

    pub fn with_call_factory(mut self, factory: Arc<dyn CallFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Defaults to [`LogAudioPlayer`].
    pub fn with_audio(mut self, audio: Arc<dyn AudioPlayer>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Defaults to [`LogDialogPresenter`].
    pub fn with_dialogs(mut self, dialogs: Arc<dyn DialogPresenter>) -> Self {
        self.dialogs = Some(dialogs);
        self
    }

    /// Build the coordinator and register it on `dispatcher`.
    pub fn build(self, dispatcher: Arc<Dispatcher>) -> Result<Arc<CallHandler>, CallError> {
        let rooms = self
            .rooms
            .ok_or(CallError::MissingCollaborator("room directory"))?;
        let factory = self
            .factory
            .ok_or(CallError::MissingCollaborator("call factory"))?;
        let audio: Arc<dyn AudioPlayer> = match self.audio {
            Some(audio) => audio,
            None => Arc::new(LogAudioPlayer),
        };
        let dialogs: Arc<dyn DialogPresenter> = match self.dialogs {
            Some(dialogs) => dialogs,
            None => Arc::new(LogDialogPresenter),
        };

        let handler = Arc::new_cyclic(|me| CallHandler {
            config: self.config.unwrap_or_default(),
            registry: CallRegistry::new(),
            dispatcher: dispatcher.clone(),
            rooms,
            factory,
            audio,
            dialogs,
            me: me.clone(),
            token: OnceLock::new(),
        });

        let token = dispatcher.register(handler.clone());
        let _ = handler.token.set(token);
        debug!("Call handler registered on dispatcher");
        Ok(handler)
    }
}
