use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::calls::{CallEvent, CallEventListener, CallFactory, CallHandler, CallSession, MediaSink};
use crate::rooms::InMemoryRooms;
use crate::types::call::{CallStatus, HangupParty, HangupReason, RoomId, TransportState};
use crate::types::events::{Action, ActionHandler, Dispatcher};
use crate::ui::{AudioCue, AudioPlayer, DialogPresenter, ErrorDialog};

/// Scriptable transport session. Commands are recorded as short strings;
/// events are only emitted when a test asks for them.
pub struct FakeCall {
    call_id: String,
    room_id: RoomId,
    state: Mutex<TransportState>,
    hangup_party: Mutex<Option<HangupParty>>,
    hangup_reason: Mutex<Option<HangupReason>>,
    listeners: Mutex<Vec<Arc<dyn CallEventListener>>>,
    commands: Mutex<Vec<String>>,
    emit_on_hangup: AtomicBool,
}

impl FakeCall {
    pub fn new(call_id: &str, room_id: &str) -> Arc<Self> {
        Arc::new(Self {
            call_id: call_id.to_string(),
            room_id: RoomId::from(room_id),
            state: Mutex::new(TransportState::Fledgling),
            hangup_party: Mutex::new(None),
            hangup_reason: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            emit_on_hangup: AtomicBool::new(false),
        })
    }

    pub fn set_state(&self, state: TransportState) {
        *self.state.lock().unwrap() = state;
    }

    /// Make `hangup` end the call and emit `state` + `hangup` before returning,
    /// like a transport that reports synchronously.
    pub fn set_emit_on_hangup(&self, emit: bool) {
        self.emit_on_hangup.store(emit, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn emit(&self, event: CallEvent) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_call_event(&event);
        }
    }

    pub fn transition(&self, new: TransportState) {
        let old = std::mem::replace(&mut *self.state.lock().unwrap(), new);
        self.emit(CallEvent::StateChanged { new, old });
    }

    pub fn end(&self, party: HangupParty, reason: Option<HangupReason>) {
        *self.hangup_party.lock().unwrap() = Some(party);
        *self.hangup_reason.lock().unwrap() = reason;
        self.transition(TransportState::Ended);
    }

    fn record(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }
}

impl CallSession for FakeCall {
    fn call_id(&self) -> &str {
        &self.call_id
    }

    fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn state(&self) -> TransportState {
        *self.state.lock().unwrap()
    }

    fn hangup_party(&self) -> Option<HangupParty> {
        *self.hangup_party.lock().unwrap()
    }

    fn hangup_reason(&self) -> Option<HangupReason> {
        self.hangup_reason.lock().unwrap().clone()
    }

    fn place_voice_call(&self) {
        self.record("place_voice".to_string());
    }

    fn place_video_call(&self, remote: Option<&MediaSink>, local: Option<&MediaSink>) {
        let name = |sink: Option<&MediaSink>| sink.map(|s| s.0.clone()).unwrap_or_default();
        self.record(format!("place_video {} {}", name(remote), name(local)));
    }

    fn answer(&self) {
        self.record("answer".to_string());
    }

    fn hangup(&self, reason: Option<HangupReason>) {
        match &reason {
            Some(reason) => self.record(format!("hangup {}", reason)),
            None => self.record("hangup".to_string()),
        }
        if self.emit_on_hangup.load(Ordering::SeqCst) {
            self.end(
                HangupParty::Local,
                Some(reason.unwrap_or(HangupReason::UserHangup)),
            );
            self.emit(CallEvent::Hangup);
        }
    }

    fn add_listener(&self, listener: Arc<dyn CallEventListener>) {
        self.listeners.lock().unwrap().push(listener);
    }
}

#[derive(Default)]
pub struct FakeFactory {
    created: Mutex<Vec<Arc<FakeCall>>>,
    next_id: AtomicU64,
    unsupported: AtomicBool,
}

impl FakeFactory {
    pub fn created(&self) -> Vec<Arc<FakeCall>> {
        self.created.lock().unwrap().clone()
    }

    pub fn set_unsupported(&self, unsupported: bool) {
        self.unsupported.store(unsupported, Ordering::SeqCst);
    }
}

impl CallFactory for FakeFactory {
    fn create_call(&self, room_id: &RoomId) -> Option<Arc<dyn CallSession>> {
        if self.unsupported.load(Ordering::SeqCst) {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let call = FakeCall::new(&format!("call-{}", id), room_id.as_str());
        self.created.lock().unwrap().push(call.clone());
        Some(call)
    }
}

#[derive(Default)]
pub struct RecordingAudio {
    events: Mutex<Vec<String>>,
}

impl RecordingAudio {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl AudioPlayer for RecordingAudio {
    fn play(&self, cue: AudioCue) {
        self.events.lock().unwrap().push(format!("play {}", cue));
    }

    fn pause(&self, cue: AudioCue) {
        self.events.lock().unwrap().push(format!("pause {}", cue));
    }
}

#[derive(Default)]
pub struct RecordingDialogs {
    shown: Mutex<Vec<ErrorDialog>>,
}

impl RecordingDialogs {
    pub fn shown(&self) -> Vec<ErrorDialog> {
        self.shown.lock().unwrap().clone()
    }
}

impl DialogPresenter for RecordingDialogs {
    fn show_error(&self, dialog: ErrorDialog) {
        self.shown.lock().unwrap().push(dialog);
    }
}

#[derive(Default)]
pub struct RecordingHandler {
    actions: Mutex<Vec<Action>>,
}

impl RecordingHandler {
    pub fn names(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Room ids of every `call_state` notification, in order.
    pub fn call_states(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .filter_map(|a| match a {
                Action::CallState { room_id } => Some(room_id.to_string()),
                _ => None,
            })
            .collect()
    }
}

impl ActionHandler for RecordingHandler {
    fn handle_action(&self, action: &Action) {
        self.actions.lock().unwrap().push(action.clone());
    }
}

/// A coordinator wired to recording fakes.
pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub rooms: Arc<InMemoryRooms>,
    pub factory: Arc<FakeFactory>,
    pub audio: Arc<RecordingAudio>,
    pub dialogs: Arc<RecordingDialogs>,
    pub recorder: Arc<RecordingHandler>,
    pub handler: Arc<CallHandler>,
}

impl Harness {
    pub fn new() -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let rooms = Arc::new(InMemoryRooms::new());
        let factory = Arc::new(FakeFactory::default());
        let audio = Arc::new(RecordingAudio::default());
        let dialogs = Arc::new(RecordingDialogs::default());
        let recorder = Arc::new(RecordingHandler::default());

        let handler = CallHandler::builder()
            .with_rooms(rooms.clone())
            .with_call_factory(factory.clone())
            .with_audio(audio.clone())
            .with_dialogs(dialogs.clone())
            .build(dispatcher.clone())
            .expect("harness handler should build");
        dispatcher.register(recorder.clone());

        Self {
            dispatcher,
            rooms,
            factory,
            audio,
            dialogs,
            recorder,
            handler,
        }
    }

    pub fn dispatch(&self, action: Action) {
        self.dispatcher.dispatch(action);
    }

    pub fn status(&self, room_id: &str) -> Option<CallStatus> {
        self.handler
            .get_call(&RoomId::from(room_id))
            .map(|call| call.status())
    }
}
