//! Fire-and-forget side effects the coordinator triggers in the view layer.

use log::{info, warn};
use serde::Serialize;
use std::fmt;

/// Logical audio cue identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AudioCue {
    #[serde(rename = "ringback")]
    Ringback,
    #[serde(rename = "call-end")]
    CallEnd,
    #[serde(rename = "busy")]
    Busy,
}

impl AudioCue {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Ringback => "ringback",
            Self::CallEnd => "call-end",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for AudioCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Starts and stops audio cues. Failures stay inside the implementation.
pub trait AudioPlayer: Send + Sync {
    /// Restarts the cue from the beginning.
    fn play(&self, cue: AudioCue);

    fn pause(&self, cue: AudioCue);
}

/// Modal error dialog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDialog {
    pub title: Option<String>,
    pub description: String,
    pub button: Option<String>,
    pub focus: bool,
}

impl ErrorDialog {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: description.into(),
            button: None,
            focus: true,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_button(mut self, label: impl Into<String>) -> Self {
        self.button = Some(label.into());
        self
    }
}

pub trait DialogPresenter: Send + Sync {
    fn show_error(&self, dialog: ErrorDialog);
}

/// Audio player for headless clients: cues only show up in the log.
#[derive(Debug, Default, Clone)]
pub struct LogAudioPlayer;

impl AudioPlayer for LogAudioPlayer {
    fn play(&self, cue: AudioCue) {
        info!("Playing audio cue {}", cue);
    }

    fn pause(&self, cue: AudioCue) {
        info!("Pausing audio cue {}", cue);
    }
}

#[derive(Debug, Default, Clone)]
pub struct LogDialogPresenter;

impl DialogPresenter for LogDialogPresenter {
    fn show_error(&self, dialog: ErrorDialog) {
        warn!(
            "{}: {}",
            dialog.title.as_deref().unwrap_or("Error"),
            dialog.description
        );
    }
}
