// ABOUTME: RecordingSession state machine that captures one chord from raw key-down events
// ABOUTME: Escape cancels, Delete clears, bare keys are ignored and conflicting chords keep listening

use crate::conflict::{self, ConflictOwner};
use crate::hotkey::keys::{KEY_DELETE, KEY_ESCAPE, KEY_FORWARD_DELETE};
use crate::hotkey::{HotKeyBinding, Modifiers};
use crate::model::{BindingSet, SlotRef};
use thiserror::Error;

/// One raw key-down as delivered by the key tap. Events the OS delivered
/// without a key code are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: Option<u32>,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key_code: u32, modifiers: Modifiers) -> Self {
        Self {
            key_code: Some(key_code),
            modifiers,
        }
    }

    pub fn bare(key_code: u32) -> Self {
        Self::new(key_code, Modifiers::empty())
    }

    fn is_cancel(&self) -> bool {
        self.key_code == Some(KEY_ESCAPE)
    }

    fn is_clear(&self) -> bool {
        matches!(self.key_code, Some(KEY_DELETE | KEY_FORWARD_DELETE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Listening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingOutcome {
    Captured(HotKeyBinding),
    Cleared,
    Cancelled,
}

impl RecordingOutcome {
    /// The value to write into the edited slot, if the outcome changes it.
    pub fn new_binding(&self) -> Option<Option<HotKeyBinding>> {
        match self {
            RecordingOutcome::Captured(binding) => Some(Some(*binding)),
            RecordingOutcome::Cleared => Some(None),
            RecordingOutcome::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResponse {
    Ignored,
    Conflict(ConflictOwner),
    Finished(RecordingOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    #[error("a hotkey recording is already in progress")]
    AlreadyRecording,
    #[error("no recording session with that handle is active")]
    NoSuchSession,
    #[error("{0} global hotkeys are still registered")]
    HotKeysStillActive(usize),
}

/// Opaque handle for the caller's active recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub(crate) u64);

#[derive(Debug)]
pub struct RecordingSession {
    slot: SlotRef,
    state: RecordingState,
}

impl RecordingSession {
    /// Starts listening for `slot`. The registry must already be suspended.
    pub fn start(slot: SlotRef, active_registrations: usize) -> Result<Self, RecordingError> {
        if active_registrations != 0 {
            return Err(RecordingError::HotKeysStillActive(active_registrations));
        }
        tracing::debug!(?slot, "Recording started");
        Ok(Self {
            slot,
            state: RecordingState::Listening,
        })
    }

    pub fn slot(&self) -> SlotRef {
        self.slot
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == RecordingState::Listening
    }

    pub fn handle_key_down(&mut self, event: &KeyEvent, set: &BindingSet) -> KeyResponse {
        if !self.is_listening() {
            return KeyResponse::Ignored;
        }
        let Some(key_code) = event.key_code else {
            return KeyResponse::Ignored;
        };

        if event.is_cancel() {
            return self.finish(RecordingOutcome::Cancelled);
        }
        if event.is_clear() {
            return self.finish(RecordingOutcome::Cleared);
        }

        // A bare key is never a global hotkey
        let Ok(candidate) = HotKeyBinding::new(key_code, event.modifiers) else {
            return KeyResponse::Ignored;
        };

        match conflict::check(candidate, set, Some(self.slot)) {
            Some(owner) => {
                tracing::debug!(chord = %candidate, owner = %owner, "Recorded chord conflicts");
                KeyResponse::Conflict(owner)
            }
            None => self.finish(RecordingOutcome::Captured(candidate)),
        }
    }

    pub fn cancel(&mut self) -> Option<RecordingOutcome> {
        if !self.is_listening() {
            return None;
        }
        self.state = RecordingState::Idle;
        Some(RecordingOutcome::Cancelled)
    }

    /// Whether the key tap should swallow `event` instead of passing it on.
    pub fn should_suppress(event: &KeyEvent) -> bool {
        event.is_cancel() || event.is_clear() || !event.modifiers.is_empty()
    }

    fn finish(&mut self, outcome: RecordingOutcome) -> KeyResponse {
        self.state = RecordingState::Idle;
        tracing::debug!(slot = ?self.slot, ?outcome, "Recording finished");
        KeyResponse::Finished(outcome)
    }
}
