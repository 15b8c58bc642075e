// ABOUTME: Publish/subscribe notifications about binding edits, registration failures and recordings
// ABOUTME: Subscribers get an mpsc receiver; dropped receivers are pruned on the next publish

use crate::conflict::ConflictOwner;
use crate::hotkey::HotKeyBinding;
use crate::model::SlotRef;
use crate::recording::RecordingOutcome;
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingEvent {
    BindingsChanged,
    RegistrationFailed {
        owner: String,
        binding: HotKeyBinding,
        reason: String,
    },
    RecordingStarted(SlotRef),
    RecordingConflict {
        slot: SlotRef,
        owner: ConflictOwner,
    },
    RecordingFinished {
        slot: SlotRef,
        outcome: RecordingOutcome,
    },
    SaveFailed(String),
}

#[derive(Default)]
pub struct Notifier {
    subscribers: Vec<Sender<BindingEvent>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<BindingEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: BindingEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
