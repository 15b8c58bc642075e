// ABOUTME: Launcher facade that owns the binding set and coordinates store, registry, recorder and dispatch
// ABOUTME: All mutation happens on the thread running the command loop; OS threads only send AppCommands

use crate::conflict::{self, ConflictOwner};
use crate::dispatch::{AppCommand, DispatchCoordinator};
use crate::events::{BindingEvent, Notifier};
use crate::hotkey::HotKeyBinding;
use crate::model::{BindingSet, BindingSlot, IdeKind, ItemId, LaunchItem, SlotRef};
use crate::platform::{self, HotKeyFacility, HotKeyToken, KeyEventTap, TokenSink};
use crate::recording::{
    KeyEvent, KeyResponse, RecordingError, RecordingOutcome, RecordingSession, SessionHandle,
};
use crate::registry::{HotKeyAction, HotKeyRegistry, InactiveBinding};
use crate::store::BindingStore;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("already used by {0}")]
    Conflict(ConflictOwner),
    #[error("no launch item with id {0}")]
    UnknownItem(ItemId),
    #[error("{0} does not support an extension hotkey")]
    NotExtensible(String),
    #[error("{} is already in the launcher", .0.display())]
    DuplicatePath(PathBuf),
    #[error("{} is not an application bundle or folder", .0.display())]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Recording(#[from] RecordingError),
}

struct ActiveRecording {
    handle: SessionHandle,
    session: RecordingSession,
}

pub struct Launcher {
    store: BindingStore,
    set: BindingSet,
    registry: HotKeyRegistry,
    dispatch: DispatchCoordinator,
    notifier: Notifier,
    key_tap: Box<dyn KeyEventTap>,
    recording: Option<ActiveRecording>,
    next_session: u64,
    command_sender: Sender<AppCommand>,
    command_receiver: Receiver<AppCommand>,
}

impl Launcher {
    /// `facility` is `None` when global hotkeys are switched off.
    pub fn new(
        store: BindingStore,
        facility: Option<Box<dyn HotKeyFacility>>,
        key_tap: Box<dyn KeyEventTap>,
    ) -> Self {
        let (command_sender, command_receiver) = mpsc::channel();

        let registry = match facility {
            Some(facility) => {
                let sender = command_sender.clone();
                let sink: TokenSink = Box::new(move |token| {
                    let _ = sender.send(AppCommand::HotKeyFired(token));
                });
                HotKeyRegistry::init(facility, sink)
            }
            None => {
                tracing::info!("Global hotkeys are disabled by configuration");
                HotKeyRegistry::disabled()
            }
        };

        Self {
            set: BindingSet::new(HotKeyBinding::default_toggle()),
            store,
            registry,
            dispatch: DispatchCoordinator::new(),
            notifier: Notifier::new(),
            key_tap,
            recording: None,
            next_session: 1,
            command_sender,
            command_receiver,
        }
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.set
    }

    pub fn registry(&self) -> &HotKeyRegistry {
        &self.registry
    }

    pub fn command_sender(&self) -> Sender<AppCommand> {
        self.command_sender.clone()
    }

    pub fn subscribe(&mut self) -> Receiver<BindingEvent> {
        self.notifier.subscribe()
    }

    pub fn set_on_toggle(&mut self, handler: impl FnMut() + 'static) {
        self.dispatch.set_on_toggle(handler);
    }

    pub fn set_on_open(&mut self, handler: impl FnMut(&LaunchItem) + 'static) {
        self.dispatch.set_on_open(handler);
    }

    pub fn set_on_enter_extension(&mut self, handler: impl FnMut(&LaunchItem) + 'static) {
        self.dispatch.set_on_enter_extension(handler);
    }

    /// Replaces the in-memory set with the persisted one and registers it.
    pub fn load_bindings(&mut self) {
        if self.recording.is_some() {
            self.abort_recording();
        }

        self.set = self.store.load();
        tracing::info!(items = self.set.items.len(), "Loaded bindings");

        let failures = self.registry.register_all(&self.set);
        self.report_failures(failures);
        self.notifier.publish(BindingEvent::BindingsChanged);
    }

    pub fn add_item(&mut self, path: impl AsRef<Path>) -> Result<ItemId, BindingError> {
        let path = path.as_ref();
        // Application bundles are directories too
        if !path.is_dir() {
            return Err(BindingError::InvalidPath(path.to_path_buf()));
        }
        if self.set.item_by_path(path).is_some() {
            return Err(BindingError::DuplicatePath(path.to_path_buf()));
        }

        let item = LaunchItem::from_path(path);
        let id = item.id;
        tracing::info!(
            item = %id,
            path = %path.display(),
            ide = IdeKind::detect(path).map_or("none", |kind| kind.display_name()),
            "Added item"
        );
        self.set.items.push(item);

        self.persist();
        self.notifier.publish(BindingEvent::BindingsChanged);
        Ok(id)
    }

    pub fn remove_item(&mut self, id: ItemId) -> Result<(), BindingError> {
        let index = self
            .set
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(BindingError::UnknownItem(id))?;

        let editing_item = matches!(
            self.recording.as_ref().map(|r| r.session.slot()),
            Some(SlotRef::Item { id: edited, .. }) if edited == id
        );
        if editing_item {
            self.abort_recording();
        }

        let item = self.set.items.remove(index);
        tracing::info!(item = %id, path = %item.path.display(), "Removed item");
        self.commit();
        Ok(())
    }

    pub fn set_alias(&mut self, id: ItemId, alias: Option<String>) -> Result<(), BindingError> {
        let item = self.set.item_mut(id).ok_or(BindingError::UnknownItem(id))?;
        item.alias = alias
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        self.persist();
        self.notifier.publish(BindingEvent::BindingsChanged);
        Ok(())
    }

    /// Assigns or clears one item slot. A chord held by any other slot is
    /// rejected with the holder's name and nothing changes.
    pub fn update_item_binding(
        &mut self,
        id: ItemId,
        slot: BindingSlot,
        binding: Option<HotKeyBinding>,
    ) -> Result<(), BindingError> {
        let slot_ref = SlotRef::item(id, slot);
        self.check_assignable(slot_ref, binding)?;

        if self.set.binding_at(slot_ref) == binding {
            return Ok(());
        }

        self.set.set_binding(slot_ref, binding);
        tracing::info!(
            item = %id,
            ?slot,
            chord = %binding.map(|b| b.to_string()).unwrap_or_default(),
            "Updated item binding"
        );
        self.commit();
        Ok(())
    }

    pub fn set_toggle_binding(&mut self, binding: HotKeyBinding) -> Result<(), BindingError> {
        self.check_assignable(SlotRef::Toggle, Some(binding))?;

        if self.set.toggle == binding {
            return Ok(());
        }

        self.set.toggle = binding;
        tracing::info!(chord = %binding, "Updated panel toggle binding");
        self.commit();
        Ok(())
    }

    fn check_assignable(
        &self,
        slot: SlotRef,
        binding: Option<HotKeyBinding>,
    ) -> Result<(), BindingError> {
        if let SlotRef::Item { id, slot: item_slot } = slot {
            let item = self.set.item(id).ok_or(BindingError::UnknownItem(id))?;
            if item_slot == BindingSlot::Extension && binding.is_some() && !item.is_extensible {
                return Err(BindingError::NotExtensible(item.name.clone()));
            }
        }

        match binding.and_then(|candidate| conflict::check(candidate, &self.set, Some(slot))) {
            Some(owner) => {
                tracing::debug!(owner = %owner, "Rejected conflicting binding");
                Err(BindingError::Conflict(owner))
            }
            None => Ok(()),
        }
    }

    /// Suspends every global hotkey and starts capturing a chord for `slot`.
    pub fn begin_recording(&mut self, slot: SlotRef) -> Result<SessionHandle, BindingError> {
        if self.recording.is_some() {
            return Err(RecordingError::AlreadyRecording.into());
        }
        if let SlotRef::Item { id, slot: item_slot } = slot {
            let item = self.set.item(id).ok_or(BindingError::UnknownItem(id))?;
            if item_slot == BindingSlot::Extension && !item.is_extensible {
                return Err(BindingError::NotExtensible(item.name.clone()));
            }
        }

        self.registry.suspend();
        let session = match RecordingSession::start(slot, self.registry.active_count()) {
            Ok(session) => session,
            Err(e) => {
                let failures = self.registry.resume(&self.set);
                self.report_failures(failures);
                return Err(e.into());
            }
        };

        let sender = self.command_sender.clone();
        let started = self.key_tap.start(Box::new(move |event| {
            let _ = sender.send(AppCommand::RecordingKey(event));
        }));
        if let Err(e) = started {
            // The host UI can still feed keys through handle_recording_key
            tracing::warn!("Key interception unavailable while recording: {e:#}");
        }

        let handle = SessionHandle(self.next_session);
        self.next_session += 1;
        self.recording = Some(ActiveRecording { handle, session });
        self.notifier.publish(BindingEvent::RecordingStarted(slot));
        Ok(handle)
    }

    pub fn cancel_recording(&mut self, handle: SessionHandle) -> Result<(), BindingError> {
        match self.recording.as_ref() {
            Some(active) if active.handle == handle => {
                self.abort_recording();
                Ok(())
            }
            _ => Err(RecordingError::NoSuchSession.into()),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Feeds one raw key-down to the active recording. Returns `None` when no
    /// recording is in progress.
    pub fn handle_recording_key(&mut self, event: KeyEvent) -> Option<KeyResponse> {
        let active = self.recording.as_mut()?;
        let slot = active.session.slot();
        let response = active.session.handle_key_down(&event, &self.set);

        match &response {
            KeyResponse::Ignored => {}
            KeyResponse::Conflict(owner) => {
                self.notifier.publish(BindingEvent::RecordingConflict {
                    slot,
                    owner: owner.clone(),
                });
            }
            KeyResponse::Finished(outcome) => self.finish_recording(*outcome),
        }
        Some(response)
    }

    fn abort_recording(&mut self) {
        let outcome = self
            .recording
            .as_mut()
            .and_then(|active| active.session.cancel())
            .unwrap_or(RecordingOutcome::Cancelled);
        self.finish_recording(outcome);
    }

    fn finish_recording(&mut self, outcome: RecordingOutcome) {
        let Some(active) = self.recording.take() else {
            return;
        };
        let slot = active.session.slot();
        self.key_tap.stop();

        // The toggle cannot be cleared, so Delete leaves it as it was
        let changed = match outcome.new_binding() {
            Some(binding) if self.set.binding_at(slot) != binding => {
                self.set.set_binding(slot, binding)
            }
            _ => false,
        };
        tracing::info!(?slot, ?outcome, changed, "Recording finished");

        if changed {
            self.persist();
        }
        let failures = self.registry.resume(&self.set);
        self.report_failures(failures);

        self.notifier
            .publish(BindingEvent::RecordingFinished { slot, outcome });
        if changed {
            self.notifier.publish(BindingEvent::BindingsChanged);
        }
    }

    pub fn retry_inactive(&mut self) -> usize {
        self.registry.retry_inactive(&self.set)
    }

    /// Persists, re-registers unless suspended, and notifies subscribers.
    fn commit(&mut self) {
        self.persist();
        if !self.registry.is_dormant() {
            let failures = self.registry.register_all(&self.set);
            self.report_failures(failures);
        }
        self.notifier.publish(BindingEvent::BindingsChanged);
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.set) {
            tracing::error!(path = %self.store.path().display(), "Failed to save bindings: {e:#}");
            self.notifier
                .publish(BindingEvent::SaveFailed(format!("{e:#}")));
        }
    }

    fn report_failures(&mut self, failures: Vec<InactiveBinding>) {
        for failure in failures {
            self.notifier.publish(BindingEvent::RegistrationFailed {
                owner: failure.name,
                binding: failure.binding,
                reason: failure.reason.to_string(),
            });
        }
    }

    /// Handles one command. Returns false when the loop should stop.
    pub fn handle_command(&mut self, command: AppCommand) -> bool {
        tracing::trace!(?command, "Processing command");
        match command {
            AppCommand::HotKeyFired(token) => self.dispatch_token(token),
            AppCommand::RecordingKey(event) => {
                self.handle_recording_key(event);
            }
            AppCommand::TogglePanel => {
                self.dispatch.dispatch(HotKeyAction::TogglePanel, &self.set);
            }
            AppCommand::Quit => {
                tracing::info!("Quit command received");
                return false;
            }
        }
        true
    }

    fn dispatch_token(&mut self, token: HotKeyToken) {
        match self.registry.resolve(token) {
            Some(action) => {
                self.dispatch.dispatch(action, &self.set);
            }
            // Fired just before an unregister; nothing is bound to it any more
            None => tracing::debug!(token, "Ignoring hotkey for stale token"),
        }
    }

    /// Processes every queued command without blocking. Returns false if a
    /// Quit was among them.
    pub fn drain_pending(&mut self) -> bool {
        while let Ok(command) = self.command_receiver.try_recv() {
            if !self.handle_command(command) {
                return false;
            }
        }
        true
    }

    /// Runs until a Quit command arrives. The launcher holds a sender of its
    /// own, so the channel never disconnects while the loop is running.
    pub fn run_command_loop(&mut self) -> Result<()> {
        tracing::info!("Starting command processing loop");

        loop {
            platform::pump_events();

            if let Ok(command) = self.command_receiver.recv_timeout(POLL_INTERVAL)
                && !self.handle_command(command)
            {
                break;
            }
        }

        self.shutdown();
        tracing::info!("Command loop finished");
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if self.recording.is_some() {
            self.abort_recording();
        }
        self.key_tap.stop();
        self.registry.shutdown();
    }
}
