// ABOUTME: In-memory HotKeyFacility for tests, shared through a handle the test keeps
// ABOUTME: Simulates chords claimed by other processes, install failure and OS-delivered events

use super::{HotKeyFacility, HotKeyToken, InstallError, RegisterError, TokenSink};
use crate::hotkey::HotKeyBinding;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
pub struct FakeState {
    pub active: BTreeMap<HotKeyToken, HotKeyBinding>,
    pub claimed_elsewhere: HashSet<HotKeyBinding>,
    pub fail_install: bool,
    pub register_calls: usize,
    pub unregister_calls: usize,
    sink: Option<TokenSink>,
}

#[derive(Clone, Default)]
pub struct FakeFacility {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeFacility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_install() -> Self {
        let fake = Self::default();
        fake.state.lock().fail_install = true;
        fake
    }

    pub fn claim_elsewhere(&self, binding: HotKeyBinding) {
        self.state.lock().claimed_elsewhere.insert(binding);
    }

    pub fn release_elsewhere(&self, binding: HotKeyBinding) {
        self.state.lock().claimed_elsewhere.remove(&binding);
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn active_bindings(&self) -> Vec<HotKeyBinding> {
        self.state.lock().active.values().copied().collect()
    }

    /// Simulates the OS firing the hotkey registered for `binding`.
    pub fn press(&self, binding: HotKeyBinding) -> bool {
        let state = self.state.lock();
        let token = state
            .active
            .iter()
            .find(|(_, b)| **b == binding)
            .map(|(token, _)| *token);
        match (token, state.sink.as_ref()) {
            (Some(token), Some(sink)) => {
                sink(token);
                true
            }
            _ => false,
        }
    }

    pub fn fire_token(&self, token: HotKeyToken) {
        if let Some(sink) = self.state.lock().sink.as_ref() {
            sink(token);
        }
    }

    pub fn boxed(&self) -> Box<dyn HotKeyFacility> {
        Box::new(self.clone())
    }
}

impl HotKeyFacility for FakeFacility {
    fn install(&mut self, sink: TokenSink) -> Result<(), InstallError> {
        let mut state = self.state.lock();
        if state.fail_install {
            return Err(InstallError("event target unavailable".to_string()));
        }
        state.sink = Some(sink);
        Ok(())
    }

    fn register(
        &mut self,
        binding: HotKeyBinding,
        token: HotKeyToken,
    ) -> Result<(), RegisterError> {
        let mut state = self.state.lock();
        state.register_calls += 1;
        if state.sink.is_none() {
            return Err(RegisterError::NotInstalled);
        }
        if state.claimed_elsewhere.contains(&binding) {
            return Err(RegisterError::AlreadyClaimed);
        }
        assert!(
            !state.active.values().any(|b| *b == binding),
            "same chord registered twice"
        );
        state.active.insert(token, binding);
        Ok(())
    }

    fn unregister(&mut self, token: HotKeyToken) {
        let mut state = self.state.lock();
        state.unregister_calls += 1;
        state.active.remove(&token);
    }
}
