// ABOUTME: HotKeyRegistry owns every OS hotkey registration and maps fired tokens to logical actions
// ABOUTME: Supports bulk (re)registration, idempotent suspend/resume, retries and explicit teardown

use crate::hotkey::HotKeyBinding;
use crate::model::{BindingSet, BindingSlot, ItemId, SlotRef};
use crate::platform::{HotKeyFacility, HotKeyToken, RegisterError, TokenSink};
use std::collections::{BTreeMap, HashSet};

/// What a fired hotkey means to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HotKeyAction {
    TogglePanel,
    OpenItem(ItemId),
    EnterExtension(ItemId),
}

impl HotKeyAction {
    pub fn for_slot(slot: SlotRef) -> Self {
        match slot {
            SlotRef::Toggle => HotKeyAction::TogglePanel,
            SlotRef::Item {
                id,
                slot: BindingSlot::Open,
            } => HotKeyAction::OpenItem(id),
            SlotRef::Item {
                id,
                slot: BindingSlot::Extension,
            } => HotKeyAction::EnterExtension(id),
        }
    }
}

/// A binding that is live in the OS hotkey table right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredHandle {
    pub token: HotKeyToken,
    pub binding: HotKeyBinding,
    pub action: HotKeyAction,
}

/// A configured binding the OS refused; kept so the user can be told and retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactiveBinding {
    pub slot: SlotRef,
    pub name: String,
    pub binding: HotKeyBinding,
    pub reason: RegisterError,
}

pub struct HotKeyRegistry {
    facility: Option<Box<dyn HotKeyFacility>>,
    handles: BTreeMap<HotKeyToken, RegisteredHandle>,
    inactive: Vec<InactiveBinding>,
    next_token: HotKeyToken,
    dormant: bool,
}

impl HotKeyRegistry {
    /// Installs the OS event subscription. If that fails the registry is
    /// created disabled and every later call is a no-op.
    pub fn init(mut facility: Box<dyn HotKeyFacility>, sink: TokenSink) -> Self {
        let facility = match facility.install(sink) {
            Ok(()) => Some(facility),
            Err(e) => {
                tracing::error!("{e}; global hotkeys are disabled for this session");
                None
            }
        };

        Self {
            facility,
            handles: BTreeMap::new(),
            inactive: Vec::new(),
            next_token: 1,
            dormant: false,
        }
    }

    pub fn disabled() -> Self {
        Self {
            facility: None,
            handles: BTreeMap::new(),
            inactive: Vec::new(),
            next_token: 1,
            dormant: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.facility.is_some()
    }

    pub fn is_dormant(&self) -> bool {
        self.dormant
    }

    pub fn active_count(&self) -> usize {
        self.handles.len()
    }

    /// Live `(binding, action)` pairs, sorted so two snapshots compare equal.
    pub fn active_bindings(&self) -> Vec<(HotKeyBinding, HotKeyAction)> {
        let mut active: Vec<_> = self
            .handles
            .values()
            .map(|handle| (handle.binding, handle.action))
            .collect();
        active.sort_by_key(|(binding, action)| {
            (*action, binding.key_code(), binding.modifiers().bits())
        });
        active
    }

    pub fn inactive(&self) -> &[InactiveBinding] {
        &self.inactive
    }

    pub fn resolve(&self, token: HotKeyToken) -> Option<HotKeyAction> {
        self.handles.get(&token).map(|handle| handle.action)
    }

    /// Replaces the live set with `set`. Each binding is attempted on its own;
    /// failures are logged, kept in `inactive()` and returned.
    pub fn register_all(&mut self, set: &BindingSet) -> Vec<InactiveBinding> {
        self.unregister_all();
        self.inactive.clear();

        if self.facility.is_none() {
            return Vec::new();
        }
        if self.dormant {
            tracing::debug!("Registry is suspended, deferring registration to resume");
            return Vec::new();
        }

        let mut seen = HashSet::new();
        for owner in set.owners() {
            if let SlotRef::Item {
                id,
                slot: BindingSlot::Extension,
            } = owner.slot
            {
                if !set.item(id).is_some_and(|item| item.is_extensible) {
                    continue;
                }
            }
            if !seen.insert(owner.binding) {
                tracing::warn!(
                    owner = %owner.name,
                    chord = %owner.binding,
                    "Skipping binding that duplicates an earlier one"
                );
                continue;
            }

            if let Err(reason) = self.register_one(owner.slot, owner.binding) {
                tracing::warn!(
                    owner = %owner.name,
                    chord = %owner.binding,
                    "Hotkey left inactive: {reason}"
                );
                self.inactive.push(InactiveBinding {
                    slot: owner.slot,
                    name: owner.name,
                    binding: owner.binding,
                    reason,
                });
            }
        }

        tracing::info!(
            active = self.handles.len(),
            inactive = self.inactive.len(),
            "Registered hotkeys"
        );
        self.inactive.clone()
    }

    fn register_one(&mut self, slot: SlotRef, binding: HotKeyBinding) -> Result<(), RegisterError> {
        let facility = self.facility.as_mut().ok_or(RegisterError::NotInstalled)?;

        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1).max(1);

        facility.register(binding, token)?;

        let action = HotKeyAction::for_slot(slot);
        tracing::debug!(
            token,
            key_code = binding.key_code(),
            modifiers = binding.modifiers().bits(),
            ?action,
            "Registered hotkey"
        );
        self.handles.insert(
            token,
            RegisteredHandle {
                token,
                binding,
                action,
            },
        );
        Ok(())
    }

    /// Safe to call with nothing registered.
    pub fn unregister_all(&mut self) {
        let handles = std::mem::take(&mut self.handles);
        if let Some(facility) = self.facility.as_mut() {
            for token in handles.keys() {
                facility.unregister(*token);
            }
        }
        if !handles.is_empty() {
            tracing::debug!(count = handles.len(), "Unregistered hotkeys");
        }
    }

    /// Drops every registration and goes dormant. Repeated calls are no-ops.
    pub fn suspend(&mut self) {
        if self.dormant {
            return;
        }
        self.unregister_all();
        self.dormant = true;
        tracing::debug!("Hotkeys suspended");
    }

    /// Leaves dormancy and registers `set`. Does nothing if not suspended.
    pub fn resume(&mut self, set: &BindingSet) -> Vec<InactiveBinding> {
        if !self.dormant {
            return Vec::new();
        }
        self.dormant = false;
        tracing::debug!("Hotkeys resumed");
        self.register_all(set)
    }

    /// Re-attempts bindings the OS refused earlier. Returns how many went live.
    pub fn retry_inactive(&mut self, set: &BindingSet) -> usize {
        if self.dormant || self.facility.is_none() {
            return 0;
        }

        let pending = std::mem::take(&mut self.inactive);
        let mut recovered = 0;
        for entry in pending {
            // Skip entries whose slot was edited since the failure
            if set.binding_at(entry.slot) != Some(entry.binding) {
                continue;
            }
            match self.register_one(entry.slot, entry.binding) {
                Ok(()) => recovered += 1,
                Err(reason) => self.inactive.push(InactiveBinding { reason, ..entry }),
            }
        }

        if recovered > 0 {
            tracing::info!(recovered, "Recovered previously inactive hotkeys");
        }
        recovered
    }

    /// Unregisters everything and releases the OS facility.
    pub fn shutdown(&mut self) {
        self.unregister_all();
        self.inactive.clear();
        self.facility = None;
    }
}

impl Drop for HotKeyRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifiers;
    use crate::hotkey::keys::KEY_SPACE;
    use crate::model::LaunchItem;
    use crate::platform::testing::FakeFacility;
    use std::sync::mpsc;

    fn chord(key_code: u32, modifiers: Modifiers) -> HotKeyBinding {
        HotKeyBinding::new(key_code, modifiers).unwrap()
    }

    fn registry_with(fake: &FakeFacility) -> (HotKeyRegistry, mpsc::Receiver<HotKeyToken>) {
        let (tx, rx) = mpsc::channel();
        let sink: TokenSink = Box::new(move |token| {
            let _ = tx.send(token);
        });
        (HotKeyRegistry::init(fake.boxed(), sink), rx)
    }

    fn set_with_foo() -> (BindingSet, ItemId) {
        let mut set = BindingSet::default();
        let mut foo = LaunchItem::from_path("/Applications/Foo.app");
        foo.open_hotkey = Some(chord(KEY_SPACE, Modifiers::COMMAND | Modifiers::SHIFT));
        let id = foo.id;
        set.items.push(foo);
        (set, id)
    }

    #[test]
    fn test_fresh_install_registers_toggle() {
        let fake = FakeFacility::new();
        let (mut registry, _rx) = registry_with(&fake);

        let failures = registry.register_all(&BindingSet::default());
        assert!(failures.is_empty());
        assert_eq!(registry.active_count(), 1);
        assert_eq!(fake.active_bindings(), vec![HotKeyBinding::default_toggle()]);
        assert_eq!(
            registry.active_bindings(),
            vec![(HotKeyBinding::default_toggle(), HotKeyAction::TogglePanel)]
        );
    }

    #[test]
    fn test_failures_are_independent() {
        let fake = FakeFacility::new();
        fake.claim_elsewhere(HotKeyBinding::default_toggle());
        let (mut registry, _rx) = registry_with(&fake);
        let (set, foo) = set_with_foo();

        let failures = registry.register_all(&set);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].slot, SlotRef::Toggle);
        assert_eq!(failures[0].reason, RegisterError::AlreadyClaimed);
        assert_eq!(registry.active_count(), 1);
        assert_eq!(
            registry.active_bindings()[0].1,
            HotKeyAction::OpenItem(foo)
        );
    }

    #[test]
    fn test_retry_inactive_after_slot_frees() {
        let fake = FakeFacility::new();
        fake.claim_elsewhere(HotKeyBinding::default_toggle());
        let (mut registry, _rx) = registry_with(&fake);
        let set = BindingSet::default();
        registry.register_all(&set);
        assert_eq!(registry.retry_inactive(&set), 0);
        assert_eq!(registry.inactive().len(), 1);

        fake.release_elsewhere(HotKeyBinding::default_toggle());
        assert_eq!(registry.retry_inactive(&set), 1);
        assert!(registry.inactive().is_empty());
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_fired_token_resolves_to_action() {
        let fake = FakeFacility::new();
        let (mut registry, rx) = registry_with(&fake);
        let (set, foo) = set_with_foo();
        registry.register_all(&set);

        assert!(fake.press(chord(KEY_SPACE, Modifiers::COMMAND | Modifiers::SHIFT)));
        let token = rx.try_recv().unwrap();
        assert_eq!(registry.resolve(token), Some(HotKeyAction::OpenItem(foo)));
    }

    #[test]
    fn test_stale_token_resolves_to_nothing() {
        let fake = FakeFacility::new();
        let (mut registry, _rx) = registry_with(&fake);
        let (set, _) = set_with_foo();
        registry.register_all(&set);
        let old_tokens: Vec<_> = registry.handles.keys().copied().collect();

        registry.register_all(&set);
        for token in old_tokens {
            assert_eq!(registry.resolve(token), None);
        }
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_suspend_and_resume_are_idempotent() {
        let fake = FakeFacility::new();
        let (mut registry, _rx) = registry_with(&fake);
        let (set, _) = set_with_foo();
        registry.register_all(&set);
        let before = registry.active_bindings();

        registry.suspend();
        registry.suspend();
        assert!(registry.is_dormant());
        assert_eq!(registry.active_count(), 0);
        assert_eq!(fake.active_count(), 0);

        registry.resume(&set);
        let registrations = fake.state.lock().register_calls;
        registry.resume(&set);
        assert_eq!(fake.state.lock().register_calls, registrations);
        assert!(!registry.is_dormant());
        assert_eq!(registry.active_bindings(), before);
    }

    #[test]
    fn test_register_all_while_dormant_stays_empty() {
        let fake = FakeFacility::new();
        let (mut registry, _rx) = registry_with(&fake);
        registry.suspend();
        registry.register_all(&BindingSet::default());
        assert_eq!(registry.active_count(), 0);
        assert_eq!(fake.active_count(), 0);
    }

    #[test]
    fn test_unregister_all_with_nothing_registered() {
        let fake = FakeFacility::new();
        let (mut registry, _rx) = registry_with(&fake);
        registry.unregister_all();
        assert_eq!(fake.state.lock().unregister_calls, 0);
    }

    #[test]
    fn test_duplicates_and_plain_extensions_are_skipped() {
        let fake = FakeFacility::new();
        let (mut registry, _rx) = registry_with(&fake);

        let mut set = BindingSet::default();
        let mut a = LaunchItem::from_path("/Applications/A.app");
        a.open_hotkey = Some(HotKeyBinding::default_toggle());
        a.extension_hotkey = Some(chord(0, Modifiers::COMMAND));
        set.items.push(a);

        registry.register_all(&set);
        assert_eq!(registry.active_count(), 1);
        assert!(registry.inactive().is_empty());
    }

    #[test]
    fn test_install_failure_disables_registry() {
        let fake = FakeFacility::failing_install();
        let (mut registry, _rx) = registry_with(&fake);
        assert!(!registry.is_enabled());

        let failures = registry.register_all(&BindingSet::default());
        assert!(failures.is_empty());
        assert_eq!(registry.active_count(), 0);
        assert_eq!(fake.state.lock().register_calls, 0);
    }

    #[test]
    fn test_drop_unregisters_everything() {
        let fake = FakeFacility::new();
        {
            let (mut registry, _rx) = registry_with(&fake);
            let (set, _) = set_with_foo();
            registry.register_all(&set);
            assert_eq!(fake.active_count(), 2);
        }
        assert_eq!(fake.active_count(), 0);
    }
}
