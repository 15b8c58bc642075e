// ABOUTME: Pure conflict detection of a proposed chord against the configured binding namespace
// ABOUTME: Reports the display name of the first owner holding an identical (key code, modifiers) pair

use crate::hotkey::HotKeyBinding;
use crate::model::{BindingSet, SlotRef};
use std::collections::HashMap;
use std::fmt;

/// The existing holder of a chord a caller tried to claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictOwner {
    pub slot: SlotRef,
    pub name: String,
}

impl fmt::Display for ConflictOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A chord held by more than one slot of the same set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub binding: HotKeyBinding,
    pub slots: Vec<SlotRef>,
}

/// Returns the first owner of `candidate`, skipping the slot being edited.
pub fn check(
    candidate: HotKeyBinding,
    against: &BindingSet,
    excluding: Option<SlotRef>,
) -> Option<ConflictOwner> {
    against
        .owners()
        .into_iter()
        .filter(|owner| Some(owner.slot) != excluding)
        .find(|owner| owner.binding == candidate)
        .map(|owner| ConflictOwner {
            slot: owner.slot,
            name: owner.name,
        })
}

/// Every chord that appears in more than one slot, in first-seen order.
pub fn find_conflicts(set: &BindingSet) -> Vec<Conflict> {
    let mut order = Vec::new();
    let mut by_binding: HashMap<HotKeyBinding, Vec<SlotRef>> = HashMap::new();

    for owner in set.owners() {
        let slots = by_binding.entry(owner.binding).or_default();
        if slots.is_empty() {
            order.push(owner.binding);
        }
        slots.push(owner.slot);
    }

    order
        .into_iter()
        .filter_map(|binding| {
            let slots = by_binding.remove(&binding)?;
            (slots.len() > 1).then_some(Conflict { binding, slots })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifiers;
    use crate::hotkey::keys::KEY_SPACE;
    use crate::model::{BindingSlot, LaunchItem, TOGGLE_OWNER_NAME};

    fn cmd_shift_space() -> HotKeyBinding {
        HotKeyBinding::new(KEY_SPACE, Modifiers::COMMAND | Modifiers::SHIFT).unwrap()
    }

    fn set_with_item(name: &str, open: Option<HotKeyBinding>) -> (BindingSet, LaunchItem) {
        let mut set = BindingSet::default();
        let mut item = LaunchItem::from_path(format!("/Applications/{name}.app"));
        item.open_hotkey = open;
        set.items.push(item.clone());
        (set, item)
    }

    #[test]
    fn test_no_conflict_on_fresh_chord() {
        let (set, _) = set_with_item("Foo", None);
        assert_eq!(check(cmd_shift_space(), &set, None), None);
    }

    #[test]
    fn test_toggle_is_in_namespace() {
        let set = BindingSet::default();
        let owner = check(HotKeyBinding::default_toggle(), &set, None).unwrap();
        assert_eq!(owner.slot, SlotRef::Toggle);
        assert_eq!(owner.name, TOGGLE_OWNER_NAME);
    }

    #[test]
    fn test_reports_item_owner_name() {
        let (set, _) = set_with_item("Foo", Some(cmd_shift_space()));
        let owner = check(cmd_shift_space(), &set, None).unwrap();
        assert_eq!(owner.name, "Foo");
    }

    #[test]
    fn test_excluding_own_slot() {
        let (set, item) = set_with_item("Foo", Some(cmd_shift_space()));
        let own = SlotRef::item(item.id, BindingSlot::Open);
        assert_eq!(check(cmd_shift_space(), &set, Some(own)), None);
    }

    #[test]
    fn test_excluding_one_slot_still_sees_sibling_slot() {
        let (set, item) = set_with_item("Foo", Some(cmd_shift_space()));
        let sibling = SlotRef::item(item.id, BindingSlot::Extension);
        let owner = check(cmd_shift_space(), &set, Some(sibling)).unwrap();
        assert_eq!(owner.slot, SlotRef::item(item.id, BindingSlot::Open));
    }

    #[test]
    fn test_modifiers_must_match_exactly() {
        let (set, _) = set_with_item("Foo", Some(cmd_shift_space()));
        let cmd_space = HotKeyBinding::new(KEY_SPACE, Modifiers::COMMAND).unwrap();
        assert_eq!(check(cmd_space, &set, None), None);
    }

    #[test]
    fn test_find_conflicts() {
        let (mut set, first) = set_with_item("Foo", Some(cmd_shift_space()));
        let mut second = LaunchItem::from_path("/Applications/Bar.app");
        second.open_hotkey = Some(cmd_shift_space());
        let second_id = second.id;
        set.items.push(second);

        let conflicts = find_conflicts(&set);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].binding, cmd_shift_space());
        assert_eq!(
            conflicts[0].slots,
            vec![
                SlotRef::item(first.id, BindingSlot::Open),
                SlotRef::item(second_id, BindingSlot::Open)
            ]
        );

        assert!(find_conflicts(&BindingSet::default()).is_empty());
    }
}
