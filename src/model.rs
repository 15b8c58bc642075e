// ABOUTME: Launch items, binding slots and the BindingSet that owns the hotkey conflict namespace
// ABOUTME: BindingSet::sanitize restores the pairwise-distinct chord invariant after a load

use crate::hotkey::HotKeyBinding;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const TOGGLE_OWNER_NAME: &str = "Search Panel";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// IDEs whose items get a secondary "enter extension" hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeKind {
    VsCode,
    Zed,
    IntelliJ,
    PyCharm,
    WebStorm,
    GoLand,
    Rider,
    CLion,
}

impl IdeKind {
    pub fn detect(path: &Path) -> Option<Self> {
        let lowered = path.to_string_lossy().to_lowercase();

        if lowered.contains("visual studio code") || lowered.ends_with("/code.app") {
            return Some(IdeKind::VsCode);
        }
        if lowered.ends_with("/zed.app") {
            return Some(IdeKind::Zed);
        }

        const JETBRAINS: [(&str, IdeKind); 6] = [
            ("intellij", IdeKind::IntelliJ),
            ("pycharm", IdeKind::PyCharm),
            ("webstorm", IdeKind::WebStorm),
            ("goland", IdeKind::GoLand),
            ("rider", IdeKind::Rider),
            ("clion", IdeKind::CLion),
        ];
        JETBRAINS
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map(|(_, kind)| *kind)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IdeKind::VsCode => "Visual Studio Code",
            IdeKind::Zed => "Zed",
            IdeKind::IntelliJ => "IntelliJ IDEA",
            IdeKind::PyCharm => "PyCharm",
            IdeKind::WebStorm => "WebStorm",
            IdeKind::GoLand => "GoLand",
            IdeKind::Rider => "Rider",
            IdeKind::CLion => "CLion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchItem {
    pub id: ItemId,
    pub path: PathBuf,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub is_extensible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_hotkey: Option<HotKeyBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_hotkey: Option<HotKeyBinding>,
}

impl LaunchItem {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            id: ItemId::new(),
            icon: path.to_string_lossy().into_owned(),
            is_extensible: IdeKind::detect(&path).is_some(),
            name,
            path,
            alias: None,
            open_hotkey: None,
            extension_hotkey: None,
        }
    }

    pub fn binding(&self, slot: BindingSlot) -> Option<HotKeyBinding> {
        match slot {
            BindingSlot::Open => self.open_hotkey,
            BindingSlot::Extension => self.extension_hotkey,
        }
    }

    fn binding_mut(&mut self, slot: BindingSlot) -> &mut Option<HotKeyBinding> {
        match slot {
            BindingSlot::Open => &mut self.open_hotkey,
            BindingSlot::Extension => &mut self.extension_hotkey,
        }
    }

    pub fn owner_name(&self, slot: BindingSlot) -> String {
        match slot {
            BindingSlot::Open => self.name.clone(),
            BindingSlot::Extension => format!("{} (extension)", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingSlot {
    Open,
    Extension,
}

/// Names one binding slot in the conflict namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotRef {
    Toggle,
    Item { id: ItemId, slot: BindingSlot },
}

impl SlotRef {
    pub fn item(id: ItemId, slot: BindingSlot) -> Self {
        SlotRef::Item { id, slot }
    }
}

/// A configured binding together with the slot that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOwner {
    pub slot: SlotRef,
    pub name: String,
    pub binding: HotKeyBinding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSet {
    pub toggle: HotKeyBinding,
    #[serde(default)]
    pub items: Vec<LaunchItem>,
}

impl Default for BindingSet {
    fn default() -> Self {
        Self::new(HotKeyBinding::default_toggle())
    }
}

impl BindingSet {
    pub fn new(toggle: HotKeyBinding) -> Self {
        Self {
            toggle,
            items: Vec::new(),
        }
    }

    pub fn item(&self, id: ItemId) -> Option<&LaunchItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut LaunchItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn item_by_path(&self, path: &Path) -> Option<&LaunchItem> {
        self.items.iter().find(|item| item.path == path)
    }

    pub fn binding_at(&self, slot: SlotRef) -> Option<HotKeyBinding> {
        match slot {
            SlotRef::Toggle => Some(self.toggle),
            SlotRef::Item { id, slot } => self.item(id).and_then(|item| item.binding(slot)),
        }
    }

    /// Raw slot assignment. Conflict checks are the caller's job; returns
    /// false when the slot does not exist or the toggle would be cleared.
    pub fn set_binding(&mut self, slot: SlotRef, binding: Option<HotKeyBinding>) -> bool {
        match slot {
            SlotRef::Toggle => match binding {
                Some(binding) => {
                    self.toggle = binding;
                    true
                }
                None => false,
            },
            SlotRef::Item { id, slot } => match self.item_mut(id) {
                Some(item) => {
                    *item.binding_mut(slot) = binding;
                    true
                }
                None => false,
            },
        }
    }

    /// Every configured binding in namespace order: toggle, then each item's
    /// open and extension slots.
    pub fn owners(&self) -> Vec<BindingOwner> {
        let mut owners = vec![BindingOwner {
            slot: SlotRef::Toggle,
            name: TOGGLE_OWNER_NAME.to_string(),
            binding: self.toggle,
        }];

        for item in &self.items {
            for slot in [BindingSlot::Open, BindingSlot::Extension] {
                if let Some(binding) = item.binding(slot) {
                    owners.push(BindingOwner {
                        slot: SlotRef::item(item.id, slot),
                        name: item.owner_name(slot),
                        binding,
                    });
                }
            }
        }

        owners
    }

    /// Slots whose chord is already held by an earlier slot.
    pub fn duplicate_slots(&self) -> Vec<SlotRef> {
        let mut seen = HashSet::new();
        self.owners()
            .into_iter()
            .filter(|owner| !seen.insert(owner.binding))
            .map(|owner| owner.slot)
            .collect()
    }

    /// Clears duplicate chords and extension bindings on items that cannot use them.
    /// Returns the slots that were cleared.
    pub fn sanitize(&mut self) -> Vec<SlotRef> {
        let mut cleared = Vec::new();

        for item in &mut self.items {
            if !item.is_extensible && item.extension_hotkey.take().is_some() {
                cleared.push(SlotRef::item(item.id, BindingSlot::Extension));
            }
        }

        for slot in self.duplicate_slots() {
            if self.set_binding(slot, None) {
                cleared.push(slot);
            }
        }

        cleared
    }
}
