// ABOUTME: Commands marshaled onto the coordination thread and the callbacks fired hotkeys resolve to
// ABOUTME: DispatchCoordinator holds the host's toggle/open/extension handlers and invokes them in order

use crate::model::{BindingSet, LaunchItem};
use crate::platform::HotKeyToken;
use crate::recording::KeyEvent;
use crate::registry::HotKeyAction;

// Commands that can be sent to the coordination thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    HotKeyFired(HotKeyToken),
    RecordingKey(KeyEvent),
    TogglePanel,
    Quit,
}

type ToggleHandler = Box<dyn FnMut()>;
type ItemHandler = Box<dyn FnMut(&LaunchItem)>;

/// Invokes the host's handler for each resolved hotkey action. Handlers run
/// on the coordination thread, in the order the actions arrive. Item handlers
/// receive the item as it is at dispatch time, so the host never keeps its
/// own copy of the set.
#[derive(Default)]
pub struct DispatchCoordinator {
    on_toggle: Option<ToggleHandler>,
    on_open: Option<ItemHandler>,
    on_enter_extension: Option<ItemHandler>,
}

impl DispatchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_on_toggle(&mut self, handler: impl FnMut() + 'static) {
        self.on_toggle = Some(Box::new(handler));
    }

    pub fn set_on_open(&mut self, handler: impl FnMut(&LaunchItem) + 'static) {
        self.on_open = Some(Box::new(handler));
    }

    pub fn set_on_enter_extension(&mut self, handler: impl FnMut(&LaunchItem) + 'static) {
        self.on_enter_extension = Some(Box::new(handler));
    }

    /// Returns false when no handler is set for the action or its item is no
    /// longer in `set`.
    pub fn dispatch(&mut self, action: HotKeyAction, set: &BindingSet) -> bool {
        let (handler, id) = match action {
            HotKeyAction::TogglePanel => {
                return match self.on_toggle.as_mut() {
                    Some(handler) => {
                        handler();
                        true
                    }
                    None => {
                        tracing::debug!(?action, "No handler set for hotkey action");
                        false
                    }
                };
            }
            HotKeyAction::OpenItem(id) => (self.on_open.as_mut(), id),
            HotKeyAction::EnterExtension(id) => (self.on_enter_extension.as_mut(), id),
        };

        let Some(item) = set.item(id) else {
            tracing::debug!(item = %id, ?action, "Dropping hotkey for removed item");
            return false;
        };
        match handler {
            Some(handler) => {
                handler(item);
                true
            }
            None => {
                tracing::debug!(?action, "No handler set for hotkey action");
                false
            }
        }
    }
}
