// ABOUTME: HotKeyFacility backed by the global-hotkey crate (Carbon hotkeys on macOS, XGrabKey on X11)
// ABOUTME: Translates virtual key codes and modifier bits, and routes OS hotkey ids back to registry tokens

use super::{HotKeyFacility, HotKeyToken, InstallError, RegisterError, TokenSink};
use crate::hotkey::{HotKeyBinding, Modifiers};
use global_hotkey::{
    Error as HotkeyError, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers as OsModifiers},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub struct GlobalHotKeyFacility {
    manager: Option<GlobalHotKeyManager>,
    registered: HashMap<HotKeyToken, HotKey>,
    // OS hotkey id -> token; shared with the event handler thread
    routes: Arc<Mutex<HashMap<u32, HotKeyToken>>>,
}

impl GlobalHotKeyFacility {
    pub fn new() -> Self {
        Self {
            manager: None,
            registered: HashMap::new(),
            routes: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for GlobalHotKeyFacility {
    fn default() -> Self {
        Self::new()
    }
}

impl HotKeyFacility for GlobalHotKeyFacility {
    fn install(&mut self, sink: TokenSink) -> Result<(), InstallError> {
        if self.manager.is_some() {
            return Ok(());
        }

        let manager = GlobalHotKeyManager::new().map_err(|e| InstallError(e.to_string()))?;

        let routes = self.routes.clone();
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            // Only respond to key press, not release
            if event.state != HotKeyState::Pressed {
                return;
            }
            let token = routes.lock().get(&event.id).copied();
            match token {
                Some(token) => sink(token),
                None => tracing::debug!(os_id = event.id, "Hotkey event for unknown id"),
            }
        }));

        self.manager = Some(manager);
        tracing::debug!("Installed global hotkey event handler");
        Ok(())
    }

    fn register(
        &mut self,
        binding: HotKeyBinding,
        token: HotKeyToken,
    ) -> Result<(), RegisterError> {
        let manager = self.manager.as_ref().ok_or(RegisterError::NotInstalled)?;
        let code = code_for_key(binding.key_code()).ok_or(RegisterError::Unsupported)?;
        let hotkey = HotKey::new(Some(os_modifiers(binding.modifiers())), code);

        manager.register(hotkey).map_err(|e| match e {
            HotkeyError::AlreadyRegistered(_) => RegisterError::AlreadyClaimed,
            other => RegisterError::Rejected(other.to_string()),
        })?;

        self.routes.lock().insert(hotkey.id(), token);
        self.registered.insert(token, hotkey);
        Ok(())
    }

    fn unregister(&mut self, token: HotKeyToken) {
        let Some(hotkey) = self.registered.remove(&token) else {
            return;
        };
        self.routes.lock().remove(&hotkey.id());

        if let Some(manager) = self.manager.as_ref() {
            if let Err(e) = manager.unregister(hotkey) {
                // Internal tracking is already updated; the OS slot may linger
                tracing::warn!(token, "Failed to unregister hotkey: {e}");
            }
        }
    }
}

impl Drop for GlobalHotKeyFacility {
    fn drop(&mut self) {
        let tokens: Vec<HotKeyToken> = self.registered.keys().copied().collect();
        for token in tokens {
            self.unregister(token);
        }
        if self.manager.take().is_some() {
            GlobalHotKeyEvent::set_event_handler(None::<fn(GlobalHotKeyEvent)>);
        }
    }
}

fn os_modifiers(modifiers: Modifiers) -> OsModifiers {
    let mut out = OsModifiers::empty();
    if modifiers.contains(Modifiers::COMMAND) {
        out |= OsModifiers::SUPER;
    }
    if modifiers.contains(Modifiers::OPTION) {
        out |= OsModifiers::ALT;
    }
    if modifiers.contains(Modifiers::CONTROL) {
        out |= OsModifiers::CONTROL;
    }
    if modifiers.contains(Modifiers::SHIFT) {
        out |= OsModifiers::SHIFT;
    }
    out
}

/// Maps a macOS virtual key code onto the W3C code global-hotkey expects.
fn code_for_key(key_code: u32) -> Option<Code> {
    let code = match key_code {
        0 => Code::KeyA,
        11 => Code::KeyB,
        8 => Code::KeyC,
        2 => Code::KeyD,
        14 => Code::KeyE,
        3 => Code::KeyF,
        5 => Code::KeyG,
        4 => Code::KeyH,
        34 => Code::KeyI,
        38 => Code::KeyJ,
        40 => Code::KeyK,
        37 => Code::KeyL,
        46 => Code::KeyM,
        45 => Code::KeyN,
        31 => Code::KeyO,
        35 => Code::KeyP,
        12 => Code::KeyQ,
        15 => Code::KeyR,
        1 => Code::KeyS,
        17 => Code::KeyT,
        32 => Code::KeyU,
        9 => Code::KeyV,
        13 => Code::KeyW,
        7 => Code::KeyX,
        16 => Code::KeyY,
        6 => Code::KeyZ,
        29 => Code::Digit0,
        18 => Code::Digit1,
        19 => Code::Digit2,
        20 => Code::Digit3,
        21 => Code::Digit4,
        23 => Code::Digit5,
        22 => Code::Digit6,
        26 => Code::Digit7,
        28 => Code::Digit8,
        25 => Code::Digit9,
        49 => Code::Space,
        36 => Code::Enter,
        48 => Code::Tab,
        51 => Code::Backspace,
        117 => Code::Delete,
        53 => Code::Escape,
        24 => Code::Equal,
        27 => Code::Minus,
        30 => Code::BracketRight,
        33 => Code::BracketLeft,
        39 => Code::Quote,
        41 => Code::Semicolon,
        42 => Code::Backslash,
        43 => Code::Comma,
        44 => Code::Slash,
        47 => Code::Period,
        50 => Code::Backquote,
        123 => Code::ArrowLeft,
        124 => Code::ArrowRight,
        125 => Code::ArrowDown,
        126 => Code::ArrowUp,
        115 => Code::Home,
        119 => Code::End,
        116 => Code::PageUp,
        121 => Code::PageDown,
        122 => Code::F1,
        120 => Code::F2,
        99 => Code::F3,
        118 => Code::F4,
        96 => Code::F5,
        97 => Code::F6,
        98 => Code::F7,
        100 => Code::F8,
        101 => Code::F9,
        109 => Code::F10,
        103 => Code::F11,
        111 => Code::F12,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::keys::KEY_TABLE;

    #[test]
    fn test_every_known_key_maps_to_os_code() {
        for info in KEY_TABLE {
            assert!(
                code_for_key(info.code).is_some(),
                "no OS code for {}",
                info.name
            );
        }
        assert_eq!(code_for_key(999), None);
    }

    #[test]
    fn test_modifier_translation() {
        let all = Modifiers::COMMAND | Modifiers::OPTION | Modifiers::CONTROL | Modifiers::SHIFT;
        assert_eq!(
            os_modifiers(all),
            OsModifiers::SUPER | OsModifiers::ALT | OsModifiers::CONTROL | OsModifiers::SHIFT
        );
        assert_eq!(os_modifiers(Modifiers::OPTION), OsModifiers::ALT);
    }

    #[test]
    fn test_register_before_install_is_rejected() {
        let mut facility = GlobalHotKeyFacility::new();
        let result = facility.register(HotKeyBinding::default_toggle(), 1);
        assert_eq!(result, Err(RegisterError::NotInstalled));
        facility.unregister(1);
    }
}
