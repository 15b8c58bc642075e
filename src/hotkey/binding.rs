// ABOUTME: HotKeyBinding value type with a hotkey-table modifier bitmask
// ABOUTME: Parses canonical chord strings like "command+shift+space" and renders ⌃⌥⇧⌘ glyphs

use super::keys;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

bitflags! {
    /// Modifier bits as the OS hotkey table expects them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Modifiers: u32 {
        const COMMAND = 0x0100;
        const SHIFT = 0x0200;
        const OPTION = 0x0800;
        const CONTROL = 0x1000;
    }
}

// Display order used for both glyphs and canonical strings
const MODIFIER_ORDER: [(Modifiers, &str, &str); 4] = [
    (Modifiers::CONTROL, "control", "⌃"),
    (Modifiers::OPTION, "option", "⌥"),
    (Modifiers::SHIFT, "shift", "⇧"),
    (Modifiers::COMMAND, "command", "⌘"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordError {
    #[error("a hotkey needs at least one modifier (command, option, control or shift)")]
    MissingModifier,
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("hotkey chord is empty")]
    Empty,
    #[error("hotkey chord '{0}' names more than one key")]
    MultipleKeys(String),
}

/// A global hotkey chord. Equality on `(key_code, modifiers)` defines conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBinding", into = "RawBinding")]
pub struct HotKeyBinding {
    key_code: u32,
    modifiers: Modifiers,
}

#[derive(Serialize, Deserialize)]
struct RawBinding {
    key_code: u32,
    modifiers: u32,
}

impl TryFrom<RawBinding> for HotKeyBinding {
    type Error = ChordError;

    fn try_from(raw: RawBinding) -> Result<Self, Self::Error> {
        HotKeyBinding::new(raw.key_code, Modifiers::from_bits_truncate(raw.modifiers))
    }
}

impl From<HotKeyBinding> for RawBinding {
    fn from(binding: HotKeyBinding) -> Self {
        RawBinding {
            key_code: binding.key_code,
            modifiers: binding.modifiers.bits(),
        }
    }
}

impl HotKeyBinding {
    pub fn new(key_code: u32, modifiers: Modifiers) -> Result<Self, ChordError> {
        if modifiers.is_empty() {
            return Err(ChordError::MissingModifier);
        }
        Ok(Self { key_code, modifiers })
    }

    /// Option+Space, the out-of-the-box panel toggle.
    pub fn default_toggle() -> Self {
        Self {
            key_code: keys::KEY_SPACE,
            modifiers: Modifiers::OPTION,
        }
    }

    pub fn key_code(&self) -> u32 {
        self.key_code
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn modifier_symbols(&self) -> Vec<&'static str> {
        MODIFIER_ORDER
            .iter()
            .filter(|(flag, _, _)| self.modifiers.contains(*flag))
            .map(|(_, _, symbol)| *symbol)
            .collect()
    }

    /// Glyph rendering for menus and the recorder, e.g. `⌥Space`.
    pub fn display_symbols(&self) -> String {
        let mut out: String = self.modifier_symbols().concat();
        out.push_str(keys::key_label(self.key_code));
        out
    }
}

impl fmt::Display for HotKeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name, _) in MODIFIER_ORDER {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", keys::canonical_name(self.key_code))
    }
}

fn parse_modifier(part: &str) -> Option<Modifiers> {
    match part {
        "command" | "cmd" | "super" | "meta" => Some(Modifiers::COMMAND),
        "option" | "opt" | "alt" => Some(Modifiers::OPTION),
        "control" | "ctrl" => Some(Modifiers::CONTROL),
        "shift" => Some(Modifiers::SHIFT),
        _ => None,
    }
}

impl FromStr for HotKeyBinding {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::empty();
        let mut key_code = None;

        for part in s.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            let lowered = part.to_ascii_lowercase();
            if let Some(flag) = parse_modifier(&lowered) {
                modifiers |= flag;
                continue;
            }
            if key_code.is_some() {
                return Err(ChordError::MultipleKeys(s.to_string()));
            }
            key_code = Some(
                keys::code_for_name(&lowered)
                    .ok_or_else(|| ChordError::UnknownKey(part.to_string()))?,
            );
        }

        match key_code {
            Some(code) => HotKeyBinding::new(code, modifiers),
            None if modifiers.is_empty() => Err(ChordError::Empty),
            None => Err(ChordError::UnknownKey(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::keys::KEY_SPACE;

    #[test]
    fn test_new_rejects_bare_key() {
        assert_eq!(
            HotKeyBinding::new(KEY_SPACE, Modifiers::empty()),
            Err(ChordError::MissingModifier)
        );
    }

    #[test]
    fn test_parse_canonical_and_aliases() {
        let a: HotKeyBinding = "command+shift+space".parse().unwrap();
        let b: HotKeyBinding = "Shift + Cmd + Space".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key_code(), KEY_SPACE);
        assert_eq!(a.modifiers(), Modifiers::COMMAND | Modifiers::SHIFT);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<HotKeyBinding>(), Err(ChordError::Empty));
        assert_eq!(
            "space".parse::<HotKeyBinding>(),
            Err(ChordError::MissingModifier)
        );
        assert!(matches!(
            "cmd+banana".parse::<HotKeyBinding>(),
            Err(ChordError::UnknownKey(_))
        ));
        assert!(matches!(
            "cmd+a+b".parse::<HotKeyBinding>(),
            Err(ChordError::MultipleKeys(_))
        ));
        assert!(matches!(
            "cmd+shift".parse::<HotKeyBinding>(),
            Err(ChordError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_display_is_parseable() {
        let binding = HotKeyBinding::new(
            40,
            Modifiers::COMMAND | Modifiers::CONTROL | Modifiers::OPTION,
        )
        .unwrap();
        assert_eq!(binding.to_string(), "control+option+command+k");
        assert_eq!(binding.to_string().parse::<HotKeyBinding>().unwrap(), binding);
    }

    #[test]
    fn test_display_symbols() {
        assert_eq!(HotKeyBinding::default_toggle().display_symbols(), "⌥Space");
        let all = HotKeyBinding::new(
            0,
            Modifiers::COMMAND | Modifiers::SHIFT | Modifiers::OPTION | Modifiers::CONTROL,
        )
        .unwrap();
        assert_eq!(all.modifier_symbols(), vec!["⌃", "⌥", "⇧", "⌘"]);
        assert_eq!(all.display_symbols(), "⌃⌥⇧⌘A");

        let unknown = HotKeyBinding::new(250, Modifiers::COMMAND).unwrap();
        assert_eq!(unknown.display_symbols(), "⌘?");
    }

    #[test]
    fn test_deserialize_rejects_zero_modifiers() {
        let ok: HotKeyBinding = toml::from_str("key_code = 49\nmodifiers = 2048\n").unwrap();
        assert_eq!(ok, HotKeyBinding::default_toggle());

        let bare = toml::from_str::<HotKeyBinding>("key_code = 49\nmodifiers = 0\n");
        assert!(bare.is_err());
    }

    #[test]
    fn test_serialize_as_raw_bitmask() {
        let text = toml::to_string(&HotKeyBinding::default_toggle()).unwrap();
        assert!(text.contains("key_code = 49"));
        assert!(text.contains("modifiers = 2048"));
    }
}
