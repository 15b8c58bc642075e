// ABOUTME: Hotkey chord model: key code plus modifier bitmask, parsing and display
// ABOUTME: A chord without any modifier can never be constructed or deserialized

pub mod binding;
pub mod keys;

pub use binding::{ChordError, HotKeyBinding, Modifiers};
