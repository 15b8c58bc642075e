// ABOUTME: macOS virtual key code table with display labels and canonical names
// ABOUTME: Shared by chord parsing, glyph rendering and the OS hotkey backend

pub const KEY_SPACE: u32 = 49;
pub const KEY_ESCAPE: u32 = 53;
pub const KEY_DELETE: u32 = 51;
pub const KEY_FORWARD_DELETE: u32 = 117;
pub const KEY_RETURN: u32 = 36;
pub const KEY_TAB: u32 = 48;

/// One entry of the key table: virtual key code, canonical name, display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    pub code: u32,
    pub name: &'static str,
    pub label: &'static str,
}

const fn key(code: u32, name: &'static str, label: &'static str) -> KeyInfo {
    KeyInfo { code, name, label }
}

pub const KEY_TABLE: &[KeyInfo] = &[
    key(0, "a", "A"),
    key(11, "b", "B"),
    key(8, "c", "C"),
    key(2, "d", "D"),
    key(14, "e", "E"),
    key(3, "f", "F"),
    key(5, "g", "G"),
    key(4, "h", "H"),
    key(34, "i", "I"),
    key(38, "j", "J"),
    key(40, "k", "K"),
    key(37, "l", "L"),
    key(46, "m", "M"),
    key(45, "n", "N"),
    key(31, "o", "O"),
    key(35, "p", "P"),
    key(12, "q", "Q"),
    key(15, "r", "R"),
    key(1, "s", "S"),
    key(17, "t", "T"),
    key(32, "u", "U"),
    key(9, "v", "V"),
    key(13, "w", "W"),
    key(7, "x", "X"),
    key(16, "y", "Y"),
    key(6, "z", "Z"),
    key(29, "0", "0"),
    key(18, "1", "1"),
    key(19, "2", "2"),
    key(20, "3", "3"),
    key(21, "4", "4"),
    key(23, "5", "5"),
    key(22, "6", "6"),
    key(26, "7", "7"),
    key(28, "8", "8"),
    key(25, "9", "9"),
    key(KEY_SPACE, "space", "Space"),
    key(KEY_RETURN, "return", "↩"),
    key(KEY_TAB, "tab", "⇥"),
    key(KEY_DELETE, "delete", "⌫"),
    key(KEY_FORWARD_DELETE, "forwarddelete", "⌦"),
    key(KEY_ESCAPE, "escape", "Esc"),
    key(24, "equal", "="),
    key(27, "minus", "-"),
    key(30, "rightbracket", "]"),
    key(33, "leftbracket", "["),
    key(39, "quote", "'"),
    key(41, "semicolon", ";"),
    key(42, "backslash", "\\"),
    key(43, "comma", ","),
    key(44, "slash", "/"),
    key(47, "period", "."),
    key(50, "grave", "`"),
    key(123, "left", "←"),
    key(124, "right", "→"),
    key(125, "down", "↓"),
    key(126, "up", "↑"),
    key(115, "home", "↖"),
    key(119, "end", "↘"),
    key(116, "pageup", "⇞"),
    key(121, "pagedown", "⇟"),
    key(122, "f1", "F1"),
    key(120, "f2", "F2"),
    key(99, "f3", "F3"),
    key(118, "f4", "F4"),
    key(96, "f5", "F5"),
    key(97, "f6", "F6"),
    key(98, "f7", "F7"),
    key(100, "f8", "F8"),
    key(101, "f9", "F9"),
    key(109, "f10", "F10"),
    key(103, "f11", "F11"),
    key(111, "f12", "F12"),
];

pub fn lookup(code: u32) -> Option<&'static KeyInfo> {
    KEY_TABLE.iter().find(|info| info.code == code)
}

/// Display label for a key code, `?` when the code is not in the table.
pub fn key_label(code: u32) -> &'static str {
    lookup(code).map(|info| info.label).unwrap_or("?")
}

/// Resolve a canonical key name (case-insensitive, a few aliases) to its code.
pub fn code_for_name(name: &str) -> Option<u32> {
    let name = name.trim().to_ascii_lowercase();
    let name = match name.as_str() {
        "esc" => "escape",
        "enter" => "return",
        "backspace" => "delete",
        "del" => "forwarddelete",
        "[" => "leftbracket",
        "]" => "rightbracket",
        other => other,
    };
    KEY_TABLE
        .iter()
        .find(|info| info.name == name)
        .map(|info| info.code)
        .or_else(|| name.strip_prefix("key")?.parse().ok())
}

/// Canonical name for a code; unknown codes round-trip as `key<code>`.
pub fn canonical_name(code: u32) -> String {
    match lookup(code) {
        Some(info) => info.name.to_string(),
        None => format!("key{code}"),
    }
}
