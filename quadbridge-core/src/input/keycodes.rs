//! DOM `KeyboardEvent.code` → guest key code.
//!
//! Guest key codes follow the sokol/miniquad numbering (printable keys use their
//! ASCII value, special keys start at 256).

pub const KEY_SPACE: u32 = 32;
pub const KEY_APOSTROPHE: u32 = 39;
pub const KEY_SLASH: u32 = 47;
pub const KEY_TAB: u32 = 258;
pub const KEY_BACKSPACE: u32 = 259;
pub const KEY_DELETE: u32 = 261;
pub const KEY_RIGHT: u32 = 262;
pub const KEY_UP: u32 = 265;
pub const KEY_F1: u32 = 290;
pub const KEY_F10: u32 = 299;

const TABLE: &[(&str, u32)] = &[
    ("Space", 32),
    ("Quote", 222),
    ("Comma", 44),
    ("Minus", 45),
    ("Period", 46),
    ("Slash", 189),
    ("Digit0", 48),
    ("Digit1", 49),
    ("Digit2", 50),
    ("Digit3", 51),
    ("Digit4", 52),
    ("Digit5", 53),
    ("Digit6", 54),
    ("Digit7", 55),
    ("Digit8", 56),
    ("Digit9", 57),
    ("Semicolon", 59),
    ("Equal", 61),
    ("KeyA", 65),
    ("KeyB", 66),
    ("KeyC", 67),
    ("KeyD", 68),
    ("KeyE", 69),
    ("KeyF", 70),
    ("KeyG", 71),
    ("KeyH", 72),
    ("KeyI", 73),
    ("KeyJ", 74),
    ("KeyK", 75),
    ("KeyL", 76),
    ("KeyM", 77),
    ("KeyN", 78),
    ("KeyO", 79),
    ("KeyP", 80),
    ("KeyQ", 81),
    ("KeyR", 82),
    ("KeyS", 83),
    ("KeyT", 84),
    ("KeyU", 85),
    ("KeyV", 86),
    ("KeyW", 87),
    ("KeyX", 88),
    ("KeyY", 89),
    ("KeyZ", 90),
    ("BracketLeft", 91),
    ("Backslash", 92),
    ("BracketRight", 93),
    ("Backquote", 96),
    ("Escape", 256),
    ("Enter", 257),
    ("Tab", 258),
    ("Backspace", 259),
    ("Insert", 260),
    ("Delete", 261),
    ("ArrowRight", 262),
    ("ArrowLeft", 263),
    ("ArrowDown", 264),
    ("ArrowUp", 265),
    ("PageUp", 266),
    ("PageDown", 267),
    ("Home", 268),
    ("End", 269),
    ("CapsLock", 280),
    ("ScrollLock", 281),
    ("NumLock", 282),
    ("PrintScreen", 283),
    ("Pause", 284),
    ("F1", 290),
    ("F2", 291),
    ("F3", 292),
    ("F4", 293),
    ("F5", 294),
    ("F6", 295),
    ("F7", 296),
    ("F8", 297),
    ("F9", 298),
    ("F10", 299),
    ("F11", 300),
    ("F12", 301),
    ("F13", 302),
    ("F14", 303),
    ("F15", 304),
    ("F16", 305),
    ("F17", 306),
    ("F18", 307),
    ("F19", 308),
    ("F20", 309),
    ("F21", 310),
    ("F22", 311),
    ("F23", 312),
    ("F24", 313),
    ("Numpad0", 320),
    ("Numpad1", 321),
    ("Numpad2", 322),
    ("Numpad3", 323),
    ("Numpad4", 324),
    ("Numpad5", 325),
    ("Numpad6", 326),
    ("Numpad7", 327),
    ("Numpad8", 328),
    ("Numpad9", 329),
    ("NumpadDecimal", 330),
    ("NumpadDivide", 331),
    ("NumpadMultiply", 332),
    ("NumpadSubtract", 333),
    ("NumpadAdd", 334),
    ("NumpadEnter", 335),
    ("NumpadEqual", 336),
    ("ShiftLeft", 340),
    ("ControlLeft", 341),
    ("AltLeft", 342),
    ("OSLeft", 343),
    ("ShiftRight", 344),
    ("ControlRight", 345),
    ("AltRight", 346),
    ("OSRight", 347),
    ("ContextMenu", 348),
];

/// Guest key code for a DOM `code`, or `None` when the key is unsupported.
pub fn lookup(code: &str) -> Option<u32> {
    TABLE.iter().find(|(name, _)| *name == code).map(|&(_, key)| key)
}

/// Keys whose default platform action (scrolling, focus traversal, navigation)
/// is suppressed on key-down.
pub fn suppresses_default(key: u32) -> bool {
    matches!(
        key,
        KEY_SPACE | KEY_APOSTROPHE | KEY_SLASH | KEY_TAB | KEY_BACKSPACE
    ) || (KEY_RIGHT..=KEY_UP).contains(&key)
        || (KEY_F1..=KEY_F10).contains(&key)
}

/// Keys that also produce a `key_press` on key-down because some platforms
/// never deliver a character event for them.
pub fn presses_on_key_down(key: u32) -> bool {
    matches!(key, KEY_SPACE | KEY_APOSTROPHE | KEY_SLASH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_digits_and_function_keys() {
        assert_eq!(lookup("KeyA"), Some(65));
        assert_eq!(lookup("KeyZ"), Some(90));
        assert_eq!(lookup("Digit7"), Some(55));
        assert_eq!(lookup("F24"), Some(313));
        assert_eq!(lookup("ContextMenu"), Some(348));
        assert_eq!(lookup("IntlRo"), None);
    }

    #[test]
    fn default_suppression_covers_navigation_keys() {
        for key in [32, 258, 259, 262, 263, 264, 265, 290, 299] {
            assert!(suppresses_default(key), "{key}");
        }
        assert!(!suppresses_default(65));
        assert!(!suppresses_default(300));
        assert!(!suppresses_default(KEY_DELETE));
    }
}
