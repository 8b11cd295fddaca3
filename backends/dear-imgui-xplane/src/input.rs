//! Input handling for the X-Plane backend
//!
//! X-Plane reports keys as a character plus a Windows-style virtual key code
//! and a set of modifier flags. This module maps those onto Dear ImGui keys
//! and forwards them, together with mouse buttons and wheel clicks, into the
//! IO state.

use bitflags::bitflags;
use dear_imgui_rs::{Io, Key, input::MouseButton};

bitflags! {
    /// Modifier and transition flags passed to key callbacks (`XPLMKeyFlags`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeyFlags: i32 {
        const SHIFT = 1;
        const OPTION_ALT = 2;
        const CONTROL = 4;
        const DOWN = 8;
        const UP = 16;
    }
}

// XPLM virtual key codes. Letters and digits match their ASCII values.
pub const XPLM_VK_BACK: u8 = 0x08;
pub const XPLM_VK_TAB: u8 = 0x09;
pub const XPLM_VK_RETURN: u8 = 0x0D;
pub const XPLM_VK_ESCAPE: u8 = 0x1B;
pub const XPLM_VK_SPACE: u8 = 0x20;
pub const XPLM_VK_PRIOR: u8 = 0x21;
pub const XPLM_VK_NEXT: u8 = 0x22;
pub const XPLM_VK_END: u8 = 0x23;
pub const XPLM_VK_HOME: u8 = 0x24;
pub const XPLM_VK_LEFT: u8 = 0x25;
pub const XPLM_VK_UP: u8 = 0x26;
pub const XPLM_VK_RIGHT: u8 = 0x27;
pub const XPLM_VK_DOWN: u8 = 0x28;
pub const XPLM_VK_INSERT: u8 = 0x2D;
pub const XPLM_VK_DELETE: u8 = 0x2E;
pub const XPLM_VK_0: u8 = 0x30;
pub const XPLM_VK_A: u8 = 0x41;
pub const XPLM_VK_NUMPAD0: u8 = 0x60;
pub const XPLM_VK_MULTIPLY: u8 = 0x6A;
pub const XPLM_VK_ADD: u8 = 0x6B;
pub const XPLM_VK_SUBTRACT: u8 = 0x6D;
pub const XPLM_VK_DECIMAL: u8 = 0x6E;
pub const XPLM_VK_DIVIDE: u8 = 0x6F;
pub const XPLM_VK_F1: u8 = 0x70;
pub const XPLM_VK_EQUAL: u8 = 0xB0;
pub const XPLM_VK_MINUS: u8 = 0xB1;
pub const XPLM_VK_RBRACE: u8 = 0xB2;
pub const XPLM_VK_LBRACE: u8 = 0xB3;
pub const XPLM_VK_QUOTE: u8 = 0xB4;
pub const XPLM_VK_SEMICOLON: u8 = 0xB5;
pub const XPLM_VK_BACKSLASH: u8 = 0xB6;
pub const XPLM_VK_COMMA: u8 = 0xB7;
pub const XPLM_VK_SLASH: u8 = 0xB8;
pub const XPLM_VK_PERIOD: u8 = 0xB9;
pub const XPLM_VK_BACKQUOTE: u8 = 0xBA;
pub const XPLM_VK_ENTER: u8 = 0xBB;
pub const XPLM_VK_NUMPAD_ENT: u8 = 0xBC;
pub const XPLM_VK_NUMPAD_EQ: u8 = 0xBD;

const DIGITS: [Key; 10] = [
    Key::Key0,
    Key::Key1,
    Key::Key2,
    Key::Key3,
    Key::Key4,
    Key::Key5,
    Key::Key6,
    Key::Key7,
    Key::Key8,
    Key::Key9,
];

const KEYPAD_DIGITS: [Key; 10] = [
    Key::Keypad0,
    Key::Keypad1,
    Key::Keypad2,
    Key::Keypad3,
    Key::Keypad4,
    Key::Keypad5,
    Key::Keypad6,
    Key::Keypad7,
    Key::Keypad8,
    Key::Keypad9,
];

const LETTERS: [Key; 26] = [
    Key::A,
    Key::B,
    Key::C,
    Key::D,
    Key::E,
    Key::F,
    Key::G,
    Key::H,
    Key::I,
    Key::J,
    Key::K,
    Key::L,
    Key::M,
    Key::N,
    Key::O,
    Key::P,
    Key::Q,
    Key::R,
    Key::S,
    Key::T,
    Key::U,
    Key::V,
    Key::W,
    Key::X,
    Key::Y,
    Key::Z,
];

const FUNCTION_KEYS: [Key; 12] = [
    Key::F1,
    Key::F2,
    Key::F3,
    Key::F4,
    Key::F5,
    Key::F6,
    Key::F7,
    Key::F8,
    Key::F9,
    Key::F10,
    Key::F11,
    Key::F12,
];

/// Convert an XPLM virtual key code to a Dear ImGui key
pub fn vk_to_imgui_key(vk: u8) -> Option<Key> {
    let key = match vk {
        XPLM_VK_BACK => Key::Backspace,
        XPLM_VK_TAB => Key::Tab,
        XPLM_VK_RETURN => Key::Enter,
        XPLM_VK_ESCAPE => Key::Escape,
        XPLM_VK_SPACE => Key::Space,
        XPLM_VK_PRIOR => Key::PageUp,
        XPLM_VK_NEXT => Key::PageDown,
        XPLM_VK_END => Key::End,
        XPLM_VK_HOME => Key::Home,
        XPLM_VK_LEFT => Key::LeftArrow,
        XPLM_VK_UP => Key::UpArrow,
        XPLM_VK_RIGHT => Key::RightArrow,
        XPLM_VK_DOWN => Key::DownArrow,
        XPLM_VK_INSERT => Key::Insert,
        XPLM_VK_DELETE => Key::Delete,
        0x30..=0x39 => DIGITS[(vk - XPLM_VK_0) as usize],
        0x41..=0x5A => LETTERS[(vk - XPLM_VK_A) as usize],
        0x60..=0x69 => KEYPAD_DIGITS[(vk - XPLM_VK_NUMPAD0) as usize],
        XPLM_VK_MULTIPLY => Key::KeypadMultiply,
        XPLM_VK_ADD => Key::KeypadAdd,
        XPLM_VK_SUBTRACT => Key::KeypadSubtract,
        XPLM_VK_DECIMAL => Key::KeypadDecimal,
        XPLM_VK_DIVIDE => Key::KeypadDivide,
        0x70..=0x7B => FUNCTION_KEYS[(vk - XPLM_VK_F1) as usize],
        XPLM_VK_EQUAL => Key::Equal,
        XPLM_VK_MINUS => Key::Minus,
        XPLM_VK_RBRACE => Key::RightBracket,
        XPLM_VK_LBRACE => Key::LeftBracket,
        XPLM_VK_QUOTE => Key::Apostrophe,
        XPLM_VK_SEMICOLON => Key::Semicolon,
        XPLM_VK_BACKSLASH => Key::Backslash,
        XPLM_VK_COMMA => Key::Comma,
        XPLM_VK_SLASH => Key::Slash,
        XPLM_VK_PERIOD => Key::Period,
        XPLM_VK_BACKQUOTE => Key::GraveAccent,
        XPLM_VK_ENTER | XPLM_VK_NUMPAD_ENT => Key::KeypadEnter,
        XPLM_VK_NUMPAD_EQ => Key::KeypadEqual,
        _ => return None,
    };
    Some(key)
}

/// Printable 7-bit ASCII, the only characters X-Plane delivers reliably
#[inline]
pub fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

/// Whether a key press should also produce a text character.
///
/// Control shortcuts do not type, but AltGr (reported as control plus alt)
/// does.
pub fn produces_text(key: u8, flags: KeyFlags) -> bool {
    let ctrl = flags.contains(KeyFlags::CONTROL);
    let alt = flags.contains(KeyFlags::OPTION_ALT);
    flags.contains(KeyFlags::DOWN) && !(ctrl && !alt) && is_printable(key)
}

/// Convert an X-Plane mouse button index (0 left, 1 right) to a Dear ImGui
/// mouse button
pub fn mouse_button(button: usize) -> Option<MouseButton> {
    match button {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Right),
        2 => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Wheel delta `[horizontal, vertical]` for an X-Plane wheel event
pub fn wheel_delta(wheel: i32, clicks: i32) -> Option<[f32; 2]> {
    match wheel {
        0 => Some([0.0, clicks as f32]),
        1 => Some([clicks as f32, 0.0]),
        _ => None,
    }
}

/// Forward one key callback into the IO state
pub fn forward_key(io: &mut Io, key: u8, flags: KeyFlags, virtual_key: u8) {
    let down = flags.contains(KeyFlags::DOWN);
    let up = flags.contains(KeyFlags::UP);

    forward_modifiers(io, flags);

    if (down || up)
        && let Some(imgui_key) = vk_to_imgui_key(virtual_key)
    {
        io.add_key_event(imgui_key, down);
    }

    if produces_text(key, flags) {
        io.add_input_character(key as char);
    }
}

fn forward_modifiers(io: &mut Io, flags: KeyFlags) {
    let shift = flags.contains(KeyFlags::SHIFT);
    let ctrl = flags.contains(KeyFlags::CONTROL);
    let alt = flags.contains(KeyFlags::OPTION_ALT);

    io.add_key_event(Key::LeftShift, shift);
    io.add_key_event(Key::RightShift, shift);
    io.add_key_event(Key::LeftCtrl, ctrl);
    io.add_key_event(Key::RightCtrl, ctrl);
    io.add_key_event(Key::LeftAlt, alt);
    io.add_key_event(Key::RightAlt, alt);

    io.add_key_event(Key::ModShift, shift);
    io.add_key_event(Key::ModCtrl, ctrl);
    io.add_key_event(Key::ModAlt, alt);
}

/// Forward a button transition; unknown button indices are dropped.
pub fn forward_mouse_button(io: &mut Io, button: usize, down: bool) {
    if let Some(button) = mouse_button(button) {
        io.add_mouse_button_event(button, down);
    }
}

/// Forward one wheel callback into the IO state
pub fn forward_wheel(io: &mut Io, wheel: i32, clicks: i32) {
    if let Some(delta) = wheel_delta(wheel, clicks) {
        io.add_mouse_wheel_event(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::configure_backend_flags;
    use crate::test_util::lock_context;
    use dear_imgui_rs::{Context, Ui, sys};

    #[test]
    fn navigation_keys_map() {
        assert_eq!(vk_to_imgui_key(XPLM_VK_TAB), Some(Key::Tab));
        assert_eq!(vk_to_imgui_key(XPLM_VK_PRIOR), Some(Key::PageUp));
        assert_eq!(vk_to_imgui_key(XPLM_VK_NEXT), Some(Key::PageDown));
        assert_eq!(vk_to_imgui_key(XPLM_VK_LEFT), Some(Key::LeftArrow));
        assert_eq!(vk_to_imgui_key(XPLM_VK_DOWN), Some(Key::DownArrow));
        assert_eq!(vk_to_imgui_key(XPLM_VK_BACK), Some(Key::Backspace));
        assert_eq!(vk_to_imgui_key(XPLM_VK_DELETE), Some(Key::Delete));
    }

    #[test]
    fn enter_keys_map() {
        assert_eq!(vk_to_imgui_key(XPLM_VK_RETURN), Some(Key::Enter));
        assert_eq!(vk_to_imgui_key(XPLM_VK_ENTER), Some(Key::KeypadEnter));
        assert_eq!(vk_to_imgui_key(XPLM_VK_NUMPAD_ENT), Some(Key::KeypadEnter));
    }

    #[test]
    fn alphanumeric_ranges_map() {
        assert_eq!(vk_to_imgui_key(b'0'), Some(Key::Key0));
        assert_eq!(vk_to_imgui_key(b'9'), Some(Key::Key9));
        assert_eq!(vk_to_imgui_key(b'A'), Some(Key::A));
        assert_eq!(vk_to_imgui_key(b'Z'), Some(Key::Z));
        assert_eq!(vk_to_imgui_key(0x7B), Some(Key::F12));
    }

    #[test]
    fn keypad_keys_map() {
        assert_eq!(vk_to_imgui_key(XPLM_VK_NUMPAD0), Some(Key::Keypad0));
        assert_eq!(vk_to_imgui_key(0x65), Some(Key::Keypad5));
        assert_eq!(vk_to_imgui_key(0x69), Some(Key::Keypad9));
        assert_eq!(vk_to_imgui_key(XPLM_VK_MULTIPLY), Some(Key::KeypadMultiply));
        assert_eq!(vk_to_imgui_key(XPLM_VK_DECIMAL), Some(Key::KeypadDecimal));
        assert_eq!(vk_to_imgui_key(XPLM_VK_NUMPAD_EQ), Some(Key::KeypadEqual));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        assert_eq!(vk_to_imgui_key(0x00), None);
        assert_eq!(vk_to_imgui_key(0x7C), None);
        assert_eq!(vk_to_imgui_key(0xFF), None);
    }

    #[test]
    fn text_filter() {
        assert!(produces_text(b'a', KeyFlags::DOWN));
        assert!(produces_text(b'A', KeyFlags::DOWN | KeyFlags::SHIFT));
        assert!(!produces_text(b'a', KeyFlags::UP));
        assert!(!produces_text(b'c', KeyFlags::DOWN | KeyFlags::CONTROL));
        // AltGr
        assert!(produces_text(
            b'@',
            KeyFlags::DOWN | KeyFlags::CONTROL | KeyFlags::OPTION_ALT
        ));
        assert!(!produces_text(0x08, KeyFlags::DOWN));
        assert!(!produces_text(0x7F, KeyFlags::DOWN));
    }

    #[test]
    fn wheel_axes() {
        assert_eq!(wheel_delta(0, 3), Some([0.0, 3.0]));
        assert_eq!(wheel_delta(1, -2), Some([-2.0, 0.0]));
        assert_eq!(wheel_delta(2, 1), None);
    }

    #[test]
    fn mouse_buttons() {
        assert_eq!(mouse_button(0), Some(MouseButton::Left));
        assert_eq!(mouse_button(1), Some(MouseButton::Right));
        assert_eq!(mouse_button(2), Some(MouseButton::Middle));
        assert_eq!(mouse_button(3), None);
    }

    // Events are only applied by the next `frame()`, so each check runs one
    // frame on a fresh context.
    fn after_frame(feed: impl FnOnce(&mut Io), check: impl FnOnce(&Ui)) {
        let _guard = lock_context();
        let mut ctx = Context::try_create().unwrap();
        ctx.set_ini_filename(None::<String>).unwrap();
        configure_backend_flags(&mut ctx);
        {
            let io = ctx.io_mut();
            io.set_display_size([200.0, 100.0]);
            io.set_delta_time(1.0 / 60.0);
            io.set_config_input_trickle_event_queue(false);
        }
        feed(ctx.io_mut());
        check(ctx.frame());
        ctx.render();
    }

    fn queued_text() -> String {
        unsafe {
            let io = &*sys::igGetIO_Nil();
            let queue = &io.InputQueueCharacters;
            if queue.Data.is_null() || queue.Size <= 0 {
                return String::new();
            }
            std::slice::from_raw_parts(queue.Data, queue.Size as usize)
                .iter()
                .filter_map(|&c| char::from_u32(c as u32))
                .collect()
        }
    }

    #[test]
    fn key_down_reaches_io_with_text() {
        after_frame(
            |io| forward_key(io, b'a', KeyFlags::DOWN, b'A'),
            |ui| {
                assert!(ui.is_key_down(Key::A));
                assert!(!ui.io().key_ctrl());
                assert_eq!(queued_text(), "a");
            },
        );
    }

    #[test]
    fn key_up_releases_the_key() {
        after_frame(
            |io| {
                forward_key(io, b'a', KeyFlags::DOWN, b'A');
                forward_key(io, b'a', KeyFlags::UP, b'A');
            },
            |ui| {
                assert!(!ui.is_key_down(Key::A));
                assert_eq!(queued_text(), "a");
            },
        );
    }

    #[test]
    fn modifiers_reach_io() {
        after_frame(
            |io| forward_key(io, b'C', KeyFlags::DOWN | KeyFlags::SHIFT, b'C'),
            |ui| {
                let io = ui.io();
                assert!(io.key_shift());
                assert!(!io.key_ctrl());
                assert!(!io.key_alt());
                assert!(ui.is_key_down(Key::LeftShift));
                assert_eq!(queued_text(), "C");
            },
        );
        after_frame(
            |io| forward_key(io, b'c', KeyFlags::DOWN | KeyFlags::CONTROL, b'C'),
            |ui| {
                assert!(ui.io().key_ctrl());
                assert!(ui.is_key_down(Key::C));
                // Ctrl+C is a shortcut, not text
                assert_eq!(queued_text(), "");
            },
        );
        after_frame(
            |io| {
                forward_key(
                    io,
                    b'@',
                    KeyFlags::DOWN | KeyFlags::CONTROL | KeyFlags::OPTION_ALT,
                    b'Q',
                )
            },
            |ui| {
                assert!(ui.io().key_ctrl());
                assert!(ui.io().key_alt());
                assert_eq!(queued_text(), "@");
            },
        );
    }

    #[test]
    fn wheel_and_buttons_reach_io() {
        after_frame(
            |io| {
                forward_wheel(io, 0, 2);
                forward_wheel(io, 1, -1);
                forward_wheel(io, 5, 9);
                forward_mouse_button(io, 1, true);
                forward_mouse_button(io, 7, true);
            },
            |ui| {
                assert_eq!(ui.io().mouse_wheel(), 2.0);
                assert_eq!(ui.io().mouse_wheel_h(), -1.0);
                assert!(ui.is_mouse_down(MouseButton::Right));
                assert!(!ui.is_mouse_down(MouseButton::Left));
            },
        );
    }
}
