//! Physical switches, keymaps and shortcuts.

use bitflags::bitflags;
use realforce_core::{catalog, open_id};

use crate::keycode::KeyCode8;

catalog! {
    /// Switch positions on the GX1 matrix. Ids are not contiguous.
    pub enum NamedSwitch: u8 {
        // number row
        AccentGrave = 0x00 => "key_accent_grave",
        Key1 = 0x01 => "key1",
        Key2 = 0x02 => "key2",
        Key3 = 0x03 => "key3",
        Key4 = 0x04 => "key4",
        Key5 = 0x05 => "key5",
        Key6 = 0x06 => "key6",
        Key7 = 0x07 => "key7",
        Key8 = 0x08 => "key8",
        Key9 = 0x09 => "key9",
        Key0 = 0x0A => "key0",
        Minus = 0x0B => "key_minus",
        Equal = 0x0C => "key_equal",
        Backspace = 0x0E => "key_backspace",

        // letter top row
        Tab = 0x0F => "key_tab",
        Q = 0x10 => "key_q",
        W = 0x11 => "key_w",
        E = 0x12 => "key_e",
        R = 0x13 => "key_r",
        T = 0x14 => "key_t",
        Y = 0x15 => "key_y",
        U = 0x16 => "key_u",
        I = 0x17 => "key_i",
        O = 0x18 => "key_o",
        P = 0x19 => "key_p",
        BracketLeft = 0x1A => "key_bracket_left",
        BracketRight = 0x1B => "key_bracket_right",
        Backslash = 0x1C => "key_backslash",

        // letter middle row
        CapsLock = 0x1D => "key_caps_lock",
        A = 0x1E => "key_a",
        S = 0x1F => "key_s",
        D = 0x20 => "key_d",
        F = 0x21 => "key_f",
        G = 0x22 => "key_g",
        H = 0x23 => "key_h",
        J = 0x24 => "key_j",
        K = 0x25 => "key_k",
        L = 0x26 => "key_l",
        Semicolon = 0x27 => "key_semicolon",
        Apostrophe = 0x28 => "key_apostrophe",
        ReturnOrEnter = 0x2A => "key_return_or_enter",

        // letter bottom row
        LeftShift = 0x2B => "key_left_shift",
        Z = 0x2D => "key_z",
        X = 0x2E => "key_x",
        C = 0x2F => "key_c",
        V = 0x30 => "key_v",
        B = 0x31 => "key_b",
        N = 0x32 => "key_n",
        M = 0x33 => "key_m",
        Comma = 0x34 => "key_comma",
        Period = 0x35 => "key_period",
        Slash = 0x36 => "key_slash",
        RightShift = 0x38 => "key_right_shift",

        // bottom row
        LeftControl = 0x39 => "key_left_control",
        LeftGui = 0x3B => "key_left_gui",
        LeftAlt = 0x43 => "key_left_alt",
        Space = 0x3C => "key_space",
        RightAlt = 0x3D => "key_right_alt",
        RightGui = 0x44 => "key_right_gui",
        Fn = 0x45 => "key_fn",
        RightControl = 0x3F => "key_right_control",

        // movement block
        Insert = 0x4A => "key_insert",
        Delete = 0x4B => "key_delete",
        ArrowLeft = 0x4E => "key_arrow_left",
        Home = 0x4F => "key_home",
        End = 0x50 => "key_end",
        ArrowUp = 0x52 => "key_arrow_up",
        ArrowDown = 0x53 => "key_arrow_down",
        PageUp = 0x54 => "key_page_up",
        PageDown = 0x55 => "key_page_down",
        ArrowRight = 0x58 => "key_arrow_right",

        // function row
        Escape = 0x6D => "key_escape",
        F1 = 0x6F => "key_f1",
        F2 = 0x70 => "key_f2",
        F3 = 0x71 => "key_f3",
        F4 = 0x72 => "key_f4",
        F5 = 0x73 => "key_f5",
        F6 = 0x74 => "key_f6",
        F7 = 0x75 => "key_f7",
        F8 = 0x76 => "key_f8",
        F9 = 0x77 => "key_f9",
        F10 = 0x78 => "key_f10",
        F11 = 0x79 => "key_f11",
        F12 = 0x7A => "key_f12",
        PrintScreen = 0x7B => "key_print_screen",
        ScrollLock = 0x7C => "key_scroll_lock",
        Pause = 0x7D => "key_pause",
    }
}

open_id! {
    /// A physical switch, named when known
    pub enum KeyId(NamedSwitch): u8
}

catalog! {
    /// Active key map. Each map has a normal and an Fn layer.
    pub enum Keymap: u8 {
        A = 0x00 => "a",
        B = 0x01 => "b",
    }
}

bitflags! {
    /// Modifiers sent along with a shortcut's key
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ShortcutModifiers: u8 {
        const LEFT_CTRL = 0x01;
        const LEFT_SHIFT = 0x02;
        const LEFT_WIN = 0x04;
        const LEFT_ALT = 0x08;
        const RIGHT_CTRL = 0x10;
        const RIGHT_SHIFT = 0x20;
        const RIGHT_WIN = 0x40;
        const RIGHT_ALT = 0x80;
    }
}

/// One of the eight programmable shortcuts.
///
/// Layout: `[modifiers] [key]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shortcut {
    pub modifiers: ShortcutModifiers,
    pub key: KeyCode8,
}

impl Shortcut {
    pub const SIZE: usize = 2;

    pub fn from_bytes(data: &[u8; Self::SIZE]) -> Self {
        Self {
            modifiers: ShortcutModifiers::from_bits_retain(data[0]),
            key: data[1].into(),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.modifiers.bits(), self.key.raw()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::keycode::NamedKeyCode8;

    #[test]
    fn shortcut_layout() {
        let shortcut = Shortcut {
            modifiers: ShortcutModifiers::LEFT_CTRL | ShortcutModifiers::RIGHT_ALT,
            key: NamedKeyCode8::KbdC.into(),
        };
        assert_eq!(shortcut.to_bytes(), [0x81, 0x06]);
        assert_eq!(Shortcut::from_bytes(&[0x81, 0x06]), shortcut);
    }

    #[test]
    fn switch_ids_round_trip() {
        assert_eq!(KeyId::from(0x1Eu8), KeyId::Named(NamedSwitch::A));
        assert_eq!(KeyId::from(0x2Cu8), KeyId::Raw(0x2C));
        assert_eq!("key_escape".parse::<KeyId>(), Ok(KeyId::Named(NamedSwitch::Escape)));
        assert_eq!(KeyId::from(0x45u8).to_string(), "0x45[key_fn]");
        for value in 0..0x80u8 {
            assert_eq!(KeyId::from(value).raw(), value);
        }
    }

    proptest! {
        /// Every modifier bit survives, including undefined combinations
        #[test]
        fn shortcut_bytes_round_trip(bytes in any::<[u8; 2]>()) {
            prop_assert_eq!(Shortcut::from_bytes(&bytes).to_bytes(), bytes);
        }
    }
}
