//! Where each setting lives.
//!
//! Offsets are relative to the start of a page's 58 byte payload.
//!
//! Per key tables are split over banks of consecutive pages:
//! - APC flags: 32 keys per page, 1 byte each, 4 pages per map
//! - Key actions: 16 keys per page, 2 bytes each (big endian), 8 pages per
//!   keymap layer

use realforce_protocol::{NamedSetting, Setting};

use crate::apc::{ApcMap, KillSwitch};
use crate::illumination::{Led, LedSelect};
use crate::keyid::{KeyId, Keymap, Shortcut};

/// Apc page: global mode
pub const APC_MODE: usize = 0;
/// Keymap select page: active keymap
pub const KEYMAP: usize = 0;
/// Illumination 1 page: brightness, then the three indicator LEDs
pub const BRIGHTNESS: usize = 0;
/// Illumination 1 page: effect after the LEDs
pub const POWER_ON_EFFECT: usize = BRIGHTNESS + 1 + 3 * Led::SIZE;
/// Illumination 2 page
pub const BACKLIGHT: usize = 0;
pub const BACKLIGHT_IDLE: usize = 1;
pub const BACKLIGHT_IDLE_TIMER: usize = 2;

/// Number of programmable shortcuts
pub const SHORTCUTS: u8 = 8;

/// A byte position within a page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Address {
    pub page: Setting,
    pub offset: usize,
}

/// A run of consecutive pages holding one fixed width entry per key
struct Bank {
    first: NamedSetting,
    keys_per_page: u8,
    width: usize,
    pages: u8,
}

impl Bank {
    /// # Panics
    /// If the key id lies beyond the bank.
    fn resolve(&self, key: KeyId) -> Address {
        let raw = key.raw();
        assert!(
            (raw as usize) < self.keys_per_page as usize * self.pages as usize,
            "key {key} is outside the {} bank",
            self.first.name()
        );
        let (page, index) = (raw / self.keys_per_page, raw % self.keys_per_page);
        Address {
            page: Setting::from(self.first.raw() + page),
            offset: index as usize * self.width,
        }
    }
}

/// Per key APC mode.
///
/// # Panics
/// If `key` is 128 or above.
pub fn key_apc(map: ApcMap, key: KeyId) -> Address {
    let first = match map {
        ApcMap::Custom1 => NamedSetting::Custom1ApcFlags0,
        ApcMap::Custom2 => NamedSetting::Custom2ApcFlags0,
    };
    Bank {
        first,
        keys_per_page: 32,
        width: 1,
        pages: 4,
    }
    .resolve(key)
}

/// Per key action code, two bytes big endian.
///
/// # Panics
/// If `key` is 128 or above.
pub fn key_action(keymap: Keymap, fn_layer: bool, key: KeyId) -> Address {
    let first = match (keymap, fn_layer) {
        (Keymap::A, false) => NamedSetting::MapANormal0,
        (Keymap::A, true) => NamedSetting::MapAFn0,
        (Keymap::B, false) => NamedSetting::MapBNormal0,
        (Keymap::B, true) => NamedSetting::MapBFn0,
    };
    Bank {
        first,
        keys_per_page: 16,
        width: 2,
        pages: 8,
    }
    .resolve(key)
}

/// Kill switch block on the APC page, right after the mode byte
pub fn kill_switch(map: ApcMap) -> usize {
    APC_MODE
        + 1
        + match map {
            ApcMap::Custom1 => 0,
            ApcMap::Custom2 => KillSwitch::SIZE,
        }
}

/// Indicator LED on the illumination 1 page
pub fn led(select: LedSelect) -> usize {
    BRIGHTNESS + 1 + select.raw() as usize * Led::SIZE
}

/// Shortcut on the shortcuts page.
///
/// # Panics
/// If `index` is outside `1..=8`.
pub fn shortcut(index: u8) -> usize {
    assert!(
        (1..=SHORTCUTS).contains(&index),
        "shortcut index must be in 1..={SHORTCUTS}, got {index}"
    );
    (index - 1) as usize * Shortcut::SIZE
}
