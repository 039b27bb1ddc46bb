//! Actuation point control (APC) values.

use realforce_core::{catalog, Result};

use crate::keycode::KeyCode8;

catalog! {
    /// Keyboard wide actuation mode
    pub enum ApcMode: u8 {
        Depth08mm = 0x00 => "0.8mm",
        Depth15mm = 0x01 => "1.5mm",
        Depth22mm = 0x02 => "2.2mm",
        Depth30mm = 0x03 => "3.0mm",
        /// Per key settings from the custom1 map
        Custom1 = 0x04 => "custom1",
        /// Per key settings from the custom2 map
        Custom2 = 0x05 => "custom2",
    }
}

catalog! {
    /// Actuation point of a single key, used in the custom modes
    pub enum KeyApcMode: u8 {
        Depth08mm = 0x00 => "0.8mm",
        Depth15mm = 0x01 => "1.5mm",
        Depth22mm = 0x02 => "2.2mm",
        Depth30mm = 0x03 => "3.0mm",
        User1 = 0x06 => "user1",
        User2 = 0x07 => "user2",
        User3 = 0x08 => "user3",
        User4 = 0x09 => "user4",
        User5 = 0x0A => "user5",
        User6 = 0x0B => "user6",
        User7 = 0x0C => "user7",
        User8 = 0x0D => "user8",
        User9 = 0x0E => "user9",
        User10 = 0x0F => "user10",
        User11 = 0x10 => "user11",
        User12 = 0x11 => "user12",
        User13 = 0x12 => "user13",
        User14 = 0x13 => "user14",
        User15 = 0x14 => "user15",
        User16 = 0x15 => "user16",
    }
}

catalog! {
    /// How the two keys of a kill switch pair oppose each other
    pub enum KillSwitchMode: u8 {
        Off = 0x00 => "off",
        /// Neither key is active while both are held
        Neutral = 0x01 => "neutral",
        /// The key pressed first stays active
        FirstInputPriority = 0x02 => "first_input_priority",
        /// The key pressed last stays active
        LastInputPriority = 0x03 => "last_input_priority",
        Key1InputPriority = 0x04 => "key1_input_priority",
        Key2InputPriority = 0x05 => "key2_input_priority",
    }
}

catalog! {
    /// The per key maps used by [`ApcMode::Custom1`] and [`ApcMode::Custom2`]
    pub enum ApcMap: u8 {
        Custom1 = 0x00 => "custom1",
        Custom2 = 0x01 => "custom2",
    }
}

/// Two opposing keys.
///
/// Layout: `[key1] [key2] [mode]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KillSwitchPair {
    pub key1: KeyCode8,
    pub key2: KeyCode8,
    pub mode: KillSwitchMode,
}

impl KillSwitchPair {
    pub const SIZE: usize = 3;

    pub fn from_bytes(data: &[u8; Self::SIZE]) -> Result<Self> {
        Ok(Self {
            key1: data[0].into(),
            key2: data[1].into(),
            mode: data[2].try_into()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.key1.raw(), self.key2.raw(), self.mode.raw()]
    }
}

/// Kill switch settings of one APC map.
///
/// Layout: `[enabled] [pair1; 3] [pair2; 3]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KillSwitch {
    pub enabled: bool,
    pub pair1: KillSwitchPair,
    pub pair2: KillSwitchPair,
}

impl KillSwitch {
    pub const SIZE: usize = 1 + 2 * KillSwitchPair::SIZE;

    pub fn from_bytes(data: &[u8; Self::SIZE]) -> Result<Self> {
        let pair = |at: usize| {
            let mut bytes = [0u8; KillSwitchPair::SIZE];
            bytes.copy_from_slice(&data[at..at + KillSwitchPair::SIZE]);
            KillSwitchPair::from_bytes(&bytes)
        };
        Ok(Self {
            enabled: data[0] != 0,
            pair1: pair(1)?,
            pair2: pair(1 + KillSwitchPair::SIZE)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut data = [0u8; Self::SIZE];
        data[0] = self.enabled as u8;
        data[1..4].copy_from_slice(&self.pair1.to_bytes());
        data[4..7].copy_from_slice(&self.pair2.to_bytes());
        data
    }
}

#[cfg(test)]
mod tests {
    use realforce_core::KeyboardError;

    use super::*;
    use proptest::prelude::*;
    use crate::keycode::NamedKeyCode8;

    #[test]
    fn kill_switch_layout() {
        let switch = KillSwitch {
            enabled: true,
            pair1: KillSwitchPair {
                key1: NamedKeyCode8::KbdA.into(),
                key2: NamedKeyCode8::KbdD.into(),
                mode: KillSwitchMode::LastInputPriority,
            },
            pair2: KillSwitchPair {
                key1: KeyCode8::Raw(0xF0),
                key2: NamedKeyCode8::KbdS.into(),
                mode: KillSwitchMode::Neutral,
            },
        };
        let bytes = switch.to_bytes();
        assert_eq!(bytes, [0x01, 0x04, 0x07, 0x03, 0xF0, 0x16, 0x01]);
        assert_eq!(KillSwitch::from_bytes(&bytes).unwrap(), switch);
    }

    #[test]
    fn unknown_priority_mode_is_rejected() {
        let err = KillSwitch::from_bytes(&[0x00, 0x04, 0x07, 0x09, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            KeyboardError::InvalidValue {
                what: "KillSwitchMode",
                value: 0x09
            }
        ));
    }

    #[test]
    fn key_apc_mode_skips_reserved_values() {
        assert_eq!(KeyApcMode::from_raw(0x03), Some(KeyApcMode::Depth30mm));
        assert_eq!(KeyApcMode::from_raw(0x04), None);
        assert_eq!(KeyApcMode::from_raw(0x05), None);
        assert_eq!(KeyApcMode::from_raw(0x15), Some(KeyApcMode::User16));
        assert_eq!("user3".parse::<KeyApcMode>(), Ok(KeyApcMode::User3));
        assert_eq!(ApcMode::Depth15mm.to_string(), "1.5mm");
    }

    fn kill_switch_bytes(enabled: u8, keys: [u8; 4], modes: [u8; 2]) -> [u8; KillSwitch::SIZE] {
        [enabled, keys[0], keys[1], modes[0], keys[2], keys[3], modes[1]]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn kill_switch_bytes_round_trip(
            enabled in 0u8..=1,
            keys in any::<[u8; 4]>(),
            modes in [0u8..=5, 0u8..=5],
        ) {
            let bytes = kill_switch_bytes(enabled, keys, modes);
            let switch = KillSwitch::from_bytes(&bytes).unwrap();
            prop_assert_eq!(switch.to_bytes(), bytes);
        }

        #[test]
        fn kill_switch_modes_above_five_are_rejected(
            keys in any::<[u8; 4]>(),
            bad in 6u8..,
            second in any::<bool>(),
        ) {
            let modes = if second { [0, bad] } else { [bad, 0] };
            let err = KillSwitch::from_bytes(&kill_switch_bytes(1, keys, modes)).unwrap_err();
            let rejected = matches!(
                err,
                KeyboardError::InvalidValue { what: "KillSwitchMode", value } if value == u16::from(bad)
            );
            prop_assert!(rejected, "mode {:#04x} gave {:?}", bad, err);
        }
    }
}
