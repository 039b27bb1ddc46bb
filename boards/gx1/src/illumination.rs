//! Backlight and indicator settings.

use std::fmt;
use std::str::FromStr;

use realforce_core::{catalog, parse_int, KeyboardError};

catalog! {
    pub enum Brightness: u8 {
        Off = 0x00 => "off",
        Low = 0x01 => "low",
        Mid = 0x02 => "mid",
        High = 0x03 => "high",
    }
}

catalog! {
    pub enum BacklightMode: u8 {
        Custom = 0x00 => "custom",
        RainbowWave = 0x01 => "rainbow_wave",
        Windmill = 0x02 => "windmill",
        ColorBar = 0x03 => "color_bar",
        Random = 0x04 => "random",
        DemoMode = 0x05 => "demo_mode",
        PressedKey = 0x06 => "pressed_key",
        Heatmap = 0x07 => "heatmap",
        MonoMix = 0x08 => "mono_mix",
        MonoRed = 0x09 => "mono_red",
        MonoGreen = 0x0A => "mono_green",
        MonoYellow = 0x0B => "mono_yellow",
        MonoBlue = 0x0C => "mono_blue",
        MonoMagenta = 0x0D => "mono_magenta",
        MonoCyan = 0x0E => "mono_cyan",
        MonoWhite = 0x0F => "mono_white",
        /// Color follows each key's actuation point
        Apc = 0x10 => "apc",
        Off = 0xFF => "off",
    }
}

catalog! {
    /// Animation played when the keyboard powers up
    pub enum PowerOnEffect: u8 {
        Off = 0x00 => "off",
        Curtain = 0x01 => "curtain",
        Scan = 0x02 => "scan",
        FillUp = 0x03 => "fill_up",
        Join = 0x04 => "join",
        Spiral = 0x05 => "spiral",
        Hotaru = 0x06 => "hotaru",
    }
}

catalog! {
    /// Lock indicators the backlight can stand in for
    pub enum LedSelect: u8 {
        CapsLock = 0x00 => "caps_lock",
        ScrollLock = 0x01 => "scroll_lock",
        /// Not present on the GX1
        NumLock = 0x02 => "num_lock",
    }
}

/// Backlight used as a lock indicator.
///
/// Layout: `[enabled] [r] [g] [b]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Led {
    pub enabled: bool,
    pub rgb: [u8; 3],
}

impl Led {
    pub const SIZE: usize = 4;

    pub fn from_bytes(data: &[u8; Self::SIZE]) -> Self {
        Self {
            enabled: data[0] != 0,
            rgb: [data[1], data[2], data[3]],
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let [r, g, b] = self.rgb;
        [self.enabled as u8, r, g, b]
    }
}

/// Minutes of inactivity before the idle backlight kicks in, 0 is off
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdleTimer(u8);

impl IdleTimer {
    pub const OFF: Self = Self(0);
    pub const MAX_MINUTES: u8 = 30;

    pub const fn from_minutes(minutes: u8) -> Option<Self> {
        if minutes <= Self::MAX_MINUTES {
            Some(Self(minutes))
        } else {
            None
        }
    }

    pub const fn minutes(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for IdleTimer {
    type Error = KeyboardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_minutes(value).ok_or(KeyboardError::InvalidValue {
            what: "IdleTimer",
            value: value.into(),
        })
    }
}

impl fmt::Display for IdleTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("off"),
            minutes => write!(f, "{minutes}min"),
        }
    }
}

impl FromStr for IdleTimer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "off" {
            return Ok(Self::OFF);
        }
        parse_int::<u8>(s.strip_suffix("min").unwrap_or(s))
            .and_then(Self::from_minutes)
            .ok_or_else(|| format!("idle timer must be off or 0-30 minutes: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn led_layout() {
        let led = Led {
            enabled: true,
            rgb: [0xFF, 0x80, 0x00],
        };
        assert_eq!(led.to_bytes(), [0x01, 0xFF, 0x80, 0x00]);
        assert_eq!(Led::from_bytes(&led.to_bytes()), led);
        assert!(!Led::from_bytes(&[0x00, 1, 2, 3]).enabled);
    }

    #[test]
    fn idle_timer_range() {
        assert_eq!(IdleTimer::try_from(30u8).map(IdleTimer::minutes).ok(), Some(30));
        assert!(matches!(
            IdleTimer::try_from(31u8),
            Err(KeyboardError::InvalidValue { value: 31, .. })
        ));
        assert_eq!("off".parse::<IdleTimer>(), Ok(IdleTimer::OFF));
        assert_eq!("5min".parse::<IdleTimer>().map(IdleTimer::minutes), Ok(5));
        assert_eq!(IdleTimer::try_from(12u8).unwrap().to_string(), "12min");
    }

    #[test]
    fn backlight_off_is_out_of_band() {
        assert_eq!(BacklightMode::from_raw(0xFF), Some(BacklightMode::Off));
        assert_eq!(BacklightMode::from_raw(0x11), None);
        assert_eq!("mono_cyan".parse::<BacklightMode>(), Ok(BacklightMode::MonoCyan));
    }

    proptest! {
        #[test]
        fn led_bytes_round_trip(enabled in 0u8..=1, rgb in any::<[u8; 3]>()) {
            let bytes = [enabled, rgb[0], rgb[1], rgb[2]];
            prop_assert_eq!(Led::from_bytes(&bytes).to_bytes(), bytes);
        }
    }
}
