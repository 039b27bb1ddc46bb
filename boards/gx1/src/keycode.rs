//! Key codes the keyboard can emit.
//!
//! Basic codes are USB HID keyboard page (0x07) usages, stored without the
//! page. Key actions are 16 bits wide: basic codes fit in the low byte, while
//! consumer page usages (0xC0xx-0xC2xx) and the keyboard's own functions
//! (0x10xx) use the full width.

use std::fmt;
use std::str::FromStr;

use realforce_core::{catalog, open_id, parse_int};

catalog! {
    /// USB HID keyboard page usages
    pub enum NamedKeyCode8: u8 {
        NoEvent = 0x00 => "none",
        ErrorRollOver = 0x01 => "error_roll_over",
        PostFail = 0x02 => "post_fail",
        ErrorUndefined = 0x03 => "error_undefined",
        KbdA = 0x04 => "kbd_a",
        KbdB = 0x05 => "kbd_b",
        KbdC = 0x06 => "kbd_c",
        KbdD = 0x07 => "kbd_d",
        KbdE = 0x08 => "kbd_e",
        KbdF = 0x09 => "kbd_f",
        KbdG = 0x0A => "kbd_g",
        KbdH = 0x0B => "kbd_h",
        KbdI = 0x0C => "kbd_i",
        KbdJ = 0x0D => "kbd_j",
        KbdK = 0x0E => "kbd_k",
        KbdL = 0x0F => "kbd_l",
        KbdM = 0x10 => "kbd_m",
        KbdN = 0x11 => "kbd_n",
        KbdO = 0x12 => "kbd_o",
        KbdP = 0x13 => "kbd_p",
        KbdQ = 0x14 => "kbd_q",
        KbdR = 0x15 => "kbd_r",
        KbdS = 0x16 => "kbd_s",
        KbdT = 0x17 => "kbd_t",
        KbdU = 0x18 => "kbd_u",
        KbdV = 0x19 => "kbd_v",
        KbdW = 0x1A => "kbd_w",
        KbdX = 0x1B => "kbd_x",
        KbdY = 0x1C => "kbd_y",
        KbdZ = 0x1D => "kbd_z",
        Kbd1 = 0x1E => "kbd1",
        Kbd2 = 0x1F => "kbd2",
        Kbd3 = 0x20 => "kbd3",
        Kbd4 = 0x21 => "kbd4",
        Kbd5 = 0x22 => "kbd5",
        Kbd6 = 0x23 => "kbd6",
        Kbd7 = 0x24 => "kbd7",
        Kbd8 = 0x25 => "kbd8",
        Kbd9 = 0x26 => "kbd9",
        Kbd0 = 0x27 => "kbd0",
        KbdReturnOrEnter = 0x28 => "kbd_return_or_enter",
        KbdEscape = 0x29 => "kbd_escape",
        KbdBackspace = 0x2A => "kbd_backspace",
        KbdTab = 0x2B => "kbd_tab",
        KbdSpace = 0x2C => "kbd_space",
        KbdMinus = 0x2D => "kbd_minus",
        KbdEqual = 0x2E => "kbd_equal",
        KbdBracketLeft = 0x2F => "kbd_bracket_left",
        KbdBracketRight = 0x30 => "kbd_bracket_right",
        KbdBackslash = 0x31 => "kbd_backslash",
        KbdNonUsHash = 0x32 => "kbd_non_us_hash",
        KbdSemicolon = 0x33 => "kbd_semicolon",
        KbdApostrophe = 0x34 => "kbd_apostrophe",
        KbdAccentGrave = 0x35 => "kbd_accent_grave",
        KbdComma = 0x36 => "kbd_comma",
        KbdPeriod = 0x37 => "kbd_period",
        KbdSlash = 0x38 => "kbd_slash",
        KbdCapsLock = 0x39 => "kbd_caps_lock",
        KbdF1 = 0x3A => "kbd_f1",
        KbdF2 = 0x3B => "kbd_f2",
        KbdF3 = 0x3C => "kbd_f3",
        KbdF4 = 0x3D => "kbd_f4",
        KbdF5 = 0x3E => "kbd_f5",
        KbdF6 = 0x3F => "kbd_f6",
        KbdF7 = 0x40 => "kbd_f7",
        KbdF8 = 0x41 => "kbd_f8",
        KbdF9 = 0x42 => "kbd_f9",
        KbdF10 = 0x43 => "kbd_f10",
        KbdF11 = 0x44 => "kbd_f11",
        KbdF12 = 0x45 => "kbd_f12",
        KbdPrintScreen = 0x46 => "kbd_print_screen",
        KbdScrollLock = 0x47 => "kbd_scroll_lock",
        KbdPause = 0x48 => "kbd_pause",
        KbdInsert = 0x49 => "kbd_insert",
        KbdHome = 0x4A => "kbd_home",
        KbdPageUp = 0x4B => "kbd_page_up",
        KbdDelete = 0x4C => "kbd_delete",
        KbdEnd = 0x4D => "kbd_end",
        KbdPageDown = 0x4E => "kbd_page_down",
        KbdArrowRight = 0x4F => "kbd_arrow_right",
        KbdArrowLeft = 0x50 => "kbd_arrow_left",
        KbdArrowDown = 0x51 => "kbd_arrow_down",
        KbdArrowUp = 0x52 => "kbd_arrow_up",
        KpNumLock = 0x53 => "kp_num_lock",
        KpSlash = 0x54 => "kp_slash",
        KpStar = 0x55 => "kp_star",
        KpMinus = 0x56 => "kp_minus",
        KpPlus = 0x57 => "kp_plus",
        KpEnter = 0x58 => "kp_enter",
        Kp1 = 0x59 => "kp1",
        Kp2 = 0x5A => "kp2",
        Kp3 = 0x5B => "kp3",
        Kp4 = 0x5C => "kp4",
        Kp5 = 0x5D => "kp5",
        Kp6 = 0x5E => "kp6",
        Kp7 = 0x5F => "kp7",
        Kp8 = 0x60 => "kp8",
        Kp9 = 0x61 => "kp9",
        Kp0 = 0x62 => "kp0",
        KpPeriod = 0x63 => "kp_period",
        KbdNonUsBackslash = 0x64 => "kbd_non_us_backslash",
        KbdApp = 0x65 => "kbd_app",
        KbdPower = 0x66 => "kbd_power",
        KpEqual = 0x67 => "kp_equal",
        KbdF13 = 0x68 => "kbd_f13",
        KbdF14 = 0x69 => "kbd_f14",
        KbdF15 = 0x6A => "kbd_f15",
        KbdF16 = 0x6B => "kbd_f16",
        KbdF17 = 0x6C => "kbd_f17",
        KbdF18 = 0x6D => "kbd_f18",
        KbdF19 = 0x6E => "kbd_f19",
        KbdF20 = 0x6F => "kbd_f20",
        KbdF21 = 0x70 => "kbd_f21",
        KbdF22 = 0x71 => "kbd_f22",
        KbdF23 = 0x72 => "kbd_f23",
        KbdF24 = 0x73 => "kbd_f24",
        KbdExecute = 0x74 => "kbd_execute",
        KbdHelp = 0x75 => "kbd_help",
        KbdMenu = 0x76 => "kbd_menu",
        KbdSelect = 0x77 => "kbd_select",
        KbdStop = 0x78 => "kbd_stop",
        KbdAgain = 0x79 => "kbd_again",
        KbdUndo = 0x7A => "kbd_undo",
        KbdCut = 0x7B => "kbd_cut",
        KbdCopy = 0x7C => "kbd_copy",
        KbdPaste = 0x7D => "kbd_paste",
        KbdFind = 0x7E => "kbd_find",
        KbdMute = 0x7F => "kbd_mute",
        KbdVolumeUp = 0x80 => "kbd_volume_up",
        KbdVolumeDown = 0x81 => "kbd_volume_down",
        KbdLockingCapsLock = 0x82 => "kbd_locking_caps_lock",
        KbdLockingNumLock = 0x83 => "kbd_locking_num_lock",
        KbdLockingScrollLock = 0x84 => "kbd_locking_scroll_lock",
        KpComma = 0x85 => "kp_comma",
        KpEqualAs400 = 0x86 => "kp_equal_as400",
        KbdInternational1 = 0x87 => "kbd_international1",
        KbdInternational2 = 0x88 => "kbd_international2",
        KbdInternational3 = 0x89 => "kbd_international3",
        KbdInternational4 = 0x8A => "kbd_international4",
        KbdInternational5 = 0x8B => "kbd_international5",
        KbdInternational6 = 0x8C => "kbd_international6",
        KbdInternational7 = 0x8D => "kbd_international7",
        KbdInternational8 = 0x8E => "kbd_international8",
        KbdInternational9 = 0x8F => "kbd_international9",
        KbdLang1 = 0x90 => "kbd_lang1",
        KbdLang2 = 0x91 => "kbd_lang2",
        KbdLang3 = 0x92 => "kbd_lang3",
        KbdLang4 = 0x93 => "kbd_lang4",
        KbdLang5 = 0x94 => "kbd_lang5",
        KbdLang6 = 0x95 => "kbd_lang6",
        KbdLang7 = 0x96 => "kbd_lang7",
        KbdLang8 = 0x97 => "kbd_lang8",
        KbdLang9 = 0x98 => "kbd_lang9",
        KbdAlternateErase = 0x99 => "kbd_alternate_erase",
        KbdSysReqOrAttention = 0x9A => "kbd_sys_req_or_attention",
        KbdCancel = 0x9B => "kbd_cancel",
        KbdClear = 0x9C => "kbd_clear",
        KbdPrior = 0x9D => "kbd_prior",
        KbdReturn = 0x9E => "kbd_return",
        KbdSeparator = 0x9F => "kbd_separator",
        KbdOut = 0xA0 => "kbd_out",
        KbdOper = 0xA1 => "kbd_oper",
        KbdClearOrAgain = 0xA2 => "kbd_clear_or_again",
        KbdCrSelOrProps = 0xA3 => "kbd_cr_sel_or_props",
        KbdExSel = 0xA4 => "kbd_ex_sel",
        KbdLeftControl = 0xE0 => "kbd_left_control",
        KbdLeftShift = 0xE1 => "kbd_left_shift",
        KbdLeftAlt = 0xE2 => "kbd_left_alt",
        KbdLeftGui = 0xE3 => "kbd_left_gui",
        KbdRightControl = 0xE4 => "kbd_right_control",
        KbdRightShift = 0xE5 => "kbd_right_shift",
        KbdRightAlt = 0xE6 => "kbd_right_alt",
        KbdRightGui = 0xE7 => "kbd_right_gui",    }
}

open_id! {
    /// An 8 bit key code, named when known
    pub enum KeyCode8(NamedKeyCode8): u8
}

catalog! {
    /// Extended key codes outside the keyboard page
    pub enum NamedKeyCode: u16 {
        CsmrDisplayBrightnessIncrement = 0xC06F => "csmr_display_brightness_increment",
        CsmrDisplayBrightnessDecrement = 0xC070 => "csmr_display_brightness_decrement",
        CsmrScanNextTrack = 0xC0B5 => "csmr_scan_next_track",
        CsmrScanPrevTrack = 0xC0B6 => "csmr_scan_prev_track",
        CsmrStop = 0xC0B7 => "csmr_stop",
        CsmrEject = 0xC0B8 => "csmr_eject",
        CsmrPlayOrPause = 0xC0CD => "csmr_play_or_pause",
        CsmrVolumeIncrement = 0xC0E9 => "csmr_volume_increment",
        CsmrVolumeDecrement = 0xC0EA => "csmr_volume_decrement",
        CsmrAlPlayer = 0xC183 => "csmr_al_player",
        CsmrAlMail = 0xC18A => "csmr_al_mail",
        CsmrAlCalculator = 0xC192 => "csmr_al_calculator",
        CsmrAlLocalMachineBrowser = 0xC194 => "csmr_al_local_machine_browser",
        CsmrAcSearch = 0xC221 => "csmr_ac_search",
        CsmrAcHome = 0xC223 => "csmr_ac_home",
        CsmrAcBack = 0xC224 => "csmr_ac_back",
        CsmrAcForward = 0xC225 => "csmr_ac_forward",
        CsmrAcRefresh = 0xC227 => "csmr_ac_refresh",
        CsmrAcBookmarks = 0xC22A => "csmr_ac_bookmarks",
        Fn = 0x1000 => "fn",
        Save = 0x1001 => "save",
        SwitchLayout = 0x1013 => "switch_layout",
        ApcPlus = 0x1020 => "apc_plus",
        ApcMinus = 0x1021 => "apc_minus",
        ApcCustom1 = 0x1023 => "apc_custom1",
        ApcCustom2 = 0x1024 => "apc_custom2",
        StrokeClear = 0x1050 => "stroke_clear",
        IlluminationBrightPlus = 0x1060 => "illumination_bright_plus",
        IlluminationBrightMinus = 0x1061 => "illumination_bright_minus",
        IlluminationModePlus = 0x1063 => "illumination_mode_plus",
        IlluminationModeMinus = 0x1064 => "illumination_mode_minus",
        IlluminationEasyColor = 0x1066 => "illumination_easy_color",
        IlluminationPowerOnEffectPlus = 0x1068 => "illumination_power_on_effect_plus",
        IlluminationPowerOnEffectMinus = 0x1069 => "illumination_power_on_effect_minus",
        MacroM1 = 0x10C0 => "macro_m1",
        MacroM2 = 0x10C1 => "macro_m2",
        MacroM3 = 0x10C2 => "macro_m3",
        MacroM4 = 0x10C3 => "macro_m4",
        MacroM5 = 0x10C4 => "macro_m5",
        MacroM6 = 0x10C5 => "macro_m6",
        MacroM7 = 0x10C6 => "macro_m7",
        EasyMacroRecord = 0x10D0 => "easy_macro_record",
        EasyMacroPlay = 0x10D1 => "easy_macro_play",
        Shortcut1 = 0x10E0 => "shortcut1",
        Shortcut2 = 0x10E1 => "shortcut2",
        Shortcut3 = 0x10E2 => "shortcut3",
        Shortcut4 = 0x10E3 => "shortcut4",
        Shortcut5 = 0x10E4 => "shortcut5",
        Shortcut6 = 0x10E5 => "shortcut6",
        Shortcut7 = 0x10E6 => "shortcut7",
        Shortcut8 = 0x10E7 => "shortcut8",    }
}

/// A key action as stored in the key action banks
#[derive(Clone, Copy, Debug)]
pub enum KeyCode {
    Basic(KeyCode8),
    Extended(NamedKeyCode),
    Raw(u16),
}

impl KeyCode {
    pub const fn raw(self) -> u16 {
        match self {
            Self::Basic(code) => code.raw() as u16,
            Self::Extended(code) => code.raw(),
            Self::Raw(raw) => raw,
        }
    }

    /// The catalog name, if the code has one
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::Basic(code) => code.named().map(NamedKeyCode8::name),
            Self::Extended(code) => Some(code.name()),
            Self::Raw(_) => None,
        }
    }
}

impl From<u16> for KeyCode {
    fn from(value: u16) -> Self {
        if let Ok(basic) = u8::try_from(value) {
            return Self::Basic(basic.into());
        }
        match NamedKeyCode::from_raw(value) {
            Some(code) => Self::Extended(code),
            None => Self::Raw(value),
        }
    }
}

impl From<KeyCode8> for KeyCode {
    fn from(value: KeyCode8) -> Self {
        Self::Basic(value)
    }
}

impl From<NamedKeyCode8> for KeyCode {
    fn from(value: NamedKeyCode8) -> Self {
        Self::Basic(value.into())
    }
}

impl From<NamedKeyCode> for KeyCode {
    fn from(value: NamedKeyCode) -> Self {
        Self::Extended(value)
    }
}

impl PartialEq for KeyCode {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

impl Eq for KeyCode {}

impl std::hash::Hash for KeyCode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw().hash(state)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "0x{:04x}[{name}]", self.raw()),
            None => write!(f, "0x{:04x}", self.raw()),
        }
    }
}

impl FromStr for KeyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NamedKeyCode8::from_name(s)
            .map(Self::from)
            .or_else(|| NamedKeyCode::from_name(s).map(Self::Extended))
            .or_else(|| parse_int::<u16>(s).map(Self::from))
            .ok_or_else(|| format!("unknown KeyCode: {s}"))
    }
}
