//! Catalog of the keyboard's configuration pages.
//!
//! Each page is 58 bytes of payload. Pages missing from the catalog are still
//! addressable through [`Setting::Raw`].

use realforce_core::{catalog, open_id};

catalog! {
    /// Pages with a known meaning
    pub enum NamedSetting: u8 {
        ModelInfoA = 0x00 => "model_info_a",
        ModelInfoB = 0x01 => "model_info_b",
        /// Custom APC flags, e.g. keep dynamic mode below the actuation point
        CustomApcFlags = 0x04 => "custom_apc_flags",
        CustomApcActuationPointDistance = 0x05 => "custom_apc_actuation_point_distance",
        CustomApcDynamicRelativeDistance = 0x06 => "custom_apc_dynamic_relative_distance",
        /// 01 enabled, 00 disabled
        MacroEnabled = 0x07 => "macro_enabled",
        Macro1Name = 0x08 => "macro1_name",
        /// Two bytes per event, `[flags] [hid key]` or `[flags] [delay]`; flags 0x20 is a release
        Macro1Events0 = 0x09 => "macro1_events0",
        Macro1Events1 = 0x0A => "macro1_events1",
        Macro1Events2 = 0x0B => "macro1_events2",
        Macro2Name = 0x0C => "macro2_name",
        Macro2Events0 = 0x0D => "macro2_events0",
        Macro2Events1 = 0x0E => "macro2_events1",
        Macro2Events2 = 0x0F => "macro2_events2",
        Macro3Name = 0x10 => "macro3_name",
        Macro3Events0 = 0x11 => "macro3_events0",
        Macro3Events1 = 0x12 => "macro3_events1",
        Macro3Events2 = 0x13 => "macro3_events2",
        Macro4Name = 0x14 => "macro4_name",
        Macro4Events0 = 0x15 => "macro4_events0",
        Macro4Events1 = 0x16 => "macro4_events1",
        Macro4Events2 = 0x17 => "macro4_events2",
        Macro5Name = 0x18 => "macro5_name",
        Macro5Events0 = 0x19 => "macro5_events0",
        Macro5Events1 = 0x1A => "macro5_events1",
        Macro5Events2 = 0x1B => "macro5_events2",
        Macro6Name = 0x1C => "macro6_name",
        Macro6Events0 = 0x1D => "macro6_events0",
        Macro6Events1 = 0x1E => "macro6_events1",
        Macro6Events2 = 0x1F => "macro6_events2",
        Macro7Name = 0x20 => "macro7_name",
        Macro7Events0 = 0x21 => "macro7_events0",
        Macro7Events1 = 0x22 => "macro7_events1",
        Macro7Events2 = 0x23 => "macro7_events2",
        Macro8Name = 0x24 => "macro8_name",
        Macro8Events0 = 0x25 => "macro8_events0",
        Macro8Events1 = 0x26 => "macro8_events1",
        Macro8Events2 = 0x27 => "macro8_events2",
        KeyboardName = 0x28 => "keyboard_name",
        /// Eight 2-byte shortcuts, `[modifier bits] [hid key]`
        Shortcuts = 0x2D => "shortcuts",
        /// One bit per key, set means fixed APC, unset means dynamic
        PerKeyFixedApcCustom1 = 0x2E => "per_key_fixed_apc_custom1",
        PerKeyFixedApcCustom2 = 0x2F => "per_key_fixed_apc_custom2",
        /// `[apc mode] [custom1 kill switch (7)] [custom2 kill switch (7)]`
        Apc = 0x30 => "apc",
        /// 00 map A, 01 map B
        KeymapSelect = 0x31 => "keymap_select",
        /// 32 per-key APC modes per page
        Custom1ApcFlags0 = 0x38 => "custom1_apc_flags0",
        Custom1ApcFlags1 = 0x39 => "custom1_apc_flags1",
        Custom1ApcFlags2 = 0x3A => "custom1_apc_flags2",
        Custom1ApcFlags3 = 0x3B => "custom1_apc_flags3",
        Custom2ApcFlags0 = 0x3C => "custom2_apc_flags0",
        Custom2ApcFlags1 = 0x3D => "custom2_apc_flags1",
        Custom2ApcFlags2 = 0x3E => "custom2_apc_flags2",
        Custom2ApcFlags3 = 0x3F => "custom2_apc_flags3",
        /// 16 two-byte key codes per page
        MapANormal0 = 0x40 => "map_a_normal0",
        MapANormal1 = 0x41 => "map_a_normal1",
        MapANormal2 = 0x42 => "map_a_normal2",
        MapANormal3 = 0x43 => "map_a_normal3",
        MapANormal4 = 0x44 => "map_a_normal4",
        MapANormal5 = 0x45 => "map_a_normal5",
        MapANormal6 = 0x46 => "map_a_normal6",
        MapANormal7 = 0x47 => "map_a_normal7",
        MapAFn0 = 0x48 => "map_a_fn0",
        MapAFn1 = 0x49 => "map_a_fn1",
        MapAFn2 = 0x4A => "map_a_fn2",
        MapAFn3 = 0x4B => "map_a_fn3",
        MapAFn4 = 0x4C => "map_a_fn4",
        MapAFn5 = 0x4D => "map_a_fn5",
        MapAFn6 = 0x4E => "map_a_fn6",
        MapAFn7 = 0x4F => "map_a_fn7",
        MapBNormal0 = 0x50 => "map_b_normal0",
        MapBNormal1 = 0x51 => "map_b_normal1",
        MapBNormal2 = 0x52 => "map_b_normal2",
        MapBNormal3 = 0x53 => "map_b_normal3",
        MapBNormal4 = 0x54 => "map_b_normal4",
        MapBNormal5 = 0x55 => "map_b_normal5",
        MapBNormal6 = 0x56 => "map_b_normal6",
        MapBNormal7 = 0x57 => "map_b_normal7",
        MapBFn0 = 0x58 => "map_b_fn0",
        MapBFn1 = 0x59 => "map_b_fn1",
        MapBFn2 = 0x5A => "map_b_fn2",
        MapBFn3 = 0x5B => "map_b_fn3",
        MapBFn4 = 0x5C => "map_b_fn4",
        MapBFn5 = 0x5D => "map_b_fn5",
        MapBFn6 = 0x5E => "map_b_fn6",
        MapBFn7 = 0x5F => "map_b_fn7",
        /// `[brightness] [caps led (4)] [scroll led (4)] [num led (4)] [power on effect]`
        Illumination1 = 0x60 => "illumination1",
        /// `[backlight mode] [idle backlight mode] [idle timer minutes]`
        Illumination2 = 0x61 => "illumination2",
    }
}

open_id! {
    /// A page id, named when the catalog knows it
    pub enum Setting(NamedSetting): u8
}

/// Pages the vendor software reads on start-up
pub fn known_pages() -> impl Iterator<Item = Setting> {
    (0x00..=0x31u8)
        .chain([0x35])
        .chain(0x37..=0x87)
        .chain([0xBE, 0xBF])
        .map(Setting::from)
}
