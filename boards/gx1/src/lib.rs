//! Realforce GX1 settings over the page protocol.
//!
//! [`Keyboard`] turns typed settings into byte edits of cached pages. Every
//! setter takes a [`WritePolicy`]: `Cache` batches edits until the next
//! [`Keyboard::flush`], `Flush` sends the page right away.

use std::time::Duration;

use realforce_core::{BoardInfo, Result, Transport};
use realforce_protocol::{abi, Exchange, NamedSetting, PageCache, PageData, Setting, PAGE_SIZE};
use tracing::debug;

pub mod apc;
pub mod discovery;
pub mod hid;
pub mod illumination;
pub mod keycode;
pub mod keyid;
pub mod layout;

pub use realforce_protocol::WritePolicy;

use crate::apc::{ApcMap, ApcMode, KeyApcMode, KillSwitch};
use crate::discovery::DeviceRef;
use crate::hid::HidTransport;
use crate::illumination::{BacklightMode, Brightness, IdleTimer, Led, LedSelect, PowerOnEffect};
use crate::keycode::KeyCode;
use crate::keyid::{KeyId, Keymap, Shortcut};

pub mod consts {
    pub const VENDOR_ID: u16 = 0x0853;
    pub const PRODUCT_ID: u16 = 0x0317;
    /// Vendor defined configuration interface
    pub const USAGE_PAGE: u16 = 0xFF00;
    pub const USAGE: u16 = 0x01;
}

/// Board info for detection and CLI
pub static INFO: BoardInfo = BoardInfo {
    name: "Realforce GX1",
    cli_name: "gx1",
    vendor_id: consts::VENDOR_ID,
    product_id: consts::PRODUCT_ID,
    usage_page: consts::USAGE_PAGE,
    usage: consts::USAGE,
};

/// Answer to the info query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// e.g. `X1UD11`
    pub model: String,
    /// e.g. `A0.15`
    pub firmware: String,
}

const MODEL_LEN: usize = 6;
const FIRMWARE_OFFSET: usize = 8;

impl Identity {
    fn parse(payload: &PageData) -> Self {
        let model = &payload[..MODEL_LEN];
        let end = model.iter().position(|b| *b == 0).unwrap_or(MODEL_LEN);
        let [a, b, c, d] = [0, 1, 2, 3].map(|i| payload[FIRMWARE_OFFSET + i]);
        Self {
            model: String::from_utf8_lossy(&model[..end]).into_owned(),
            firmware: format!("{a:X}{b:X}.{c:X}{d:X}"),
        }
    }
}

/// Longest prefix of `name` that fits a page without splitting a character
fn truncate_name(name: &str) -> &str {
    let mut end = name.len().min(PAGE_SIZE);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// High level settings access for one keyboard session
pub struct Keyboard<T> {
    cache: PageCache<T>,
}

impl<T> Clone for Keyboard<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl Keyboard<HidTransport> {
    /// Open a keyboard found by [`discovery`]
    pub fn open(device: &DeviceRef, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self::new(HidTransport::open(device)?, timeout))
    }
}

impl<T: Transport> Keyboard<T> {
    pub fn new(transport: T, timeout: Option<Duration>) -> Self {
        Self {
            cache: PageCache::new(Exchange::new(transport, timeout)),
        }
    }

    /// The page cache behind this keyboard
    pub fn cache(&self) -> &PageCache<T> {
        &self.cache
    }

    /// Model and firmware version, available outside a session too
    pub async fn info(&self) -> Result<Identity> {
        let reply = self.cache.request(&abi::info()).await?;
        let identity = Identity::parse(&abi::payload(&reply));
        debug!(?identity, "info");
        Ok(identity)
    }

    pub async fn hello(&self) -> Result<()> {
        self.cache.hello().await
    }

    pub async fn goodbye(&self) -> Result<()> {
        self.cache.goodbye().await
    }

    pub async fn flush(&self) -> Result<()> {
        self.cache.flush().await
    }

    pub async fn save(&self) -> Result<()> {
        self.cache.save().await
    }

    /// Whole page payload, for diagnostics
    pub async fn raw_page(&self, page: Setting) -> Result<PageData> {
        self.cache.get(page).await
    }

    async fn read<const N: usize>(
        &self,
        page: impl Into<Setting>,
        offset: usize,
    ) -> Result<[u8; N]> {
        let data = self.cache.get(page.into()).await?;
        let mut out = [0u8; N];
        out.copy_from_slice(&data[offset..offset + N]);
        Ok(out)
    }

    async fn read_byte(&self, page: impl Into<Setting>, offset: usize) -> Result<u8> {
        let [byte] = self.read(page, offset).await?;
        Ok(byte)
    }

    async fn write(
        &self,
        page: impl Into<Setting>,
        offset: usize,
        bytes: &[u8],
        policy: WritePolicy,
    ) -> Result<()> {
        self.cache
            .modify(page.into(), policy, |data| {
                data[offset..offset + bytes.len()].copy_from_slice(bytes)
            })
            .await
    }

    pub async fn name(&self) -> Result<String> {
        let data = self.cache.get(NamedSetting::KeyboardName.into()).await?;
        let end = data.iter().position(|b| *b == 0).unwrap_or(PAGE_SIZE);
        Ok(String::from_utf8_lossy(&data[..end]).into_owned())
    }

    /// Names longer than a page are cut at the last whole character that fits
    pub async fn set_name(&self, name: &str, policy: WritePolicy) -> Result<()> {
        let name = truncate_name(name);
        let mut data = [0u8; PAGE_SIZE];
        data[..name.len()].copy_from_slice(name.as_bytes());
        self.cache
            .set(NamedSetting::KeyboardName.into(), data, policy)
            .await
    }

    pub async fn apc_mode(&self) -> Result<ApcMode> {
        self.read_byte(NamedSetting::Apc, layout::APC_MODE)
            .await?
            .try_into()
    }

    pub async fn set_apc_mode(&self, mode: ApcMode, policy: WritePolicy) -> Result<()> {
        self.write(NamedSetting::Apc, layout::APC_MODE, &[mode.raw()], policy)
            .await
    }

    pub async fn kill_switch(&self, map: ApcMap) -> Result<KillSwitch> {
        let bytes = self
            .read(NamedSetting::Apc, layout::kill_switch(map))
            .await?;
        KillSwitch::from_bytes(&bytes)
    }

    pub async fn set_kill_switch(
        &self,
        map: ApcMap,
        switch: KillSwitch,
        policy: WritePolicy,
    ) -> Result<()> {
        self.write(
            NamedSetting::Apc,
            layout::kill_switch(map),
            &switch.to_bytes(),
            policy,
        )
        .await
    }

    /// # Panics
    /// If `key` is outside the 128 key range.
    pub async fn key_apc(&self, map: ApcMap, key: KeyId) -> Result<KeyApcMode> {
        let at = layout::key_apc(map, key);
        self.read_byte(at.page, at.offset).await?.try_into()
    }

    pub async fn set_key_apc(
        &self,
        map: ApcMap,
        key: KeyId,
        mode: KeyApcMode,
        policy: WritePolicy,
    ) -> Result<()> {
        let at = layout::key_apc(map, key);
        self.write(at.page, at.offset, &[mode.raw()], policy).await
    }

    pub async fn keymap(&self) -> Result<Keymap> {
        self.read_byte(NamedSetting::KeymapSelect, layout::KEYMAP)
            .await?
            .try_into()
    }

    pub async fn set_keymap(&self, keymap: Keymap, policy: WritePolicy) -> Result<()> {
        self.write(
            NamedSetting::KeymapSelect,
            layout::KEYMAP,
            &[keymap.raw()],
            policy,
        )
        .await
    }

    /// # Panics
    /// If `key` is outside the 128 key range.
    pub async fn key_action(&self, keymap: Keymap, fn_layer: bool, key: KeyId) -> Result<KeyCode> {
        let at = layout::key_action(keymap, fn_layer, key);
        let bytes = self.read(at.page, at.offset).await?;
        Ok(u16::from_be_bytes(bytes).into())
    }

    pub async fn set_key_action(
        &self,
        keymap: Keymap,
        fn_layer: bool,
        key: KeyId,
        code: KeyCode,
        policy: WritePolicy,
    ) -> Result<()> {
        let at = layout::key_action(keymap, fn_layer, key);
        self.write(at.page, at.offset, &code.raw().to_be_bytes(), policy)
            .await
    }

    /// # Panics
    /// If `index` is outside `1..=8`.
    pub async fn shortcut(&self, index: u8) -> Result<Shortcut> {
        let bytes = self
            .read(NamedSetting::Shortcuts, layout::shortcut(index))
            .await?;
        Ok(Shortcut::from_bytes(&bytes))
    }

    pub async fn set_shortcut(
        &self,
        index: u8,
        shortcut: Shortcut,
        policy: WritePolicy,
    ) -> Result<()> {
        self.write(
            NamedSetting::Shortcuts,
            layout::shortcut(index),
            &shortcut.to_bytes(),
            policy,
        )
        .await
    }

    pub async fn brightness(&self) -> Result<Brightness> {
        self.read_byte(NamedSetting::Illumination1, layout::BRIGHTNESS)
            .await?
            .try_into()
    }

    pub async fn set_brightness(&self, brightness: Brightness, policy: WritePolicy) -> Result<()> {
        self.write(
            NamedSetting::Illumination1,
            layout::BRIGHTNESS,
            &[brightness.raw()],
            policy,
        )
        .await
    }

    pub async fn led(&self, select: LedSelect) -> Result<Led> {
        let bytes = self
            .read(NamedSetting::Illumination1, layout::led(select))
            .await?;
        Ok(Led::from_bytes(&bytes))
    }

    pub async fn set_led(&self, select: LedSelect, led: Led, policy: WritePolicy) -> Result<()> {
        self.write(
            NamedSetting::Illumination1,
            layout::led(select),
            &led.to_bytes(),
            policy,
        )
        .await
    }

    pub async fn power_on_effect(&self) -> Result<PowerOnEffect> {
        self.read_byte(NamedSetting::Illumination1, layout::POWER_ON_EFFECT)
            .await?
            .try_into()
    }

    pub async fn set_power_on_effect(
        &self,
        effect: PowerOnEffect,
        policy: WritePolicy,
    ) -> Result<()> {
        self.write(
            NamedSetting::Illumination1,
            layout::POWER_ON_EFFECT,
            &[effect.raw()],
            policy,
        )
        .await
    }

    pub async fn backlight(&self) -> Result<BacklightMode> {
        self.read_byte(NamedSetting::Illumination2, layout::BACKLIGHT)
            .await?
            .try_into()
    }

    pub async fn set_backlight(&self, mode: BacklightMode, policy: WritePolicy) -> Result<()> {
        self.write(
            NamedSetting::Illumination2,
            layout::BACKLIGHT,
            &[mode.raw()],
            policy,
        )
        .await
    }

    /// Mode shown after the idle timer runs out
    pub async fn backlight_idle(&self) -> Result<BacklightMode> {
        self.read_byte(NamedSetting::Illumination2, layout::BACKLIGHT_IDLE)
            .await?
            .try_into()
    }

    pub async fn set_backlight_idle(&self, mode: BacklightMode, policy: WritePolicy) -> Result<()> {
        self.write(
            NamedSetting::Illumination2,
            layout::BACKLIGHT_IDLE,
            &[mode.raw()],
            policy,
        )
        .await
    }

    pub async fn backlight_idle_timer(&self) -> Result<IdleTimer> {
        self.read_byte(NamedSetting::Illumination2, layout::BACKLIGHT_IDLE_TIMER)
            .await?
            .try_into()
    }

    pub async fn set_backlight_idle_timer(
        &self,
        timer: IdleTimer,
        policy: WritePolicy,
    ) -> Result<()> {
        self.write(
            NamedSetting::Illumination2,
            layout::BACKLIGHT_IDLE_TIMER,
            &[timer.minutes()],
            policy,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use realforce_protocol::abi::cmd;
    use realforce_protocol::mock::MockTransport;
    use realforce_protocol::SlotState;

    use realforce_core::KeyboardError;

    use super::*;
    use crate::apc::{KillSwitchMode, KillSwitchPair};
    use crate::keycode::{NamedKeyCode, NamedKeyCode8};
    use crate::keyid::{NamedSwitch, ShortcutModifiers};

    fn keyboard() -> (Keyboard<Arc<MockTransport>>, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        (Keyboard::new(Arc::clone(&mock), None), mock)
    }

    #[tokio::test]
    async fn identity_parses_model_and_firmware() {
        let (kb, mock) = keyboard();
        let mut payload = [0u8; PAGE_SIZE];
        payload[..6].copy_from_slice(b"X1UD11");
        payload[8..12].copy_from_slice(&[0x0A, 0x00, 0x01, 0x05]);
        mock.set_identity(payload);

        let identity = kb.info().await.unwrap();
        assert_eq!(identity.model, "X1UD11");
        assert_eq!(identity.firmware, "A0.15");
    }

    #[tokio::test]
    async fn name_is_truncated_on_a_char_boundary() {
        let (kb, mock) = keyboard();
        // byte 58 falls inside the 29th two byte character
        let long = format!("a{}", "é".repeat(30));
        kb.set_name(&long, WritePolicy::Flush).await.unwrap();

        let kept = format!("a{}", "é".repeat(28));
        let stored = mock.page(0x28);
        assert_eq!(&stored[..57], kept.as_bytes());
        assert_eq!(stored[57], 0);
        assert_eq!(kb.name().await.unwrap(), kept);

        kb.set_name("gx1", WritePolicy::Flush).await.unwrap();
        assert_eq!(&mock.page(0x28)[..4], b"gx1\0");
    }

    #[tokio::test]
    async fn settings_on_one_page_share_a_write() {
        let (kb, mock) = keyboard();
        kb.set_backlight(BacklightMode::MonoCyan, WritePolicy::Cache)
            .await
            .unwrap();
        kb.set_backlight_idle(BacklightMode::Off, WritePolicy::Cache)
            .await
            .unwrap();
        kb.set_backlight_idle_timer(IdleTimer::from_minutes(5).unwrap(), WritePolicy::Cache)
            .await
            .unwrap();
        assert!(mock.sent_with(cmd::WRITE_PAGE).is_empty());

        kb.flush().await.unwrap();
        assert_eq!(mock.sent_with(cmd::WRITE_PAGE).len(), 1);
        assert_eq!(&mock.page(0x61)[..3], [0x0E, 0xFF, 0x05]);
        assert_eq!(kb.backlight_idle().await.unwrap(), BacklightMode::Off);
    }

    #[tokio::test]
    async fn setters_leave_neighbouring_bytes_alone() {
        let (kb, mock) = keyboard();
        let mut page = [0xEEu8; PAGE_SIZE];
        page[0] = 0x01;
        mock.set_page(0x30, page);

        let switch = KillSwitch {
            enabled: true,
            pair1: KillSwitchPair {
                key1: NamedKeyCode8::KbdA.into(),
                key2: NamedKeyCode8::KbdD.into(),
                mode: KillSwitchMode::LastInputPriority,
            },
            pair2: KillSwitchPair {
                key1: NamedKeyCode8::KbdW.into(),
                key2: NamedKeyCode8::KbdS.into(),
                mode: KillSwitchMode::Neutral,
            },
        };
        kb.set_kill_switch(ApcMap::Custom2, switch, WritePolicy::Flush)
            .await
            .unwrap();

        let stored = mock.page(0x30);
        assert_eq!(stored[0], 0x01);
        assert_eq!(stored[1..8], [0xEE; 7]);
        assert_eq!(stored[8..15], switch.to_bytes());
        assert_eq!(stored[15], 0xEE);
        assert_eq!(kb.kill_switch(ApcMap::Custom2).await.unwrap(), switch);
        assert_eq!(kb.apc_mode().await.unwrap(), ApcMode::Depth15mm);
    }

    #[tokio::test]
    async fn key_actions_are_big_endian() {
        let (kb, mock) = keyboard();
        let key = KeyId::from(NamedSwitch::A);
        kb.set_key_action(Keymap::B, true, key, NamedKeyCode::Fn.into(), WritePolicy::Flush)
            .await
            .unwrap();

        let at = layout::key_action(Keymap::B, true, key);
        assert_eq!(at.page.raw(), 0x59);
        assert_eq!(mock.page(0x59)[at.offset..at.offset + 2], [0x10, 0x00]);
        assert_eq!(
            kb.key_action(Keymap::B, true, key).await.unwrap(),
            KeyCode::from(NamedKeyCode::Fn)
        );
        assert_eq!(
            kb.key_action(Keymap::A, false, key).await.unwrap(),
            KeyCode::from(0x0000u16)
        );
    }

    #[tokio::test]
    async fn per_key_apc_and_shortcuts() {
        let (kb, mock) = keyboard();
        let escape = KeyId::from(NamedSwitch::Escape);
        kb.set_key_apc(ApcMap::Custom1, escape, KeyApcMode::User3, WritePolicy::Flush)
            .await
            .unwrap();
        assert_eq!(mock.page(0x3B)[0x0D], 0x08);
        assert_eq!(
            kb.key_apc(ApcMap::Custom1, escape).await.unwrap(),
            KeyApcMode::User3
        );

        let shortcut = Shortcut {
            modifiers: ShortcutModifiers::LEFT_CTRL | ShortcutModifiers::LEFT_SHIFT,
            key: NamedKeyCode8::KbdEscape.into(),
        };
        kb.set_shortcut(8, shortcut, WritePolicy::Flush)
            .await
            .unwrap();
        assert_eq!(mock.page(0x2D)[14..16], [0x03, 0x29]);
        assert_eq!(kb.shortcut(8).await.unwrap(), shortcut);
    }

    #[tokio::test]
    async fn out_of_range_bytes_are_reported() {
        let (kb, mock) = keyboard();
        let mut page = [0u8; PAGE_SIZE];
        page[layout::BRIGHTNESS] = 0x07;
        page[layout::POWER_ON_EFFECT] = 0x06;
        mock.set_page(0x60, page);

        assert!(matches!(
            kb.brightness().await,
            Err(KeyboardError::InvalidValue {
                what: "Brightness",
                value: 0x07
            })
        ));
        assert_eq!(kb.power_on_effect().await.unwrap(), PowerOnEffect::Hotaru);
    }

    #[tokio::test]
    async fn cached_setters_wait_for_save() {
        let (kb, mock) = keyboard();
        kb.set_keymap(Keymap::B, WritePolicy::Cache).await.unwrap();
        kb.set_brightness(Brightness::High, WritePolicy::Cache)
            .await
            .unwrap();
        let led = Led {
            enabled: true,
            rgb: [0x10, 0x20, 0x30],
        };
        kb.set_led(LedSelect::ScrollLock, led, WritePolicy::Cache)
            .await
            .unwrap();
        assert!(matches!(
            kb.cache().state(NamedSetting::Illumination1.into()),
            Some(SlotState::Dirty(_))
        ));

        kb.save().await.unwrap();
        let commands: Vec<u8> = mock.sent().iter().map(|p| p[2]).collect();
        assert_eq!(commands.last(), Some(&cmd::SAVE));
        assert_eq!(mock.sent_with(cmd::WRITE_PAGE).len(), 2);
        assert_eq!(mock.page(0x31)[0], 0x01);
        assert_eq!(mock.page(0x60)[5..9], led.to_bytes());
        assert_eq!(kb.led(LedSelect::ScrollLock).await.unwrap(), led);
    }
}
