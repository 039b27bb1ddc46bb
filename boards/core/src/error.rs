//! Errors that can occur while talking to a keyboard.

use std::sync::Arc;
use std::time::Duration;

/// Errors that can occur during keyboard operations.
///
/// Cloneable so that one in-flight page transfer can hand its outcome to every
/// caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyboardError {
    /// Device was not found
    #[error("device not found")]
    DeviceNotFound,

    /// More than one device matched and the caller needs exactly one
    #[error("{0} devices matched, narrow the search")]
    MultipleDevices(usize),

    /// Could not get a client for the device reference
    #[error("no client for device {0}")]
    NoClient(String),

    /// The HID descriptor does not match the one the protocol was written against
    #[error("unexpected hid descriptor: {}", hex(.0))]
    UnexpectedDescriptor(Vec<u8>),

    /// Exclusive access to the device was denied
    #[error("cannot seize device: {0}")]
    CannotSeize(String),

    /// Device went away while waiting for a reply
    #[error("device removed")]
    DeviceRemoved,

    /// Another client grabbed the device
    #[error("device seized by another client")]
    DeviceSeized,

    /// The device was released by its exclusive owner
    #[error("device unseized")]
    DeviceUnseized,

    /// The report stream ended without a matching reply
    #[error("no reply from device")]
    NoReply,

    /// The reply had the wrong length, prefix, echo or signature
    #[error("unexpected data: {}", hex(.0))]
    UnexpectedData(Vec<u8>),

    /// No reply within the configured exchange timeout
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// A byte read from the device is outside the known value set
    #[error("invalid {what} value 0x{value:02x}")]
    InvalidValue { what: &'static str, value: u16 },

    /// HID communication error
    #[error("hid error: {0}")]
    Hid(Arc<hidapi::HidError>),

    /// A background transfer task died
    #[error("transfer task failed: {0}")]
    TaskFailed(String),
}

impl From<hidapi::HidError> for KeyboardError {
    fn from(e: hidapi::HidError) -> Self {
        Self::Hid(Arc::new(e))
    }
}

pub type Result<T> = std::result::Result<T, KeyboardError>;

/// Format bytes as a space separated hex string, trimming trailing zeros.
pub fn hex(data: &[u8]) -> String {
    let end = data.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let bytes: Vec<String> = data[..end].iter().map(|b| format!("{b:02x}")).collect();
    format!("[{}]", bytes.join(" "))
}
