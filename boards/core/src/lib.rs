//! Core traits and types for Realforce keyboard control.
//!
//! This crate provides:
//! - The [`Transport`] contract every HID backend implements
//! - The [`KeyboardError`] taxonomy shared by all layers
//! - Static board info and device matching criteria
//! - The [`catalog!`] and [`open_id!`] macros for device value catalogs

mod board;
mod catalog;
mod error;
mod transport;

pub use board::{BoardInfo, DeviceCriteria};
pub use catalog::{parse_int, FromStrRadix};
pub use error::{hex, KeyboardError, Result};
pub use transport::{Fanout, Notification, Packet, Transport, PACKET_SIZE};
