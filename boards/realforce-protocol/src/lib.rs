//! Realforce configuration protocol.
//!
//! Settings live in numbered 58 byte pages. This crate encodes the packets
//! that move pages, pairs each request with its reply over the shared report
//! channel, and keeps a write-back cache of pages so that many small edits
//! become as few page transfers as possible.

pub mod abi;
mod cache;
mod exchange;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
mod setting;

pub use abi::{PageData, PAGE_SIZE};
pub use cache::{PageCache, SlotState, WritePolicy};
pub use exchange::Exchange;
pub use setting::{known_pages, NamedSetting, Setting};
