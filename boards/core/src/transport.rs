//! Transport contract between the protocol engine and a HID backend.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::Result;

/// Every report exchanged with the keyboard is exactly this long
pub const PACKET_SIZE: usize = 64;

/// One outbound or inbound report
pub type Packet = [u8; PACKET_SIZE];

/// Something observed on a device's inbound channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// An input report and the time it arrived
    InputReport { timestamp: Instant, data: Vec<u8> },
    DeviceRemoved,
    DeviceSeized,
    DeviceUnseized,
}

/// Byte level access to one open device session.
pub trait Transport: Send + Sync + 'static {
    /// Send a single output report.
    fn send(&self, packet: &Packet) -> impl Future<Output = Result<()>> + Send;

    /// Subscribe to inbound notifications.
    ///
    /// The stream only yields what arrives after subscribing, in arrival order,
    /// and ends when the session closes.
    fn reports(&self) -> BoxStream<'static, Notification>;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send(&self, packet: &Packet) -> impl Future<Output = Result<()>> + Send {
        (**self).send(packet)
    }

    fn reports(&self) -> BoxStream<'static, Notification> {
        (**self).reports()
    }
}

/// Fans notifications out to every live subscriber.
#[derive(Debug, Default)]
pub struct Fanout {
    subscribers: Mutex<Vec<UnboundedSender<Notification>>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new subscription stream
    pub fn subscribe(&self) -> BoxStream<'static, Notification> {
        let (tx, rx) = unbounded_channel();
        self.lock().push(tx);
        UnboundedReceiverStream::new(rx).boxed()
    }

    /// Deliver a notification, dropping subscribers that went away
    pub fn publish(&self, notification: Notification) {
        self.lock()
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }

    /// End every open subscription stream
    pub fn close(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UnboundedSender<Notification>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
