//! In-memory keyboard for exercising the protocol engine without hardware.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::stream::BoxStream;
use realforce_core::{Fanout, Notification, Packet, Result, Transport, PACKET_SIZE};
use tokio::sync::Semaphore;

use crate::abi::{self, cmd, PageData, PAGE_DATA_OFFSET, PAGE_SIZE, READ_ACK, RECV_PREFIX};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Memory {
    pages: HashMap<u8, PageData>,
    identity: Option<PageData>,
}

/// Answers every command the way a keyboard with perfect memory would.
///
/// Reads return the stored page (zeros until written), writes store their
/// payload, info returns the configured identity, and everything else is
/// echoed back.
#[derive(Default)]
pub struct MockTransport {
    fanout: Arc<Fanout>,
    memory: Arc<Mutex<Memory>>,
    sent: Mutex<Vec<Packet>>,
    pending: Mutex<VecDeque<Notification>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    fail_writes: AtomicBool,
    hung_up: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every packet sent so far
    pub fn sent(&self) -> Vec<Packet> {
        lock(&self.sent).clone()
    }

    /// Sent packets with the given command byte
    pub fn sent_with(&self, command: u8) -> Vec<Packet> {
        self.sent()
            .into_iter()
            .filter(|p| p[2] == command)
            .collect()
    }

    /// Current device-side contents of a page
    pub fn page(&self, page: u8) -> PageData {
        lock(&self.memory).pages.get(&page).copied().unwrap_or([0; PAGE_SIZE])
    }

    pub fn set_page(&self, page: u8, data: PageData) {
        lock(&self.memory).pages.insert(page, data);
    }

    /// Payload of the reply to an info query
    pub fn set_identity(&self, data: PageData) {
        lock(&self.memory).identity = Some(data);
    }

    /// Deliver a notification ahead of the next reply
    pub fn inject(&self, notification: Notification) {
        lock(&self.pending).push_back(notification);
    }

    /// Hold back replies until the returned semaphore gets a permit
    pub fn hold(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *lock(&self.gate) = Some(Arc::clone(&gate));
        gate
    }

    /// Answer writes with a device removal instead of an acknowledgement
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// End the report stream on the next send
    pub fn hang_up(&self) {
        self.hung_up.store(true, Ordering::SeqCst);
    }
}

/// Build the keyboard's reply to `packet`, updating page memory for writes
fn respond(memory: &Mutex<Memory>, fail_writes: bool, packet: &Packet) -> Notification {
    let command = packet[2];
    let page = packet[5];
    if command == cmd::WRITE_PAGE && fail_writes {
        return Notification::DeviceRemoved;
    }

    let mut reply = [0u8; PACKET_SIZE];
    reply[..2].copy_from_slice(&RECV_PREFIX);
    reply[2] = command;
    match command {
        cmd::READ_PAGE => {
            let data = lock(memory).pages.get(&page).copied().unwrap_or([0; PAGE_SIZE]);
            reply[3..PAGE_DATA_OFFSET].copy_from_slice(&READ_ACK);
            reply[PAGE_DATA_OFFSET..].copy_from_slice(&data);
        },
        cmd::WRITE_PAGE => {
            lock(memory).pages.insert(page, abi::payload(packet));
            reply[3..PAGE_DATA_OFFSET].copy_from_slice(&packet[3..PAGE_DATA_OFFSET]);
        },
        cmd::INFO => {
            if let Some(identity) = lock(memory).identity {
                reply[PAGE_DATA_OFFSET..].copy_from_slice(&identity);
            }
        },
        _ => reply[3..PAGE_DATA_OFFSET].copy_from_slice(&packet[3..PAGE_DATA_OFFSET]),
    }
    Notification::InputReport {
        timestamp: Instant::now(),
        data: reply.to_vec(),
    }
}

impl Transport for MockTransport {
    async fn send(&self, packet: &Packet) -> Result<()> {
        lock(&self.sent).push(*packet);
        if self.hung_up.load(Ordering::SeqCst) {
            self.fanout.close();
            return Ok(());
        }

        let mut notes: Vec<Notification> = lock(&self.pending).drain(..).collect();
        let fail_writes = self.fail_writes.load(Ordering::SeqCst);
        let gate = lock(&self.gate).clone();
        match gate {
            None => {
                notes.push(respond(&self.memory, fail_writes, packet));
                for note in notes {
                    self.fanout.publish(note);
                }
            },
            Some(gate) => {
                // page memory only changes once the reply is let through
                let fanout = Arc::clone(&self.fanout);
                let memory = Arc::clone(&self.memory);
                let packet = *packet;
                tokio::spawn(async move {
                    let Ok(_permit) = gate.acquire().await else {
                        return;
                    };
                    notes.push(respond(&memory, fail_writes, &packet));
                    for note in notes {
                        fanout.publish(note);
                    }
                });
            },
        }
        Ok(())
    }

    fn reports(&self) -> BoxStream<'static, Notification> {
        self.fanout.subscribe()
    }
}
