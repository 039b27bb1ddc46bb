//! Write-back page cache.
//!
//! One slot per page id, each in exactly one of four states:
//!
//! - `Reading`: a fetch is in flight, later readers join it
//! - `Ready`: last value confirmed to match the device
//! - `Dirty`: changed locally, not sent yet
//! - `Writing`: being sent, reads see the value being sent
//!
//! Transfers run as spawned tasks that settle their own slot when they finish,
//! so a caller giving up on a transfer never leaves a slot stuck. Every slot
//! transition happens under one short lock that is never held across an await.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use realforce_core::{KeyboardError, Packet, Result, Transport};
use tracing::debug;

use crate::abi::{self, PageData};
use crate::exchange::Exchange;
use crate::setting::Setting;

/// What a setter does after updating the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Leave the page dirty until the next flush
    Cache,
    /// Send the page before returning
    #[default]
    Flush,
}

/// Observable state of a cache slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Reading,
    Ready(PageData),
    Dirty(PageData),
    Writing(PageData),
}

/// A spawned transfer that any number of callers can wait on
#[derive(Clone)]
struct InFlight<V: Clone> {
    id: u64,
    done: Shared<BoxFuture<'static, Result<V>>>,
}

impl<V> InFlight<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn spawn(id: u64, task: impl Future<Output = Result<V>> + Send + 'static) -> Self {
        let handle = tokio::spawn(task);
        let done = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(KeyboardError::TaskFailed(e.to_string())),
            }
        }
        .boxed()
        .shared();
        Self { id, done }
    }
}

enum Slot {
    Reading(InFlight<PageData>),
    Ready(PageData),
    /// `superseded` is an older send to this page that has not finished yet
    Dirty {
        data: PageData,
        superseded: Option<InFlight<()>>,
    },
    Writing {
        data: PageData,
        write: InFlight<()>,
    },
}

impl Slot {
    /// The newest local value, if one is known
    fn data(&self) -> Option<PageData> {
        match self {
            Slot::Reading(_) => None,
            Slot::Ready(data) | Slot::Dirty { data, .. } | Slot::Writing { data, .. } => {
                Some(*data)
            },
        }
    }

    fn state(&self) -> SlotState {
        match self {
            Slot::Reading(_) => SlotState::Reading,
            Slot::Ready(data) => SlotState::Ready(*data),
            Slot::Dirty { data, .. } => SlotState::Dirty(*data),
            Slot::Writing { data, .. } => SlotState::Writing(*data),
        }
    }
}

type Slots = BTreeMap<Setting, Slot>;

/// Overwrite a slot with a local edit, keeping track of any send still in flight
fn store(slots: &mut Slots, page: Setting, data: PageData) {
    let superseded = match slots.remove(&page) {
        Some(Slot::Writing { write, .. }) => Some(write),
        Some(Slot::Dirty { superseded, .. }) => superseded,
        _ => None,
    };
    slots.insert(page, Slot::Dirty { data, superseded });
}

struct Inner<T> {
    exchange: Exchange<T>,
    slots: Mutex<Slots>,
    next_id: AtomicU64,
}

impl<T: Transport> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn finish_read(&self, page: Setting, id: u64, result: &Result<PageData>) {
        let mut slots = self.lock();
        let ours = matches!(slots.get(&page), Some(Slot::Reading(read)) if read.id == id);
        if !ours {
            // a local edit or a clear got there first
            return;
        }
        match result {
            Ok(data) => {
                slots.insert(page, Slot::Ready(*data));
            },
            Err(_) => {
                slots.remove(&page);
            },
        }
    }

    fn finish_write(&self, page: Setting, id: u64, data: PageData, ok: bool) {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(&page) else {
            return;
        };
        if matches!(slot, Slot::Writing { write, .. } if write.id == id) {
            *slot = if ok {
                Slot::Ready(data)
            } else {
                Slot::Dirty {
                    data,
                    superseded: None,
                }
            };
            return;
        }
        release(slot, id);
    }

    fn release_superseded(&self, page: Setting, id: u64) {
        if let Some(slot) = self.lock().get_mut(&page) {
            release(slot, id);
        }
    }
}

/// Forget a finished older send that a newer edit was waiting on
fn release(slot: &mut Slot, id: u64) {
    if let Slot::Dirty { superseded, .. } = slot {
        if superseded.as_ref().is_some_and(|w| w.id == id) {
            *superseded = None;
        }
    }
}

/// Session scoped page cache over one keyboard.
///
/// Cheap to clone, every clone shares the same slots and exchange.
pub struct PageCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for PageCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> PageCache<T> {
    pub fn new(exchange: Exchange<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                exchange,
                slots: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn exchange(&self) -> &Exchange<T> {
        &self.inner.exchange
    }

    /// Send a packet that bypasses the cache and return the reply
    pub async fn request(&self, packet: &Packet) -> Result<Packet> {
        self.inner.exchange.send_and_receive(packet).await
    }

    /// Current state of a page's slot, `None` if the page was never touched
    pub fn state(&self, page: Setting) -> Option<SlotState> {
        self.inner.lock().get(&page).map(Slot::state)
    }

    /// Read a page, from the cache when possible.
    ///
    /// Concurrent reads of an uncached page share one fetch. A failed fetch
    /// leaves no trace, so the next read tries again.
    pub async fn get(&self, page: Setting) -> Result<PageData> {
        let read = {
            let mut slots = self.inner.lock();
            match slots.get(&page) {
                Some(Slot::Reading(read)) => read.clone(),
                Some(
                    Slot::Ready(data) | Slot::Dirty { data, .. } | Slot::Writing { data, .. },
                ) => return Ok(*data),
                None => {
                    let read = self.start_read(page);
                    slots.insert(page, Slot::Reading(read.clone()));
                    read
                },
            }
        };

        let fetched = read.done.await?;
        // a set that raced the fetch wins
        let newest = self.inner.lock().get(&page).and_then(Slot::data);
        Ok(newest.unwrap_or(fetched))
    }

    /// Replace a page locally, then flush it if `policy` asks for that.
    pub async fn set(&self, page: Setting, data: PageData, policy: WritePolicy) -> Result<()> {
        debug!(%page, ?policy, "set");
        store(&mut self.inner.lock(), page, data);
        self.apply(page, policy).await
    }

    /// Read-modify-write a page.
    ///
    /// `edit` runs against the newest cached value under the cache lock, so
    /// edits to different bytes of one page never overwrite each other.
    pub async fn modify<F>(&self, page: Setting, policy: WritePolicy, mut edit: F) -> Result<()>
    where
        F: FnMut(&mut PageData),
    {
        loop {
            self.get(page).await?;
            let mut slots = self.inner.lock();
            // None if the cache was cleared since the read
            if let Some(mut data) = slots.get(&page).and_then(Slot::data) {
                edit(&mut data);
                store(&mut slots, page, data);
                break;
            }
        }
        debug!(%page, ?policy, "modify");
        self.apply(page, policy).await
    }

    async fn apply(&self, page: Setting, policy: WritePolicy) -> Result<()> {
        match policy {
            WritePolicy::Cache => Ok(()),
            WritePolicy::Flush => self.flush_page(page).await,
        }
    }

    /// Send one page if it has unsent changes.
    ///
    /// Waits for a send that is already in flight instead of starting a second
    /// one. A failed send puts the page back to dirty.
    pub async fn flush_page(&self, page: Setting) -> Result<()> {
        loop {
            let (write, last) = {
                let mut slots = self.inner.lock();
                let Some(slot) = slots.get_mut(&page) else {
                    return Ok(());
                };
                match slot {
                    Slot::Ready(_) | Slot::Reading(_) => return Ok(()),
                    Slot::Writing { write, .. } => (write.clone(), true),
                    Slot::Dirty {
                        superseded: Some(write),
                        ..
                    } => (write.clone(), false),
                    Slot::Dirty {
                        data,
                        superseded: None,
                    } => {
                        let data = *data;
                        let write = self.start_write(page, data);
                        *slot = Slot::Writing {
                            data,
                            write: write.clone(),
                        };
                        (write, true)
                    },
                }
            };

            if last {
                return write.done.await;
            }
            // the older send must land before the newer one goes out, its
            // outcome no longer matters since newer data replaces it
            let _ = write.done.await;
            self.inner.release_superseded(page, write.id);
        }
    }

    /// Send every dirty page in ascending page order.
    ///
    /// Sends already in flight are awaited first, never reissued.
    pub async fn flush(&self) -> Result<()> {
        let (dirty, writing) = {
            let slots = self.inner.lock();
            let dirty: Vec<Setting> = slots
                .iter()
                .filter(|(_, slot)| matches!(slot, Slot::Dirty { .. }))
                .map(|(page, _)| *page)
                .collect();
            let writing: Vec<InFlight<()>> = slots
                .values()
                .filter_map(|slot| match slot {
                    Slot::Writing { write, .. } => Some(write.clone()),
                    _ => None,
                })
                .collect();
            (dirty, writing)
        };
        debug!(dirty = dirty.len(), writing = writing.len(), "flush");

        for write in writing {
            write.done.await?;
        }
        for page in dirty {
            self.flush_page(page).await?;
        }
        Ok(())
    }

    /// Flush, then commit everything written to non-volatile storage
    pub async fn save(&self) -> Result<()> {
        self.flush().await?;
        debug!("save");
        self.request(&abi::save()).await.map(drop)
    }

    /// Start a session on a clean cache
    pub async fn hello(&self) -> Result<()> {
        self.clear();
        debug!("hello");
        self.request(&abi::handshake(false)).await.map(drop)
    }

    /// End the session.
    ///
    /// The keyboard reloads its saved state, dropping flushed but unsaved
    /// edits, so the cache is emptied as well.
    pub async fn goodbye(&self) -> Result<()> {
        self.flush().await?;
        debug!("goodbye");
        self.request(&abi::handshake(true)).await?;
        self.clear();
        Ok(())
    }

    /// Forget every slot. Transfers still in flight finish without touching
    /// the emptied cache.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    fn start_read(&self, page: Setting) -> InFlight<PageData> {
        let id = self.inner.next_id();
        let inner = Arc::clone(&self.inner);
        debug!(%page, "fetch");
        InFlight::spawn(id, async move {
            let result = match inner.exchange.send_and_receive(&abi::read_page(page.raw())).await {
                Ok(reply) => abi::parse_read_response(&reply),
                Err(e) => Err(e),
            };
            inner.finish_read(page, id, &result);
            result
        })
    }

    fn start_write(&self, page: Setting, data: PageData) -> InFlight<()> {
        let id = self.inner.next_id();
        let inner = Arc::clone(&self.inner);
        debug!(%page, "write");
        InFlight::spawn(id, async move {
            let result = inner
                .exchange
                .send_and_receive(&abi::write_page(page.raw(), &data))
                .await
                .map(drop);
            inner.finish_write(page, id, data, result.is_ok());
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::join_all;
    use realforce_core::Notification;

    use super::*;
    use crate::abi::{cmd, PAGE_SIZE};
    use crate::mock::MockTransport;
    use crate::setting::NamedSetting;

    const NAME: Setting = Setting::Named(NamedSetting::KeyboardName);
    const APC: Setting = Setting::Named(NamedSetting::Apc);
    const ILLUMINATION2: Setting = Setting::Named(NamedSetting::Illumination2);

    fn cache() -> (Arc<MockTransport>, PageCache<Arc<MockTransport>>) {
        let mock = Arc::new(MockTransport::new());
        let cache = PageCache::new(Exchange::new(Arc::clone(&mock), None));
        (mock, cache)
    }

    fn page(fill: u8) -> PageData {
        [fill; PAGE_SIZE]
    }

    fn written_pages(mock: &MockTransport) -> Vec<u8> {
        mock.sent_with(cmd::WRITE_PAGE).iter().map(|p| p[5]).collect()
    }

    #[tokio::test]
    async fn cached_set_is_read_back_without_traffic() {
        let (mock, cache) = cache();
        cache.set(APC, page(7), WritePolicy::Cache).await.unwrap();
        assert_eq!(cache.get(APC).await.unwrap(), page(7));
        assert!(mock.sent().is_empty());
        assert_eq!(cache.state(APC), Some(SlotState::Dirty(page(7))));
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_fetch() {
        let (mock, cache) = cache();
        mock.set_page(0x30, page(3));
        let reads = join_all((0..5).map(|_| cache.get(APC))).await;
        for read in reads {
            assert_eq!(read.unwrap(), page(3));
        }
        assert_eq!(mock.sent_with(cmd::READ_PAGE).len(), 1);
        assert_eq!(cache.state(APC), Some(SlotState::Ready(page(3))));

        cache.get(APC).await.unwrap();
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn set_during_fetch_wins() {
        let (mock, cache) = cache();
        let gate = mock.hold();
        mock.set_page(0x30, page(1));

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(APC).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.state(APC), Some(SlotState::Reading));

        cache.set(APC, page(2), WritePolicy::Cache).await.unwrap();
        gate.add_permits(1);
        assert_eq!(reader.await.unwrap().unwrap(), page(2));
        assert_eq!(cache.state(APC), Some(SlotState::Dirty(page(2))));
    }

    #[tokio::test]
    async fn newest_write_wins() {
        let (mock, cache) = cache();
        let gate = mock.hold();
        cache.set(APC, page(1), WritePolicy::Cache).await.unwrap();

        let first = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.flush_page(APC).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.state(APC), Some(SlotState::Writing(page(1))));
        assert_eq!(cache.get(APC).await.unwrap(), page(1));

        cache.set(APC, page(2), WritePolicy::Cache).await.unwrap();
        gate.add_permits(1);
        first.await.unwrap().unwrap();
        assert_eq!(cache.state(APC), Some(SlotState::Dirty(page(2))));
        assert_eq!(mock.page(0x30), page(1));

        cache.flush().await.unwrap();
        assert_eq!(cache.state(APC), Some(SlotState::Ready(page(2))));
        assert_eq!(mock.page(0x30), page(2));
    }

    #[tokio::test]
    async fn newer_send_waits_for_older_one() {
        let (mock, cache) = cache();
        let gate = mock.hold();
        cache.set(APC, page(1), WritePolicy::Cache).await.unwrap();
        let first = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.flush_page(APC).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.set(APC, page(2), WritePolicy::Flush).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(mock.sent_with(cmd::WRITE_PAGE).len(), 1);

        gate.add_permits(1);
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        let payloads: Vec<u8> = mock
            .sent_with(cmd::WRITE_PAGE)
            .iter()
            .map(|p| p[6])
            .collect();
        assert_eq!(payloads, [1, 2]);
        assert_eq!(cache.state(APC), Some(SlotState::Ready(page(2))));
    }

    #[tokio::test]
    async fn failed_write_stays_dirty() {
        let (mock, cache) = cache();
        mock.fail_writes(true);
        let err = cache
            .set(NAME, page(9), WritePolicy::Flush)
            .await
            .unwrap_err();
        assert!(matches!(err, KeyboardError::DeviceRemoved));
        assert_eq!(cache.state(NAME), Some(SlotState::Dirty(page(9))));

        mock.fail_writes(false);
        cache.flush().await.unwrap();
        assert_eq!(cache.state(NAME), Some(SlotState::Ready(page(9))));
        assert_eq!(mock.page(0x28), page(9));
    }

    #[tokio::test]
    async fn failed_read_leaves_no_slot() {
        let (mock, cache) = cache();
        mock.inject(Notification::DeviceSeized);
        let err = cache.get(APC).await.unwrap_err();
        assert!(matches!(err, KeyboardError::DeviceSeized));
        assert_eq!(cache.state(APC), None);

        assert_eq!(cache.get(APC).await.unwrap(), page(0));
        assert_eq!(mock.sent_with(cmd::READ_PAGE).len(), 2);
    }

    #[tokio::test]
    async fn flush_writes_in_ascending_page_order() {
        let (mock, cache) = cache();
        for p in [ILLUMINATION2, APC, NAME] {
            cache.set(p, page(p.raw()), WritePolicy::Cache).await.unwrap();
        }
        cache.flush().await.unwrap();
        assert_eq!(written_pages(&mock), [0x28, 0x30, 0x61]);
        assert_eq!(mock.page(0x61), page(0x61));
    }

    #[tokio::test]
    async fn modify_edits_the_newest_value() {
        let (mock, cache) = cache();
        mock.set_page(0x30, page(0));
        cache
            .modify(APC, WritePolicy::Cache, |data| data[0] = 4)
            .await
            .unwrap();
        cache
            .modify(APC, WritePolicy::Flush, |data| data[1] = 5)
            .await
            .unwrap();
        let stored = mock.page(0x30);
        assert_eq!(stored[..3], [4, 5, 0]);
        assert_eq!(mock.sent_with(cmd::READ_PAGE).len(), 1);
        assert_eq!(mock.sent_with(cmd::WRITE_PAGE).len(), 1);
    }

    #[tokio::test]
    async fn save_flushes_before_committing() {
        let (mock, cache) = cache();
        cache.set(APC, page(1), WritePolicy::Cache).await.unwrap();
        cache.save().await.unwrap();
        let commands: Vec<u8> = mock.sent().iter().map(|p| p[2]).collect();
        assert_eq!(commands, [cmd::WRITE_PAGE, cmd::SAVE]);
    }

    #[tokio::test]
    async fn goodbye_flushes_then_empties_cache() {
        let (mock, cache) = cache();
        cache.set(APC, page(1), WritePolicy::Cache).await.unwrap();
        cache.goodbye().await.unwrap();
        let sent = mock.sent();
        assert_eq!(sent[0][2], cmd::WRITE_PAGE);
        assert_eq!(sent[1][..6], abi::handshake(true)[..6]);
        assert_eq!(cache.state(APC), None);
    }

    #[tokio::test]
    async fn hello_starts_from_empty_cache() {
        let (mock, cache) = cache();
        cache.set(APC, page(1), WritePolicy::Cache).await.unwrap();
        cache.hello().await.unwrap();
        assert_eq!(cache.state(APC), None);
        assert_eq!(mock.sent(), [abi::handshake(false)]);
    }

    #[tokio::test]
    async fn write_finishing_after_clear_leaves_slot_absent() {
        let (mock, cache) = cache();
        let gate = mock.hold();
        cache.set(APC, page(1), WritePolicy::Cache).await.unwrap();
        let flush = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.flush_page(APC).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.clear();
        gate.add_permits(1);
        flush.await.unwrap().unwrap();
        assert_eq!(cache.state(APC), None);
    }

    #[tokio::test]
    async fn late_reply_after_timeout_never_fills_another_page() {
        let mock = Arc::new(MockTransport::new());
        let cache = PageCache::new(Exchange::new(
            Arc::clone(&mock),
            Some(Duration::from_millis(30)),
        ));
        let illumination1 = Setting::from(0x60u8);
        mock.set_page(0x30, page(0x11));
        mock.set_page(0x60, page(0x22));
        let gate = mock.hold();

        let err = cache.get(APC).await.unwrap_err();
        assert!(matches!(err, KeyboardError::Timeout(_)));
        assert_eq!(cache.state(APC), None);

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(illumination1).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        gate.add_permits(1);

        assert_eq!(reader.await.unwrap().unwrap(), page(0x22));
        assert_eq!(
            cache.state(illumination1),
            Some(SlotState::Ready(page(0x22)))
        );
    }
}
