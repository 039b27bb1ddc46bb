//! Request/response correlation over a half-duplex report channel.

use std::time::{Duration, Instant};

use futures::stream::BoxStream;
use realforce_core::{hex, KeyboardError, Notification, Packet, Result, Transport};
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::abi::{self, SEND_PREFIX};

/// A request that timed out while its reply may still be on the way
struct Overdue {
    reports: BoxStream<'static, Notification>,
    request: Packet,
    sent_at: Instant,
}

/// Pairs each outbound packet with its reply.
///
/// The link only carries one request at a time, so exchanges queue up in FIFO
/// order behind a single slot no matter how many callers are active. A reply
/// that missed its timeout must be drained before the link carries anything
/// else, since replies of the same command are indistinguishable.
pub struct Exchange<T> {
    transport: T,
    slot: Mutex<Option<Overdue>>,
    timeout: Option<Duration>,
}

impl<T: Transport> Exchange<T> {
    /// Wrap a transport. Without a timeout an exchange waits for as long as the
    /// report stream stays open.
    pub fn new(transport: T, timeout: Option<Duration>) -> Self {
        Self {
            transport,
            slot: Mutex::new(None),
            timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a packet and wait for the reply that echoes its command byte.
    ///
    /// # Panics
    /// If the packet does not carry the outbound marker.
    pub async fn send_and_receive(&self, packet: &Packet) -> Result<Packet> {
        assert!(
            packet.starts_with(&SEND_PREFIX),
            "outbound packet must start with {SEND_PREFIX:02x?}"
        );

        let mut slot = self.slot.lock().await;
        if let Some(overdue) = slot.take() {
            *slot = self.drain(overdue).await?;
            if slot.is_some() {
                return Err(KeyboardError::Timeout(self.timeout.unwrap_or_default()));
            }
        }

        // subscribe before sending so the reply cannot slip past
        let mut reports = self.transport.reports();
        let sent_at = Instant::now();
        debug!(packet = %hex(packet), "send");
        self.transport.send(packet).await?;

        let Some(limit) = self.timeout else {
            return receive(&mut reports, packet, sent_at).await;
        };
        let outcome = tokio::time::timeout(limit, receive(&mut reports, packet, sent_at)).await;
        match outcome {
            Ok(reply) => reply,
            Err(_) => {
                warn!(packet = %hex(packet), ?limit, "no reply in time, link owes a late reply");
                *slot = Some(Overdue {
                    reports,
                    request: *packet,
                    sent_at,
                });
                Err(KeyboardError::Timeout(limit))
            },
        }
    }

    /// Wait out the late reply to a request that timed out.
    ///
    /// Gives the overdue request back if its reply still does not show up in
    /// time. Device events and a closed stream end the session, so they are
    /// passed on.
    async fn drain(&self, mut overdue: Overdue) -> Result<Option<Overdue>> {
        let limit = self.timeout.unwrap_or_default();
        let late = receive(&mut overdue.reports, &overdue.request, overdue.sent_at);
        let outcome = tokio::time::timeout(limit, late).await;
        match outcome {
            Err(_) => Ok(Some(overdue)),
            Ok(Ok(reply)) => {
                debug!(packet = %hex(&reply), "discarded late reply");
                Ok(None)
            },
            Ok(Err(KeyboardError::UnexpectedData(data))) => {
                debug!(data = %hex(&data), "discarded late report");
                Ok(None)
            },
            Ok(Err(e)) => Err(e),
        }
    }
}

/// Scan the report stream for the reply to `request`
async fn receive(
    reports: &mut BoxStream<'static, Notification>,
    request: &Packet,
    sent_at: Instant,
) -> Result<Packet> {
    while let Some(notification) = reports.next().await {
        match notification {
            Notification::InputReport { timestamp, data } => {
                if timestamp < sent_at {
                    warn!(data = %hex(&data), "skipped report from before the request");
                    continue;
                }
                debug!(packet = %hex(&data), "recv");
                return abi::validate_response(request, &data);
            },
            Notification::DeviceRemoved => return Err(KeyboardError::DeviceRemoved),
            Notification::DeviceSeized => return Err(KeyboardError::DeviceSeized),
            Notification::DeviceUnseized => return Err(KeyboardError::DeviceUnseized),
        }
    }
    Err(KeyboardError::NoReply)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::abi::{cmd, RECV_PREFIX};
    use crate::mock::MockTransport;

    fn exchange(mock: &Arc<MockTransport>) -> Exchange<Arc<MockTransport>> {
        Exchange::new(Arc::clone(mock), None)
    }

    fn inbound(command: u8) -> Vec<u8> {
        let mut data = vec![0u8; 64];
        data[..2].copy_from_slice(&RECV_PREFIX);
        data[2] = command;
        data
    }

    #[tokio::test]
    async fn reply_is_matched_to_request() {
        let mock = Arc::new(MockTransport::new());
        let reply = exchange(&mock).send_and_receive(&abi::info()).await.unwrap();
        assert_eq!(reply[..3], [0x55, 0x55, cmd::INFO]);
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn stale_report_is_skipped() {
        let mock = Arc::new(MockTransport::new());
        let earlier = Instant::now() - Duration::from_millis(5);
        mock.inject(Notification::InputReport {
            timestamp: earlier,
            data: inbound(0x99),
        });
        let reply = exchange(&mock).send_and_receive(&abi::info()).await.unwrap();
        assert_eq!(reply[2], cmd::INFO);
    }

    #[tokio::test]
    async fn echo_mismatch_is_rejected() {
        let mock = Arc::new(MockTransport::new());
        mock.inject(Notification::InputReport {
            timestamp: Instant::now() + Duration::from_secs(1),
            data: inbound(cmd::SAVE),
        });
        let err = exchange(&mock)
            .send_and_receive(&abi::info())
            .await
            .unwrap_err();
        assert!(matches!(err, KeyboardError::UnexpectedData(_)));
    }

    #[tokio::test]
    async fn device_events_abort_the_wait() {
        let mock = Arc::new(MockTransport::new());
        let exchange = exchange(&mock);

        mock.inject(Notification::DeviceRemoved);
        let err = exchange.send_and_receive(&abi::info()).await.unwrap_err();
        assert!(matches!(err, KeyboardError::DeviceRemoved));

        mock.inject(Notification::DeviceSeized);
        let err = exchange.send_and_receive(&abi::info()).await.unwrap_err();
        assert!(matches!(err, KeyboardError::DeviceSeized));

        mock.inject(Notification::DeviceUnseized);
        let err = exchange.send_and_receive(&abi::info()).await.unwrap_err();
        assert!(matches!(err, KeyboardError::DeviceUnseized));
    }

    #[tokio::test]
    async fn closed_stream_means_no_reply() {
        let mock = Arc::new(MockTransport::new());
        mock.hang_up();
        let err = exchange(&mock)
            .send_and_receive(&abi::info())
            .await
            .unwrap_err();
        assert!(matches!(err, KeyboardError::NoReply));
    }

    #[tokio::test]
    async fn timeout_bounds_the_wait_when_configured() {
        let mock = Arc::new(MockTransport::new());
        let _gate = mock.hold();
        let exchange = Exchange::new(Arc::clone(&mock), Some(Duration::from_millis(20)));
        let err = exchange.send_and_receive(&abi::info()).await.unwrap_err();
        assert!(matches!(err, KeyboardError::Timeout(_)));
    }

    #[tokio::test]
    async fn late_reply_is_drained_before_the_next_request() {
        let mock = Arc::new(MockTransport::new());
        let gate = mock.hold();
        let exchange = Arc::new(Exchange::new(Arc::clone(&mock), Some(Duration::from_millis(30))));
        let err = exchange.send_and_receive(&abi::info()).await.unwrap_err();
        assert!(matches!(err, KeyboardError::Timeout(_)));

        let next = {
            let exchange = Arc::clone(&exchange);
            tokio::spawn(async move { exchange.send_and_receive(&abi::save()).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        // the save only goes out once the info reply is accounted for
        assert_eq!(mock.sent().len(), 1);

        gate.add_permits(1);
        let reply = next.await.unwrap().unwrap();
        assert_eq!(reply[2], cmd::SAVE);
        let commands: Vec<u8> = mock.sent().iter().map(|p| p[2]).collect();
        assert_eq!(commands, [cmd::INFO, cmd::SAVE]);
    }

    #[tokio::test]
    async fn link_stays_blocked_while_the_late_reply_is_missing() {
        let mock = Arc::new(MockTransport::new());
        let _gate = mock.hold();
        let exchange = Exchange::new(Arc::clone(&mock), Some(Duration::from_millis(20)));
        let err = exchange.send_and_receive(&abi::read_page(0x30)).await.unwrap_err();
        assert!(matches!(err, KeyboardError::Timeout(_)));

        let err = exchange.send_and_receive(&abi::read_page(0x60)).await.unwrap_err();
        assert!(matches!(err, KeyboardError::Timeout(_)));
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn one_exchange_in_flight_at_a_time() {
        let mock = Arc::new(MockTransport::new());
        let gate = mock.hold();
        let exchange = Arc::new(exchange(&mock));
        let tasks: Vec<_> = (1..=3u8)
            .map(|page| {
                let exchange = Arc::clone(&exchange);
                tokio::spawn(async move { exchange.send_and_receive(&abi::read_page(page)).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(mock.sent().len(), 1);

        gate.add_permits(1);
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap()[2], cmd::READ_PAGE);
        }
        let mut pages: Vec<u8> = mock.sent().iter().map(|p| p[5]).collect();
        pages.sort();
        assert_eq!(pages, [0x01, 0x02, 0x03]);
    }
}
