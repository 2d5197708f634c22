//! In-process [`Transport`] over bounded crossbeam channels.
//!
//! Every `(channel, stream_id)` pair with a subscriber maps to one bounded
//! queue. A [`LocalPublication`] looks its queue up on each offer, so a
//! publication can be created before anyone subscribes and simply reports
//! [`OfferError::NotConnected`] until then. A full queue is
//! [`OfferError::BackPressured`].
//!
//! Control clients connect with [`LocalTransport::connect_control`]; the
//! conductor picks the new image up on its next
//! [`poll_control_image`](Transport::poll_control_image).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use reel_codec::{CodecError, ControlRequest};
use reel_core::{Image, OfferError, Publication, Transport, TransportError};

/// Payload ceiling given to publications unless overridden.
pub const DEFAULT_MAX_PAYLOAD_LENGTH: usize = 1408 - 32;

type Registry = Arc<Mutex<HashMap<(String, i32), Sender<Vec<u8>>>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── LocalTransport ─────────────────────────────────────────────────

/// Shared handle to an in-process message fabric. Clones see the same
/// subscribers and control connections.
#[derive(Clone)]
pub struct LocalTransport {
    registry: Registry,
    capacity: usize,
    max_payload_length: usize,
    control_tx: Sender<LocalImage>,
    control_rx: Receiver<LocalImage>,
}

impl LocalTransport {
    /// A fabric whose queues each hold `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
            max_payload_length: DEFAULT_MAX_PAYLOAD_LENGTH,
            control_tx,
            control_rx,
        }
    }

    /// Same fabric, with `max` as the payload ceiling of publications
    /// created from now on.
    pub fn with_max_payload_length(mut self, max: usize) -> Self {
        self.max_payload_length = max;
        self
    }

    /// Subscribe to `channel`/`stream_id`, replacing any earlier subscriber.
    pub fn subscribe(&self, channel: &str, stream_id: i32) -> LocalImage {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        lock(&self.registry).insert((channel.to_string(), stream_id), tx);
        LocalImage::new(rx)
    }

    /// Open a control connection to whoever polls this transport.
    pub fn connect_control(&self) -> LocalControlClient {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        // The receiving end lives inside this transport, so the send cannot fail.
        let _ = self.control_tx.send(LocalImage::new(rx));
        LocalControlClient {
            requests: tx,
            buffer: Vec::new(),
        }
    }
}

impl Transport for LocalTransport {
    fn add_publication(
        &mut self,
        channel: &str,
        stream_id: i32,
    ) -> Result<Box<dyn Publication>, TransportError> {
        if channel.is_empty() {
            return Err(TransportError::InvalidChannel {
                channel: channel.to_string(),
                reason: "empty channel".to_string(),
            });
        }
        Ok(Box::new(LocalPublication {
            registry: Arc::clone(&self.registry),
            channel: channel.to_string(),
            stream_id,
            max_payload_length: self.max_payload_length,
            position: 0,
        }))
    }

    fn poll_control_image(&mut self) -> Option<Box<dyn Image>> {
        self.control_rx
            .try_recv()
            .ok()
            .map(|image| Box::new(image) as Box<dyn Image>)
    }
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("capacity", &self.capacity)
            .field("max_payload_length", &self.max_payload_length)
            .field("subscribers", &lock(&self.registry).len())
            .finish()
    }
}

// ── LocalPublication ───────────────────────────────────────────────

/// Sends to whichever subscriber currently owns the channel and stream.
///
/// `max_payload_length` is advertised to callers but not enforced: a
/// larger message is still delivered whole.
pub struct LocalPublication {
    registry: Registry,
    channel: String,
    stream_id: i32,
    max_payload_length: usize,
    position: u64,
}

impl Publication for LocalPublication {
    fn offer(&mut self, buffer: &[u8]) -> Result<u64, OfferError> {
        let key = (self.channel.clone(), self.stream_id);
        let mut registry = lock(&self.registry);
        let Some(tx) = registry.get(&key) else {
            return Err(OfferError::NotConnected);
        };
        match tx.try_send(buffer.to_vec()) {
            Ok(()) => {
                self.position += buffer.len() as u64;
                Ok(self.position)
            }
            Err(TrySendError::Full(_)) => Err(OfferError::BackPressured),
            Err(TrySendError::Disconnected(_)) => {
                registry.remove(&key);
                Err(OfferError::NotConnected)
            }
        }
    }

    fn max_payload_length(&self) -> usize {
        self.max_payload_length
    }

    fn channel(&self) -> &str {
        &self.channel
    }

    fn stream_id(&self) -> i32 {
        self.stream_id
    }
}

// ── LocalImage ─────────────────────────────────────────────────────

/// Receiving end of one queue.
pub struct LocalImage {
    rx: Receiver<Vec<u8>>,
    closed: bool,
}

impl LocalImage {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self { rx, closed: false }
    }

    /// Take the next message if one is waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    /// Wait up to `timeout` for the next message.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Vec<u8>> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }
}

impl Image for LocalImage {
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8]), fragment_limit: usize) -> usize {
        let mut polled = 0;
        while polled < fragment_limit {
            let Some(message) = self.try_recv() else {
                break;
            };
            handler(&message);
            polled += 1;
        }
        polled
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// ── LocalControlClient ─────────────────────────────────────────────

/// The client end of a control connection. Dropping it closes the
/// archive's control session once queued requests are drained.
pub struct LocalControlClient {
    requests: Sender<Vec<u8>>,
    buffer: Vec<u8>,
}

/// Why a [`LocalControlClient`] could not send.
#[derive(Debug, PartialEq, Eq)]
pub enum ClientSendError {
    /// The request could not be encoded.
    Codec(CodecError),
    /// The request queue refused the message.
    Offer(OfferError),
}

impl std::fmt::Display for ClientSendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "request encoding failed: {e}"),
            Self::Offer(e) => write!(f, "request not sent: {e}"),
        }
    }
}

impl std::error::Error for ClientSendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Offer(e) => Some(e),
        }
    }
}

impl LocalControlClient {
    /// Encode and queue `request`.
    pub fn send(&mut self, request: &ControlRequest) -> Result<(), ClientSendError> {
        self.buffer.clear();
        request
            .encode(&mut self.buffer)
            .map_err(ClientSendError::Codec)?;
        self.send_raw(self.buffer.clone())
            .map_err(ClientSendError::Offer)
    }

    /// Queue arbitrary bytes as one request fragment.
    pub fn send_raw(&self, fragment: Vec<u8>) -> Result<(), OfferError> {
        self.requests.try_send(fragment).map_err(|err| match err {
            TrySendError::Full(_) => OfferError::BackPressured,
            TrySendError::Disconnected(_) => OfferError::NotConnected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_without_subscriber_is_not_connected() {
        let mut transport = LocalTransport::new(4);
        let mut publication = transport.add_publication("aeron:ipc", 1).unwrap();
        assert_eq!(publication.offer(b"x"), Err(OfferError::NotConnected));

        let mut image = transport.subscribe("aeron:ipc", 1);
        assert_eq!(publication.offer(b"abc"), Ok(3));
        assert_eq!(image.try_recv(), Some(b"abc".to_vec()));
    }

    #[test]
    fn full_queue_is_back_pressure() {
        let mut transport = LocalTransport::new(2);
        let _image = transport.subscribe("aeron:ipc", 1);
        let mut publication = transport.add_publication("aeron:ipc", 1).unwrap();

        assert!(publication.offer(b"1").is_ok());
        assert!(publication.offer(b"2").is_ok());
        assert_eq!(publication.offer(b"3"), Err(OfferError::BackPressured));
    }

    #[test]
    fn dropped_subscriber_is_not_connected() {
        let mut transport = LocalTransport::new(2);
        let image = transport.subscribe("aeron:ipc", 1);
        let mut publication = transport.add_publication("aeron:ipc", 1).unwrap();
        drop(image);
        assert_eq!(publication.offer(b"1"), Err(OfferError::NotConnected));
    }

    #[test]
    fn empty_channel_is_rejected() {
        let mut transport = LocalTransport::new(2);
        assert!(matches!(
            transport.add_publication("", 1),
            Err(TransportError::InvalidChannel { .. })
        ));
    }

    #[test]
    fn control_connection_delivers_requests_then_closes() {
        let mut transport = LocalTransport::new(4);
        let mut client = transport.connect_control();
        let mut image = transport.poll_control_image().unwrap();
        assert!(transport.poll_control_image().is_none());

        let request = ControlRequest::ListRecordings {
            correlation_id: 5,
            from_recording_id: 0,
            record_count: 3,
        };
        client.send(&request).unwrap();
        drop(client);

        let mut received = Vec::new();
        let polled = image.poll(&mut |f| received.push(ControlRequest::decode(f).unwrap()), 10);
        assert_eq!(polled, 1);
        assert_eq!(received, vec![request]);
        assert!(image.is_closed());
        assert_eq!(image.poll(&mut |_| {}, 10), 0);
    }

    #[test]
    fn payload_ceiling_is_per_transport() {
        let mut transport = LocalTransport::new(2).with_max_payload_length(512);
        let publication = transport.add_publication("aeron:ipc", 1).unwrap();
        assert_eq!(publication.max_payload_length(), 512);
    }
}
