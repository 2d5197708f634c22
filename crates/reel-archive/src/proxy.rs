//! Encoding and sending of control responses.
//!
//! [`ControlSessionProxy`] is the only code that writes to a client's
//! response channel. There is one per conductor. It owns its scratch
//! buffer and the idle strategy used between send retries, and keeps no
//! protocol state.

use reel_codec::{
    descriptor_message_header, encode_control_response, stamp_correlation_id, ControlResponseCode,
    MessageHeader,
};
use reel_core::{IdleStrategy, Publication, RecordingId};

use crate::error::ControlError;

/// What a send does while the client's channel refuses offers without
/// being down (back pressure, admin action).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SendPolicy {
    /// Keep retrying until the offer succeeds or the channel goes down.
    ///
    /// A client that stops reading stalls the conductor, and every other
    /// client with it.
    #[default]
    Unbounded,
    /// Give up after `max_attempts` refused offers with
    /// [`ControlError::SendTimeout`]; the session is then closed as if
    /// its channel had gone down.
    Bounded {
        /// Offers to make before giving up.
        max_attempts: usize,
    },
}

/// Encoder and sender for everything a control session replies with.
pub struct ControlSessionProxy {
    idle: Box<dyn IdleStrategy>,
    policy: SendPolicy,
    buffer: Vec<u8>,
}

impl ControlSessionProxy {
    /// A proxy that idles with `idle` between refused offers.
    pub fn new(idle: Box<dyn IdleStrategy>, policy: SendPolicy) -> Self {
        Self {
            idle,
            policy,
            buffer: Vec::with_capacity(512),
        }
    }

    /// The retry policy in force.
    pub fn policy(&self) -> SendPolicy {
        self.policy
    }

    /// Send `OK` with an empty error message and no relevant id.
    pub fn send_ok_response(
        &mut self,
        correlation_id: i64,
        publication: &mut dyn Publication,
    ) -> Result<usize, ControlError> {
        self.send_response(correlation_id, 0, ControlResponseCode::Ok, "", publication)
    }

    /// Send a response with an explicit code, relevant id, and message.
    pub fn send_response(
        &mut self,
        correlation_id: i64,
        relevant_id: i64,
        code: ControlResponseCode,
        error_message: &str,
        publication: &mut dyn Publication,
    ) -> Result<usize, ControlError> {
        self.buffer.clear();
        encode_control_response(
            &mut self.buffer,
            correlation_id,
            relevant_id,
            code,
            error_message,
        )?;
        self.send(publication)
    }

    /// Send `RECORDING_UNKNOWN` naming `recording_id`.
    ///
    /// An id too large for the signed `relevantId` is answered with
    /// `ERROR` instead of a wrapped id.
    pub fn send_recording_unknown(
        &mut self,
        correlation_id: i64,
        recording_id: RecordingId,
        publication: &mut dyn Publication,
    ) -> Result<usize, ControlError> {
        match recording_id.to_relevant_id() {
            Some(relevant_id) => self.send_response(
                correlation_id,
                relevant_id,
                ControlResponseCode::RecordingUnknown,
                "",
                publication,
            ),
            None => self.send_response(
                correlation_id,
                0,
                ControlResponseCode::Error,
                &format!("recording id {recording_id} out of range"),
                publication,
            ),
        }
    }

    /// Send a descriptor body exactly as stored in the catalog.
    ///
    /// The body is not re-encoded: a message header goes in front and
    /// the correlation id field is overwritten. Returns the bytes sent.
    pub fn send_descriptor(
        &mut self,
        correlation_id: i64,
        body: &[u8],
        publication: &mut dyn Publication,
    ) -> Result<usize, ControlError> {
        self.buffer.clear();
        descriptor_message_header().encode(&mut self.buffer);
        self.buffer.extend_from_slice(body);
        stamp_correlation_id(
            &mut self.buffer[MessageHeader::ENCODED_LENGTH..],
            correlation_id,
        )?;
        self.send(publication)
    }

    fn send(&mut self, publication: &mut dyn Publication) -> Result<usize, ControlError> {
        let mut refused = 0;
        loop {
            match publication.offer(&self.buffer) {
                Ok(_) => {
                    self.idle.reset();
                    return Ok(self.buffer.len());
                }
                Err(cause) if cause.is_terminal() => {
                    return Err(ControlError::ChannelDown {
                        channel: publication.channel().to_string(),
                        stream_id: publication.stream_id(),
                        cause,
                    });
                }
                Err(_) => {
                    refused += 1;
                    if let SendPolicy::Bounded { max_attempts } = self.policy {
                        if refused >= max_attempts {
                            return Err(ControlError::SendTimeout { attempts: refused });
                        }
                    }
                    self.idle.idle();
                }
            }
        }
    }
}

impl std::fmt::Debug for ControlSessionProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSessionProxy")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_codec::{encode_descriptor_body, ControlResponse};
    use reel_core::OfferError;
    use reel_test_utils::fixtures::new_recording;
    use reel_test_utils::{CountingIdleStrategy, MockPublication, SentMessage};

    fn proxy(policy: SendPolicy) -> (ControlSessionProxy, CountingIdleStrategy) {
        let idle = CountingIdleStrategy::new();
        (ControlSessionProxy::new(idle.boxed(), policy), idle)
    }

    #[test]
    fn ok_response_has_empty_message() {
        let (mut proxy, idle) = proxy(SendPolicy::Unbounded);
        let mut publication = MockPublication::new("aeron:ipc", 20);
        proxy.send_ok_response(7, &mut publication).unwrap();

        let response = ControlResponse::decode(&publication.frames()[0]).unwrap();
        assert_eq!(response.correlation_id, 7);
        assert_eq!(response.code, ControlResponseCode::Ok);
        assert_eq!(response.error_message, "");
        assert_eq!(idle.resets(), 1);
        assert_eq!(idle.idles(), 0);
    }

    #[test]
    fn recording_unknown_carries_id() {
        let (mut proxy, _) = proxy(SendPolicy::Unbounded);
        let mut publication = MockPublication::new("aeron:ipc", 20);
        proxy
            .send_recording_unknown(3, RecordingId(12), &mut publication)
            .unwrap();

        let response = ControlResponse::decode(&publication.frames()[0]).unwrap();
        assert_eq!(response.code, ControlResponseCode::RecordingUnknown);
        assert_eq!(response.relevant_id, 12);
    }

    #[test]
    fn recording_unknown_never_wraps_large_ids() {
        let (mut proxy, _) = proxy(SendPolicy::Unbounded);
        let mut publication = MockPublication::new("aeron:ipc", 20);
        proxy
            .send_recording_unknown(3, RecordingId(u64::MAX), &mut publication)
            .unwrap();

        let response = ControlResponse::decode(&publication.frames()[0]).unwrap();
        assert_eq!(response.code, ControlResponseCode::Error);
        assert_eq!(response.relevant_id, 0);
        assert!(response.error_message.contains("out of range"));
    }

    #[test]
    fn descriptor_is_restamped_not_reencoded() {
        let (mut proxy, _) = proxy(SendPolicy::Unbounded);
        let mut publication = MockPublication::new("aeron:ipc", 20);
        let descriptor = new_recording(6, 1, "channel", "channel?tag=f", "sourceA")
            .into_descriptor(RecordingId(4), 1_000);
        let mut body = Vec::new();
        encode_descriptor_body(&mut body, 0, &descriptor).unwrap();

        let sent = proxy
            .send_descriptor(99, &body, &mut publication)
            .unwrap();
        assert_eq!(sent, body.len() + MessageHeader::ENCODED_LENGTH);

        let frame = &publication.frames()[0];
        assert_eq!(&frame[MessageHeader::ENCODED_LENGTH + 8..], &body[8..]);
        assert_eq!(
            SentMessage::decode(frame),
            SentMessage::Descriptor {
                correlation_id: 99,
                descriptor,
            }
        );
    }

    #[test]
    fn retries_through_back_pressure() {
        let (mut proxy, idle) = proxy(SendPolicy::Unbounded);
        let mut publication = MockPublication::new("aeron:ipc", 20);
        publication.fail_next([
            OfferError::BackPressured,
            OfferError::AdminAction,
            OfferError::BackPressured,
        ]);

        proxy.send_ok_response(1, &mut publication).unwrap();
        assert_eq!(publication.offer_attempts(), 4);
        assert_eq!(publication.frames().len(), 1);
        assert_eq!(idle.idles(), 3);
        assert_eq!(idle.resets(), 1);
    }

    #[test]
    fn terminal_state_is_channel_down() {
        for cause in [OfferError::NotConnected, OfferError::Closed] {
            let (mut proxy, _) = proxy(SendPolicy::Unbounded);
            let mut publication = MockPublication::new("aeron:udp?endpoint=host:1", 20);
            publication.fail_next([OfferError::BackPressured, cause]);

            let err = proxy.send_ok_response(1, &mut publication).unwrap_err();
            match err {
                ControlError::ChannelDown {
                    channel,
                    stream_id,
                    cause: reported,
                } => {
                    assert_eq!(channel, "aeron:udp?endpoint=host:1");
                    assert_eq!(stream_id, 20);
                    assert_eq!(reported, cause);
                }
                other => panic!("expected ChannelDown, got {other:?}"),
            }
            assert!(publication.frames().is_empty());
        }
    }

    #[test]
    fn bounded_policy_gives_up() {
        let (mut proxy, idle) = proxy(SendPolicy::Bounded { max_attempts: 5 });
        let mut publication = MockPublication::new("aeron:ipc", 20);
        publication.fail_always(OfferError::BackPressured);

        let err = proxy.send_ok_response(1, &mut publication).unwrap_err();
        assert!(matches!(err, ControlError::SendTimeout { attempts: 5 }));
        assert_eq!(publication.offer_attempts(), 5);
        assert_eq!(idle.idles(), 4);
    }
}
