//! Test utilities and mock types for Reel development.
//!
//! Provides mock implementations of the transport seams ([`Publication`],
//! [`Image`], [`Transport`]), a scriptable [`DataPlane`], a counting
//! [`IdleStrategy`], and catalog [`fixtures`].
//!
//! Every mock is a cheap handle over shared state: clone it, hand one
//! clone to the code under test as a `Box<dyn ...>`, and keep the other to
//! script behaviour and inspect what happened.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use reel_codec::{decode_descriptor_message, ControlRequest, ControlResponse, RecordingEvent};
use reel_core::{
    DataPlane, DataPlaneError, IdleStrategy, Image, OfferError, Publication, RecordingDescriptor,
    SourceLocation, Transport, TransportError,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── MockPublication ─────────────────────────────────────────────

struct PublicationState {
    max_payload_length: usize,
    frames: Vec<Vec<u8>>,
    script: VecDeque<OfferError>,
    sticky: Option<OfferError>,
    offers: usize,
    position: u64,
}

/// A publication that records every accepted frame.
///
/// Offers succeed unless failures were scripted with
/// [`fail_next`](Self::fail_next) (consumed one per offer) or
/// [`fail_always`](Self::fail_always).
#[derive(Clone)]
pub struct MockPublication {
    channel: String,
    stream_id: i32,
    state: Arc<Mutex<PublicationState>>,
}

impl MockPublication {
    pub fn new(channel: impl Into<String>, stream_id: i32) -> Self {
        Self {
            channel: channel.into(),
            stream_id,
            state: Arc::new(Mutex::new(PublicationState {
                max_payload_length: usize::MAX,
                frames: Vec::new(),
                script: VecDeque::new(),
                sticky: None,
                offers: 0,
                position: 0,
            })),
        }
    }

    /// Same publication with a payload ceiling.
    pub fn with_max_payload_length(self, max: usize) -> Self {
        self.set_max_payload_length(max);
        self
    }

    pub fn set_max_payload_length(&self, max: usize) {
        lock(&self.state).max_payload_length = max;
    }

    /// Fail the next offers with these results, in order.
    pub fn fail_next(&self, results: impl IntoIterator<Item = OfferError>) {
        lock(&self.state).script.extend(results);
    }

    /// Fail every offer from now on with `error`.
    pub fn fail_always(&self, error: OfferError) {
        lock(&self.state).sticky = Some(error);
    }

    /// Undo [`fail_always`](Self::fail_always).
    pub fn recover(&self) {
        lock(&self.state).sticky = None;
    }

    /// Number of offer calls, successful or not.
    pub fn offer_attempts(&self) -> usize {
        lock(&self.state).offers
    }

    /// Every accepted frame, in order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        lock(&self.state).frames.clone()
    }

    /// Drain the accepted frames.
    pub fn take_frames(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut lock(&self.state).frames)
    }

    /// Decode the accepted frames.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.frames().iter().map(|f| SentMessage::decode(f)).collect()
    }

    /// Drain and decode the accepted frames.
    pub fn take_messages(&self) -> Vec<SentMessage> {
        self.take_frames()
            .iter()
            .map(|f| SentMessage::decode(f))
            .collect()
    }

    /// Boxed clone for code that owns its publication.
    pub fn boxed(&self) -> Box<dyn Publication> {
        Box::new(self.clone())
    }
}

impl Publication for MockPublication {
    fn offer(&mut self, buffer: &[u8]) -> Result<u64, OfferError> {
        let mut state = lock(&self.state);
        state.offers += 1;
        if let Some(err) = state.script.pop_front() {
            return Err(err);
        }
        if let Some(err) = state.sticky {
            return Err(err);
        }
        state.frames.push(buffer.to_vec());
        state.position += buffer.len() as u64;
        Ok(state.position)
    }

    fn max_payload_length(&self) -> usize {
        lock(&self.state).max_payload_length
    }

    fn channel(&self) -> &str {
        &self.channel
    }

    fn stream_id(&self) -> i32 {
        self.stream_id
    }
}

/// A frame the archive sent, decoded for assertions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentMessage {
    Response(ControlResponse),
    Descriptor {
        correlation_id: i64,
        descriptor: RecordingDescriptor,
    },
    Event(RecordingEvent),
    Undecodable(Vec<u8>),
}

impl SentMessage {
    pub fn decode(frame: &[u8]) -> Self {
        if let Ok(response) = ControlResponse::decode(frame) {
            return Self::Response(response);
        }
        if let Ok(view) = decode_descriptor_message(frame) {
            return Self::Descriptor {
                correlation_id: view.correlation_id(),
                descriptor: view.to_descriptor(),
            };
        }
        if let Ok(event) = RecordingEvent::decode(frame) {
            return Self::Event(event);
        }
        Self::Undecodable(frame.to_vec())
    }

    /// Recording id of a descriptor frame.
    pub fn descriptor_id(&self) -> Option<u64> {
        match self {
            Self::Descriptor { descriptor, .. } => Some(descriptor.recording_id.0),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&ControlResponse> {
        match self {
            Self::Response(r) => Some(r),
            _ => None,
        }
    }
}

// ── MockImage ───────────────────────────────────────────────────

#[derive(Default)]
struct ImageState {
    fragments: VecDeque<Vec<u8>>,
    closed: bool,
}

/// An inbound control stream fed by the test.
#[derive(Clone, Default)]
pub struct MockImage {
    state: Arc<Mutex<ImageState>>,
}

impl MockImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an encoded request.
    pub fn push_request(&self, request: &ControlRequest) {
        let mut buf = Vec::new();
        if request.encode(&mut buf).is_ok() {
            self.push_raw(buf);
        }
    }

    /// Queue arbitrary bytes as one fragment.
    pub fn push_raw(&self, fragment: Vec<u8>) {
        lock(&self.state).fragments.push_back(fragment);
    }

    /// Fragments not yet polled.
    pub fn pending(&self) -> usize {
        lock(&self.state).fragments.len()
    }

    /// Mark the image closed, as when the client goes away.
    pub fn close(&self) {
        lock(&self.state).closed = true;
    }

    pub fn boxed(&self) -> Box<dyn Image> {
        Box::new(self.clone())
    }
}

impl Image for MockImage {
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8]), fragment_limit: usize) -> usize {
        let mut polled = 0;
        while polled < fragment_limit {
            // Release the lock before calling out.
            let Some(fragment) = lock(&self.state).fragments.pop_front() else {
                break;
            };
            handler(&fragment);
            polled += 1;
        }
        polled
    }

    fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

// ── MockTransport ───────────────────────────────────────────────

#[derive(Default)]
struct TransportState {
    images: VecDeque<MockImage>,
    publications: HashMap<(String, i32), MockPublication>,
    rejected_channels: Vec<String>,
    max_payload_length: Option<usize>,
}

/// A transport whose control images and publications are mocks.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload ceiling given to every publication created from now on.
    pub fn set_max_payload_length(&self, max: usize) {
        lock(&self.state).max_payload_length = Some(max);
    }

    /// A new client connects; returns the image to feed its requests into.
    pub fn connect_client(&self) -> MockImage {
        let image = MockImage::new();
        lock(&self.state).images.push_back(image.clone());
        image
    }

    /// Make `add_publication` fail for this channel.
    pub fn reject_channel(&self, channel: impl Into<String>) {
        lock(&self.state).rejected_channels.push(channel.into());
    }

    /// The publication created for this channel and stream, if any.
    pub fn publication(&self, channel: &str, stream_id: i32) -> Option<MockPublication> {
        lock(&self.state)
            .publications
            .get(&(channel.to_string(), stream_id))
            .cloned()
    }

    pub fn boxed(&self) -> Box<dyn Transport> {
        Box::new(self.clone())
    }
}

impl Transport for MockTransport {
    fn add_publication(
        &mut self,
        channel: &str,
        stream_id: i32,
    ) -> Result<Box<dyn Publication>, TransportError> {
        let mut state = lock(&self.state);
        if state.rejected_channels.iter().any(|c| c == channel) {
            return Err(TransportError::InvalidChannel {
                channel: channel.to_string(),
                reason: "rejected by test".to_string(),
            });
        }
        let publication = MockPublication::new(channel, stream_id);
        if let Some(max) = state.max_payload_length {
            publication.set_max_payload_length(max);
        }
        state
            .publications
            .insert((channel.to_string(), stream_id), publication.clone());
        Ok(Box::new(publication))
    }

    fn poll_control_image(&mut self) -> Option<Box<dyn Image>> {
        lock(&self.state)
            .images
            .pop_front()
            .map(|image| Box::new(image) as Box<dyn Image>)
    }
}

// ── MockDataPlane ───────────────────────────────────────────────

/// A call the archive made into the data plane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataPlaneCall {
    StartRecording {
        channel: String,
        stream_id: i32,
        source: SourceLocation,
    },
    StopRecording {
        channel: String,
        stream_id: i32,
    },
    StartReplay {
        recording_id: u64,
        position: i64,
        length: i64,
        replay_channel: String,
        replay_stream_id: i32,
    },
}

#[derive(Default)]
struct DataPlaneState {
    calls: Vec<DataPlaneCall>,
    failure: Option<DataPlaneError>,
    next_replay_id: i64,
}

/// Records every data-plane call; optionally fails them all.
#[derive(Clone, Default)]
pub struct MockDataPlane {
    state: Arc<Mutex<DataPlaneState>>,
}

impl MockDataPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every call with `reason` until cleared.
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.fail_with_error(DataPlaneError::rejected(reason));
    }

    /// Fail every call with `error` until cleared.
    pub fn fail_with_error(&self, error: DataPlaneError) {
        lock(&self.state).failure = Some(error);
    }

    pub fn clear_failure(&self) {
        lock(&self.state).failure = None;
    }

    pub fn calls(&self) -> Vec<DataPlaneCall> {
        lock(&self.state).calls.clone()
    }

    pub fn boxed(&self) -> Box<dyn DataPlane> {
        Box::new(self.clone())
    }

    fn record(&self, call: DataPlaneCall) -> Result<(), DataPlaneError> {
        let mut state = lock(&self.state);
        state.calls.push(call);
        match &state.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl DataPlane for MockDataPlane {
    fn start_recording(
        &mut self,
        channel: &str,
        stream_id: i32,
        source: SourceLocation,
    ) -> Result<(), DataPlaneError> {
        self.record(DataPlaneCall::StartRecording {
            channel: channel.to_string(),
            stream_id,
            source,
        })
    }

    fn stop_recording(&mut self, channel: &str, stream_id: i32) -> Result<(), DataPlaneError> {
        self.record(DataPlaneCall::StopRecording {
            channel: channel.to_string(),
            stream_id,
        })
    }

    fn start_replay(
        &mut self,
        recording: &RecordingDescriptor,
        position: i64,
        length: i64,
        replay_channel: &str,
        replay_stream_id: i32,
    ) -> Result<i64, DataPlaneError> {
        self.record(DataPlaneCall::StartReplay {
            recording_id: recording.recording_id.0,
            position,
            length,
            replay_channel: replay_channel.to_string(),
            replay_stream_id,
        })?;
        let mut state = lock(&self.state);
        let id = state.next_replay_id;
        state.next_replay_id += 1;
        Ok(id)
    }
}

// ── CountingIdleStrategy ────────────────────────────────────────

#[derive(Default)]
struct IdleCounts {
    idles: usize,
    resets: usize,
}

/// An idle strategy that only counts how it was called.
#[derive(Clone, Default)]
pub struct CountingIdleStrategy {
    counts: Arc<Mutex<IdleCounts>>,
}

impl CountingIdleStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idles(&self) -> usize {
        lock(&self.counts).idles
    }

    pub fn resets(&self) -> usize {
        lock(&self.counts).resets
    }

    pub fn boxed(&self) -> Box<dyn IdleStrategy> {
        Box::new(self.clone())
    }
}

impl IdleStrategy for CountingIdleStrategy {
    fn idle(&mut self) {
        lock(&self.counts).idles += 1;
    }

    fn reset(&mut self) {
        lock(&self.counts).resets += 1;
    }
}
