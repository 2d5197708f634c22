//! Reel archive over the in-process transport.
//!
//! Demonstrates:
//!   1. Launching an `ArchiveConductor` on a fresh catalog
//!   2. Connecting a control client and reading its responses
//!   3. Starting recordings, with a toy data plane reporting their lifecycle
//!   4. Listing the catalog in MTU-bounded batches
//!   5. Requesting a replay and reading recording events
//!
//! The conductor is driven from the main thread here so the output is
//! deterministic; `ArchiveRunner` moves it onto its own thread instead.
//!
//! Run with:
//!   cargo run -p reel-archive --example local_archive

use std::error::Error;
use std::sync::{Arc, Mutex};

use reel_archive::{ArchiveConductor, ArchiveConfig, EventsChannel, LocalImage, LocalTransport};
use reel_codec::{ControlRequest, ControlResponseCode};
use reel_core::{
    DataPlane, DataPlaneError, NewRecording, RecordingDescriptor, SourceLocation, SystemEpochClock, NULL_POSITION,
};
use reel_test_utils::SentMessage;

const CONTROL_RESPONSE_CHANNEL: &str = "aeron:udp?endpoint=localhost:8020";
const CONTROL_RESPONSE_STREAM: i32 = 20;
const EVENTS_CHANNEL: &str = "aeron:udp?endpoint=localhost:8030";
const EVENTS_STREAM: i32 = 30;

// ─── A toy data plane ───────────────────────────────────────────
//
// Remembers which streams it was asked to record so that main() can
// play the part of the recorder and report their lifecycle back.

#[derive(Clone, Default)]
struct ToyDataPlane {
    started: Arc<Mutex<Vec<(String, i32)>>>,
    next_replay: Arc<Mutex<i64>>,
}

impl DataPlane for ToyDataPlane {
    fn start_recording(
        &mut self,
        channel: &str,
        stream_id: i32,
        _source: SourceLocation,
    ) -> Result<(), DataPlaneError> {
        self.started
            .lock()
            .map_err(|_| DataPlaneError::Closed)?
            .push((channel.to_string(), stream_id));
        Ok(())
    }

    fn stop_recording(&mut self, _channel: &str, _stream_id: i32) -> Result<(), DataPlaneError> {
        Ok(())
    }

    fn start_replay(
        &mut self,
        recording: &RecordingDescriptor,
        position: i64,
        length: i64,
        replay_channel: &str,
        replay_stream_id: i32,
    ) -> Result<i64, DataPlaneError> {
        println!(
            "  data plane: replay recording {} [{position}, {}) -> {replay_channel} stream {replay_stream_id}",
            recording.recording_id,
            position + length
        );
        let mut next = self.next_replay.lock().map_err(|_| DataPlaneError::Closed)?;
        *next += 1;
        Ok(*next)
    }
}

/// Drive the conductor until the client has a reply waiting.
fn await_reply(conductor: &mut ArchiveConductor, responses: &mut LocalImage) -> SentMessage {
    loop {
        conductor.do_work();
        if let Some(frame) = responses.try_recv() {
            return SentMessage::decode(&frame);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let dir = tempfile::tempdir()?;
    let transport = LocalTransport::new(256).with_max_payload_length(512);
    let data_plane = ToyDataPlane::default();

    let config = ArchiveConfig {
        archive_dir: dir.path().to_path_buf(),
        recording_events: Some(EventsChannel {
            channel: EVENTS_CHANNEL.into(),
            stream_id: EVENTS_STREAM,
        }),
        ..ArchiveConfig::default()
    };
    let mut events = transport.subscribe(EVENTS_CHANNEL, EVENTS_STREAM);
    let mut conductor = ArchiveConductor::launch(
        config,
        Box::new(transport.clone()),
        Box::new(data_plane.clone()),
        SystemEpochClock,
    )?;

    // ── Connect ──
    let mut responses = transport.subscribe(CONTROL_RESPONSE_CHANNEL, CONTROL_RESPONSE_STREAM);
    let mut client = transport.connect_control();
    client.send(&ControlRequest::Connect {
        correlation_id: 1,
        response_stream_id: CONTROL_RESPONSE_STREAM,
        response_channel: CONTROL_RESPONSE_CHANNEL.into(),
    })?;
    if let SentMessage::Response(r) = await_reply(&mut conductor, &mut responses) {
        println!("connected: control session {}", r.relevant_id);
    }

    // ── Start recordings ──
    let streams = [
        ("aeron:udp?endpoint=localhost:40123|session-id=6", 1),
        ("aeron:udp?endpoint=localhost:40124", 1),
        ("aeron:ipc?tag=7", 2),
    ];
    for (i, (channel, stream_id)) in streams.iter().enumerate() {
        client.send(&ControlRequest::StartRecording {
            correlation_id: 10 + i as i64,
            stream_id: *stream_id,
            source_location: SourceLocation::Local,
            channel: (*channel).into(),
        })?;
        let reply = await_reply(&mut conductor, &mut responses);
        println!("start recording {channel}: {reply:?}");
    }

    // Play the recorder: each started stream becomes a recording.
    let started = std::mem::take(&mut *data_plane.started.lock().map_err(|e| e.to_string())?);
    for (session_id, (channel, stream_id)) in started.into_iter().enumerate() {
        let id = conductor.on_recording_started(NewRecording {
            start_position: 0,
            stop_position: NULL_POSITION,
            initial_term_id: 0,
            segment_file_length: 128 * 1024 * 1024,
            term_buffer_length: 64 * 1024,
            mtu_length: 1408,
            session_id: session_id as i32,
            stream_id,
            stripped_channel: reel_core::strip_channel(&channel),
            original_channel: channel,
            source_identity: "127.0.0.1:40000".into(),
        })?;
        conductor.on_recording_progress(id, 64 * 1024)?;
        conductor.on_recording_stopped(id, 128 * 1024)?;
    }

    // ── List ──
    client.send(&ControlRequest::ListRecordings {
        correlation_id: 20,
        from_recording_id: 0,
        record_count: 10,
    })?;
    loop {
        match await_reply(&mut conductor, &mut responses) {
            SentMessage::Descriptor { descriptor, .. } => println!(
                "  recording {}: {} stream {} [{}, {}]",
                descriptor.recording_id,
                descriptor.stripped_channel,
                descriptor.stream_id,
                descriptor.start_position,
                descriptor.stop_position
            ),
            SentMessage::Response(r) if r.code == ControlResponseCode::RecordingUnknown => {
                println!("listing complete, next recording id {}", r.relevant_id);
                break;
            }
            other => println!("unexpected: {other:?}"),
        }
    }

    // ── Replay ──
    client.send(&ControlRequest::Replay {
        correlation_id: 30,
        recording_id: 1,
        position: 0,
        length: 4096,
        replay_stream_id: 40,
        replay_channel: "aeron:udp?endpoint=localhost:8040".into(),
    })?;
    if let SentMessage::Response(r) = await_reply(&mut conductor, &mut responses) {
        println!("replay: {:?} session {}", r.code, r.relevant_id);
    }

    // ── Events ──
    let mut event_count = 0;
    while let Some(frame) = events.try_recv() {
        if let SentMessage::Event(event) = SentMessage::decode(&frame) {
            println!("  event: {event:?}");
            event_count += 1;
        }
    }
    println!("{event_count} recording events");

    println!("{:#?}", conductor.metrics());
    conductor.close()?;
    Ok(())
}
