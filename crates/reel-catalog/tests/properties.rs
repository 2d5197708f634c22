//! Property tests: id allocation and lookup under arbitrary histories.

use proptest::prelude::*;
use reel_catalog::{Catalog, CatalogOptions, FileSyncLevel};
use reel_core::{ManualClock, NewRecording, RecordingId, NULL_POSITION};
use tempfile::TempDir;

#[derive(Clone, Debug)]
enum Op {
    Add(NewRecording),
    Invalidate(u64),
    Stop { id: u64, extra: i64 },
}

fn arb_recording() -> impl Strategy<Value = NewRecording> {
    (
        0i64..1 << 32,
        any::<i32>(),
        any::<i32>(),
        "[a-z:?=.0-9]{1,40}",
        "[a-zA-Z0-9.:]{0,20}",
    )
        .prop_map(|(start, session_id, stream_id, channel, source)| NewRecording {
            start_position: start,
            stop_position: NULL_POSITION,
            initial_term_id: session_id.wrapping_mul(3),
            segment_file_length: 1 << 20,
            term_buffer_length: 1 << 16,
            mtu_length: 1408,
            session_id,
            stream_id,
            original_channel: format!("{channel}|session-id={session_id}"),
            stripped_channel: channel,
            source_identity: source,
        })
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_recording().prop_map(Op::Add),
        1 => (0u64..16).prop_map(Op::Invalidate),
        1 => (0u64..16, 0i64..1 << 20).prop_map(|(id, extra)| Op::Stop { id, extra }),
    ]
}

fn open(dir: &TempDir) -> Catalog {
    Catalog::open(
        dir.path(),
        CatalogOptions {
            entry_length: 512,
            file_sync_level: FileSyncLevel::None,
            ..CatalogOptions::default()
        },
        Box::new(ManualClock::new(1_000)),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ids_strictly_increase_and_lookups_match(ops in prop::collection::vec(arb_op(), 1..24)) {
        let dir = TempDir::new().unwrap();
        let mut catalog = open(&dir);

        // Model: id -> (recording, stop, valid)
        let mut model: Vec<(NewRecording, Option<(i64, i64)>, bool)> = Vec::new();

        for op in ops {
            match op {
                Op::Add(recording) => {
                    let id = catalog.add_new_recording(recording.clone()).unwrap();
                    prop_assert_eq!(id, RecordingId(model.len() as u64));
                    model.push((recording, None, true));
                }
                Op::Invalidate(id) => {
                    let result = catalog.invalidate(RecordingId(id));
                    match model.get_mut(id as usize) {
                        Some(entry) if entry.2 => {
                            prop_assert!(result.is_ok());
                            entry.2 = false;
                        }
                        _ => prop_assert!(result.is_err()),
                    }
                }
                Op::Stop { id, extra } => {
                    let stop_ts = 2_000 + extra;
                    match model.get_mut(id as usize) {
                        Some(entry) if entry.2 => {
                            let stop_position = entry.0.start_position + extra;
                            catalog.update_stop(RecordingId(id), stop_ts, stop_position).unwrap();
                            entry.1 = Some((stop_ts, stop_position));
                        }
                        _ => prop_assert!(catalog.update_stop(RecordingId(id), stop_ts, 0).is_err()),
                    }
                }
            }
        }

        prop_assert_eq!(catalog.next_recording_id(), RecordingId(model.len() as u64));

        // Reopen so the checks cover recovery as well as the live mirror.
        drop(catalog);
        let catalog = open(&dir);
        prop_assert_eq!(catalog.next_recording_id(), RecordingId(model.len() as u64));

        for (index, (recording, stop, valid)) in model.iter().enumerate() {
            let id = RecordingId(index as u64);
            if !valid {
                prop_assert!(catalog.lookup(id).is_err());
                continue;
            }
            let d = catalog.lookup(id).unwrap();
            prop_assert_eq!(d.recording_id, id);
            prop_assert_eq!(d.start_timestamp, 1_000);
            prop_assert_eq!(d.start_position, recording.start_position);
            prop_assert_eq!(d.session_id, recording.session_id);
            prop_assert_eq!(d.stream_id, recording.stream_id);
            prop_assert_eq!(d.initial_term_id, recording.initial_term_id);
            prop_assert_eq!(&d.stripped_channel, &recording.stripped_channel);
            prop_assert_eq!(&d.original_channel, &recording.original_channel);
            prop_assert_eq!(&d.source_identity, &recording.source_identity);
            match stop {
                Some((ts, pos)) => {
                    prop_assert_eq!(d.stop_timestamp, *ts);
                    prop_assert_eq!(d.stop_position, *pos);
                }
                None => prop_assert!(d.is_active()),
            }
        }

        let live = model.iter().filter(|e| e.2).count() as u64;
        prop_assert_eq!(catalog.count_valid(), live);
    }
}
