//! Asynchronous recording lifecycle notifications.

use reel_core::RecordingId;

use crate::codec::{
    read_i32_le, read_i64_le, read_u64_le, read_var_str, write_i32_le, write_i64_le,
    write_u64_le, write_var_str,
};
use crate::error::CodecError;
use crate::header::{split_header, template, MessageHeader};

const STARTED_BLOCK_LENGTH: u16 = 24;
const PROGRESS_BLOCK_LENGTH: u16 = 24;
const STOPPED_BLOCK_LENGTH: u16 = 24;

/// A notification published on the recording events channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordingEvent {
    /// A recording was added to the catalog.
    Started {
        /// The new recording.
        recording_id: RecordingId,
        /// Position of the first recorded byte.
        start_position: i64,
        /// Transport session id.
        session_id: i32,
        /// Stream id.
        stream_id: i32,
        /// Channel being recorded.
        channel: String,
        /// Where the data came from.
        source_identity: String,
    },
    /// A live recording advanced.
    Progress {
        /// The recording.
        recording_id: RecordingId,
        /// Position of the first recorded byte.
        start_position: i64,
        /// Current recorded position.
        position: i64,
    },
    /// A recording ended.
    Stopped {
        /// The recording.
        recording_id: RecordingId,
        /// Position of the first recorded byte.
        start_position: i64,
        /// Final position.
        stop_position: i64,
    },
}

impl RecordingEvent {
    /// Recording the event refers to.
    pub fn recording_id(&self) -> RecordingId {
        match self {
            Self::Started { recording_id, .. }
            | Self::Progress { recording_id, .. }
            | Self::Stopped { recording_id, .. } => *recording_id,
        }
    }

    /// Append the complete message to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Self::Started {
                recording_id,
                start_position,
                session_id,
                stream_id,
                channel,
                source_identity,
            } => {
                MessageHeader::new(template::RECORDING_STARTED, STARTED_BLOCK_LENGTH).encode(buf);
                write_u64_le(buf, recording_id.0);
                write_i64_le(buf, *start_position);
                write_i32_le(buf, *session_id);
                write_i32_le(buf, *stream_id);
                write_var_str(buf, "channel", channel)?;
                write_var_str(buf, "sourceIdentity", source_identity)
            }
            Self::Progress {
                recording_id,
                start_position,
                position,
            } => {
                MessageHeader::new(template::RECORDING_PROGRESS, PROGRESS_BLOCK_LENGTH).encode(buf);
                write_u64_le(buf, recording_id.0);
                write_i64_le(buf, *start_position);
                write_i64_le(buf, *position);
                Ok(())
            }
            Self::Stopped {
                recording_id,
                start_position,
                stop_position,
            } => {
                MessageHeader::new(template::RECORDING_STOPPED, STOPPED_BLOCK_LENGTH).encode(buf);
                write_u64_le(buf, recording_id.0);
                write_i64_le(buf, *start_position);
                write_i64_le(buf, *stop_position);
                Ok(())
            }
        }
    }

    /// Decode a complete message, header included.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let (header, mut r) = split_header(buf)?;
        let mut block = header.take_block(&mut r)?;
        let b = &mut block;
        let event = match header.template_id {
            template::RECORDING_STARTED => Self::Started {
                recording_id: RecordingId(read_u64_le(b)?),
                start_position: read_i64_le(b)?,
                session_id: read_i32_le(b)?,
                stream_id: read_i32_le(b)?,
                channel: read_var_str(&mut r, "channel")?.to_string(),
                source_identity: read_var_str(&mut r, "sourceIdentity")?.to_string(),
            },
            template::RECORDING_PROGRESS => Self::Progress {
                recording_id: RecordingId(read_u64_le(b)?),
                start_position: read_i64_le(b)?,
                position: read_i64_le(b)?,
            },
            template::RECORDING_STOPPED => Self::Stopped {
                recording_id: RecordingId(read_u64_le(b)?),
                start_position: read_i64_le(b)?,
                stop_position: read_i64_le(b)?,
            },
            template_id => return Err(CodecError::UnknownTemplate { template_id }),
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_events_decode() {
        let events = [
            RecordingEvent::Started {
                recording_id: RecordingId(4),
                start_position: 0,
                session_id: 8,
                stream_id: 1,
                channel: "aeron:ipc".into(),
                source_identity: "aeron:ipc".into(),
            },
            RecordingEvent::Progress {
                recording_id: RecordingId(4),
                start_position: 0,
                position: 8192,
            },
            RecordingEvent::Stopped {
                recording_id: RecordingId(4),
                start_position: 0,
                stop_position: 16384,
            },
        ];
        for event in events {
            let mut buf = Vec::new();
            event.encode(&mut buf).unwrap();
            let decoded = RecordingEvent::decode(&buf).unwrap();
            assert_eq!(decoded.recording_id(), RecordingId(4));
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn control_message_is_not_an_event() {
        let mut buf = Vec::new();
        crate::control::encode_control_response(
            &mut buf,
            1,
            0,
            crate::control::ControlResponseCode::Ok,
            "",
        )
        .unwrap();
        assert_eq!(
            RecordingEvent::decode(&buf),
            Err(CodecError::UnknownTemplate {
                template_id: template::CONTROL_RESPONSE
            })
        );
    }
}
