//! Client control requests and the archive's control response.

use reel_core::SourceLocation;

use crate::codec::{
    read_i32_le, read_i64_le, read_u64_le, read_u8, read_var_str, var_str_length, write_i32_le,
    write_i64_le, write_u64_le, write_u8, write_var_str,
};
use crate::error::CodecError;
use crate::header::{split_header, template, MessageHeader};

const CONNECT_BLOCK_LENGTH: u16 = 12;
const CLOSE_SESSION_BLOCK_LENGTH: u16 = 8;
const START_RECORDING_BLOCK_LENGTH: u16 = 13;
const STOP_RECORDING_BLOCK_LENGTH: u16 = 12;
const REPLAY_BLOCK_LENGTH: u16 = 36;
const LIST_RECORDINGS_BLOCK_LENGTH: u16 = 20;
const LIST_RECORDINGS_FOR_URI_BLOCK_LENGTH: u16 = 24;
const CONTROL_RESPONSE_BLOCK_LENGTH: u16 = 20;

// ── ControlResponseCode ─────────────────────────────────────────

/// Outcome carried by a [`ControlResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlResponseCode {
    /// The request succeeded.
    Ok,
    /// The request failed; `error_message` says why.
    Error,
    /// The request named a recording the catalog does not hold;
    /// `relevant_id` is that recording id.
    RecordingUnknown,
}

impl ControlResponseCode {
    /// Wire value.
    pub fn value(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::RecordingUnknown => 2,
        }
    }

    /// Parse a wire value.
    pub fn from_value(value: i32) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Error),
            2 => Ok(Self::RecordingUnknown),
            other => Err(CodecError::UnknownEnumValue {
                field: "code",
                value: other as i64,
            }),
        }
    }
}

fn source_location_value(location: SourceLocation) -> u8 {
    match location {
        SourceLocation::Local => 0,
        SourceLocation::Remote => 1,
    }
}

fn source_location_from_value(value: u8) -> Result<SourceLocation, CodecError> {
    match value {
        0 => Ok(SourceLocation::Local),
        1 => Ok(SourceLocation::Remote),
        other => Err(CodecError::UnknownEnumValue {
            field: "sourceLocation",
            value: other as i64,
        }),
    }
}

// ── ControlResponse ─────────────────────────────────────────────

/// Append a complete `ControlResponse` message to `buf`.
///
/// An empty `error_message` is encoded as a zero-length field.
pub fn encode_control_response(
    buf: &mut Vec<u8>,
    correlation_id: i64,
    relevant_id: i64,
    code: ControlResponseCode,
    error_message: &str,
) -> Result<(), CodecError> {
    MessageHeader::new(template::CONTROL_RESPONSE, CONTROL_RESPONSE_BLOCK_LENGTH).encode(buf);
    write_i64_le(buf, correlation_id);
    write_i64_le(buf, relevant_id);
    write_i32_le(buf, code.value());
    write_var_str(buf, "errorMessage", error_message)
}

/// A decoded `ControlResponse`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlResponse {
    /// Echo of the request's correlation id.
    pub correlation_id: i64,
    /// Id the response refers to (session, recording, replay), or 0.
    pub relevant_id: i64,
    /// Outcome.
    pub code: ControlResponseCode,
    /// Human-readable error, empty on success.
    pub error_message: String,
}

impl ControlResponse {
    /// Decode a complete message, header included.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let (header, mut r) = split_header(buf)?;
        header.expect_template(template::CONTROL_RESPONSE)?;
        let mut block = header.take_block(&mut r)?;
        Ok(Self {
            correlation_id: read_i64_le(&mut block)?,
            relevant_id: read_i64_le(&mut block)?,
            code: ControlResponseCode::from_value(read_i32_le(&mut block)?)?,
            error_message: read_var_str(&mut r, "errorMessage")?.to_string(),
        })
    }

    /// Append this response to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_control_response(
            buf,
            self.correlation_id,
            self.relevant_id,
            self.code,
            &self.error_message,
        )
    }
}

// ── ControlRequest ──────────────────────────────────────────────

/// A request sent by a client to the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlRequest {
    /// Open a control session, replying on `response_channel`.
    Connect {
        /// Echoed on the connect response.
        correlation_id: i64,
        /// Stream id for replies.
        response_stream_id: i32,
        /// Channel for replies.
        response_channel: String,
    },
    /// Close the named control session.
    CloseSession {
        /// The session to close.
        control_session_id: u64,
    },
    /// Start recording a stream.
    StartRecording {
        /// Echoed on the response.
        correlation_id: i64,
        /// Stream to record.
        stream_id: i32,
        /// Whether the source is local or remote.
        source_location: SourceLocation,
        /// Channel to record.
        channel: String,
    },
    /// Stop recording a stream.
    StopRecording {
        /// Echoed on the response.
        correlation_id: i64,
        /// Stream being recorded.
        stream_id: i32,
        /// Channel being recorded.
        channel: String,
    },
    /// Replay part of a recording.
    Replay {
        /// Echoed on the response.
        correlation_id: i64,
        /// Recording to replay.
        recording_id: u64,
        /// Stream position to start from.
        position: i64,
        /// Bytes to replay.
        length: i64,
        /// Stream id to replay onto.
        replay_stream_id: i32,
        /// Channel to replay onto.
        replay_channel: String,
    },
    /// List up to `record_count` recordings starting at `from_recording_id`.
    ListRecordings {
        /// Echoed on every descriptor and on the terminal response.
        correlation_id: i64,
        /// First id to consider.
        from_recording_id: u64,
        /// Maximum descriptors to send.
        record_count: i32,
    },
    /// Like [`ListRecordings`](Self::ListRecordings), restricted to one
    /// channel and stream.
    ListRecordingsForUri {
        /// Echoed on every descriptor and on the terminal response.
        correlation_id: i64,
        /// First id to consider.
        from_recording_id: u64,
        /// Maximum matching descriptors to send.
        record_count: i32,
        /// Stream id that must match exactly.
        stream_id: i32,
        /// Channel that must match the stripped channel exactly.
        channel: String,
    },
}

impl ControlRequest {
    /// Correlation id of the request, if it carries one.
    pub fn correlation_id(&self) -> Option<i64> {
        match self {
            Self::Connect { correlation_id, .. }
            | Self::StartRecording { correlation_id, .. }
            | Self::StopRecording { correlation_id, .. }
            | Self::Replay { correlation_id, .. }
            | Self::ListRecordings { correlation_id, .. }
            | Self::ListRecordingsForUri { correlation_id, .. } => Some(*correlation_id),
            Self::CloseSession { .. } => None,
        }
    }

    /// Template id this request encodes as.
    pub fn template_id(&self) -> u16 {
        match self {
            Self::Connect { .. } => template::CONNECT_REQUEST,
            Self::CloseSession { .. } => template::CLOSE_SESSION_REQUEST,
            Self::StartRecording { .. } => template::START_RECORDING_REQUEST,
            Self::StopRecording { .. } => template::STOP_RECORDING_REQUEST,
            Self::Replay { .. } => template::REPLAY_REQUEST,
            Self::ListRecordings { .. } => template::LIST_RECORDINGS_REQUEST,
            Self::ListRecordingsForUri { .. } => template::LIST_RECORDINGS_FOR_URI_REQUEST,
        }
    }

    /// Encoded size of the whole message, header included.
    pub fn encoded_length(&self) -> usize {
        let (block, vars) = match self {
            Self::Connect {
                response_channel, ..
            } => (CONNECT_BLOCK_LENGTH, var_str_length(response_channel)),
            Self::CloseSession { .. } => (CLOSE_SESSION_BLOCK_LENGTH, 0),
            Self::StartRecording { channel, .. } => {
                (START_RECORDING_BLOCK_LENGTH, var_str_length(channel))
            }
            Self::StopRecording { channel, .. } => {
                (STOP_RECORDING_BLOCK_LENGTH, var_str_length(channel))
            }
            Self::Replay { replay_channel, .. } => {
                (REPLAY_BLOCK_LENGTH, var_str_length(replay_channel))
            }
            Self::ListRecordings { .. } => (LIST_RECORDINGS_BLOCK_LENGTH, 0),
            Self::ListRecordingsForUri { channel, .. } => {
                (LIST_RECORDINGS_FOR_URI_BLOCK_LENGTH, var_str_length(channel))
            }
        };
        MessageHeader::ENCODED_LENGTH + block as usize + vars
    }

    /// Append the complete message to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Self::Connect {
                correlation_id,
                response_stream_id,
                response_channel,
            } => {
                MessageHeader::new(template::CONNECT_REQUEST, CONNECT_BLOCK_LENGTH).encode(buf);
                write_i64_le(buf, *correlation_id);
                write_i32_le(buf, *response_stream_id);
                write_var_str(buf, "responseChannel", response_channel)
            }
            Self::CloseSession { control_session_id } => {
                MessageHeader::new(template::CLOSE_SESSION_REQUEST, CLOSE_SESSION_BLOCK_LENGTH)
                    .encode(buf);
                write_u64_le(buf, *control_session_id);
                Ok(())
            }
            Self::StartRecording {
                correlation_id,
                stream_id,
                source_location,
                channel,
            } => {
                MessageHeader::new(template::START_RECORDING_REQUEST, START_RECORDING_BLOCK_LENGTH)
                    .encode(buf);
                write_i64_le(buf, *correlation_id);
                write_i32_le(buf, *stream_id);
                write_u8(buf, source_location_value(*source_location));
                write_var_str(buf, "channel", channel)
            }
            Self::StopRecording {
                correlation_id,
                stream_id,
                channel,
            } => {
                MessageHeader::new(template::STOP_RECORDING_REQUEST, STOP_RECORDING_BLOCK_LENGTH)
                    .encode(buf);
                write_i64_le(buf, *correlation_id);
                write_i32_le(buf, *stream_id);
                write_var_str(buf, "channel", channel)
            }
            Self::Replay {
                correlation_id,
                recording_id,
                position,
                length,
                replay_stream_id,
                replay_channel,
            } => {
                MessageHeader::new(template::REPLAY_REQUEST, REPLAY_BLOCK_LENGTH).encode(buf);
                write_i64_le(buf, *correlation_id);
                write_u64_le(buf, *recording_id);
                write_i64_le(buf, *position);
                write_i64_le(buf, *length);
                write_i32_le(buf, *replay_stream_id);
                write_var_str(buf, "replayChannel", replay_channel)
            }
            Self::ListRecordings {
                correlation_id,
                from_recording_id,
                record_count,
            } => {
                MessageHeader::new(template::LIST_RECORDINGS_REQUEST, LIST_RECORDINGS_BLOCK_LENGTH)
                    .encode(buf);
                write_i64_le(buf, *correlation_id);
                write_u64_le(buf, *from_recording_id);
                write_i32_le(buf, *record_count);
                Ok(())
            }
            Self::ListRecordingsForUri {
                correlation_id,
                from_recording_id,
                record_count,
                stream_id,
                channel,
            } => {
                MessageHeader::new(
                    template::LIST_RECORDINGS_FOR_URI_REQUEST,
                    LIST_RECORDINGS_FOR_URI_BLOCK_LENGTH,
                )
                .encode(buf);
                write_i64_le(buf, *correlation_id);
                write_u64_le(buf, *from_recording_id);
                write_i32_le(buf, *record_count);
                write_i32_le(buf, *stream_id);
                write_var_str(buf, "channel", channel)
            }
        }
    }

    /// Decode a complete message, header included.
    ///
    /// The fixed block is located with the header's `block_length`, so
    /// trailing fields added by a newer schema version are skipped.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let (header, mut r) = split_header(buf)?;
        let mut block = header.take_block(&mut r)?;
        let b = &mut block;
        let request = match header.template_id {
            template::CONNECT_REQUEST => Self::Connect {
                correlation_id: read_i64_le(b)?,
                response_stream_id: read_i32_le(b)?,
                response_channel: read_var_str(&mut r, "responseChannel")?.to_string(),
            },
            template::CLOSE_SESSION_REQUEST => Self::CloseSession {
                control_session_id: read_u64_le(b)?,
            },
            template::START_RECORDING_REQUEST => Self::StartRecording {
                correlation_id: read_i64_le(b)?,
                stream_id: read_i32_le(b)?,
                source_location: source_location_from_value(read_u8(b)?)?,
                channel: read_var_str(&mut r, "channel")?.to_string(),
            },
            template::STOP_RECORDING_REQUEST => Self::StopRecording {
                correlation_id: read_i64_le(b)?,
                stream_id: read_i32_le(b)?,
                channel: read_var_str(&mut r, "channel")?.to_string(),
            },
            template::REPLAY_REQUEST => Self::Replay {
                correlation_id: read_i64_le(b)?,
                recording_id: read_u64_le(b)?,
                position: read_i64_le(b)?,
                length: read_i64_le(b)?,
                replay_stream_id: read_i32_le(b)?,
                replay_channel: read_var_str(&mut r, "replayChannel")?.to_string(),
            },
            template::LIST_RECORDINGS_REQUEST => Self::ListRecordings {
                correlation_id: read_i64_le(b)?,
                from_recording_id: read_u64_le(b)?,
                record_count: read_i32_le(b)?,
            },
            template::LIST_RECORDINGS_FOR_URI_REQUEST => Self::ListRecordingsForUri {
                correlation_id: read_i64_le(b)?,
                from_recording_id: read_u64_le(b)?,
                record_count: read_i32_le(b)?,
                stream_id: read_i32_le(b)?,
                channel: read_var_str(&mut r, "channel")?.to_string(),
            },
            template_id => return Err(CodecError::UnknownTemplate { template_id }),
        };
        Ok(request)
    }
}

/// Best-effort extraction of a request's correlation id from raw bytes.
///
/// Lets the archive answer a request it could not fully decode. Returns
/// `None` for foreign schemas, unknown templates, requests without a
/// correlation id, or blocks too short to hold one.
pub fn peek_correlation_id(buf: &[u8]) -> Option<i64> {
    let (header, mut r) = split_header(buf).ok()?;
    match header.template_id {
        template::CONNECT_REQUEST
        | template::START_RECORDING_REQUEST
        | template::STOP_RECORDING_REQUEST
        | template::REPLAY_REQUEST
        | template::LIST_RECORDINGS_REQUEST
        | template::LIST_RECORDINGS_FOR_URI_REQUEST => read_i64_le(&mut r).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::SCHEMA_ID;

    fn all_requests() -> Vec<ControlRequest> {
        vec![
            ControlRequest::Connect {
                correlation_id: 1,
                response_stream_id: 20,
                response_channel: "aeron:udp?endpoint=localhost:8020".into(),
            },
            ControlRequest::CloseSession {
                control_session_id: 9,
            },
            ControlRequest::StartRecording {
                correlation_id: 2,
                stream_id: 33,
                source_location: SourceLocation::Remote,
                channel: "aeron:udp?endpoint=localhost:40123".into(),
            },
            ControlRequest::StopRecording {
                correlation_id: 3,
                stream_id: 33,
                channel: "aeron:udp?endpoint=localhost:40123".into(),
            },
            ControlRequest::Replay {
                correlation_id: 4,
                recording_id: 12,
                position: 1024,
                length: 4096,
                replay_stream_id: 44,
                replay_channel: "aeron:ipc".into(),
            },
            ControlRequest::ListRecordings {
                correlation_id: 5,
                from_recording_id: 0,
                record_count: 100,
            },
            ControlRequest::ListRecordingsForUri {
                correlation_id: 6,
                from_recording_id: 3,
                record_count: 2,
                stream_id: 1,
                channel: "channel".into(),
            },
        ]
    }

    #[test]
    fn every_request_decodes_to_itself() {
        for request in all_requests() {
            let mut buf = Vec::new();
            request.encode(&mut buf).unwrap();
            assert_eq!(buf.len(), request.encoded_length(), "{request:?}");
            assert_eq!(ControlRequest::decode(&buf).unwrap(), request);
            assert_eq!(peek_correlation_id(&buf), request.correlation_id());
        }
    }

    #[test]
    fn newer_version_with_longer_block_still_decodes() {
        let mut buf = Vec::new();
        MessageHeader {
            block_length: LIST_RECORDINGS_BLOCK_LENGTH + 4,
            template_id: template::LIST_RECORDINGS_REQUEST,
            schema_id: SCHEMA_ID,
            version: 2,
        }
        .encode(&mut buf);
        write_i64_le(&mut buf, 77);
        write_u64_le(&mut buf, 5);
        write_i32_le(&mut buf, 10);
        write_i32_le(&mut buf, -1); // field unknown to this version

        assert_eq!(
            ControlRequest::decode(&buf).unwrap(),
            ControlRequest::ListRecordings {
                correlation_id: 77,
                from_recording_id: 5,
                record_count: 10,
            }
        );
    }

    #[test]
    fn truncated_request_keeps_correlation_id() {
        let request = ControlRequest::StartRecording {
            correlation_id: 42,
            stream_id: 1,
            source_location: SourceLocation::Local,
            channel: "aeron:ipc".into(),
        };
        let mut buf = Vec::new();
        request.encode(&mut buf).unwrap();
        buf.truncate(buf.len() - 3);

        assert!(matches!(
            ControlRequest::decode(&buf),
            Err(CodecError::Truncated { .. })
        ));
        assert_eq!(peek_correlation_id(&buf), Some(42));
    }

    #[test]
    fn bad_source_location_rejected() {
        let mut buf = Vec::new();
        ControlRequest::StartRecording {
            correlation_id: 1,
            stream_id: 1,
            source_location: SourceLocation::Local,
            channel: String::new(),
        }
        .encode(&mut buf)
        .unwrap();
        // header(8) + correlationId(8) + streamId(4)
        buf[20] = 9;
        assert_eq!(
            ControlRequest::decode(&buf),
            Err(CodecError::UnknownEnumValue {
                field: "sourceLocation",
                value: 9
            })
        );
    }

    #[test]
    fn unknown_template_rejected() {
        let mut buf = Vec::new();
        MessageHeader::new(77, 0).encode(&mut buf);
        assert_eq!(
            ControlRequest::decode(&buf),
            Err(CodecError::UnknownTemplate { template_id: 77 })
        );
        assert_eq!(peek_correlation_id(&buf), None);
    }

    #[test]
    fn response_with_empty_error_message() {
        let mut buf = Vec::new();
        encode_control_response(&mut buf, 3, 0, ControlResponseCode::Ok, "").unwrap();
        assert_eq!(buf.len(), MessageHeader::ENCODED_LENGTH + 20 + 4);
        let response = ControlResponse::decode(&buf).unwrap();
        assert_eq!(response.code, ControlResponseCode::Ok);
        assert!(response.error_message.is_empty());
    }

    #[test]
    fn response_code_values_are_stable() {
        for code in [
            ControlResponseCode::Ok,
            ControlResponseCode::Error,
            ControlResponseCode::RecordingUnknown,
        ] {
            assert_eq!(ControlResponseCode::from_value(code.value()).unwrap(), code);
        }
        assert!(ControlResponseCode::from_value(3).is_err());
    }

    #[test]
    fn response_decoder_rejects_other_templates() {
        let mut buf = Vec::new();
        all_requests()[0].encode(&mut buf).unwrap();
        assert!(matches!(
            ControlResponse::decode(&buf),
            Err(CodecError::UnexpectedTemplate { .. })
        ));
    }
}
