//! Decoder for `application/vnd.amazon.eventstream` responses.
//!
//! Each frame is a 12-byte prelude (total length, headers length, prelude
//! CRC), typed headers, the payload and a trailing message CRC. Both
//! checksums are CRC-32; a mismatch fails the stream.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt};
use gateway_core::{is_retryable_status, GatewayError, GatewayResult, ProviderKind};
use serde::Deserialize;
use std::collections::HashMap;

const PRELUDE_LEN: usize = 12;
const CRC_LEN: usize = 4;

/// Frames larger than this are rejected as corrupt
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Typed header value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Boolean
    Bool(bool),
    /// Signed 8-bit integer
    Byte(i8),
    /// Signed 16-bit integer
    Short(i16),
    /// Signed 32-bit integer
    Int(i32),
    /// Signed 64-bit integer
    Long(i64),
    /// Raw bytes
    Bytes(Bytes),
    /// UTF-8 string
    String(String),
    /// Milliseconds since the epoch
    Timestamp(i64),
    /// UUID bytes
    Uuid([u8; 16]),
}

impl HeaderValue {
    /// String value, if this is a string header
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

/// One decoded frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventMessage {
    /// Headers by name
    pub headers: HashMap<String, HeaderValue>,
    /// Raw payload
    pub payload: Bytes,
}

impl EventMessage {
    /// String header by name
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(HeaderValue::as_str)
    }
}

/// Incremental frame decoder
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: BytesMut,
}

fn corrupt(message: impl Into<String>) -> GatewayError {
    GatewayError::streaming(format!("Malformed event stream: {}", message.into()))
}

fn take<'a>(cursor: &mut &'a [u8], len: usize) -> GatewayResult<&'a [u8]> {
    if cursor.len() < len {
        return Err(corrupt("truncated header"));
    }
    let (head, tail) = cursor.split_at(len);
    *cursor = tail;
    Ok(head)
}

fn take_array<const N: usize>(cursor: &mut &[u8]) -> GatewayResult<[u8; N]> {
    let mut array = [0_u8; N];
    array.copy_from_slice(take(cursor, N)?);
    Ok(array)
}

/// Big-endian CRC stored in the four bytes before `end`
fn crc_at(buffer: &[u8], end: usize) -> u32 {
    let mut crc = [0_u8; CRC_LEN];
    crc.copy_from_slice(&buffer[end - CRC_LEN..end]);
    u32::from_be_bytes(crc)
}

fn parse_headers(mut cursor: &[u8]) -> GatewayResult<HashMap<String, HeaderValue>> {
    let mut headers = HashMap::new();
    while !cursor.is_empty() {
        let name_len = usize::from(take_array::<1>(&mut cursor)?[0]);
        let name = String::from_utf8_lossy(take(&mut cursor, name_len)?).into_owned();
        let value_type = take_array::<1>(&mut cursor)?[0];
        let value = match value_type {
            0 => HeaderValue::Bool(true),
            1 => HeaderValue::Bool(false),
            2 => HeaderValue::Byte(i8::from_be_bytes(take_array(&mut cursor)?)),
            3 => HeaderValue::Short(i16::from_be_bytes(take_array(&mut cursor)?)),
            4 => HeaderValue::Int(i32::from_be_bytes(take_array(&mut cursor)?)),
            5 => HeaderValue::Long(i64::from_be_bytes(take_array(&mut cursor)?)),
            6 | 7 => {
                let len = usize::from(u16::from_be_bytes(take_array(&mut cursor)?));
                let raw = take(&mut cursor, len)?;
                if value_type == 6 {
                    HeaderValue::Bytes(Bytes::copy_from_slice(raw))
                } else {
                    HeaderValue::String(String::from_utf8_lossy(raw).into_owned())
                }
            }
            8 => HeaderValue::Timestamp(i64::from_be_bytes(take_array(&mut cursor)?)),
            9 => HeaderValue::Uuid(take_array(&mut cursor)?),
            other => return Err(corrupt(format!("unknown header type {other}"))),
        };
        headers.insert(name, value);
    }
    Ok(headers)
}

impl EventStreamDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Whether undecoded bytes remain
    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Next complete frame, or `None` if more bytes are needed
    pub fn next_message(&mut self) -> GatewayResult<Option<EventMessage>> {
        if self.buffer.len() < PRELUDE_LEN {
            return Ok(None);
        }

        let mut prelude = &self.buffer[..PRELUDE_LEN];
        let total_len = prelude.get_u32() as usize;
        let headers_len = prelude.get_u32() as usize;

        if total_len > MAX_FRAME_LEN || total_len < PRELUDE_LEN + headers_len + CRC_LEN {
            return Err(corrupt(format!(
                "invalid frame lengths (total {total_len}, headers {headers_len})"
            )));
        }
        let prelude_crc = crc_at(&self.buffer, PRELUDE_LEN);
        if crc32fast::hash(&self.buffer[..PRELUDE_LEN - CRC_LEN]) != prelude_crc {
            return Err(corrupt("prelude checksum mismatch"));
        }
        if self.buffer.len() < total_len {
            return Ok(None);
        }
        if crc32fast::hash(&self.buffer[..total_len - CRC_LEN]) != crc_at(&self.buffer, total_len) {
            return Err(corrupt("message checksum mismatch"));
        }

        let frame = self.buffer.split_to(total_len).freeze();
        let headers_end = PRELUDE_LEN + headers_len;
        let headers = parse_headers(&frame[PRELUDE_LEN..headers_end])?;
        let payload = frame.slice(headers_end..total_len - CRC_LEN);

        Ok(Some(EventMessage { headers, payload }))
    }
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    bytes: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExceptionPayload {
    message: Option<String>,
    #[serde(rename = "Message")]
    message_upper: Option<String>,
}

fn exception_status(exception_type: &str) -> u16 {
    match exception_type {
        "throttlingException" => 429,
        "serviceUnavailableException" => 503,
        "internalServerException" | "modelStreamErrorException" => 500,
        "modelTimeoutException" => 408,
        "accessDeniedException" => 403,
        "resourceNotFoundException" => 404,
        _ => 400,
    }
}

/// Model payload carried by a frame.
///
/// `chunk` events yield their base64-decoded JSON; other events yield `None`;
/// exceptions become provider errors.
pub fn chunk_payload(message: &EventMessage) -> GatewayResult<Option<Bytes>> {
    match message.header_str(":message-type") {
        Some("event") => {
            if message.header_str(":event-type") != Some("chunk") {
                return Ok(None);
            }
            let chunk: ChunkPayload = serde_json::from_slice(&message.payload)
                .map_err(|e| corrupt(format!("chunk payload is not JSON: {e}")))?;
            let decoded = STANDARD
                .decode(chunk.bytes.as_bytes())
                .map_err(|e| corrupt(format!("chunk bytes are not base64: {e}")))?;
            Ok(Some(Bytes::from(decoded)))
        }
        Some("exception") => {
            let exception_type = message.header_str(":exception-type").unwrap_or("exception");
            let payload: ExceptionPayload =
                serde_json::from_slice(&message.payload).unwrap_or_default();
            let detail = payload
                .message
                .or(payload.message_upper)
                .unwrap_or_else(|| String::from_utf8_lossy(&message.payload).into_owned());
            let status = exception_status(exception_type);
            Err(GatewayError::provider(
                ProviderKind::AwsBedrock.display_name(),
                format!("{exception_type}: {detail}"),
                Some(status),
                is_retryable_status(status),
            ))
        }
        Some("error") => {
            let code = message.header_str(":error-code").unwrap_or("error");
            let detail = message.header_str(":error-message").unwrap_or_default();
            Err(GatewayError::provider(
                ProviderKind::AwsBedrock.display_name(),
                format!("{code}: {detail}"),
                None,
                false,
            ))
        }
        other => Err(corrupt(format!("unexpected message type {other:?}"))),
    }
}

/// Turn a raw response body into a stream of chunk payloads.
///
/// The stream ends after the first error.
pub fn decode_chunks<S>(body: S) -> BoxStream<'static, GatewayResult<Bytes>>
where
    S: Stream<Item = GatewayResult<Bytes>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = EventStreamDecoder::new();
        while let Some(data) = body.next().await {
            match data {
                Ok(data) => decoder.push(&data),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
            loop {
                match decoder.next_message().and_then(|message| match message {
                    Some(message) => chunk_payload(&message).map(Some),
                    None => Ok(None),
                }) {
                    Ok(Some(Some(payload))) => {
                        yield Ok(payload);
                    }
                    Ok(Some(None)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
        if decoder.has_remaining() {
            yield Err(GatewayError::streaming("event stream ended mid-frame"));
        }
    };
    stream.boxed()
}
