//! Server-Sent Events framing for agent backend responses.
//!
//! Lines are split on the raw bytes before any UTF-8 decoding happens. Line
//! terminators are pure ASCII, so a multi-byte character cut across two network
//! chunks is always reassembled before it is decoded, and the output does not
//! depend on chunk boundaries.

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde_json::Value;

use crate::errors::BridgeResult;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental SSE frame splitter.
///
/// Lines end in `\n`, `\r\n` or a lone `\r`, and a blank line closes the frame.
/// Every byte is scanned once, however the input is chunked.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    // Offset in `buffer` up to which no line terminator was found
    scanned: usize,
    // Payloads of the open frame, released at its blank line
    frame: Vec<String>,
    frame_bytes: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and collect the data payloads of every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        let mut line_start = 0;
        loop {
            let Some(offset) = self.buffer[self.scanned..]
                .iter()
                .position(|b| *b == b'\n' || *b == b'\r')
            else {
                self.scanned = self.buffer.len();
                break;
            };
            let line_end = self.scanned + offset;
            let next = self.buffer.get(line_end + 1).copied();
            let terminator_len = match (self.buffer[line_end], next) {
                (b'\r', Some(b'\n')) => 2,
                // A trailing `\r` may be the first half of `\r\n`
                (b'\r', None) => {
                    self.scanned = line_end;
                    break;
                }
                _ => 1,
            };

            let line = &self.buffer[line_start..line_end];
            if line.is_empty() {
                payloads.append(&mut self.frame);
                self.frame_bytes = 0;
            } else {
                if let Some(payload) = data_payload(line) {
                    self.frame.push(payload);
                }
                self.frame_bytes += line_end + terminator_len - line_start;
            }

            line_start = line_end + terminator_len;
            self.scanned = line_start;
        }

        self.buffer.drain(..line_start);
        self.scanned -= line_start;
        payloads
    }

    /// Bytes received that have not yet formed a complete frame
    pub fn pending(&self) -> usize {
        self.frame_bytes + self.buffer.len()
    }
}

/// The significant payload of a `data:` line
fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    line.strip_prefix(DATA_PREFIX)
        .map(str::trim)
        .filter(|data| !data.is_empty() && *data != DONE_SENTINEL)
        .map(String::from)
}

/// Decode a byte stream into the JSON payloads of its SSE frames.
///
/// Payloads that are not valid JSON are dropped with a warning and decoding carries
/// on with the next frame. Transport errors are passed through and end the stream.
/// Bytes left over when the input ends without a final blank line are discarded.
pub fn decode_events<S>(bytes: S) -> impl Stream<Item = BridgeResult<Value>>
where
    S: Stream<Item = BridgeResult<Bytes>>,
{
    async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for payload in decoder.push(&chunk) {
                match serde_json::from_str::<Value>(&payload) {
                    Ok(value) => yield Ok(value),
                    Err(e) => tracing::warn!("Dropping malformed SSE payload {:?}: {}", payload, e),
                }
            }
        }

        if decoder.pending() > 0 {
            tracing::debug!("Discarding {} bytes of incomplete SSE frame", decoder.pending());
        }
    }
}
