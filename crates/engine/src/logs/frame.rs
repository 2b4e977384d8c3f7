//! Multiplexed log frame codec
//!
//! The container runtime multiplexes a container's stdout and stderr
//! over one connection: each frame is an 8-byte header (stream id, three
//! reserved bytes, big-endian u32 payload length) followed by the
//! payload. The format is fixed by the runtime and reproduced here
//! bit-exactly.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use drydock_ports::{LogFrame, LogFrameStream, StreamKind};

const HEADER_LEN: usize = 8;

const STREAM_STDERR: u8 = 0;
const STREAM_STDOUT: u8 = 1;
// stderr of a container attached to a tty
const STREAM_STDERR_TTY: u8 = 2;

/// Encode one frame. The inverse of the decoder; used by diagnostics
/// and tests that need wire-exact fixtures.
pub fn encode_frame(kind: StreamKind, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(match kind {
        StreamKind::Stderr => STREAM_STDERR,
        StreamKind::Stdout => STREAM_STDOUT,
    });
    out.extend_from_slice(&[0, 0, 0]);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Incremental decoder over any byte stream.
pub struct FrameDecoder<R> {
    reader: R,
}

impl<R: AsyncRead + Send + Unpin + 'static> FrameDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next frame. `None` on a clean end of stream; an end of
    /// stream inside a frame is an error.
    pub async fn next_frame(&mut self) -> io::Result<Option<LogFrame>> {
        let mut header = [0u8; HEADER_LEN];
        let mut filled = 0;

        while filled < HEADER_LEN {
            let n = self.reader.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated frame header",
                ));
            }
            filled += n;
        }

        let kind = match header[0] {
            STREAM_STDOUT => StreamKind::Stdout,
            STREAM_STDERR | STREAM_STDERR_TTY => StreamKind::Stderr,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown stream id {other}"),
                ))
            }
        };

        let length = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let mut payload = vec![0u8; length];
        self.reader.read_exact(&mut payload).await?;

        Ok(Some(LogFrame { kind, payload }))
    }

    /// Turn the decoder into a frame stream that ends after the first
    /// error or at a clean end of input.
    pub fn into_stream(self) -> LogFrameStream {
        Box::pin(futures::stream::unfold(Some(self), |state| async move {
            let mut decoder = state?;
            match decoder.next_frame().await {
                Ok(Some(frame)) => Some((Ok(frame), Some(decoder))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_decodes_frames_bit_exactly() {
        let mut wire = encode_frame(StreamKind::Stdout, b"hello out\n");
        wire.extend(encode_frame(StreamKind::Stderr, b"hello err\n"));

        let mut decoder = FrameDecoder::new(std::io::Cursor::new(wire));

        let first = decoder.next_frame().await.unwrap().unwrap();
        assert_eq!(first.kind, StreamKind::Stdout);
        assert_eq!(first.payload, b"hello out\n");

        let second = decoder.next_frame().await.unwrap().unwrap();
        assert_eq!(second.kind, StreamKind::Stderr);
        assert_eq!(second.payload, b"hello err\n");

        assert!(decoder.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tty_stderr_variant_routes_to_stderr() {
        let mut wire = vec![2u8, 0, 0, 0];
        wire.extend_from_slice(&2u32.to_be_bytes());
        wire.extend_from_slice(b"ab");

        let mut decoder = FrameDecoder::new(std::io::Cursor::new(wire));
        let frame = decoder.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.kind, StreamKind::Stderr);
    }

    #[tokio::test]
    async fn test_unknown_stream_id_is_invalid_data() {
        let mut wire = vec![9u8, 0, 0, 0];
        wire.extend_from_slice(&0u32.to_be_bytes());

        let mut decoder = FrameDecoder::new(std::io::Cursor::new(wire));
        let err = decoder.next_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_truncated_header_and_payload_error() {
        let mut decoder = FrameDecoder::new(std::io::Cursor::new(vec![1u8, 0, 0]));
        let err = decoder.next_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let mut wire = vec![1u8, 0, 0, 0];
        wire.extend_from_slice(&10u32.to_be_bytes());
        wire.extend_from_slice(b"short");

        let mut decoder = FrameDecoder::new(std::io::Cursor::new(wire));
        let err = decoder.next_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_stream_ends_after_error() {
        let wire = vec![9u8, 0, 0, 0, 0, 0, 0, 0];
        let mut stream = FrameDecoder::new(std::io::Cursor::new(wire)).into_stream();

        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_payload_frame() {
        let wire = encode_frame(StreamKind::Stdout, b"");
        let mut decoder = FrameDecoder::new(std::io::Cursor::new(wire));
        let frame = decoder.next_frame().await.unwrap().unwrap();
        assert!(frame.payload.is_empty());
    }
}
