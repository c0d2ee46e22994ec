//! SSE encoder.
//!
//! [`encode_event`] frames a single [`Event`] into a buffer; [`EventEncoder`]
//! exposes the same framing as a [`tokio_util::codec::Encoder`], and
//! [`ServerConn`] writes framed events to an [`AsyncWrite`] and flushes after
//! every one of them.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{trace, warn};

use crate::{
    constants::{COLON, LF, SPACE},
    error::SseResult,
    event::Event,
};

/// The keepalive message written for the zero event.
const KEEPALIVE: &[u8] = b":\n\n";

fn put_field(dst: &mut BytesMut, name: &[u8], value: &[u8]) {
    dst.reserve(name.len() + value.len() + 3);
    dst.put_slice(name);
    dst.put_u8(COLON);
    dst.put_u8(SPACE);
    dst.put_slice(value);
    dst.put_u8(LF);
}

/// Appends the wire form of `event` to `dst`.
///
/// The zero event becomes a bare keepalive comment. Otherwise `event`, `id`
/// and `retry` are written when set, followed by one `data:` line per
/// LF-separated segment of the payload and a blank line.
///
/// An empty final segment (a payload that is empty or ends with LF) is written
/// as `data:` without the space, so the decoder restores it exactly. Leading
/// spaces of a segment are kept: ` x` is sent as `data:  x`.
///
/// `event` and `id` must not contain LF; this is not checked.
pub fn encode_event(event: &Event, dst: &mut BytesMut) {
    if event.is_zero() {
        dst.extend_from_slice(KEEPALIVE);
        return;
    }

    if !event.event.is_empty() {
        put_field(dst, b"event", event.event.as_bytes());
    }
    if !event.id.is_empty() {
        put_field(dst, b"id", event.id.as_bytes());
    }
    if event.retry != 0 {
        put_field(dst, b"retry", event.retry.to_string().as_bytes());
    }

    if let Some(data) = event.data.as_deref() {
        let mut segments = data.split(|&b| b == LF).peekable();
        while let Some(segment) = segments.next() {
            if segment.is_empty() && segments.peek().is_none() {
                dst.extend_from_slice(b"data:\n");
            } else {
                put_field(dst, b"data", segment);
            }
        }
    }

    dst.put_u8(LF);
}

/// [`Encoder`] producing SSE frames, for use with
/// [`FramedWrite`](tokio_util::codec::FramedWrite).
#[derive(Clone, Copy, Debug, Default)]
pub struct EventEncoder;

impl EventEncoder {
    /// Create a new encoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<&Event> for EventEncoder {
    type Error = crate::error::SseError;

    fn encode(&mut self, event: &Event, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_event(event, dst);
        Ok(())
    }
}

impl Encoder<Event> for EventEncoder {
    type Error = crate::error::SseError;

    fn encode(&mut self, event: Event, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_event(&event, dst);
        Ok(())
    }
}

/// Writes [`Event`]s to an event stream.
///
/// The transport head (status and `Content-Type`, see
/// [`event_stream_response`](crate::response::event_stream_response)) must be
/// sent before the first event. After a failed [`send`](Self::send) the
/// stream may hold a partial message and must not be used again.
#[derive(Debug)]
pub struct ServerConn<W> {
    writer: W,
    buf: BytesMut,
}

impl<W> ServerConn<W> {
    /// Send events over `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: BytesMut::new(),
        }
    }

    /// Reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the connection, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> ServerConn<W>
where
    W: AsyncWrite + Unpin,
{
    /// Write one event and flush the writer.
    ///
    /// Sending the zero event (`Event::default()`) writes a keepalive. To send
    /// a real event without a payload use `Event::new("")`.
    ///
    /// The flush is attempted even when the write fails.
    ///
    /// # Errors
    ///
    /// Returns [`SseError::Io`](crate::SseError::Io) if writing or flushing
    /// fails.
    pub async fn send(&mut self, event: &Event) -> SseResult<()> {
        self.buf.clear();
        encode_event(event, &mut self.buf);

        let written = self.writer.write_all(&self.buf).await;
        let flushed = self.writer.flush().await;

        written.inspect_err(|e| warn!(error = %e, "SSE event write failed"))?;
        flushed?;
        trace!(len = self.buf.len(), keepalive = event.is_zero(), "SSE event sent");
        Ok(())
    }

    /// Send a keepalive comment.
    ///
    /// # Errors
    ///
    /// Returns [`SseError::Io`](crate::SseError::Io) if writing or flushing
    /// fails.
    pub async fn keepalive(&mut self) -> SseResult<()> {
        self.send(&Event::default()).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        pin::Pin,
        task::{Context, Poll},
    };

    use super::*;
    use crate::error::SseError;

    fn encode(event: &Event) -> BytesMut {
        let mut dst = BytesMut::new();
        encode_event(event, &mut dst);
        dst
    }

    /// Writer recording what was written and how often it was flushed.
    #[derive(Default)]
    struct RecordingWriter {
        written: Vec<u8>,
        flushes: usize,
        fail_writes: bool,
    }

    impl AsyncWrite for RecordingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            if this.fail_writes {
                return Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)));
            }
            this.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.get_mut().flushes += 1;
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn keepalive() {
        assert_eq!(&encode(&Event::default())[..], b":\n\n");
    }

    #[test]
    fn single_fields() {
        assert_eq!(&encode(&Event::default().with_id("a"))[..], b"id: a\n\n");
        assert_eq!(&encode(&Event::default().with_event("a"))[..], b"event: a\n\n");
        assert_eq!(
            &encode(&Event::default().with_retry(1000))[..],
            b"retry: 1000\n\n"
        );
        assert_eq!(
            &encode(&Event::new("message here"))[..],
            b"data: message here\n\n"
        );
    }

    #[test]
    fn multiline_data() {
        assert_eq!(
            &encode(&Event::new("multi\nline\nmessage"))[..],
            b"data: multi\ndata: line\ndata: message\n\n"
        );
        assert_eq!(
            &encode(&Event::new("a\n\nb"))[..],
            b"data: a\ndata: \ndata: b\n\n"
        );
    }

    #[test]
    fn leading_space_is_not_normalised() {
        assert_eq!(
            &encode(&Event::new(" leading space\n second"))[..],
            b"data:  leading space\ndata:  second\n\n"
        );
    }

    #[test]
    fn trailing_newline() {
        assert_eq!(
            &encode(&Event::new("ends in newline\n"))[..],
            b"data: ends in newline\ndata:\n\n"
        );
        assert_eq!(&encode(&Event::new("\n"))[..], b"data: \ndata:\n\n");
    }

    #[test]
    fn empty_data_is_still_sent() {
        assert_eq!(&encode(&Event::new(""))[..], b"data:\n\n");
    }

    #[test]
    fn field_order() {
        let event = Event::new("  leading spaces\nmultiline\nand ends with a newline\n")
            .with_event(" also leading space")
            .with_id(" 4")
            .with_retry(1000);
        assert_eq!(
            &encode(&event)[..],
            &b"event:  also leading space\nid:  4\nretry: 1000\ndata:   leading spaces\ndata: multiline\ndata: and ends with a newline\ndata:\n\n"[..]
        );
    }

    #[test]
    fn codec_encoder() {
        let mut encoder = EventEncoder::new();
        let mut dst = BytesMut::new();
        encoder
            .encode(&Event::default(), &mut dst)
            .expect("encode keepalive");
        encoder
            .encode(Event::new("x").with_id("1"), &mut dst)
            .expect("encode event");
        assert_eq!(&dst[..], b":\n\nid: 1\ndata: x\n\n");
    }

    #[tokio::test]
    async fn send_writes_and_flushes() {
        let mut conn = ServerConn::new(RecordingWriter::default());

        for i in 0..10 {
            conn.keepalive().await.expect("send keepalive");
            assert_eq!(conn.get_ref().flushes, i + 1);
        }
        conn.send(&Event::new("hello")).await.expect("send event");

        let writer = conn.into_inner();
        assert_eq!(writer.flushes, 11);
        assert_eq!(
            writer.written,
            [&b":\n\n".repeat(10)[..], &b"data: hello\n\n"[..]].concat()
        );
    }

    #[tokio::test]
    async fn send_flushes_even_on_failure() {
        let mut conn = ServerConn::new(RecordingWriter {
            fail_writes: true,
            ..Default::default()
        });

        let err = conn
            .send(&Event::new("lost"))
            .await
            .expect_err("write should fail");
        assert!(matches!(err, SseError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(conn.get_ref().flushes, 1);
    }
}
