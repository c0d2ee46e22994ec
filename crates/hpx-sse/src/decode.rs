//! Streaming, byte-level SSE decoder.
//!
//! [`ClientConn`] reads an event stream one line at a time and classifies each
//! line by its first byte. It does not split the stream into lines up front:
//! field names are matched byte by byte against the buffered reader with one
//! byte of lookahead, so `data` values can be copied straight into the event
//! buffer however the line is split across reads.
//!
//! Deviations from the HTML Living Standard:
//!
//! - Only LF terminates a line. A CR before it stays part of the value.
//! - A UTF-8 BOM is skipped after *any* line boundary, not only at the start
//!   of the stream, so the decoder does not need to know its position.
//! - `data` is not required to be UTF-8. `event` and `id` are decoded lossily.

use bytes::{BufMut, BytesMut};
use futures_core::Stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, trace, warn};

use crate::{
    config::DecoderConfig,
    constants::{
        BOM, COLON, DATA_REST, EVENT_REST, ID_REST, LF, RETRY_REST, SPACE, VALUE_RETAIN_CAPACITY,
    },
    error::{SseError, SseResult},
    event::Event,
};

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

/// Known field names, keyed by the first byte of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Event,
    Data,
    Id,
    Retry,
}

impl Field {
    fn from_first_byte(byte: u8) -> Option<Self> {
        match byte {
            b'e' => Some(Self::Event),
            b'd' => Some(Self::Data),
            b'i' => Some(Self::Id),
            b'r' => Some(Self::Retry),
            _ => None,
        }
    }

    /// The bytes of the field name after its first byte.
    fn rest(self) -> &'static [u8] {
        match self {
            Self::Event => EVENT_REST,
            Self::Data => DATA_REST,
            Self::Id => ID_REST,
            Self::Retry => RETRY_REST,
        }
    }
}

/// What happened to the line that was just classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    /// Everything up to and including the LF was consumed, or nothing of the
    /// line is left to discard (a skipped BOM, a keepalive boundary).
    Consumed,
    /// The line was not recognised. Whatever is left of it, up to and
    /// including its LF, still has to be discarded.
    Unmatched,
    /// A blank line ended a group that carried data.
    Dispatch,
}

// ---------------------------------------------------------------------------
// EventBuilder
// ---------------------------------------------------------------------------

/// Fields accumulated for the group currently being parsed.
#[derive(Debug, Default)]
struct EventBuilder {
    event: String,
    id: String,
    retry: u64,
    data: Option<BytesMut>,
    /// Caller-provided buffer, moved into `data` on the first `data` line.
    spare: Option<BytesMut>,
}

impl EventBuilder {
    fn new(spare: Option<BytesMut>) -> Self {
        Self {
            spare: spare.map(|mut buf| {
                buf.clear();
                buf
            }),
            ..Default::default()
        }
    }

    fn has_data(&self) -> bool {
        self.data.is_some()
    }

    fn data_mut(&mut self) -> &mut BytesMut {
        self.data
            .get_or_insert_with(|| self.spare.take().unwrap_or_default())
    }

    /// Build the event, dropping the LF appended after the last `data` line.
    fn dispatch(self) -> Event {
        let data = self.data.map(|mut data| {
            if data.last() == Some(&LF) {
                data.truncate(data.len() - 1);
            }
            data
        });

        Event {
            event: self.event,
            data,
            id: self.id,
            retry: self.retry,
        }
    }
}

// ---------------------------------------------------------------------------
// Byte-level helpers
// ---------------------------------------------------------------------------

/// Returns the next byte without consuming it.
async fn peek_byte<R>(reader: &mut R) -> SseResult<u8>
where
    R: AsyncBufRead + Unpin,
{
    let available = reader.fill_buf().await?;
    available.first().copied().ok_or(SseError::StreamEnded)
}

async fn read_byte<R>(reader: &mut R) -> SseResult<u8>
where
    R: AsyncBufRead + Unpin,
{
    let byte = peek_byte(reader).await?;
    reader.consume(1);
    Ok(byte)
}

/// Matches `rest` followed by `:` and an optional single space.
///
/// A byte that does not match is left in the reader, so a mismatch never eats
/// into the LF of the line.
async fn match_field_name<R>(reader: &mut R, rest: &[u8]) -> SseResult<bool>
where
    R: AsyncBufRead + Unpin,
{
    for &expected in rest {
        if peek_byte(reader).await? != expected {
            return Ok(false);
        }
        reader.consume(1);
    }

    if peek_byte(reader).await? != COLON {
        return Ok(false);
    }
    reader.consume(1);

    if peek_byte(reader).await? == SPACE {
        reader.consume(1);
    }

    Ok(true)
}

/// Appends the rest of the current line to `out` and consumes its LF.
///
/// Fails with `too_large(limit)` as soon as `out` would grow past `limit`,
/// without reading the remainder of the line.
async fn read_line_into<R>(
    reader: &mut R,
    out: &mut BytesMut,
    limit: usize,
    too_large: fn(usize) -> SseError,
) -> SseResult<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Err(SseError::StreamEnded);
        }

        let eol = memchr::memchr(LF, available);
        let chunk = &available[..eol.unwrap_or(available.len())];
        if out.len() + chunk.len() > limit {
            return Err(too_large(limit));
        }
        out.extend_from_slice(chunk);

        let used = eol.map_or(chunk.len(), |pos| pos + 1);
        reader.consume(used);
        if eol.is_some() {
            return Ok(());
        }
    }
}

/// Consumes everything up to and including the next LF.
async fn discard_line<R>(reader: &mut R) -> SseResult<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Err(SseError::StreamEnded);
        }

        match memchr::memchr(LF, available) {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

fn parse_retry(value: &str) -> Option<u64> {
    value.parse().ok()
}

// ---------------------------------------------------------------------------
// ClientConn
// ---------------------------------------------------------------------------

/// Low-level event stream client that only parses the stream.
///
/// Each [`receive`](Self::receive) call returns one dispatched [`Event`].
/// Keepalives and groups without a `data` line are skipped internally. Any
/// `event`, `id` or `retry` such a group set is kept for the next event.
///
/// A `ClientConn` is owned by a single reader; there is no internal locking.
/// Dropping a pending `receive` future leaves the stream at an arbitrary
/// position, so the connection should be discarded afterwards.
#[derive(Debug)]
pub struct ClientConn<R> {
    reader: R,
    last_event_id: String,
    max_data_size: usize,
    max_field_size: usize,
    /// Scratch buffer for `event`, `id` and `retry` values.
    value: BytesMut,
}

impl<R: AsyncRead + Unpin> ClientConn<BufReader<R>> {
    /// Wrap an unbuffered reader in a [`BufReader`] and parse events from it.
    pub fn buffered(reader: R) -> Self {
        Self::new(BufReader::new(reader))
    }
}

impl<R> ClientConn<R> {
    /// Parse events from `reader` with the default configuration.
    pub fn new(reader: R) -> Self {
        Self::from_config(reader, DecoderConfig::default())
    }

    /// Parse events from `reader` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn with_config(reader: R, config: DecoderConfig) -> SseResult<Self> {
        config.validate().map_err(SseError::config)?;
        Ok(Self::from_config(reader, config))
    }

    fn from_config(reader: R, config: DecoderConfig) -> Self {
        Self {
            reader,
            last_event_id: String::new(),
            max_data_size: config.max_data_size,
            max_field_size: config.max_field_size,
            value: BytesMut::new(),
        }
    }

    /// The last `id` field seen on the stream, even if the group carrying it
    /// never dispatched an event.
    pub fn last_event_id(&self) -> &str {
        &self.last_event_id
    }

    /// Set the last event ID, e.g. when resuming from a `Last-Event-ID`.
    pub fn set_last_event_id(&mut self, id: impl Into<String>) {
        self.last_event_id = id.into();
    }

    /// Reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consume the connection, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> ClientConn<R>
where
    R: AsyncBufRead + Unpin,
{
    /// Read the next event from the stream.
    ///
    /// `buf`, if given, is cleared and reused as the event's `data`, so a
    /// long-lived connection can run without allocating per event:
    ///
    /// ```rust,no_run
    /// # async fn example(mut conn: hpx_sse::ClientConn<&[u8]>) -> hpx_sse::SseResult<()> {
    /// let mut spare = None;
    /// loop {
    ///     let mut event = conn.receive(spare.take()).await?;
    ///     println!("{:?}", event.data());
    ///     spare = event.data.take();
    /// }
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// - [`SseError::StreamEnded`] once the stream is exhausted. A partially
    ///   parsed event is discarded.
    /// - [`SseError::DataTooLarge`] if the event's data exceeds the configured
    ///   limit.
    /// - [`SseError::Io`] if reading fails.
    pub async fn receive(&mut self, buf: Option<BytesMut>) -> SseResult<Event> {
        let mut builder = EventBuilder::new(buf);

        loop {
            let first = read_byte(&mut self.reader).await?;

            let line = match first {
                LF if builder.has_data() => Line::Dispatch,
                LF => {
                    // Fields seen so far stay in place for the next group.
                    trace!("skipping event group without data");
                    Line::Consumed
                }
                _ if first == BOM[0] => self.skip_bom().await?,
                _ => match Field::from_first_byte(first) {
                    Some(field) => self.parse_field(field, &mut builder).await?,
                    None => Line::Unmatched,
                },
            };

            match line {
                Line::Dispatch => {
                    let event = builder.dispatch();
                    debug!(
                        event_type = %event.event,
                        id = %event.id,
                        len = event.data().len(),
                        "SSE event dispatched",
                    );
                    return Ok(event);
                }
                Line::Consumed => {}
                Line::Unmatched => discard_line(&mut self.reader).await?,
            }
        }
    }

    /// Convert the connection into a [`Stream`] of events.
    ///
    /// The stream ends when the underlying reader is exhausted and yields
    /// any other error once before ending.
    pub fn into_stream(self) -> impl Stream<Item = SseResult<Event>> {
        futures_util::stream::unfold(Some(self), |conn| async move {
            let mut conn = conn?;
            match conn.receive(None).await {
                Ok(event) => Some((Ok(event), Some(conn))),
                Err(SseError::StreamEnded) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Skips the rest of a BOM whose first byte was already read.
    async fn skip_bom(&mut self) -> SseResult<Line> {
        for &expected in &BOM[1..] {
            if peek_byte(&mut self.reader).await? != expected {
                return Ok(Line::Unmatched);
            }
            self.reader.consume(1);
        }
        trace!("skipping byte order mark");
        // The line itself has not been looked at yet.
        Ok(Line::Consumed)
    }

    async fn parse_field(&mut self, field: Field, builder: &mut EventBuilder) -> SseResult<Line> {
        if !match_field_name(&mut self.reader, field.rest()).await? {
            return Ok(Line::Unmatched);
        }

        match field {
            Field::Data => {
                let data = builder.data_mut();
                read_line_into(
                    &mut self.reader,
                    data,
                    self.max_data_size,
                    SseError::data_too_large,
                )
                .await
                    .inspect_err(|e| {
                        if e.is_data_too_large() {
                            warn!(limit = self.max_data_size, "SSE event data too large");
                        }
                    })?;
                data.put_u8(LF);
            }
            Field::Event => {
                builder.event = self.read_value().await?;
            }
            Field::Id => {
                let id = self.read_value().await?;
                self.last_event_id.clone_from(&id);
                builder.id = id;
            }
            Field::Retry => {
                // An unparseable value is ignored and keeps the previous one.
                if let Some(retry) = parse_retry(&self.read_value().await?) {
                    builder.retry = retry;
                }
            }
        }

        Ok(Line::Consumed)
    }

    /// Reads a non-`data` field value, decoded lossily as UTF-8.
    async fn read_value(&mut self) -> SseResult<String> {
        self.value.clear();
        let read = read_line_into(
            &mut self.reader,
            &mut self.value,
            self.max_field_size,
            SseError::field_too_large,
        )
        .await;
        let value = String::from_utf8_lossy(&self.value).into_owned();

        if self.value.capacity() > VALUE_RETAIN_CAPACITY {
            self.value = BytesMut::new();
        }

        read.inspect_err(|e| {
            if e.is_field_too_large() {
                warn!(limit = self.max_field_size, "SSE field value too large");
            }
        })?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
