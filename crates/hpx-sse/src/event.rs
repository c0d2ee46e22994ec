//! The event record shared by the encoder and the decoder.

use core::time::Duration;

use bytes::BytesMut;

/// An event sent by a [`ServerConn`](crate::ServerConn) and received by a
/// [`ClientConn`](crate::ClientConn).
///
/// `id` is the id carried by this specific event. The stream-wide last event
/// ID lives on [`ClientConn::last_event_id`](crate::ClientConn::last_event_id)
/// instead, because it also changes on groups that never dispatch an event.
///
/// `data` is tri-state: `None` means no `data` field was present at all, while
/// `Some` of an empty buffer is a real, empty payload. `retry` is in
/// milliseconds and `0` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// The event type, empty when unspecified.
    pub event: String,
    /// The data payload. Not required to be UTF-8.
    pub data: Option<BytesMut>,
    /// The id of this event, empty when absent.
    pub id: String,
    /// Reconnection time in milliseconds advertised by the server, `0` when
    /// absent.
    ///
    /// Unsigned: a negative `retry` value on the wire does not parse and is
    /// ignored by the decoder, like any other malformed value.
    pub retry: u64,
}

impl Event {
    /// Create an event carrying the given payload.
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        Self::default().with_data(data)
    }

    /// Set the event type.
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Set the data payload.
    #[must_use]
    pub fn with_data(mut self, data: impl AsRef<[u8]>) -> Self {
        self.data = Some(BytesMut::from(data.as_ref()));
        self
    }

    /// Set the event id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the retry interval in milliseconds.
    #[must_use]
    pub fn with_retry(mut self, retry: u64) -> Self {
        self.retry = retry;
        self
    }

    /// Whether this is the zero event, which encodes as a keepalive.
    ///
    /// Note that `Event::new("")` is not zero: it has an empty but present
    /// payload and is sent as a real event.
    pub fn is_zero(&self) -> bool {
        self.event.is_empty() && self.data.is_none() && self.id.is_empty() && self.retry == 0
    }

    /// The payload as a byte slice, empty when absent.
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    /// The retry interval, if one was set.
    pub fn retry_duration(&self) -> Option<Duration> {
        (self.retry != 0).then(|| Duration::from_millis(self.retry))
    }
}
