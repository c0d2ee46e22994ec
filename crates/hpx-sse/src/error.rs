//! Error handling for the SSE encoder and decoder.

use std::io;

use thiserror::Error;

/// The result type used throughout this crate.
pub type SseResult<T> = Result<T, SseError>;

/// Errors produced by [`ClientConn`](crate::ClientConn) and
/// [`ServerConn`](crate::ServerConn).
#[derive(Error, Debug)]
pub enum SseError {
    /// The underlying stream ended. Any partially parsed event is discarded.
    ///
    /// This is the normal way for an event stream to finish.
    #[error("event stream ended")]
    StreamEnded,

    /// The accumulated `data` of one event exceeded the configured limit.
    ///
    /// The stream is left in the middle of a line; the connection should be
    /// closed.
    #[error("event data exceeds the limit of {limit} bytes")]
    DataTooLarge { limit: usize },

    /// An `event`, `id` or `retry` value exceeded the configured limit.
    ///
    /// As with [`SseError::DataTooLarge`], the connection should be closed.
    #[error("field value exceeds the limit of {limit} bytes")]
    FieldTooLarge { limit: usize },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Reading from or writing to the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for SseError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::StreamEnded
        } else {
            Self::Io(e)
        }
    }
}

impl SseError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a data size limit error.
    pub fn data_too_large(limit: usize) -> Self {
        Self::DataTooLarge { limit }
    }

    /// Create a field value size limit error.
    pub fn field_too_large(limit: usize) -> Self {
        Self::FieldTooLarge { limit }
    }

    /// Returns `true` if the stream ended normally.
    pub fn is_stream_ended(&self) -> bool {
        matches!(self, Self::StreamEnded)
    }

    /// Returns `true` if an event was rejected for being too large.
    pub fn is_data_too_large(&self) -> bool {
        matches!(self, Self::DataTooLarge { .. })
    }

    /// Returns `true` if an `event`, `id` or `retry` value was too large.
    pub fn is_field_too_large(&self) -> bool {
        matches!(self, Self::FieldTooLarge { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SseError::config("max data size must be > 0");
        assert!(matches!(err, SseError::Config { .. }));

        let err = SseError::data_too_large(16);
        assert!(err.is_data_too_large());
        assert!(!err.is_stream_ended());
        assert_eq!(err.to_string(), "event data exceeds the limit of 16 bytes");

        let err = SseError::field_too_large(8);
        assert!(err.is_field_too_large());
        assert!(!err.is_data_too_large());
        assert_eq!(err.to_string(), "field value exceeds the limit of 8 bytes");
    }

    #[test]
    fn test_unexpected_eof_is_stream_end() {
        let err = SseError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(err.is_stream_ended());

        let err = SseError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(err, SseError::Io(_)));
    }
}
