//! # hpx-sse
//!
//! Server-Sent Events on the wire: a streaming decoder that turns a byte
//! stream into [`Event`]s, and an encoder that frames [`Event`]s and flushes
//! them immediately.
//!
//! Both halves work on a single open stream; connecting, reconnecting and
//! acting on `retry` are left to the caller.
//!
//! ## Features
//!
//! - **Byte-level decoder**: [`ClientConn`] parses any
//!   [`AsyncBufRead`](tokio::io::AsyncBufRead) without requiring UTF-8
//!   payloads, tracks the last event ID, and can reuse one data buffer for
//!   every event.
//! - **Flushing encoder**: [`ServerConn`] writes one complete message per
//!   [`send`](ServerConn::send) and flushes after each, so events are never
//!   held back by buffering.
//! - **Lossless round trips**: multi-line payloads, leading spaces and
//!   trailing newlines survive encode → decode unchanged.
//! - **Bounded memory**: the decoder rejects events larger than
//!   [`DecoderConfig::max_data_size`] (4 MiB by default) and `event`, `id`
//!   or `retry` values larger than [`DecoderConfig::max_field_size`] (64 KiB).
//!
//! ## Quick Start
//!
//! ```rust
//! use hpx_sse::{ClientConn, Event, ServerConn, SseError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SseError> {
//! let mut server = ServerConn::new(Vec::new());
//! server.send(&Event::new("hello\nworld").with_event("greeting")).await?;
//! server.keepalive().await?;
//!
//! let wire = server.into_inner();
//! let mut client = ClientConn::new(wire.as_slice());
//!
//! let event = client.receive(None).await?;
//! assert_eq!(event.event, "greeting");
//! assert_eq!(event.data(), b"hello\nworld");
//!
//! // The keepalive is skipped; the stream simply ends.
//! assert!(client.receive(None).await.unwrap_err().is_stream_ended());
//! # Ok(())
//! # }
//! ```

mod config;
pub mod constants;
mod decode;
mod encode;
pub mod error;
mod event;
pub mod response;

pub use config::DecoderConfig;
pub use constants::{MAX_EVENT_DATA_SIZE, MAX_FIELD_VALUE_SIZE};
pub use decode::ClientConn;
pub use encode::{EventEncoder, ServerConn, encode_event};
pub use error::{SseError, SseResult};
pub use event::Event;
