//! Wire-level constants shared by the encoder and the decoder.

/// Newline byte, the only line terminator the grammar recognises.
pub(crate) const LF: u8 = b'\n';
/// Field separator.
pub(crate) const COLON: u8 = b':';
/// Optional single space after the field separator.
pub(crate) const SPACE: u8 = b' ';

/// Byte Order Mark as char
const BOM_CHAR: char = '\u{FEFF}';
const BOM_LEN: usize = BOM_CHAR.len_utf8();
/// Byte representation of the BOM [`char`]
pub(crate) const BOM: &[u8; BOM_LEN] = &{
    let mut buf = [0u8; BOM_LEN];
    BOM_CHAR.encode_utf8(&mut buf);
    buf
};

// Field names, without their leading byte: the decoder dispatches on the first
// byte of a line and only has to match the rest.
pub(crate) const EVENT_REST: &[u8] = b"vent";
pub(crate) const DATA_REST: &[u8] = b"ata";
pub(crate) const ID_REST: &[u8] = b"d";
pub(crate) const RETRY_REST: &[u8] = b"etry";

/// Default upper bound on the accumulated `data` of a single event (4 MiB).
pub const MAX_EVENT_DATA_SIZE: usize = 4 * 1024 * 1024;

/// Default upper bound on a single `event`, `id` or `retry` value (64 KiB).
pub const MAX_FIELD_VALUE_SIZE: usize = 64 * 1024;

/// Scratch capacity kept between field values; a larger buffer is released.
pub(crate) const VALUE_RETAIN_CAPACITY: usize = 1024;

/// `Content-Type` of an event stream response.
pub const EVENT_STREAM_MIME: &str = "text/event-stream";
