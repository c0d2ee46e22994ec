//! HTTP framing around an event stream.
//!
//! The event stream itself is just bytes. Before the first byte the server
//! has to answer `200 OK` with `Content-Type: text/event-stream`, and the
//! client has to ask for that content type and check it came back. These
//! helpers do that once per connection with the [`http`] types.

use http::{
    HeaderMap, HeaderValue, Response, StatusCode,
    header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, HeaderName},
};

use crate::constants::EVENT_STREAM_MIME;

/// Header carrying the last seen event id when a client reconnects.
pub const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

/// Build the `200 OK` event stream response wrapping `body`.
///
/// Sets `Content-Type: text/event-stream` and `Cache-Control: no-cache`. Add
/// any other headers to the returned response before sending it.
pub fn event_stream_response<B>(body: B) -> Response<B> {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM_MIME));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// Add the request headers a client sends when opening an event stream.
///
/// `last_event_id`, typically [`ClientConn::last_event_id`] from a previous
/// connection, is sent as `Last-Event-ID` when it is non-empty and a valid
/// header value.
///
/// [`ClientConn::last_event_id`]: crate::ClientConn::last_event_id
pub fn insert_request_headers(headers: &mut HeaderMap, last_event_id: Option<&str>) {
    headers.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM_MIME));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    if let Some(id) = last_event_id.filter(|id| !id.is_empty())
        && let Ok(value) = HeaderValue::from_str(id)
    {
        headers.insert(LAST_EVENT_ID, value);
    }
}

/// Whether a response's `Content-Type` announces an event stream.
pub fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|ct| ct.contains(EVENT_STREAM_MIME))
}
