//! Server-sent events keep-alive stream

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};

/// Interval between keep-alive comments
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// An event stream that never yields data and only emits keep-alive
/// comments. It ends when the client disconnects and the body is dropped.
pub fn keep_alive_stream(
    interval: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(stream::pending::<Result<Event, Infallible>>())
        .keep_alive(KeepAlive::new().interval(interval).text(""))
}
