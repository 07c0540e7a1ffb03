//! Relaying an opened upstream stream to the client.
//!
//! Chunks are forwarded one at a time through `Body::from_stream`; hyper
//! only polls for the next chunk once the previous one was written, so
//! memory stays bounded regardless of stream length.
//!
//! When the client goes away hyper drops the body, which drops the
//! upstream byte stream and closes the upstream connection. The
//! `RelayGuard` observes that drop to log and release the listener slot.

use std::time::Instant;

use axum::{
    body::Body,
    http::{header::CACHE_CONTROL, HeaderValue},
    response::Response,
};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::sync::OwnedSemaphorePermit;

use crate::http::response::copy_end_to_end_headers;
use crate::observability::metrics;
use crate::proxy::session::{StreamPhase, StreamSession};
use crate::proxy::upstream::OpenedStream;

/// Turn an opened upstream into the client response.
pub fn relay_response(
    opened: OpenedStream,
    mut session: StreamSession,
    permit: OwnedSemaphorePermit,
) -> Response {
    let OpenedStream {
        status,
        headers,
        first_chunk,
        rest,
    } = opened;

    tracing::info!(
        request_id = %session.request_id(),
        status = %status,
        headers = ?headers,
        attempts = session.attempts(),
        "Upstream responded, relaying stream"
    );

    session.advance(StreamPhase::Streaming);
    let mut guard = RelayGuard::new(session, permit);

    let body = stream::iter(first_chunk.map(Ok::<Bytes, reqwest::Error>))
        .chain(rest)
        .map(move |chunk| match chunk {
            Ok(bytes) => {
                guard.bytes += bytes.len() as u64;
                Ok(bytes)
            }
            Err(e) => {
                guard.upstream_failed(&e);
                Err(std::io::Error::other(e))
            }
        });

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    copy_end_to_end_headers(&headers, response.headers_mut());
    response
        .headers_mut()
        .entry(CACHE_CONTROL)
        .or_insert(HeaderValue::from_static("no-cache, no-store"));
    response
}

/// Lives exactly as long as the relayed body.
struct RelayGuard {
    session: StreamSession,
    bytes: u64,
    streaming_since: Instant,
    upstream_error: Option<String>,
    _permit: OwnedSemaphorePermit,
}

impl RelayGuard {
    fn new(session: StreamSession, permit: OwnedSemaphorePermit) -> Self {
        metrics::relay_opened();
        Self {
            session,
            bytes: 0,
            streaming_since: Instant::now(),
            upstream_error: None,
            _permit: permit,
        }
    }

    fn upstream_failed(&mut self, err: &reqwest::Error) {
        tracing::warn!(
            request_id = %self.session.request_id(),
            bytes = self.bytes,
            error = %err,
            "Upstream failed mid-stream, aborting client connection"
        );
        self.upstream_error = Some(err.to_string());
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if !self.session.phase().is_terminal() {
            self.session.advance(StreamPhase::Closed);
        }
        metrics::relay_closed(self.bytes);
        tracing::info!(
            request_id = %self.session.request_id(),
            bytes = self.bytes,
            streamed_for = ?self.streaming_since.elapsed(),
            total = ?self.session.elapsed(),
            upstream_error = self.upstream_error.as_deref(),
            "Stream closed"
        );
    }
}
