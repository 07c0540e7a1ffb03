//! Upstream dialing with deadline and retries.
//!
//! # Responsibilities
//! - Own the only HTTP client allowed to talk to the upstream host
//! - Dial the rewritten URL, wait for headers and the first chunk
//! - Retry retryable failures with backoff
//!
//! # Design Decisions
//! - Relaxed certificate checks live on this client only, and the client
//!   refuses other hosts (including redirect targets)
//! - Client headers are never forwarded; only the fixed outbound set is sent
//! - The deadline stops at the first chunk; the remaining stream is unbounded

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::redirect::Policy;
use url::Url;

use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::session::{StreamPhase, StreamSession};
use crate::proxy::target::{ProxyTarget, TargetError, TrustPolicy};
use crate::resilience::with_deadline;

const MAX_REDIRECTS: usize = 5;

/// An upstream response whose head and first chunk have arrived.
pub struct OpenedStream {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `None` when the upstream closed the body without sending anything.
    pub first_chunk: Option<Bytes>,
    pub rest: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("first_chunk_len", &self.first_chunk.as_ref().map(Bytes::len))
            .finish_non_exhaustive()
    }
}

/// HTTP client dedicated to the configured upstream host.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    target: Arc<ProxyTarget>,
}

impl UpstreamClient {
    pub fn new(target: Arc<ProxyTarget>) -> Result<Self, TargetError> {
        let redirect_host = target.host().to_string();
        let redirect = Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if attempt.url().host_str() == Some(redirect_host.as_str()) {
                attempt.follow()
            } else {
                attempt.stop()
            }
        });

        let mut builder = reqwest::Client::builder()
            .default_headers(target.outbound_headers().clone())
            .connect_timeout(target.connect_timeout())
            .redirect(redirect)
            .no_proxy();

        if let TrustPolicy::AcceptInvalidCerts { host } = target.trust() {
            tracing::warn!(host = %host, "Certificate verification relaxed for upstream host");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            http: builder.build()?,
            target,
        })
    }

    /// Dial `url` until it yields a first chunk or the retry policy gives up.
    ///
    /// On success the session is `Connected`; on error it is `Failed`.
    pub async fn open(
        &self,
        url: &Url,
        session: &mut StreamSession,
    ) -> Result<OpenedStream, ProxyError> {
        if url.host_str() != Some(self.target.host()) {
            return Err(ProxyError::ForeignHost(url.host_str().unwrap_or_default().to_string()));
        }

        let policy = self.target.retry();
        loop {
            session.advance(StreamPhase::DialingUpstream);
            let attempt = session.attempts();

            match with_deadline(self.target.response_timeout(), self.dial(url)).await {
                Ok(opened) => {
                    session.advance(StreamPhase::Connected);
                    metrics::record_upstream_attempt("ok");
                    return Ok(opened);
                }
                Err(e) => {
                    session.advance(StreamPhase::Failed);
                    metrics::record_upstream_attempt(e.kind());

                    if e.is_retryable() && policy.should_retry(attempt) {
                        let delay = policy.delay_after(attempt);
                        tracing::warn!(
                            request_id = %session.request_id(),
                            attempt,
                            delay = ?delay,
                            error = %e,
                            "Upstream attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// One dial: send, check status, wait for the first chunk.
    async fn dial(&self, url: &Url) -> Result<OpenedStream, ProxyError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ProxyError::from_send(e, self.target.connect_timeout()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::UpstreamStatus(status));
        }

        let headers = response.headers().clone();
        let mut rest = response.bytes_stream().boxed();
        let first_chunk = rest
            .next()
            .await
            .transpose()
            .map_err(|e| ProxyError::UpstreamBody(e.to_string()))?;

        Ok(OpenedStream {
            status,
            headers,
            first_chunk,
            rest,
        })
    }
}
