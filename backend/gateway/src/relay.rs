//! Relay of provider fragments onto the HTTP response body.
//!
//! The relay owns the provider stream. hyper drops the body when the caller
//! disconnects, which drops the relay and with it the provider connection.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures::stream::{Fuse, Stream, StreamExt};
use tracing::{info, warn};

use atlas_core::{AtlasError, FragmentStream};
use atlas_logging::redact_sensitive_data;

/// Body stream that forwards fragments verbatim, in arrival order.
///
/// A provider error after the first byte ends the body with an error, so the
/// caller sees an aborted transfer rather than a clean end of stream.
pub struct RelayStream {
    first: Option<String>,
    inner: Fuse<FragmentStream>,
    fragments: usize,
    bytes: usize,
    finished: bool,
    started: Instant,
}

impl RelayStream {
    /// `first` is a fragment already pulled from `inner` before headers were sent.
    pub fn new(first: Option<String>, inner: FragmentStream) -> Self {
        Self {
            first,
            inner: inner.fuse(),
            fragments: 0,
            bytes: 0,
            finished: false,
            started: Instant::now(),
        }
    }

    fn emit(&mut self, fragment: String) -> Bytes {
        self.fragments += 1;
        self.bytes += fragment.len();
        Bytes::from(fragment)
    }
}

impl Stream for RelayStream {
    type Item = Result<Bytes, AtlasError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }
        if let Some(first) = this.first.take() {
            return Poll::Ready(Some(Ok(this.emit(first))));
        }

        loop {
            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(fragment))) if fragment.is_empty() => continue,
                Poll::Ready(Some(Ok(fragment))) => {
                    return Poll::Ready(Some(Ok(this.emit(fragment))));
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    let err = match err {
                        AtlasError::StreamInterrupted(_) => err,
                        other => AtlasError::StreamInterrupted(other.to_string()),
                    };
                    warn!(
                        fragments = this.fragments,
                        bytes = this.bytes,
                        error = %redact_sensitive_data(&err.to_string()),
                        "Provider stream failed mid-flight; aborting response"
                    );
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    info!(
                        fragments = this.fragments,
                        bytes = this.bytes,
                        elapsed_ms = this.started.elapsed().as_millis() as u64,
                        "Chat stream completed"
                    );
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        if !self.finished {
            info!(
                fragments = self.fragments,
                bytes = self.bytes,
                "Caller went away before completion; closing provider stream"
            );
        }
    }
}
