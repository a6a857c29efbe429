//! Byte relay between the upstream chat stream and an outbound response body.
//!
//! A spawned pump reads the upstream stream and forwards each chunk, unmodified
//! and in arrival order, into a bounded channel. The response writer drains the
//! channel. Either side going away ends the relay: upstream end-of-stream or
//! error drops the sender, and a dropped receiver (client disconnect) stops the
//! pump, which then drops the upstream body.

use crate::core::RawByteStream;
use crate::error::ChatError;
use async_stream::stream;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use std::io;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type RelayItem = Result<Bytes, ChatError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayOutcome {
    /// Upstream signalled end-of-stream.
    #[default]
    Completed,
    /// Upstream failed mid-stream; the error was forwarded to the receiver.
    UpstreamFailed,
    /// The receiver was dropped before upstream finished.
    ClientClosed,
}

/// What the pump forwarded before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayStats {
    pub chunks: usize,
    pub bytes: usize,
    pub outcome: RelayOutcome,
}

#[derive(Debug)]
pub struct PermitRelay {
    receiver: mpsc::Receiver<RelayItem>,
    pump: JoinHandle<RelayStats>,
}

impl PermitRelay {
    /// Starts pumping `upstream` into a channel holding at most `capacity` chunks.
    pub fn spawn(upstream: RawByteStream, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let pump = tokio::spawn(pump(upstream, tx));
        Self { receiver: rx, pump }
    }

    pub fn into_parts(self) -> (mpsc::Receiver<RelayItem>, JoinHandle<RelayStats>) {
        (self.receiver, self.pump)
    }

    /// Drains the channel as a response body. An upstream error ends the body
    /// with an I/O error, which aborts the outbound response.
    ///
    /// The pump task is detached here; dropping the returned stream closes the
    /// channel and the pump exits on its own.
    pub fn into_body_stream(self) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
        let mut rx = self.receiver;
        stream! {
            while let Some(item) = rx.recv().await {
                match item {
                    Ok(chunk) => yield Ok(chunk),
                    Err(err) => {
                        yield Err(io::Error::other(err));
                        break;
                    }
                }
            }
        }
    }
}

async fn pump(mut upstream: RawByteStream, tx: mpsc::Sender<RelayItem>) -> RelayStats {
    let mut stats = RelayStats::default();
    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                stats.outcome = RelayOutcome::ClientClosed;
                break;
            }
            next = upstream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                let len = chunk.len();
                if tx.send(Ok(chunk)).await.is_err() {
                    stats.outcome = RelayOutcome::ClientClosed;
                    break;
                }
                stats.chunks += 1;
                stats.bytes += len;
            }
            Some(Err(err)) => {
                warn!(error = %err, chunks = stats.chunks, "Upstream stream failed mid-relay");
                stats.outcome = RelayOutcome::UpstreamFailed;
                let _ = tx.send(Err(err)).await;
                break;
            }
            None => {
                stats.outcome = RelayOutcome::Completed;
                break;
            }
        }
    }
    debug!(chunks = stats.chunks, bytes = stats.bytes, outcome = ?stats.outcome, "Relay finished");
    stats
}
