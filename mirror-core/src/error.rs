//! Domain-specific error types for the mirroring receiver.
//!
//! Fallible setup and session operations return `Result<T, MirrorError>`.
//! Per-packet problems on the data plane never surface here: they are
//! dropped and counted by the router instead.

use std::net::SocketAddr;

use thiserror::Error;

/// The canonical error type for the receiver.
#[derive(Debug, Error)]
pub enum MirrorError {
    // ── Control-plane Errors ─────────────────────────────────────
    /// A request frame could not be interpreted at all.
    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),

    /// A request header block exceeded the read bound.
    #[error("request too large: {size} bytes (max {max})")]
    RequestTooLarge { size: usize, max: usize },

    /// A declared request body exceeded the read bound.
    #[error("request body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    // ── Data-plane Errors ────────────────────────────────────────
    /// A session key had an unsupported length or encoding.
    #[error("invalid session key: {0}")]
    InvalidKey(String),

    /// A payload could not be decrypted with the current session key.
    #[error("decrypt failed: {0}")]
    Decrypt(&'static str),

    /// A socket for a data channel could not be bound.
    #[error("cannot bind {channel} on {addr}: {source}")]
    Bind {
        channel: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/UDP layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// A configured address could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    /// An mpsc or watch channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Worker Errors ────────────────────────────────────────────
    /// A spawned worker failed.
    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── WorkerError ──────────────────────────────────────────────────

/// Typed error for spawned receiver workers (acceptor, sessions, data
/// channel loops).
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker was cancelled by receiver shutdown.
    #[error("worker was cancelled")]
    Cancelled,

    /// The worker panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),

    /// The worker's I/O failed.
    #[error("worker I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for WorkerError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_cancelled() {
            WorkerError::Cancelled
        } else {
            WorkerError::Panicked(e.to_string())
        }
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for MirrorError {
    fn from(s: String) -> Self {
        MirrorError::Other(s)
    }
}

impl From<&str> for MirrorError {
    fn from(s: &str) -> Self {
        MirrorError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for MirrorError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        MirrorError::ChannelClosed
    }
}

impl From<hex::FromHexError> for MirrorError {
    fn from(e: hex::FromHexError) -> Self {
        MirrorError::InvalidKey(e.to_string())
    }
}

impl MirrorError {
    /// Whether this error came from the underlying stream rather than
    /// from the content of a request. Stream errors end a session.
    pub fn is_stream_error(&self) -> bool {
        matches!(self, MirrorError::Connection(_) | MirrorError::ChannelClosed)
    }
}
