//! Hand-off from the video-data loop to the decode/render side.
//!
//! The receive loop calls [`FrameSink::submit`] inline, so sinks must
//! never block: [`ChannelSink`] queues with `try_send` and refuses the
//! frame when the decoder falls behind.

use std::time::Instant;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::mirror::rtp::RtpHeader;

/// One payload unit after header stripping and decryption.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub header: RtpHeader,
    pub payload: Bytes,
    pub received_at: Instant,
}

/// Why a sink refused a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("decode queue full")]
    Full,
    #[error("decoder gone")]
    Closed,
}

/// Consumer of decrypted video frames.
pub trait FrameSink: Send + Sync + 'static {
    /// Accept a frame without blocking.
    fn submit(&self, frame: VideoFrame) -> Result<(), SubmitError>;
}

// ── ChannelSink ──────────────────────────────────────────────────

/// Bounded queue towards a decoder task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<VideoFrame>,
}

impl ChannelSink {
    /// Create a sink and the receiving end the decoder drains.
    pub fn new(depth: usize) -> (Self, mpsc::Receiver<VideoFrame>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, rx)
    }
}

impl FrameSink for ChannelSink {
    fn submit(&self, frame: VideoFrame) -> Result<(), SubmitError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::Full,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}

// ── DiscardSink ──────────────────────────────────────────────────

/// Accepts and drops everything. Used when no decoder is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl FrameSink for DiscardSink {
    fn submit(&self, _frame: VideoFrame) -> Result<(), SubmitError> {
        Ok(())
    }
}
