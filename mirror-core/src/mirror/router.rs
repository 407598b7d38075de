//! Receive loops for the four data channels.
//!
//! Each bound socket gets one loop running until the data-plane
//! cancellation token fires:
//!
//! | Channel        | Handling                                        |
//! |----------------|-------------------------------------------------|
//! | video-data     | strip header, decrypt, submit to the frame sink |
//! | video-control  | time-sync reply                                 |
//! | audio-control  | time-sync reply                                 |
//! | audio-data     | drained and discarded                           |
//!
//! Nothing that arrives on a socket can stop a loop: per-datagram
//! problems are counted and logged at debug level at most.

use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::mirror::channels::{ChannelKind, MAX_DATAGRAM_SIZE};
use crate::mirror::decrypt::{SessionKey, decrypt};
use crate::mirror::rtp;
use crate::mirror::sink::{FrameSink, VideoFrame};
use crate::mirror::stats::RouterStats;
use crate::mirror::timesync;

// ── VideoPath ────────────────────────────────────────────────────

/// Everything the video-data loop needs to turn a datagram into a frame.
#[derive(Clone)]
pub struct VideoPath {
    sink: Arc<dyn FrameSink>,
    key: watch::Receiver<Option<SessionKey>>,
    stats: Arc<RouterStats>,
}

impl VideoPath {
    pub fn new(
        sink: Arc<dyn FrameSink>,
        key: watch::Receiver<Option<SessionKey>>,
        stats: Arc<RouterStats>,
    ) -> Self {
        Self { sink, key, stats }
    }

    /// Process one video-data datagram.
    pub fn handle(&self, datagram: &[u8]) {
        self.stats.record_video_datagram();

        let Some((header, payload)) = rtp::split(datagram) else {
            self.stats.record_runt();
            return;
        };

        let key = self.key.borrow().clone();
        let Some(plain) = decrypt(payload, key.as_ref()) else {
            self.stats.record_decrypt_failure();
            debug!(seq = header.sequence, len = payload.len(), "video payload failed to decrypt");
            return;
        };

        let frame = VideoFrame {
            header,
            payload: plain,
            received_at: Instant::now(),
        };
        match self.sink.submit(frame) {
            Ok(()) => self.stats.record_forwarded(),
            Err(e) => {
                self.stats.record_dropped();
                debug!(seq = header.sequence, "frame dropped: {e}");
            }
        }
    }
}

// ── Channel loops ────────────────────────────────────────────────

/// What a channel loop does with each datagram.
#[derive(Clone)]
pub enum ChannelHandler {
    Video(VideoPath),
    TimeSync(Arc<RouterStats>),
    Drain(Arc<RouterStats>),
}

impl ChannelHandler {
    /// The handler the router assigns to `kind`.
    pub fn for_kind(kind: ChannelKind, video: &VideoPath, stats: &Arc<RouterStats>) -> Self {
        match kind {
            ChannelKind::VideoData => ChannelHandler::Video(video.clone()),
            ChannelKind::VideoControl | ChannelKind::AudioControl => {
                ChannelHandler::TimeSync(Arc::clone(stats))
            }
            ChannelKind::AudioData => ChannelHandler::Drain(Arc::clone(stats)),
        }
    }
}

/// Receive on `socket` until `shutdown` fires.
pub async fn run_channel(
    kind: ChannelKind,
    socket: Arc<UdpSocket>,
    handler: ChannelHandler,
    shutdown: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let port = socket.local_addr().map(|a| a.port()).unwrap_or_default();
    debug!("{kind} listener started on port {port}");

    loop {
        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            r = socket.recv_from(&mut buf) => r,
        };

        let (len, from) = match received {
            Ok(pair) => pair,
            Err(e) => {
                if shutdown.is_cancelled() {
                    break;
                }
                debug!("{kind} receive error: {e}");
                continue;
            }
        };

        let datagram = &buf[..len];
        match &handler {
            ChannelHandler::Video(path) => path.handle(datagram),
            ChannelHandler::TimeSync(stats) => {
                timesync::respond(&socket, datagram, from, stats).await
            }
            ChannelHandler::Drain(stats) => stats.record_audio_datagram(),
        }
    }

    debug!("{kind} listener on port {port} stopped");
}

// ── Tests ────────────────────────────────────────────────────────
