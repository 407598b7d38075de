//! Receiver service core logic.
//!
//! Wires a [`MirrorReceiver`] to a frame consumer, logs lifecycle
//! events, and runs until the shutdown future resolves.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use mirror_core::{
    ChannelSink, MirrorError, MirrorReceiver, ReceiverEvent, ReceiverStatus, StartReport,
};

use crate::config::ReceiverFileConfig;
use crate::dump::{DumpWriter, consume_frames};

// ── ReceiverService ──────────────────────────────────────────────

/// The top-level receiver service.
pub struct ReceiverService {
    receiver: MirrorReceiver,
    frames: tokio::sync::mpsc::Receiver<mirror_core::VideoFrame>,
    dump_path: Option<PathBuf>,
}

impl ReceiverService {
    /// Build the receiver from file configuration.
    pub fn new(config: &ReceiverFileConfig) -> Result<Self, MirrorError> {
        let receiver_config = config.to_receiver_config()?;
        let (sink, frames) = ChannelSink::new(config.video.queue_depth.max(1));
        let receiver = MirrorReceiver::new(receiver_config).with_sink(Arc::new(sink));
        Ok(Self {
            receiver,
            frames,
            dump_path: config.dump_path(),
        })
    }

    pub fn receiver(&self) -> &MirrorReceiver {
        &self.receiver
    }

    /// Start, serve until `shutdown` resolves, then stop.
    pub async fn run<F>(self, shutdown: F) -> Result<(), MirrorError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            receiver,
            frames,
            dump_path,
        } = self;

        let writer = match &dump_path {
            Some(path) => match DumpWriter::create(path).await {
                Ok(w) => {
                    info!("dumping video payloads to {}", path.display());
                    Some(w)
                }
                Err(e) => {
                    warn!("cannot open dump file {}: {e}", path.display());
                    None
                }
            },
            None => None,
        };
        let consumer = tokio::spawn(consume_frames(frames, writer));
        let events = tokio::spawn(log_events(receiver.subscribe()));

        let report = receiver.start().await?;
        log_report(&report);

        shutdown.await;

        receiver.stop().await?;
        info!("data plane totals: {:?}", receiver.stats());
        drop(receiver);

        if let Ok(consumed) = consumer.await {
            info!("{consumed} video frame(s) consumed");
        }
        let _ = events.await;
        Ok(())
    }
}

fn log_report(report: &StartReport) {
    info!(
        "control port {}, video {}-{}, audio {}-{}",
        report.control_port,
        report.channels.video_data,
        report.channels.video_control,
        report.channels.audio_data,
        report.channels.audio_control,
    );
    for kind in &report.unavailable {
        warn!("{kind} channel unavailable");
    }
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<ReceiverEvent>) {
    loop {
        match events.recv().await {
            Ok(ReceiverEvent::Connected { session, peer }) => {
                info!(session, "{}", ReceiverStatus::Connected { session, peer });
            }
            Ok(ReceiverEvent::Disconnected { session, peer }) => {
                info!(session, "{peer} left; {}", ReceiverStatus::Waiting);
            }
            Err(RecvError::Lagged(n)) => warn!("{n} lifecycle event(s) missed"),
            Err(RecvError::Closed) => break,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
