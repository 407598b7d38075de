//! Data-plane counters.
//!
//! Updated lock-free from the receive loops and read as a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by all data-channel loops.
#[derive(Debug, Default)]
pub struct RouterStats {
    video_datagrams: AtomicU64,
    runt_datagrams: AtomicU64,
    decrypt_failures: AtomicU64,
    frames_forwarded: AtomicU64,
    frames_dropped: AtomicU64,
    sync_replies: AtomicU64,
    short_probes: AtomicU64,
    audio_datagrams: AtomicU64,
}

/// Point-in-time copy of [`RouterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Datagrams received on video-data.
    pub video_datagrams: u64,
    /// Video-data datagrams too short to carry a payload.
    pub runt_datagrams: u64,
    pub decrypt_failures: u64,
    /// Frames accepted by the decode sink.
    pub frames_forwarded: u64,
    /// Frames the decode sink refused (queue full or closed).
    pub frames_dropped: u64,
    pub sync_replies: u64,
    /// Control datagrams too short to be a time-sync probe.
    pub short_probes: u64,
    pub audio_datagrams: u64,
}

impl RouterStats {
    pub fn record_video_datagram(&self) {
        self.video_datagrams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_runt(&self) {
        self.runt_datagrams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decrypt_failure(&self) {
        self.decrypt_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync_reply(&self) {
        self.sync_replies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_short_probe(&self) {
        self.short_probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audio_datagram(&self) {
        self.audio_datagrams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            video_datagrams: self.video_datagrams.load(Ordering::Relaxed),
            runt_datagrams: self.runt_datagrams.load(Ordering::Relaxed),
            decrypt_failures: self.decrypt_failures.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            sync_replies: self.sync_replies.load(Ordering::Relaxed),
            short_probes: self.short_probes.load(Ordering::Relaxed),
            audio_datagrams: self.audio_datagrams.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = RouterStats::default();
        stats.record_video_datagram();
        stats.record_video_datagram();
        stats.record_runt();
        stats.record_forwarded();
        stats.record_audio_datagram();

        let snap = stats.snapshot();
        assert_eq!(snap.video_datagrams, 2);
        assert_eq!(snap.runt_datagrams, 1);
        assert_eq!(snap.frames_forwarded, 1);
        assert_eq!(snap.audio_datagrams, 1);
        assert_eq!(snap.sync_replies, 0);
    }
}
