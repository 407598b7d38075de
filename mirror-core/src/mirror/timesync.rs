//! Time-sync responder for the control channels.
//!
//! Senders probe the video-control and audio-control ports periodically
//! and stop streaming if nobody answers. The reply is a fixed 32-byte
//! datagram:
//!
//! ```text
//! 0..4     first word of the probe, echoed
//! 4..16    zero
//! 16..24   receive timestamp  (NTP seconds u32 BE, fraction u32 BE)
//! 24..32   transmit timestamp (same value)
//! ```
//!
//! No offset or round-trip estimation is attempted; the reply only
//! gives the sender a live clock reference.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;
use tracing::{trace, warn};

use crate::mirror::stats::RouterStats;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Probes shorter than this are ignored; replies are exactly this long.
pub const SYNC_PACKET_SIZE: usize = 32;

const RECEIVE_OFFSET: usize = 16;
const TRANSMIT_OFFSET: usize = 24;

// ── NtpTimestamp ─────────────────────────────────────────────────

/// 64-bit NTP fixed-point time: whole seconds since 1900 plus a 32-bit
/// binary fraction of a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpTimestamp {
    pub seconds: u32,
    pub fraction: u32,
}

impl NtpTimestamp {
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Convert wall-clock time. Seconds wrap at the NTP era boundary.
    pub fn from_system_time(t: SystemTime) -> Self {
        let since_unix = t.duration_since(UNIX_EPOCH).unwrap_or_default();
        let seconds = (since_unix.as_secs() + NTP_UNIX_OFFSET) as u32;
        let fraction = ((since_unix.subsec_nanos() as u64) << 32) / 1_000_000_000;
        Self {
            seconds,
            fraction: fraction as u32,
        }
    }

    pub fn encode(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&self.seconds.to_be_bytes());
        buf[4..8].copy_from_slice(&self.fraction.to_be_bytes());
        buf
    }

    pub fn decode(b: &[u8; 8]) -> Self {
        Self {
            seconds: u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            fraction: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
        }
    }
}

// ── Reply construction ───────────────────────────────────────────

/// Build the reply to `probe` stamped with `now`.
///
/// Returns `None` for probes shorter than [`SYNC_PACKET_SIZE`].
pub fn build_reply(probe: &[u8], now: NtpTimestamp) -> Option<[u8; SYNC_PACKET_SIZE]> {
    if probe.len() < SYNC_PACKET_SIZE {
        return None;
    }
    let mut reply = [0u8; SYNC_PACKET_SIZE];
    reply[0..4].copy_from_slice(&probe[0..4]);
    let stamp = now.encode();
    reply[RECEIVE_OFFSET..RECEIVE_OFFSET + 8].copy_from_slice(&stamp);
    reply[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 8].copy_from_slice(&stamp);
    Some(reply)
}

/// Answer one probe received on `socket` from `from`. Failures are
/// logged and dropped.
pub(crate) async fn respond(socket: &UdpSocket, probe: &[u8], from: SocketAddr, stats: &RouterStats) {
    let Some(reply) = build_reply(probe, NtpTimestamp::now()) else {
        stats.record_short_probe();
        return;
    };
    match socket.send_to(&reply, from).await {
        Ok(_) => {
            stats.record_sync_reply();
            trace!("time-sync reply sent to {from}");
        }
        Err(e) => warn!("time-sync reply to {from} failed: {e}"),
    }
}

// ── Tests ────────────────────────────────────────────────────────
