//! # Data plane
//!
//! UDP side of the receiver: four channels bound for the receiver's
//! lifetime, independent of any control session.
//!
//! ```text
//!  video-data ──► rtp::split ──► decrypt ──► FrameSink ──► decoder
//!  video-control ─┐
//!  audio-control ─┴► timesync::build_reply ──► back to sender
//!  audio-data ───► drained
//! ```
//!
//! ## Sub-modules
//!
//! | Module     | Purpose                                        |
//! |------------|------------------------------------------------|
//! | `channels` | Channel kinds, port table and UDP bindings     |
//! | `router`   | Per-channel receive loops                      |
//! | `rtp`      | Fixed 12-byte transport header                 |
//! | `decrypt`  | Optional AES-CBC payload decryption            |
//! | `timesync` | NTP-style time-sync replies                    |
//! | `sink`     | Non-blocking hand-off to the decoder           |
//! | `stats`    | Lock-free data-plane counters                  |

pub mod channels;
pub mod decrypt;
pub mod router;
pub mod rtp;
pub mod sink;
pub mod stats;
pub mod timesync;

// ── Re-exports ───────────────────────────────────────────────────

pub use channels::{ChannelBinding, ChannelBindings, ChannelKind, ChannelPorts, MAX_DATAGRAM_SIZE};
pub use decrypt::{SessionKey, decrypt};
pub use router::{ChannelHandler, VideoPath, run_channel};
pub use rtp::{RTP_HEADER_SIZE, RtpHeader};
pub use sink::{ChannelSink, DiscardSink, FrameSink, SubmitError, VideoFrame};
pub use stats::{RouterStats, StatsSnapshot};
pub use timesync::{NtpTimestamp, SYNC_PACKET_SIZE};
