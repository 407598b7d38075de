//! # mirror-core
//!
//! Core library of a screen-mirroring receiver.
//!
//! This crate contains:
//! - **Control plane**: `RtspCodec` framing, `Request`/`Response`, the
//!   verb-dispatching `handshake` engine and the per-connection
//!   `network` session loop
//! - **Data plane** (`mirror`): four UDP channels, RTP header stripping,
//!   optional AES-CBC decryption, time-sync replies and the `FrameSink`
//!   hand-off to a decoder
//! - **Lifecycle**: `MirrorReceiver` starts and stops everything in order
//! - **Discovery**: `ServiceRecords` and the `Advertiser` seam
//! - **State**: per-session `SessionPhase` and receiver-wide `ReceiverStatus`
//! - **Error**: `MirrorError`, a `thiserror`-based error hierarchy

pub mod advertise;
pub mod codec;
pub mod device;
pub mod error;
pub mod events;
pub mod handshake;
pub mod message;
pub mod mirror;
pub mod network;
pub mod receiver;
pub mod request;
pub mod response;
pub mod state;
pub mod task;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use advertise::{Advertiser, LogAdvertiser, ServiceRecord, ServiceRecords};
pub use codec::{Inbound, MAX_BODY_SIZE, MAX_HEADER_SIZE, RtspCodec};
pub use device::DeviceInfo;
pub use error::{MirrorError, WorkerError};
pub use events::ReceiverEvent;
pub use message::{Method, Protocol};
pub use mirror::{
    ChannelKind, ChannelPorts, ChannelSink, DiscardSink, FrameSink, RouterStats, RtpHeader,
    SessionKey, StatsSnapshot, SubmitError, VideoFrame,
};
pub use receiver::{MirrorReceiver, ReceiverConfig, StartReport};
pub use request::Request;
pub use response::Response;
pub use state::{ReceiverStatus, SessionId, SessionPhase};
pub use task::{WorkerPool, WorkerRole};
