//! Lifecycle notifications for whoever drives the UI.

use std::net::SocketAddr;

use crate::state::SessionId;

/// Emitted on the receiver's broadcast channel. Subscribers that fall
/// behind lose the oldest events; [`crate::ReceiverStatus`] always
/// holds the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// A session answered its first `SETUP`.
    Connected { session: SessionId, peer: SocketAddr },
    /// An established session ended, by `TEARDOWN`, peer close, error
    /// or shutdown.
    Disconnected { session: SessionId, peer: SocketAddr },
}
