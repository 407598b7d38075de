//! Receiver-wide status as seen by the UI layer.
//!
//! Only two observable states exist. Several control sessions may be
//! open, but only the one whose `SETUP` made the receiver `Connected`
//! can return it to `Waiting`.

use std::fmt;
use std::net::SocketAddr;

use tokio::sync::watch;

/// Identifier assigned to each accepted control connection.
pub type SessionId = u64;

/// What the UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverStatus {
    /// No established session.
    #[default]
    Waiting,
    /// A sender completed `SETUP`.
    Connected { session: SessionId, peer: SocketAddr },
}

impl ReceiverStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

impl fmt::Display for ReceiverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting for connection"),
            Self::Connected { peer, .. } => write!(f, "connected to {peer}"),
        }
    }
}

/// Apply a session becoming established. Returns `true` if the status
/// changed.
pub(crate) fn mark_connected(
    status: &watch::Sender<ReceiverStatus>,
    session: SessionId,
    peer: SocketAddr,
) -> bool {
    status.send_if_modified(|current| {
        let next = ReceiverStatus::Connected { session, peer };
        if *current == next {
            return false;
        }
        *current = next;
        true
    })
}

/// Apply a session ending. Only the active session resets the status.
pub(crate) fn mark_disconnected(status: &watch::Sender<ReceiverStatus>, session: SessionId) -> bool {
    status.send_if_modified(|current| match *current {
        ReceiverStatus::Connected { session: active, .. } if active == session => {
            *current = ReceiverStatus::Waiting;
            true
        }
        _ => false,
    })
}
