//! Per-session handshake phase.
//!
//! The phase is informational. Every verb is answered on its own
//! semantics, so [`SessionPhase::observe`] records whatever the peer
//! just did instead of rejecting requests that arrive out of order.

use std::fmt;
use std::time::Instant;

use crate::message::Method;

/// Where a control session is in the handshake.
///
/// ```text
///  AwaitRequest ─► OptionsNegotiated ─► Announced ─► SetupComplete
///                                                       │
///                        TornDown ◄── Flushed ◄── Recording
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Connection accepted, nothing negotiated yet.
    #[default]
    AwaitRequest,
    OptionsNegotiated,
    Announced,
    /// Transport agreed; the receiver reports itself as connected.
    SetupComplete {
        since: Instant,
    },
    Recording,
    Flushed,
    /// Terminal: the peer sent `TEARDOWN`.
    TornDown,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitRequest => write!(f, "AwaitRequest"),
            Self::OptionsNegotiated => write!(f, "OptionsNegotiated"),
            Self::Announced => write!(f, "Announced"),
            Self::SetupComplete { .. } => write!(f, "SetupComplete"),
            Self::Recording => write!(f, "Recording"),
            Self::Flushed => write!(f, "Flushed"),
            Self::TornDown => write!(f, "TornDown"),
        }
    }
}

impl SessionPhase {
    /// Record the effect of `method`. Verbs that do not move the
    /// handshake (HTTP queries, unknown verbs) leave the phase alone.
    pub fn observe(&mut self, method: &Method) {
        let next = match method {
            Method::Options => Self::OptionsNegotiated,
            Method::Announce => Self::Announced,
            Method::Setup => Self::SetupComplete {
                since: Instant::now(),
            },
            Method::Record => Self::Recording,
            Method::Flush => Self::Flushed,
            Method::Teardown => Self::TornDown,
            Method::Get | Method::Post | Method::Other(_) => return,
        };
        *self = next;
    }
}

// ── Tests ────────────────────────────────────────────────────────
