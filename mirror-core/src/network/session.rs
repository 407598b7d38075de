//! One control session: read a request, answer it, repeat.
//!
//! Generic over the stream so tests can drive it with mock I/O. The
//! loop ends on `TEARDOWN`, peer close, a stream error or shutdown.
//! Malformed input is logged and skipped; only stream errors end the
//! session abnormally.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, watch};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{Inbound, RtspCodec};
use crate::error::MirrorError;
use crate::events::ReceiverEvent;
use crate::handshake::{self, Directive, HandshakeContext};
use crate::state::receiver::{mark_connected, mark_disconnected};
use crate::state::{ReceiverStatus, SessionId, SessionPhase};

/// Shared handles a session reports through.
#[derive(Clone)]
pub struct SessionShared {
    pub handshake: Arc<HandshakeContext>,
    pub status: Arc<watch::Sender<ReceiverStatus>>,
    pub events: broadcast::Sender<ReceiverEvent>,
}

/// Why a session loop returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    TornDown,
    PeerClosed,
    Shutdown,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TornDown => write!(f, "torn down"),
            Self::PeerClosed => write!(f, "closed by peer"),
            Self::Shutdown => write!(f, "receiver shutting down"),
        }
    }
}

/// Serve one control connection until it ends.
pub async fn run_session<S>(
    stream: S,
    id: SessionId,
    peer: SocketAddr,
    shared: SessionShared,
    shutdown: CancellationToken,
) -> Result<SessionEnd, MirrorError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, RtspCodec::new());
    let mut phase = SessionPhase::default();
    let mut established = false;

    let outcome = loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break Ok(SessionEnd::Shutdown),
            next = framed.next() => next,
        };

        let req = match next {
            None => break Ok(SessionEnd::PeerClosed),
            Some(Err(e)) => break Err(e),
            Some(Ok(Inbound::Malformed(e))) => {
                warn!(session = id, "skipping malformed request from {peer}: {e}");
                continue;
            }
            Some(Ok(Inbound::Request(req))) => req,
        };

        debug!(session = id, cseq = req.cseq(), "{} {}", req.method(), req.uri());
        let reply = handshake::respond(&req, &shared.handshake);
        phase.observe(req.method());

        // A peer that stops reading must not hold the session past shutdown.
        tokio::select! {
            _ = shutdown.cancelled() => break Ok(SessionEnd::Shutdown),
            sent = framed.send(reply.response) => {
                if let Err(e) = sent {
                    break Err(e);
                }
            }
        }

        match reply.directive {
            Directive::Continue => {}
            Directive::Established => {
                if !established {
                    established = true;
                    info!(session = id, "sender {peer} connected");
                    mark_connected(&shared.status, id, peer);
                    let _ = shared.events.send(ReceiverEvent::Connected { session: id, peer });
                }
            }
            Directive::Close => {
                tokio::select! {
                    _ = shutdown.cancelled() => break Ok(SessionEnd::Shutdown),
                    _ = framed.close() => break Ok(SessionEnd::TornDown),
                }
            }
        }
    };

    debug!(session = id, "session ended in phase {phase}");
    if established {
        mark_disconnected(&shared.status, id);
        let _ = shared.events.send(ReceiverEvent::Disconnected { session: id, peer });
        info!(session = id, "sender {peer} disconnected");
    }

    outcome
}

// ── Tests ────────────────────────────────────────────────────────
