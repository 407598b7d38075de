//! Control-port accept loop.
//!
//! Each accepted connection runs its own session task. Sessions share
//! nothing mutable beyond the status cell and event channel, so a
//! failing peer cannot affect the others. Connections over the
//! session limit are closed immediately.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::network::session::{SessionShared, run_session};
use crate::state::SessionId;

/// Pause after a failed `accept` so descriptor exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Acceptor {
    listener: TcpListener,
    shared: SessionShared,
    max_sessions: usize,
}

impl Acceptor {
    pub fn new(listener: TcpListener, shared: SessionShared, max_sessions: usize) -> Self {
        Self {
            listener,
            shared,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until `shutdown` fires, then wait for every session to
    /// finish. The listener is closed before sessions are awaited.
    pub async fn run(self, shutdown: CancellationToken) {
        let Self {
            listener,
            shared,
            max_sessions,
        } = self;
        let permits = Arc::new(Semaphore::new(max_sessions));
        let mut sessions = JoinSet::new();
        let mut next_id: SessionId = 1;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        warn!("session task failed: {}", WorkerError::from(e));
                    }
                }

                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("accept failed: {e}");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };

                    let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
                        warn!("rejecting {peer}: {max_sessions} sessions already open");
                        drop(stream);
                        continue;
                    };

                    let id = next_id;
                    next_id += 1;
                    info!(session = id, "control connection from {peer}");
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(session = id, "TCP_NODELAY not set for {peer}: {e}");
                    }

                    let shared = shared.clone();
                    let token = shutdown.child_token();
                    sessions.spawn(async move {
                        let _permit = permit;
                        match run_session(stream, id, peer, shared, token).await {
                            Ok(end) => info!(session = id, "session with {peer} {end}"),
                            Err(e) => warn!(session = id, "session with {peer} failed: {e}"),
                        }
                    });
                }
            }
        }

        drop(listener);
        debug!("control listener closed; waiting for {} session(s)", sessions.len());
        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                warn!("session task failed: {}", WorkerError::from(e));
            }
        }
    }
}
