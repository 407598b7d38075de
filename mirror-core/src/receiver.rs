//! Receiver lifecycle.
//!
//! [`MirrorReceiver`] owns everything that lives between `start` and
//! `stop`: the four data-channel loops, the control-port acceptor and
//! its sessions, and the advertiser.
//!
//! Start order: data channels, control listener, advertisement.
//! Stop order: control listener and sessions, data channels,
//! advertisement. Both are idempotent.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::advertise::{Advertiser, LogAdvertiser, ServiceRecords};
use crate::device::DeviceInfo;
use crate::error::MirrorError;
use crate::events::ReceiverEvent;
use crate::handshake::HandshakeContext;
use crate::mirror::channels::{ChannelBindings, ChannelKind, ChannelPorts};
use crate::mirror::decrypt::SessionKey;
use crate::mirror::router::{ChannelHandler, VideoPath, run_channel};
use crate::mirror::sink::{DiscardSink, FrameSink};
use crate::mirror::stats::{RouterStats, StatsSnapshot};
use crate::network::{Acceptor, SessionShared};
use crate::state::ReceiverStatus;
use crate::task::{WorkerPool, WorkerRole};

/// Standard control port.
pub const DEFAULT_CONTROL_PORT: u16 = 7000;
pub const DEFAULT_MAX_SESSIONS: usize = 4;

const EVENT_CAPACITY: usize = 32;

// ── ReceiverConfig ───────────────────────────────────────────────

/// Configuration for [`MirrorReceiver`].
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address every socket binds on.
    pub bind_address: IpAddr,
    /// TCP control port. 0 picks a free port.
    pub control_port: u16,
    /// UDP data-channel ports. 0 picks a free port.
    pub channels: ChannelPorts,
    /// Concurrent control sessions; further connections are closed.
    pub max_sessions: usize,
    pub device: DeviceInfo,
    /// Key installed before the first datagram arrives.
    pub session_key: Option<SessionKey>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            control_port: DEFAULT_CONTROL_PORT,
            channels: ChannelPorts::default(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            device: DeviceInfo::default(),
            session_key: None,
        }
    }
}

impl ReceiverConfig {
    /// Everything on loopback with OS-assigned ports.
    pub fn ephemeral() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            control_port: 0,
            channels: ChannelPorts::ephemeral(),
            ..Self::default()
        }
    }
}

/// Where a started receiver actually listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub control_port: u16,
    pub channels: ChannelPorts,
    /// Channels whose port could not be bound.
    pub unavailable: Vec<ChannelKind>,
}

// ── MirrorReceiver ───────────────────────────────────────────────

enum Lifecycle {
    Stopped,
    Running(Running),
}

struct Running {
    report: StartReport,
    control_shutdown: CancellationToken,
    data_shutdown: CancellationToken,
    workers: WorkerPool,
    bindings: ChannelBindings,
}

/// A screen-mirroring receiver.
///
/// # Lifetime
///
/// Construct, optionally plug in a sink and an advertiser, then call
/// [`start`](Self::start). Sessions, channel loops and advertisement
/// run until [`stop`](Self::stop). A stopped receiver can be started
/// again.
pub struct MirrorReceiver {
    config: ReceiverConfig,
    sink: Arc<dyn FrameSink>,
    advertiser: Arc<dyn Advertiser>,
    stats: Arc<RouterStats>,
    key: watch::Sender<Option<SessionKey>>,
    status: Arc<watch::Sender<ReceiverStatus>>,
    events: broadcast::Sender<ReceiverEvent>,
    state: Mutex<Lifecycle>,
}

impl MirrorReceiver {
    /// A receiver that discards frames and only logs its advertisement.
    pub fn new(config: ReceiverConfig) -> Self {
        let (key, _) = watch::channel(config.session_key.clone());
        let (status, _) = watch::channel(ReceiverStatus::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            sink: Arc::new(DiscardSink),
            advertiser: Arc::new(LogAdvertiser),
            stats: Arc::new(RouterStats::default()),
            key,
            status: Arc::new(status),
            events,
            state: Mutex::new(Lifecycle::Stopped),
        }
    }

    /// Deliver decrypted frames to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn FrameSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_advertiser(mut self, advertiser: Arc<dyn Advertiser>) -> Self {
        self.advertiser = advertiser;
        self
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Bind, spawn and advertise. Returns the effective ports.
    ///
    /// Calling this on a running receiver returns the existing report.
    /// A data channel that cannot be bound is reported but does not
    /// fail the start; the control listener failing to bind does.
    pub async fn start(&self) -> Result<StartReport, MirrorError> {
        let mut state = self.state.lock().await;
        if let Lifecycle::Running(running) = &*state {
            debug!("start ignored: receiver already running");
            return Ok(running.report.clone());
        }

        let ip = self.config.bind_address;
        let mut workers = WorkerPool::new();

        // 1. Data plane.
        let (bindings, _failures) = ChannelBindings::bind(ip, self.config.channels).await;
        let data_shutdown = CancellationToken::new();
        let video = VideoPath::new(
            Arc::clone(&self.sink),
            self.key.subscribe(),
            Arc::clone(&self.stats),
        );
        for binding in bindings.iter() {
            let Some(socket) = binding.socket() else {
                continue;
            };
            let handler = ChannelHandler::for_kind(binding.kind, &video, &self.stats);
            workers.spawn(
                WorkerRole::Channel(binding.kind),
                run_channel(binding.kind, Arc::clone(socket), handler, data_shutdown.clone()),
            );
        }

        // 2. Control plane.
        let control_addr = SocketAddr::new(ip, self.config.control_port);
        let listener = match bind_control(control_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("{e}");
                data_shutdown.cancel();
                workers.join_all().await;
                return Err(e);
            }
        };
        let control_port = listener
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(control_addr.port());

        let channels = bindings.ports();
        let shared = SessionShared {
            handshake: Arc::new(HandshakeContext {
                device: Arc::new(self.config.device.clone()),
                ports: channels,
            }),
            status: Arc::clone(&self.status),
            events: self.events.clone(),
        };
        let control_shutdown = CancellationToken::new();
        let acceptor = Acceptor::new(listener, shared, self.config.max_sessions);
        workers.spawn(WorkerRole::Acceptor, acceptor.run(control_shutdown.clone()));

        // 3. Advertisement.
        let records = ServiceRecords::new(&self.config.device, control_port);
        if let Err(e) = self.advertiser.start(&records).await {
            warn!("service advertisement failed: {e}");
        }

        let report = StartReport {
            control_port,
            channels,
            unavailable: bindings.unavailable(),
        };
        info!(
            "receiver \"{}\" ({}) listening on {ip}:{control_port}, video {}/{}, audio {}/{}",
            self.config.device.name,
            self.config.device.device_id,
            channels.video_data,
            channels.video_control,
            channels.audio_data,
            channels.audio_control,
        );
        if !report.unavailable.is_empty() {
            warn!("unavailable channels: {:?}", report.unavailable);
        }

        *state = Lifecycle::Running(Running {
            report: report.clone(),
            control_shutdown,
            data_shutdown,
            workers,
            bindings,
        });
        Ok(report)
    }

    /// Stop everything `start` brought up. A no-op when stopped.
    pub async fn stop(&self) -> Result<(), MirrorError> {
        let mut state = self.state.lock().await;
        let Lifecycle::Running(mut running) = std::mem::replace(&mut *state, Lifecycle::Stopped)
        else {
            debug!("stop ignored: receiver not running");
            return Ok(());
        };

        // Control plane first so no session outlives its data channels.
        running.control_shutdown.cancel();
        running.workers.join_where(|r| *r == WorkerRole::Acceptor).await;

        running.data_shutdown.cancel();
        running.workers.join_where(WorkerRole::is_channel).await;
        drop(running.bindings);

        if let Err(e) = self.advertiser.stop().await {
            warn!("withdrawing advertisement failed: {e}");
        }

        self.status.send_replace(ReceiverStatus::Waiting);
        info!("receiver stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, Lifecycle::Running(_))
    }

    /// Effective ports of a running receiver.
    pub async fn report(&self) -> Option<StartReport> {
        match &*self.state.lock().await {
            Lifecycle::Running(running) => Some(running.report.clone()),
            Lifecycle::Stopped => None,
        }
    }

    /// Install the key video payloads are decrypted with. Applies from
    /// the next datagram on.
    pub fn set_session_key(&self, key: SessionKey) {
        info!("session key installed ({} bit)", key.bits());
        self.key.send_replace(Some(key));
    }

    /// Forward video payloads unchanged again.
    pub fn clear_session_key(&self) {
        if self.key.send_replace(None).is_some() {
            info!("session key cleared");
        }
    }

    /// Watch the connected/waiting status.
    pub fn status(&self) -> watch::Receiver<ReceiverStatus> {
        self.status.subscribe()
    }

    /// Receive connect/disconnect events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ReceiverEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

async fn bind_control(addr: SocketAddr) -> Result<TcpListener, MirrorError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| MirrorError::Bind {
            channel: "control",
            addr,
            source,
        })
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_is_idempotent() {
        let receiver = MirrorReceiver::new(ReceiverConfig::ephemeral());
        let first = receiver.start().await.unwrap();
        let second = receiver.start().await.unwrap();
        assert_eq!(first, second);
        assert_ne!(first.control_port, 0);
        assert!(first.unavailable.is_empty());
        receiver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_noop() {
        let receiver = MirrorReceiver::new(ReceiverConfig::ephemeral());
        receiver.stop().await.unwrap();
        assert!(!receiver.is_running().await);
    }

    #[tokio::test]
    async fn control_port_conflict_fails_start() {
        let squatter = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ReceiverConfig {
            control_port: squatter.local_addr().unwrap().port(),
            ..ReceiverConfig::ephemeral()
        };
        let receiver = MirrorReceiver::new(config);
        let err = receiver.start().await.unwrap_err();
        assert!(matches!(err, MirrorError::Bind { channel: "control", .. }));
        assert!(!receiver.is_running().await);
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let receiver = MirrorReceiver::new(ReceiverConfig::ephemeral());
        receiver.start().await.unwrap();
        receiver.stop().await.unwrap();
        receiver.start().await.unwrap();
        assert!(receiver.is_running().await);
        receiver.stop().await.unwrap();
        assert!(receiver.report().await.is_none());
    }

    #[test]
    fn key_swap() {
        let receiver = MirrorReceiver::new(ReceiverConfig::default());
        let mut watcher = receiver.key.subscribe();
        receiver.set_session_key(SessionKey::from_bytes(&[7u8; 32]).unwrap());
        assert!(watcher.has_changed().unwrap());
        assert_eq!(watcher.borrow_and_update().as_ref().map(SessionKey::bits), Some(256));
        receiver.clear_session_key();
        assert!(watcher.borrow().is_none());
    }
}
