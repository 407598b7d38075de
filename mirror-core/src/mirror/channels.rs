//! UDP channel bindings for the data plane.
//!
//! Four sockets are bound once at receiver start and live until
//! shutdown. A channel whose port cannot be bound is logged and left
//! unavailable; the other channels still come up.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, error};

use crate::error::MirrorError;

/// Largest datagram a data channel accepts.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

// ── ChannelKind ──────────────────────────────────────────────────

/// Stream kind × direction of a data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    VideoData,
    VideoControl,
    AudioData,
    AudioControl,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::VideoData,
        ChannelKind::VideoControl,
        ChannelKind::AudioData,
        ChannelKind::AudioControl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::VideoData => "video-data",
            ChannelKind::VideoControl => "video-control",
            ChannelKind::AudioData => "audio-data",
            ChannelKind::AudioControl => "audio-control",
        }
    }

    /// Control channels carry time-sync probes.
    pub fn is_control(&self) -> bool {
        matches!(self, ChannelKind::VideoControl | ChannelKind::AudioControl)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── ChannelPorts ─────────────────────────────────────────────────

/// One port per channel kind. Port 0 asks the OS for a free port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPorts {
    pub video_data: u16,
    pub video_control: u16,
    pub audio_data: u16,
    pub audio_control: u16,
}

impl Default for ChannelPorts {
    fn default() -> Self {
        Self {
            video_data: 7010,
            video_control: 7011,
            audio_data: 7012,
            audio_control: 7013,
        }
    }
}

impl ChannelPorts {
    /// All channels on OS-assigned ports.
    pub fn ephemeral() -> Self {
        Self {
            video_data: 0,
            video_control: 0,
            audio_data: 0,
            audio_control: 0,
        }
    }

    pub fn get(&self, kind: ChannelKind) -> u16 {
        match kind {
            ChannelKind::VideoData => self.video_data,
            ChannelKind::VideoControl => self.video_control,
            ChannelKind::AudioData => self.audio_data,
            ChannelKind::AudioControl => self.audio_control,
        }
    }

    fn set(&mut self, kind: ChannelKind, port: u16) {
        match kind {
            ChannelKind::VideoData => self.video_data = port,
            ChannelKind::VideoControl => self.video_control = port,
            ChannelKind::AudioData => self.audio_data = port,
            ChannelKind::AudioControl => self.audio_control = port,
        }
    }
}

// ── ChannelBindings ──────────────────────────────────────────────

/// A bound channel: its port and, if binding succeeded, its socket.
#[derive(Debug)]
pub struct ChannelBinding {
    pub kind: ChannelKind,
    pub port: u16,
    socket: Option<Arc<UdpSocket>>,
}

impl ChannelBinding {
    pub fn socket(&self) -> Option<&Arc<UdpSocket>> {
        self.socket.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.socket.is_some()
    }
}

/// The receiver's four data channels. Immutable once bound; sessions
/// only read the ports.
#[derive(Debug)]
pub struct ChannelBindings {
    bindings: Vec<ChannelBinding>,
}

impl ChannelBindings {
    /// Bind every channel on `ip`. Failures are logged and returned
    /// alongside the bindings; the failed channel keeps its requested
    /// port number but has no socket.
    pub async fn bind(ip: IpAddr, requested: ChannelPorts) -> (Self, Vec<MirrorError>) {
        let mut bindings = Vec::with_capacity(ChannelKind::ALL.len());
        let mut failures = Vec::new();

        for kind in ChannelKind::ALL {
            let addr = SocketAddr::new(ip, requested.get(kind));
            match UdpSocket::bind(addr).await {
                Ok(socket) => {
                    let port = socket.local_addr().map(|a| a.port()).unwrap_or(addr.port());
                    debug!("{kind} bound on {}", SocketAddr::new(ip, port));
                    bindings.push(ChannelBinding {
                        kind,
                        port,
                        socket: Some(Arc::new(socket)),
                    });
                }
                Err(source) => {
                    error!("cannot bind {kind} on {addr}: {source}");
                    failures.push(MirrorError::Bind {
                        channel: kind.name(),
                        addr,
                        source,
                    });
                    bindings.push(ChannelBinding {
                        kind,
                        port: addr.port(),
                        socket: None,
                    });
                }
            }
        }

        (Self { bindings }, failures)
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&ChannelBinding> {
        self.bindings.iter().find(|b| b.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelBinding> {
        self.bindings.iter()
    }

    /// Effective port of every channel.
    pub fn ports(&self) -> ChannelPorts {
        let mut ports = ChannelPorts::ephemeral();
        for b in &self.bindings {
            ports.set(b.kind, b.port);
        }
        ports
    }

    /// Channels that failed to bind.
    pub fn unavailable(&self) -> Vec<ChannelKind> {
        self.bindings
            .iter()
            .filter(|b| !b.is_available())
            .map(|b| b.kind)
            .collect()
    }
}

// ── Tests ────────────────────────────────────────────────────────
