//! Configuration for the receiver service.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use mirror_core::device::{
    DEFAULT_FEATURES, DEFAULT_MODEL, DEFAULT_NAME, DEFAULT_PROTOCOL_VERSION,
    DEFAULT_SOURCE_VERSION, format_device_id,
};
use mirror_core::receiver::{DEFAULT_CONTROL_PORT, DEFAULT_MAX_SESSIONS};
use mirror_core::{ChannelPorts, DeviceInfo, MirrorError, ReceiverConfig, SessionKey};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverFileConfig {
    /// Sockets and session limits.
    pub network: NetworkConfig,
    /// Identity shown to senders.
    pub device: DeviceConfig,
    /// Frame delivery and decryption.
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

/// Network configuration. A port of 0 lets the OS choose.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: String,
    /// TCP control port.
    pub control_port: u16,
    pub video_data_port: u16,
    pub video_control_port: u16,
    pub audio_data_port: u16,
    pub audio_control_port: u16,
    /// Concurrent control sessions.
    pub max_sessions: usize,
}

/// Device identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Display name in the sender's device list.
    pub name: String,
    /// Raw device id (hex digits). Empty derives one from the name.
    pub device_id: String,
    pub model: String,
    pub source_version: String,
    pub protocol_version: String,
    pub features: u32,
}

/// Video delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// File the raw video payloads are appended to. Empty disables it.
    pub dump_path: String,
    /// Frames buffered between the receive loop and the consumer.
    pub queue_depth: usize,
    /// Hex AES key (32, 48 or 64 digits). Empty forwards payloads as-is.
    pub session_key: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        let ports = ChannelPorts::default();
        Self {
            bind_address: "0.0.0.0".into(),
            control_port: DEFAULT_CONTROL_PORT,
            video_data_port: ports.video_data,
            video_control_port: ports.video_control,
            audio_data_port: ports.audio_data,
            audio_control_port: ports.audio_control,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.into(),
            device_id: String::new(),
            model: DEFAULT_MODEL.into(),
            source_version: DEFAULT_SOURCE_VERSION.into(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.into(),
            features: DEFAULT_FEATURES,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            dump_path: String::new(),
            queue_depth: 256,
            session_key: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

/// Why a config file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config at {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// The file does not exist (first run).
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            Self::Unreadable { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

impl ReceiverFileConfig {
    /// Load configuration from a TOML file.
    ///
    /// Nothing is logged here. The caller falls back to defaults and
    /// reports the [`ConfigError`] once its subscriber is installed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Dump file, if one is configured.
    pub fn dump_path(&self) -> Option<PathBuf> {
        let path = self.video.dump_path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    /// Convert into the library's `ReceiverConfig`.
    pub fn to_receiver_config(&self) -> Result<ReceiverConfig, MirrorError> {
        let bind_address: IpAddr = self.network.bind_address.trim().parse()?;

        let session_key = match self.video.session_key.trim() {
            "" => None,
            hex_key => Some(SessionKey::from_hex(hex_key)?),
        };

        let name = match self.device.name.trim() {
            "" => DEFAULT_NAME,
            name => name,
        };
        let mut device = DeviceInfo::named(name);
        if !self.device.device_id.trim().is_empty() {
            device.device_id = format_device_id(self.device.device_id.trim());
        }
        device.model = self.device.model.clone();
        device.source_version = self.device.source_version.clone();
        device.protocol_version = self.device.protocol_version.clone();
        device.features = self.device.features;

        Ok(ReceiverConfig {
            bind_address,
            control_port: self.network.control_port,
            channels: ChannelPorts {
                video_data: self.network.video_data_port,
                video_control: self.network.video_control_port,
                audio_data: self.network.audio_data_port,
                audio_control: self.network.audio_control_port,
            },
            max_sessions: self.network.max_sessions.max(1),
            device,
            session_key,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
