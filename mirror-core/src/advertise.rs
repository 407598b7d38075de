//! Service advertisement.
//!
//! The receiver publishes two records: one for the mirroring service
//! and one for the companion audio service. How they reach the
//! network is up to the [`Advertiser`] plugged into the receiver; the
//! core only builds the records and starts/stops the advertiser at the
//! right points of the lifecycle.

use async_trait::async_trait;
use tracing::info;

use crate::device::DeviceInfo;
use crate::error::MirrorError;

pub const AIRPLAY_SERVICE: &str = "_airplay._tcp";
pub const RAOP_SERVICE: &str = "_raop._tcp";

/// Extended feature word appended to the device mask in the `features` key.
pub const EXTENDED_FEATURES: &str = "0x1E";

/// Placeholder public key published as `pk`/`pi`.
pub const PUBLIC_KEY: &str = "b07727d6f6cd6e08b58c98a7e206fc2848a9187319202e77840132b70f058043";

/// One DNS-SD record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub service_type: &'static str,
    pub instance_name: String,
    pub port: u16,
    pub txt: Vec<(&'static str, String)>,
}

impl ServiceRecord {
    pub fn txt_value(&self, key: &str) -> Option<&str> {
        self.txt
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Both records for one receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecords {
    pub airplay: ServiceRecord,
    pub raop: ServiceRecord,
}

impl ServiceRecords {
    /// Build the records for `device` listening on `control_port`.
    pub fn new(device: &DeviceInfo, control_port: u16) -> Self {
        let txt = |pairs: &[(&'static str, &str)]| -> Vec<(&'static str, String)> {
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
        };

        let features = features_txt(device.features);
        let airplay = ServiceRecord {
            service_type: AIRPLAY_SERVICE,
            instance_name: device.name.clone(),
            port: control_port,
            txt: txt(&[
                ("deviceid", device.device_id.as_str()),
                ("features", features.as_str()),
                ("model", device.model.as_str()),
                ("srcvers", device.source_version.as_str()),
                ("flags", "0x4"),
                ("vv", "2"),
                ("pk", PUBLIC_KEY),
                ("pi", PUBLIC_KEY),
            ]),
        };

        let raop = ServiceRecord {
            service_type: RAOP_SERVICE,
            instance_name: format!("{}@{}", device.compact_id(), device.name),
            port: control_port,
            txt: txt(&[
                ("ch", "2"),
                ("cn", "0,1,2,3"),
                ("da", "true"),
                ("et", "0,1"),
                ("md", "0,1,2"),
                ("pw", "false"),
                ("sr", "44100"),
                ("ss", "16"),
                ("sv", "false"),
                ("tp", "UDP"),
                ("txtvers", "1"),
                ("vn", "65537"),
                ("vs", device.source_version.as_str()),
                ("sf", "0x4"),
                ("am", device.model.as_str()),
                ("pk", PUBLIC_KEY),
            ]),
        };

        Self { airplay, raop }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceRecord> {
        [&self.airplay, &self.raop].into_iter()
    }
}

/// `features` TXT value: the device mask in hex plus the extended word.
pub fn features_txt(mask: u32) -> String {
    format!("{mask:#X},{EXTENDED_FEATURES}")
}

/// Publishes service records for the receiver's lifetime.
#[async_trait]
pub trait Advertiser: Send + Sync {
    /// Publish `records`. A failure is logged by the receiver but does
    /// not stop it from serving.
    async fn start(&self, records: &ServiceRecords) -> Result<(), MirrorError>;

    /// Withdraw whatever `start` published.
    async fn stop(&self) -> Result<(), MirrorError>;
}

/// Logs the records instead of publishing them. Useful where no
/// responder is available or discovery is handled out of process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAdvertiser;

#[async_trait]
impl Advertiser for LogAdvertiser {
    async fn start(&self, records: &ServiceRecords) -> Result<(), MirrorError> {
        for record in records.iter() {
            info!(
                "advertising {} \"{}\" on port {} ({} txt keys)",
                record.service_type,
                record.instance_name,
                record.port,
                record.txt.len()
            );
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), MirrorError> {
        info!("advertisement withdrawn");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
