//! Receiver identity as presented to senders.
//!
//! The same [`DeviceInfo`] feeds the `/server-info` document on the
//! control port and the service records handed to the advertiser, so
//! the two never disagree.

/// Feature mask advertised by default (video, screen mirroring, audio).
/// Published as the plist integer and, in hex, in the `features` TXT key.
pub const DEFAULT_FEATURES: u32 = 0x5A7F_FFF7;
pub const DEFAULT_MODEL: &str = "AppleTV3,2";
pub const DEFAULT_SOURCE_VERSION: &str = "220.68";
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.0";
pub const DEFAULT_NAME: &str = "Mirror Receiver";

/// Content type of the server-info document.
pub const PLIST_CONTENT_TYPE: &str = "text/x-apple-plist+xml";

/// Static description of this receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable name shown in the sender's device list.
    pub name: String,
    /// MAC-style id, e.g. `A1:B2:C3:D4:E5:F6`.
    pub device_id: String,
    pub model: String,
    pub source_version: String,
    pub protocol_version: String,
    pub features: u32,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self::named(DEFAULT_NAME)
    }
}

impl DeviceInfo {
    /// Defaults with the given name and an id derived from it.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            device_id: derive_device_id(name),
            model: DEFAULT_MODEL.into(),
            source_version: DEFAULT_SOURCE_VERSION.into(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.into(),
            features: DEFAULT_FEATURES,
        }
    }

    /// Override the device id with a raw identifier (see [`format_device_id`]).
    pub fn with_raw_id(mut self, raw: &str) -> Self {
        self.device_id = format_device_id(raw);
        self
    }

    /// Device id without separators, as used in RAOP service names.
    pub fn compact_id(&self) -> String {
        self.device_id.replace(':', "")
    }

    /// Property-list XML answering `GET /server-info`.
    pub fn server_info_plist(&self) -> String {
        format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
                "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" ",
                "\"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
                "<plist version=\"1.0\">\n",
                "<dict>\n",
                "\t<key>deviceid</key>\n\t<string>{}</string>\n",
                "\t<key>features</key>\n\t<integer>{}</integer>\n",
                "\t<key>model</key>\n\t<string>{}</string>\n",
                "\t<key>protovers</key>\n\t<string>{}</string>\n",
                "\t<key>srcvers</key>\n\t<string>{}</string>\n",
                "</dict>\n",
                "</plist>\n",
            ),
            xml_escape(&self.device_id),
            self.features,
            xml_escape(&self.model),
            xml_escape(&self.protocol_version),
            xml_escape(&self.source_version),
        )
    }
}

/// Format a raw identifier as a MAC-style id.
///
/// The raw value is padded with `0` and cut to 12 characters, split
/// into colon-separated pairs and upper-cased.
pub fn format_device_id(raw: &str) -> String {
    let mut chars: Vec<char> = raw.chars().filter(|c| !c.is_whitespace()).take(12).collect();
    chars.resize(12, '0');
    chars
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>().to_uppercase())
        .collect::<Vec<_>>()
        .join(":")
}

/// A stable id for a receiver that has none configured.
pub fn derive_device_id(name: &str) -> String {
    let hash = blake3::hash(name.as_bytes());
    format_device_id(&hash.to_hex()[..12])
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ── Tests ────────────────────────────────────────────────────────
