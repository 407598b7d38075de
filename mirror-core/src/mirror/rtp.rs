//! Fixed transport header on video-data datagrams.
//!
//! ## Wire format (big-endian)
//!
//! ```text
//! byte 0:   V(2) P(1) X(1) CC(4)
//! byte 1:   M(1) PT(7)
//! 2..4:     sequence number   u16
//! 4..8:     timestamp         u32
//! 8..12:    SSRC              u32
//! 12..:     payload (possibly encrypted)
//! ```
//!
//! Only the fixed 12 bytes are stripped; CSRC lists and extensions are
//! left in the payload untouched.

/// Length of the fixed header.
pub const RTP_HEADER_SIZE: usize = 12;

/// Decoded fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RtpHeader {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub csrc_count: u8,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Decode from exactly the header bytes.
    pub fn decode(b: &[u8; RTP_HEADER_SIZE]) -> Self {
        Self {
            version: b[0] >> 6,
            padding: b[0] & 0x20 != 0,
            extension: b[0] & 0x10 != 0,
            csrc_count: b[0] & 0x0F,
            marker: b[1] & 0x80 != 0,
            payload_type: b[1] & 0x7F,
            sequence: u16::from_be_bytes([b[2], b[3]]),
            timestamp: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
            ssrc: u32::from_be_bytes([b[8], b[9], b[10], b[11]]),
        }
    }

    /// Serialize (used by tests and tooling that synthesise streams).
    pub fn encode(&self) -> [u8; RTP_HEADER_SIZE] {
        let mut b = [0u8; RTP_HEADER_SIZE];
        b[0] = (self.version << 6)
            | ((self.padding as u8) << 5)
            | ((self.extension as u8) << 4)
            | (self.csrc_count & 0x0F);
        b[1] = ((self.marker as u8) << 7) | (self.payload_type & 0x7F);
        b[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        b[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        b[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        b
    }
}

/// Split a datagram into header and payload.
///
/// Returns `None` unless at least one payload byte follows the header.
pub fn split(datagram: &[u8]) -> Option<(RtpHeader, &[u8])> {
    if datagram.len() <= RTP_HEADER_SIZE {
        return None;
    }
    let (head, payload) = datagram.split_at(RTP_HEADER_SIZE);
    let head: &[u8; RTP_HEADER_SIZE] = head.try_into().ok()?;
    Some((RtpHeader::decode(head), payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fields() {
        let raw = [
            0x80, 0xE0, 0x01, 0x02, 0x00, 0x00, 0x10, 0x00, 0xDE, 0xAD, 0xBE, 0xEF,
        ];
        let h = RtpHeader::decode(&raw);
        assert_eq!(h.version, 2);
        assert!(h.marker);
        assert_eq!(h.payload_type, 0x60);
        assert_eq!(h.sequence, 0x0102);
        assert_eq!(h.timestamp, 0x1000);
        assert_eq!(h.ssrc, 0xDEADBEEF);
        assert_eq!(h.encode(), raw);
    }

    #[test]
    fn header_only_datagrams_have_no_payload() {
        assert!(split(&[0u8; 0]).is_none());
        assert!(split(&[0u8; 5]).is_none());
        assert!(split(&[0u8; RTP_HEADER_SIZE]).is_none());
    }

    #[test]
    fn thirteen_bytes_leave_one_payload_byte() {
        let mut dgram = [0u8; 13];
        dgram[12] = 0x42;
        let (_, payload) = split(&dgram).unwrap();
        assert_eq!(payload, &[0x42]);
    }
}
