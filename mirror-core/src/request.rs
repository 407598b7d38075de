//! Parsed control-channel requests.
//!
//! A request is a request line, a block of `Name: value` header lines
//! and an optional body. Header lookup is a case-insensitive linear scan
//! and an absent header reads as the empty string.

use bytes::Bytes;

use crate::error::MirrorError;
use crate::message::{Method, Protocol};

/// Header names the handshake engine reads.
pub mod headers {
    pub const CSEQ: &str = "CSeq";
    pub const APPLE_CHALLENGE: &str = "Apple-Challenge";
    pub const TRANSPORT: &str = "Transport";
    pub const CONTENT_LENGTH: &str = "Content-Length";
}

/// One inbound request frame.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: String,
    protocol: Protocol,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Request {
    /// Parse a header block (everything before the blank line, without
    /// the terminator) and attach `body`.
    pub fn parse(head: &str, body: Bytes) -> Result<Self, MirrorError> {
        let mut lines = head.split("\r\n");
        let request_line = lines.next().map(str::trim).unwrap_or_default();
        if request_line.is_empty() {
            return Err(MirrorError::MalformedRequest("empty request line"));
        }

        let mut parts = request_line.split_whitespace();
        let method = parts.next().map(Method::parse).unwrap_or(Method::Other(String::new()));
        let uri = parts.next().unwrap_or_default().to_string();
        let protocol = match parts.next() {
            Some(v) if v.to_ascii_uppercase().starts_with("HTTP/") => Protocol::Http,
            _ => Protocol::Rtsp,
        };

        let headers = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();

        Ok(Self {
            method,
            uri,
            protocol,
            headers,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Value of the first header named `name` (any case), or `""`.
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }

    /// The client's sequence token, echoed verbatim in the reply.
    pub fn cseq(&self) -> &str {
        self.header(headers::CSEQ)
    }
}

/// Scan a raw header block for `Content-Length` without building a
/// full [`Request`]. Used by the codec to size the body.
pub(crate) fn scan_content_length(head: &str) -> Option<usize> {
    head.split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(n, _)| n.trim().eq_ignore_ascii_case(headers::CONTENT_LENGTH))
        .and_then(|(_, v)| v.trim().parse().ok())
}

// ── Tests ────────────────────────────────────────────────────────
