//! Outbound control-channel responses.
//!
//! Responses are built with a small fluent API and serialised by the
//! codec as `<version> <code> <reason>\r\n`, one `Name: value\r\n` line
//! per header, a blank line, then the body.

use bytes::{BufMut, Bytes, BytesMut};

use crate::message::Protocol;

/// Value of the `Server` header on every handshake reply.
pub const SERVER: &str = "AirTunes/220.68";

/// One outbound response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    protocol: Protocol,
    status: u16,
    reason: &'static str,
    headers: Vec<(&'static str, String)>,
    body: Bytes,
}

impl Response {
    /// A `200 OK` with no headers.
    pub fn ok(protocol: Protocol) -> Self {
        Self {
            protocol,
            status: 200,
            reason: "OK",
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Append a header line. Order of calls is the order on the wire.
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Attach a body. `Content-Type` and `Content-Length` are added.
    pub fn body(mut self, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.headers.push(("Content-Type", content_type.to_string()));
        self.headers.push(("Content-Length", body.len().to_string()));
        self.body = body;
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Value of the first header named `name` (any case).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialise into `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(64 + self.headers.len() * 32 + self.body.len());
        dst.put_slice(self.protocol.version().as_bytes());
        dst.put_slice(format!(" {} {}\r\n", self.status, self.reason).as_bytes());
        for (name, value) in &self.headers {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        dst.put_slice(&self.body);
    }

    /// Serialise into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_ok_is_status_line_and_blank_line() {
        let bytes = Response::ok(Protocol::Rtsp).to_bytes();
        assert_eq!(&bytes[..], b"RTSP/1.0 200 OK\r\n\r\n");
    }

    #[test]
    fn headers_keep_insertion_order() {
        let bytes = Response::ok(Protocol::Rtsp)
            .header("CSeq", "3")
            .header("Server", SERVER)
            .to_bytes();
        assert_eq!(
            &bytes[..],
            b"RTSP/1.0 200 OK\r\nCSeq: 3\r\nServer: AirTunes/220.68\r\n\r\n"
        );
    }

    #[test]
    fn body_sets_length() {
        let resp = Response::ok(Protocol::Http).body("text/plain", "hello");
        assert_eq!(resp.header_value("content-length"), Some("5"));
        assert!(resp.to_bytes().ends_with(b"\r\n\r\nhello"));
    }
}
