//! Control-channel verbs and protocol identifiers.
//!
//! Verbs are parsed case-insensitively and never fail: anything that is
//! not a known verb becomes [`Method::Other`] so the engine can still
//! answer it.

use std::fmt;

// ── Protocol ─────────────────────────────────────────────────────

/// Which textual protocol a request (and its response) speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// `RTSP/1.0`: the mirroring handshake.
    Rtsp,
    /// `HTTP/1.1`: device-info queries on the same port.
    Http,
}

impl Protocol {
    /// The version token written at the start of a response status line.
    pub fn version(&self) -> &'static str {
        match self {
            Protocol::Rtsp => "RTSP/1.0",
            Protocol::Http => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version())
    }
}

// ── Method ───────────────────────────────────────────────────────

/// All verbs the handshake engine distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    // ── Handshake ────────────────────────────────────────────────
    Options,
    Announce,
    Setup,
    Record,
    Flush,
    Teardown,

    // ── HTTP-style ───────────────────────────────────────────────
    Get,
    Post,

    /// Any verb without dedicated handling (`GET_PARAMETER`,
    /// `SET_PARAMETER`, `PAUSE`, ...). Stored upper-cased.
    Other(String),
}

/// Verbs advertised in the `Public` header of an `OPTIONS` reply.
pub const PUBLIC_METHODS: &str = "ANNOUNCE, SETUP, RECORD, PAUSE, FLUSH, TEARDOWN, OPTIONS, \
                                  GET_PARAMETER, SET_PARAMETER, POST, GET";

impl Method {
    /// Parse a verb token, ignoring ASCII case.
    pub fn parse(token: &str) -> Self {
        let upper = token.trim().to_ascii_uppercase();
        match upper.as_str() {
            "OPTIONS" => Method::Options,
            "ANNOUNCE" => Method::Announce,
            "SETUP" => Method::Setup,
            "RECORD" => Method::Record,
            "FLUSH" => Method::Flush,
            "TEARDOWN" => Method::Teardown,
            "GET" => Method::Get,
            "POST" => Method::Post,
            _ => Method::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Options => "OPTIONS",
            Method::Announce => "ANNOUNCE",
            Method::Setup => "SETUP",
            Method::Record => "RECORD",
            Method::Flush => "FLUSH",
            Method::Teardown => "TEARDOWN",
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(s) => s,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Method::parse("options"), Method::Options);
        assert_eq!(Method::parse("SeTuP"), Method::Setup);
        assert_eq!(Method::parse("TEARDOWN"), Method::Teardown);
        assert_eq!(Method::parse("get"), Method::Get);
    }

    #[test]
    fn unknown_verbs_are_kept_upper_cased() {
        assert_eq!(
            Method::parse("get_parameter"),
            Method::Other("GET_PARAMETER".into())
        );
        assert_eq!(Method::parse("get_parameter").to_string(), "GET_PARAMETER");
    }

    #[test]
    fn public_list_names_every_handled_verb() {
        for verb in ["OPTIONS", "ANNOUNCE", "SETUP", "RECORD", "FLUSH", "TEARDOWN", "GET", "POST"] {
            assert!(PUBLIC_METHODS.contains(verb), "{verb} missing");
        }
    }

    #[test]
    fn protocol_versions() {
        assert_eq!(Protocol::Rtsp.to_string(), "RTSP/1.0");
        assert_eq!(Protocol::Http.version(), "HTTP/1.1");
    }
}
