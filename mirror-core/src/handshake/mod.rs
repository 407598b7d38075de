//! Control-plane handshake engine.
//!
//! Maps one request to one response. Dispatch is by verb alone: the
//! session's current phase never causes a request to be refused, so a
//! peer that reorders or repeats verbs still gets a sensible answer.
//!
//! | Verb       | Reply headers (after `CSeq`)                | Directive     |
//! |------------|---------------------------------------------|---------------|
//! | `OPTIONS`  | `Public`, `Server`, `Apple-Response`?       | continue      |
//! | `ANNOUNCE` | `Server`                                    | continue      |
//! | `SETUP`    | `Server`, `Transport` (+server_port), `Session` | established |
//! | `RECORD`   | `Server`, `Audio-Latency: 0`                | continue      |
//! | `FLUSH`    | `Server`                                    | continue      |
//! | `TEARDOWN` | `Server`, `Connection: close`               | close         |
//! | `GET`/`POST` | see [`http`]                              | continue      |
//! | other      | `CSeq` when present                         | continue      |

pub mod http;

use std::sync::Arc;

use crate::device::DeviceInfo;
use crate::message::{Method, PUBLIC_METHODS, Protocol};
use crate::mirror::channels::ChannelPorts;
use crate::request::{Request, headers};
use crate::response::{Response, SERVER};

/// Session identifier handed out in `SETUP` replies.
pub const SESSION_ID: &str = "1";

/// Read-only data every session answers from.
#[derive(Debug, Clone)]
pub struct HandshakeContext {
    pub device: Arc<DeviceInfo>,
    /// Ports the data channels are bound on.
    pub ports: ChannelPorts,
}

/// What the session loop does after sending the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Keep reading requests.
    Continue,
    /// Keep reading; the transport is now negotiated.
    Established,
    /// Close the connection and end the session.
    Close,
}

/// A response plus the follow-up action.
#[derive(Debug, Clone)]
pub struct Reply {
    pub response: Response,
    pub directive: Directive,
}

impl Reply {
    fn next(response: Response) -> Self {
        Self {
            response,
            directive: Directive::Continue,
        }
    }
}

/// Answer one request.
pub fn respond(req: &Request, ctx: &HandshakeContext) -> Reply {
    let cseq = req.cseq();
    let base = || {
        Response::ok(Protocol::Rtsp)
            .header(headers::CSEQ, cseq)
            .header("Server", SERVER)
    };

    match req.method() {
        Method::Options => {
            let mut resp = Response::ok(Protocol::Rtsp)
                .header(headers::CSEQ, cseq)
                .header("Public", PUBLIC_METHODS)
                .header("Server", SERVER);
            if !req.header(headers::APPLE_CHALLENGE).is_empty() {
                // Challenge signing needs the device private key; not implemented.
                resp = resp.header("Apple-Response", "");
            }
            Reply::next(resp)
        }
        Method::Announce | Method::Flush => Reply::next(base()),
        Method::Setup => Reply {
            response: base()
                .header(
                    headers::TRANSPORT,
                    server_transport(req.header(headers::TRANSPORT), &ctx.ports),
                )
                .header("Session", SESSION_ID),
            directive: Directive::Established,
        },
        Method::Record => Reply::next(base().header("Audio-Latency", "0")),
        Method::Teardown => Reply {
            response: base().header("Connection", "close"),
            directive: Directive::Close,
        },
        Method::Get | Method::Post => Reply::next(http::respond(req, &ctx.device)),
        Method::Other(_) => {
            let mut resp = Response::ok(Protocol::Rtsp);
            if !cseq.is_empty() {
                resp = resp.header(headers::CSEQ, cseq);
            }
            Reply::next(resp)
        }
    }
}

/// The client's transport string with our video-data/video-control
/// port pair as `server_port`. Any `server_port` the client sent is
/// replaced.
pub fn server_transport(client: &str, ports: &ChannelPorts) -> String {
    let ours = format!("server_port={}-{}", ports.video_data, ports.video_control);
    let mut params: Vec<&str> = client
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| {
            !p.get(..12)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("server_port="))
        })
        .collect();
    params.push(&ours);
    params.join(";")
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn ctx() -> HandshakeContext {
        HandshakeContext {
            device: Arc::new(DeviceInfo::named("Test TV")),
            ports: ChannelPorts {
                video_data: 7010,
                video_control: 7011,
                audio_data: 7012,
                audio_control: 7013,
            },
        }
    }

    fn answer(raw: &str) -> Reply {
        respond(&Request::parse(raw, Bytes::new()).unwrap(), &ctx())
    }

    fn text(reply: &Reply) -> String {
        String::from_utf8(reply.response.to_bytes().to_vec()).unwrap()
    }

    #[test]
    fn cseq_is_echoed_for_every_handshake_verb() {
        for verb in ["OPTIONS", "ANNOUNCE", "SETUP", "RECORD", "FLUSH", "TEARDOWN"] {
            let reply = answer(&format!("{verb} * RTSP/1.0\r\nCSeq: 42abc"));
            assert_eq!(reply.response.header_value("CSeq"), Some("42abc"), "{verb}");
            assert!(text(&reply).starts_with("RTSP/1.0 200 OK\r\nCSeq: 42abc\r\n"));
        }
    }

    #[test]
    fn options_lists_verbs() {
        let reply = answer("OPTIONS * RTSP/1.0\r\nCSeq: 1");
        assert_eq!(reply.response.header_value("Public"), Some(PUBLIC_METHODS));
        assert_eq!(reply.response.header_value("Server"), Some(SERVER));
        assert_eq!(reply.response.header_value("Apple-Response"), None);
        assert_eq!(reply.directive, Directive::Continue);
    }

    #[test]
    fn options_with_challenge_adds_response_header() {
        let reply = answer("OPTIONS * RTSP/1.0\r\nCSeq: 1\r\nApple-Challenge: c29tZQ==");
        assert_eq!(reply.response.header_value("Apple-Response"), Some(""));
    }

    #[test]
    fn setup_reports_bound_ports() {
        let reply = answer(
            "SETUP rtsp://x/1 RTSP/1.0\r\nCSeq: 3\r\nTransport: RTP/AVP/UDP;unicast;mode=record",
        );
        assert_eq!(reply.directive, Directive::Established);
        assert_eq!(
            reply.response.header_value("Transport"),
            Some("RTP/AVP/UDP;unicast;mode=record;server_port=7010-7011")
        );
        assert_eq!(reply.response.header_value("Session"), Some("1"));
    }

    #[test]
    fn setup_replaces_client_server_port() {
        let reply = answer(
            "SETUP * RTSP/1.0\r\nCSeq: 3\r\nTransport: RTP/AVP;Server_Port=1-2;client_port=5-6",
        );
        assert_eq!(
            reply.response.header_value("Transport"),
            Some("RTP/AVP;client_port=5-6;server_port=7010-7011")
        );
    }

    #[test]
    fn setup_without_transport() {
        let reply = answer("SETUP * RTSP/1.0\r\nCSeq: 3");
        assert_eq!(
            reply.response.header_value("Transport"),
            Some("server_port=7010-7011")
        );
    }

    #[test]
    fn record_hints_zero_latency() {
        let reply = answer("RECORD * RTSP/1.0\r\nCSeq: 5");
        assert_eq!(reply.response.header_value("Audio-Latency"), Some("0"));
    }

    #[test]
    fn teardown_closes() {
        let reply = answer("TEARDOWN * RTSP/1.0\r\nCSeq: 9");
        assert_eq!(reply.directive, Directive::Close);
        assert_eq!(reply.response.header_value("Connection"), Some("close"));
    }

    #[test]
    fn verbs_match_case_insensitively() {
        assert_eq!(answer("teardown * RTSP/1.0\r\nCSeq: 9").directive, Directive::Close);
        assert_eq!(answer("Setup * RTSP/1.0\r\nCSeq: 9").directive, Directive::Established);
    }

    #[test]
    fn unknown_verb_gets_generic_ok() {
        let reply = answer("GET_PARAMETER * RTSP/1.0\r\nCSeq: 11");
        assert_eq!(text(&reply), "RTSP/1.0 200 OK\r\nCSeq: 11\r\n\r\n");
        assert_eq!(reply.directive, Directive::Continue);

        let reply = answer("PAUSE * RTSP/1.0");
        assert_eq!(text(&reply), "RTSP/1.0 200 OK\r\n\r\n");
    }

    #[test]
    fn server_info_goes_to_http_responder() {
        let reply = answer("GET /server-info HTTP/1.1\r\nHost: tv");
        assert_eq!(reply.response.protocol(), Protocol::Http);
        assert_eq!(reply.directive, Directive::Continue);
    }
}
