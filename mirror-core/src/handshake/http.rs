//! Static HTTP responder sharing the control port.
//!
//! Senders query `/server-info` before mirroring; every other
//! `GET`/`POST` gets an empty `200 OK`.

use crate::device::{DeviceInfo, PLIST_CONTENT_TYPE};
use crate::message::Protocol;
use crate::request::Request;
use crate::response::{Response, SERVER};

pub const SERVER_INFO_PATH: &str = "/server-info";

/// Answer an HTTP-style request.
pub fn respond(req: &Request, device: &DeviceInfo) -> Response {
    if is_server_info(req.uri()) {
        Response::ok(Protocol::Http)
            .header("Server", SERVER)
            .body(PLIST_CONTENT_TYPE, device.server_info_plist())
    } else {
        Response::ok(Protocol::Http).header("Content-Length", "0")
    }
}

fn is_server_info(uri: &str) -> bool {
    let path = uri.split('?').next().unwrap_or_default();
    path.to_ascii_lowercase().ends_with(SERVER_INFO_PATH)
}
