//! `tokio_util` codec for the textual control channel.
//!
//! Inbound frames are header blocks terminated by `\r\n\r\n`, followed
//! by `Content-Length` bytes of body when that header is present.
//! Content problems never poison the stream: an oversized or unparsable
//! frame is yielded as [`Inbound::Malformed`] and the codec resynchronises
//! on the next terminator, so only real I/O errors end a session.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::MirrorError;
use crate::request::{Request, scan_content_length};
use crate::response::Response;

/// Upper bound on one header block, terminator excluded.
pub const MAX_HEADER_SIZE: usize = 8192;

/// Upper bound on a declared request body.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

const TERMINATOR: &[u8] = b"\r\n\r\n";

/// One decoded inbound frame.
#[derive(Debug)]
pub enum Inbound {
    Request(Request),
    /// Bytes that could not form a request. Already discarded.
    Malformed(MirrorError),
}

/// Codec for the control channel: [`Inbound`] in, [`Response`] out.
#[derive(Debug, Default)]
pub struct RtspCodec {
    /// Dropping an oversized header block until its terminator shows up.
    discarding: bool,
    /// Body bytes of a rejected request still to be skipped.
    skip: usize,
}

impl RtspCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_terminator(src: &[u8]) -> Option<usize> {
    src.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}

/// Keep only the last few bytes, which may hold a split terminator.
fn retain_tail(src: &mut BytesMut) {
    let keep = TERMINATOR.len() - 1;
    if src.len() > keep {
        src.advance(src.len() - keep);
    }
}

impl Decoder for RtspCodec {
    type Item = Inbound;
    type Error = MirrorError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.skip > 0 {
            let n = self.skip.min(src.len());
            src.advance(n);
            self.skip -= n;
            if self.skip > 0 {
                return Ok(None);
            }
        }

        if self.discarding {
            match find_terminator(src) {
                Some(end) => {
                    src.advance(end + TERMINATOR.len());
                    self.discarding = false;
                }
                None => {
                    retain_tail(src);
                    return Ok(None);
                }
            }
        }

        // Stray line breaks between requests.
        while src.starts_with(b"\r\n") {
            src.advance(2);
        }

        let Some(end) = find_terminator(src) else {
            if src.len() > MAX_HEADER_SIZE {
                let size = src.len();
                self.discarding = true;
                retain_tail(src);
                return Ok(Some(Inbound::Malformed(MirrorError::RequestTooLarge {
                    size,
                    max: MAX_HEADER_SIZE,
                })));
            }
            return Ok(None);
        };

        let head_len = end + TERMINATOR.len();
        if end > MAX_HEADER_SIZE {
            src.advance(head_len);
            return Ok(Some(Inbound::Malformed(MirrorError::RequestTooLarge {
                size: end,
                max: MAX_HEADER_SIZE,
            })));
        }

        let head = String::from_utf8_lossy(&src[..end]).into_owned();
        let body_len = scan_content_length(&head).unwrap_or(0);
        if body_len > MAX_BODY_SIZE {
            src.advance(head_len);
            self.skip = body_len;
            return Ok(Some(Inbound::Malformed(MirrorError::BodyTooLarge {
                size: body_len,
                max: MAX_BODY_SIZE,
            })));
        }

        let frame_len = head_len + body_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(frame_len);
        let body = frame.split_off(head_len).freeze();
        Ok(Some(match Request::parse(&head, body) {
            Ok(req) => Inbound::Request(req),
            Err(e) => Inbound::Malformed(e),
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // A truncated trailing request is dropped with the connection.
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<Response> for RtspCodec {
    type Error = MirrorError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
