//! Frame consumer: appends decrypted video payloads to a file.
//!
//! Stands in for a real decoder. The output is the concatenated
//! payload stream, which common tools can probe directly.

use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{info, warn};

use mirror_core::VideoFrame;

/// Appends frame payloads to a file.
pub struct DumpWriter {
    out: BufWriter<File>,
    frames: u64,
    bytes: u64,
}

impl DumpWriter {
    /// Open `path` for appending, creating it if needed.
    pub async fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            out: BufWriter::new(file),
            frames: 0,
            bytes: 0,
        })
    }

    pub async fn write_frame(&mut self, frame: &VideoFrame) -> std::io::Result<()> {
        self.out.write_all(&frame.payload).await?;
        self.frames += 1;
        self.bytes += frame.payload.len() as u64;
        Ok(())
    }

    /// Flush and return `(frames, bytes)` written.
    pub async fn finish(mut self) -> std::io::Result<(u64, u64)> {
        self.out.flush().await?;
        Ok((self.frames, self.bytes))
    }
}

/// Drain `frames` until the sending side closes, writing each to
/// `writer` when there is one. Returns the number of frames consumed.
pub async fn consume_frames(
    mut frames: mpsc::Receiver<VideoFrame>,
    mut writer: Option<DumpWriter>,
) -> u64 {
    let mut consumed = 0u64;
    while let Some(frame) = frames.recv().await {
        consumed += 1;
        if let Some(w) = writer.as_mut() {
            if let Err(e) = w.write_frame(&frame).await {
                warn!("dump write failed, disabling dump: {e}");
                writer = None;
            }
        }
    }

    if let Some(w) = writer {
        match w.finish().await {
            Ok((frames, bytes)) => info!("dump closed: {frames} frames, {bytes} bytes"),
            Err(e) => warn!("dump flush failed: {e}"),
        }
    }
    consumed
}
