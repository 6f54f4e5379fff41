//! # Keyboard-Wedge Reader
//!
//! Handheld scanners type the payload followed by Enter, with the group
//! separator sent as a raw `0x1D` byte. Lines typed by hand may spell the
//! control bytes as `\x1d` or `<GS>` instead.

use stockroom_core::Barcode;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::error::ScanResult;

pub struct WedgeReader<R> {
    inner: R,
    line: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> WedgeReader<R> {
    pub fn new(inner: R) -> Self {
        WedgeReader {
            inner,
            line: Vec::new(),
        }
    }

    /// Next non-blank line as a payload, or `None` at end of input.
    pub async fn next_payload(&mut self) -> ScanResult<Option<Barcode>> {
        loop {
            self.line.clear();
            if self.inner.read_until(b'\n', &mut self.line).await? == 0 {
                return Ok(None);
            }

            let line = trim_line_ending(&self.line);
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }

            let barcode = decode_line(line)?;
            debug!(barcode = %barcode, "Wedge payload read");
            return Ok(Some(barcode));
        }
    }
}

/// Unescapes a typed line. Non-UTF-8 input is taken verbatim.
pub fn decode_line(line: &[u8]) -> ScanResult<Barcode> {
    match std::str::from_utf8(line) {
        Ok(text) => Ok(Barcode::parse_escaped(text)?),
        Err(_) => Ok(Barcode::new(line.to_vec())),
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
