/*!
 * Live body-id feed
 *
 * Each line of the underlying reader is one complete update: the ids of every
 * body currently tracked upstream, separated by whitespace and/or commas.
 * An empty line means no body is live.
 */

use std::string::FromUtf8Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::error::Result;

/// Split one update line into body ids
pub fn parse_id_list(line: &str) -> Vec<String> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Line-oriented source of live-id updates
///
/// A line that is not valid UTF-8 is skipped with a warning; only end of
/// input or an I/O error ends the feed.
pub struct LiveIdFeed<R> {
    reader: R,
    // Partial line kept across cancelled reads
    buf: Vec<u8>,
    updates: u64,
    skipped: u64,
}

impl<R: AsyncBufRead + Unpin> LiveIdFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            updates: 0,
            skipped: 0,
        }
    }

    /// Wait for the next update. Returns `None` once the source is closed.
    ///
    /// Cancel safe: bytes of an unfinished line stay buffered until the next
    /// call.
    pub async fn next_update(&mut self) -> Result<Option<Vec<String>>> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.buf).await?;
            if read == 0 && self.buf.is_empty() {
                return Ok(None);
            }

            match decode_line(std::mem::take(&mut self.buf)) {
                Ok(line) => {
                    self.updates += 1;
                    return Ok(Some(parse_id_list(&line)));
                }
                Err(e) => {
                    self.skipped += 1;
                    warn!("Skipping live-id update that is not valid UTF-8: {}", e);
                }
            }
        }
    }

    /// Number of updates read so far
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Number of lines dropped because they could not be decoded
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

fn decode_line(mut bytes: Vec<u8>) -> std::result::Result<String, FromUtf8Error> {
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
    }
    String::from_utf8(bytes)
}
