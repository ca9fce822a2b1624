//! Newline-delimited frame reader.
//!
//! Wire format:
//! ```text
//! ┌──────────────────────────┬────────────┐
//! │ ASCII payload (N B)      │ LF | CR LF │
//! └──────────────────────────┴────────────┘
//! ```
//!
//! The reader accumulates incoming bytes into a fixed 512-byte window and
//! yields complete frames. This handles partial reads gracefully: a
//! single `Link::read` may return part of a line, several lines, or line
//! noise. When the window is full the oldest bytes are dropped, so the
//! newest data is never lost in favour of stale data.

use core::time::Duration;

use log::trace;

use super::Link;

/// Size of the accumulation window.
pub const FRAME_CAPACITY: usize = 512;

/// Longest frame handed to callers by default.
pub const DEFAULT_MAX_FRAME_LEN: usize = 255;

/// Bytes pulled from the link per read cycle.
const READ_CHUNK: usize = 64;

/// One extracted line, terminator stripped.
pub type Frame = heapless::Vec<u8, FRAME_CAPACITY>;

/// Outcome of one [`FrameReader::read_frame`] cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A complete frame.
    Frame(Frame),
    /// Bytes arrived but no complete frame yet.
    Pending,
    /// Nothing arrived within the timeout.
    Idle,
}

/// Streaming line extractor.
pub struct FrameReader {
    buf: [u8; FRAME_CAPACITY],
    /// Write cursor; `len <= FRAME_CAPACITY` always.
    len: usize,
    max_frame_len: usize,
    /// Bytes lost to the sliding window since the last reset.
    dropped: usize,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_FRAME_LEN)
    }

    /// Reader that hands out frames of at most `max_frame_len` bytes
    /// (capped at [`FRAME_CAPACITY`]). Longer segments are discarded.
    pub fn with_limit(max_frame_len: usize) -> Self {
        Self {
            buf: [0; FRAME_CAPACITY],
            len: 0,
            max_frame_len: max_frame_len.min(FRAME_CAPACITY),
            dropped: 0,
        }
    }

    /// Append `data` and try to extract one frame.
    ///
    /// Returns `None` when no complete frame is buffered yet. Further
    /// frames already in the window are returned by [`next_frame`].
    ///
    /// Framing is lossless only while the window never overflows: each
    /// call must carry at most [`FRAME_CAPACITY`] bytes minus any partial
    /// line still buffered, and [`next_frame`] must be drained between
    /// calls. Past that, the oldest bytes are evicted, frames included.
    ///
    /// [`next_frame`]: Self::next_frame
    pub fn feed(&mut self, data: &[u8]) -> Option<Frame> {
        self.push(data);
        self.next_frame()
    }

    /// Extract the next buffered frame without reading anything new.
    ///
    /// Empty and oversize segments are dropped and the scan continues.
    /// Every dropped segment shrinks the window by at least one byte, so
    /// the loop is bounded by the window size.
    pub fn next_frame(&mut self) -> Option<Frame> {
        for _ in 0..=FRAME_CAPACITY {
            let lf = self.buffered().iter().position(|&b| b == b'\n')?;
            let end = if lf > 0 && self.buf[lf - 1] == b'\r' {
                lf - 1
            } else {
                lf
            };
            // Stray CR/LF left over from an earlier partial extraction.
            let start = self.buf[..end]
                .iter()
                .position(|&b| b != b'\r' && b != b'\n')
                .unwrap_or(end);
            let seg_len = end - start;

            let frame = if seg_len > 0 && seg_len <= self.max_frame_len {
                Frame::from_slice(&self.buf[start..end]).ok()
            } else {
                None
            };
            self.consume(lf + 1);

            if frame.is_some() {
                return frame;
            }
            trace!("FRAME: skipped segment ({} bytes)", seg_len);
        }
        None
    }

    /// One read cycle against `link`.
    ///
    /// A frame already in the window is returned without touching the
    /// link. A read error is returned as-is and leaves the window
    /// untouched.
    pub fn read_frame<L: Link>(
        &mut self,
        link: &mut L,
        timeout: Duration,
    ) -> Result<Received, L::Error> {
        if let Some(frame) = self.next_frame() {
            return Ok(Received::Frame(frame));
        }

        let mut chunk = [0u8; READ_CHUNK];
        let n = link.read(&mut chunk, timeout)?;
        if n == 0 {
            return Ok(Received::Idle);
        }
        trace!("FRAME: rx {:02X?}", &chunk[..n]);

        Ok(match self.feed(&chunk[..n]) {
            Some(frame) => Received::Frame(frame),
            None => Received::Pending,
        })
    }

    /// Drop all buffered bytes (e.g. after a resync or reconnect).
    pub fn reset(&mut self) {
        self.len = 0;
        self.dropped = 0;
    }

    /// Bytes currently held in the window.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes lost to the sliding window since the last reset.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    // ── Internal ──────────────────────────────────────────────

    fn push(&mut self, data: &[u8]) {
        // Only the newest FRAME_CAPACITY bytes of `data` can survive.
        let data = if data.len() > FRAME_CAPACITY {
            self.dropped += data.len() - FRAME_CAPACITY;
            &data[data.len() - FRAME_CAPACITY..]
        } else {
            data
        };

        let free = FRAME_CAPACITY - self.len;
        if data.len() > free {
            let evict = data.len() - free;
            self.buf.copy_within(evict..self.len, 0);
            self.len -= evict;
            self.dropped += evict;
        }

        self.buf[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
    }

    fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }
}
