//! Module `reader`
//!
//! Assembles server replies from a byte stream. The reader owns its buffer:
//! bytes after the last complete line stay buffered for the next reply.

use log::trace;
use std::io::{self, ErrorKind, Read};

use crate::protocol::responses::Reply;

/// Longest single reply line accepted before the reply is considered malformed.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Upper bound on the bytes of one reply, continuation and skipped lines included.
pub const MAX_REPLY_LENGTH: usize = 16 * MAX_LINE_LENGTH;

const READ_CHUNK: usize = 4096;

/// Why no reply could be produced.
#[derive(Debug)]
pub enum ReadFailure {
    /// The peer closed the connection (zero-byte read).
    Hangup,
    /// The underlying read failed, including deadline expiry.
    Io(io::Error),
    /// A line grew past `MAX_LINE_LENGTH` without a terminator.
    LineTooLong,
    /// The lines of one reply added up to more than `MAX_REPLY_LENGTH`.
    ReplyTooLong,
}

/// Line splitter and reply assembler over any byte source.
#[derive(Debug, Default)]
pub struct ReplyReader {
    buf: Vec<u8>,
    pos: usize,
}

impl ReplyReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet consumed by a reply.
    #[cfg(test)]
    pub(crate) fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Drops buffered input, returning how many bytes were discarded.
    pub fn discard(&mut self) -> usize {
        let dropped = self.buf.len() - self.pos;
        self.buf.clear();
        self.pos = 0;
        dropped
    }

    /// Reads until a complete reply is available.
    ///
    /// A line whose first three characters are digits and whose fourth is not `-`
    /// ends the reply. A `ddd-` line opens a multi-line reply that only ends at a
    /// line carrying the same code without the dash. Stray lines outside a reply
    /// are skipped. A reply longer than `MAX_REPLY_LENGTH` in total is rejected.
    pub fn read_reply<R: Read + ?Sized>(&mut self, src: &mut R) -> Result<Reply, ReadFailure> {
        let mut open_code: Option<u16> = None;
        let mut lines = Vec::new();
        let mut total = 0usize;

        loop {
            let line = self.next_line(src)?;
            total += line.len() + 2;
            if total > MAX_REPLY_LENGTH {
                return Err(ReadFailure::ReplyTooLong);
            }
            let parsed = reply_code(&line);

            match open_code {
                Some(code) => {
                    let last = matches!(parsed, Some((c, false)) if c == code);
                    lines.push(line);
                    if last {
                        return Ok(Reply::new(code, lines));
                    }
                }
                None => match parsed {
                    Some((code, true)) => {
                        open_code = Some(code);
                        lines.push(line);
                    }
                    Some((code, false)) => {
                        lines.push(line);
                        return Ok(Reply::new(code, lines));
                    }
                    None => trace!("Skipping non-reply line: {line}"),
                },
            }
        }
    }

    /// Returns the next line without its terminator, reading more input as needed.
    fn next_line<R: Read + ?Sized>(&mut self, src: &mut R) -> Result<String, ReadFailure> {
        loop {
            if let Some(offset) = self.buf[self.pos..].iter().position(|&b| b == b'\n') {
                let end = self.pos + offset;
                let mut raw = &self.buf[self.pos..end];
                if raw.last() == Some(&b'\r') {
                    raw = &raw[..raw.len() - 1];
                }
                let line = String::from_utf8_lossy(raw).into_owned();
                self.pos = end + 1;
                if self.pos == self.buf.len() {
                    self.buf.clear();
                    self.pos = 0;
                }
                return Ok(line);
            }

            if self.buf.len() - self.pos > MAX_LINE_LENGTH {
                return Err(ReadFailure::LineTooLong);
            }

            if self.pos > 0 {
                self.buf.drain(..self.pos);
                self.pos = 0;
            }

            let mut chunk = [0u8; READ_CHUNK];
            match src.read(&mut chunk) {
                Ok(0) => return Err(ReadFailure::Hangup),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReadFailure::Io(e)),
            }
        }
    }
}

/// Parses the leading code of a line. The flag is true for a `ddd-` continuation marker.
pub fn reply_code(line: &str) -> Option<(u16, bool)> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let code = bytes[..3]
        .iter()
        .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));
    Some((code, bytes.get(3) == Some(&b'-')))
}
