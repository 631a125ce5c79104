//! Reassembles the server byte stream into status lines and dot-terminated bodies.
//!
//! Multi-line responses follow [RFC 1939 section
//! 3](https://tools.ietf.org/html/rfc1939#section-3): the body ends with a line
//! holding a single `.`, and any content line starting with `.` has been
//! byte-stuffed with one extra `.` that is removed here.

use std::io::BufRead;
use std::time::{Duration, Instant};

use crate::activity::Timestamp;
use crate::error::{Error, Result};

const CR: u8 = 0x0d;
const LF: u8 = 0x0a;
const DOT: u8 = b'.';

/// Reads responses from a buffered stream, touching the activity timestamp on every line.
pub(crate) struct ResponseReader<'a, R: BufRead> {
    inner: &'a mut R,
    activity: &'a Timestamp,
    debug: bool,
}

impl<'a, R: BufRead> ResponseReader<'a, R> {
    pub(crate) fn new(inner: &'a mut R, activity: &'a Timestamp, debug: bool) -> Self {
        ResponseReader {
            inner,
            activity,
            debug,
        }
    }

    /// Read one raw line, LF included. EOF is a lost connection.
    fn readline(&mut self, into: &mut Vec<u8>) -> Result<usize> {
        let read = self.inner.read_until(LF, into)?;
        if read == 0 {
            return Err(Error::ConnectionLost);
        }
        self.activity.touch();

        if self.debug {
            let len = into.len();
            let line = strip_newline(&into[len - read..]);
            log::trace!(target: "pop3::wire", "S: {}", String::from_utf8_lossy(line));
        }

        Ok(read)
    }

    /// Read a status line, trimmed.
    pub(crate) fn read_status(&mut self) -> Result<String> {
        let mut v = Vec::new();
        self.readline(&mut v)?;
        Ok(String::from_utf8_lossy(&v).trim().to_string())
    }

    /// Read a dot-terminated body into one buffer, lines separated by CRLF.
    ///
    /// There is no time budget. A body that would exceed `limit` bytes fails
    /// with [`Error::TooLarge`]; the rest of it is left unread.
    pub(crate) fn read_body(&mut self, limit: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            self.readline(&mut line)?;
            let content = strip_newline(&line);
            if is_terminator(content) {
                break Ok(out);
            }
            let content = unstuff(content);
            if out.len().saturating_add(content.len() + 2) > limit {
                break Err(Error::TooLarge(limit));
            }
            out.try_reserve(content.len() + 2)?;
            out.extend_from_slice(content);
            out.extend_from_slice(&[CR, LF]);
        }
    }

    /// Read a dot-terminated body as one string per line.
    ///
    /// The LF is stripped and a trailing CR kept. The whole read must finish
    /// within `budget`.
    pub(crate) fn read_lines(&mut self, budget: Duration) -> Result<Vec<String>> {
        let start = Instant::now();
        let mut out = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            self.readline(&mut line)?;
            if line.last() == Some(&LF) {
                line.pop();
            }
            if is_terminator(strip_cr(&line)) {
                break Ok(out);
            }
            if start.elapsed() >= budget {
                break Err(Error::Timeout);
            }
            out.push(String::from_utf8_lossy(unstuff(&line)).into_owned());
        }
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    match line.split_last() {
        Some((&CR, rest)) => rest,
        _ => line,
    }
}

fn strip_newline(line: &[u8]) -> &[u8] {
    match line.split_last() {
        Some((&LF, rest)) => strip_cr(rest),
        _ => line,
    }
}

fn is_terminator(content: &[u8]) -> bool {
    content == [DOT]
}

/// Remove exactly one leading dot.
fn unstuff(content: &[u8]) -> &[u8] {
    match content.split_first() {
        Some((&DOT, rest)) => rest,
        _ => content,
    }
}
