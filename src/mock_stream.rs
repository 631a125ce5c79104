use crate::activity::Timestamp;
use crate::config::MailboxBuilder;
use crate::conn::{Connection, SetReadTimeout, Transport};
use crate::error::{Error as Pop3Error, Result as Pop3Result};
use crate::queue::PendingDeletions;
use crate::session::Session;

use std::cmp::min;
use std::collections::VecDeque;
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Greeting plus a `CAPA` answer advertising `TOP`, `UIDL` and `PIPELINING`.
pub const CAPA: &str = "+OK POP3 ready\r\n\
                        +OK Capability list follows\r\nTOP\r\nUIDL\r\nPIPELINING\r\n.\r\n";
/// Positive answers to `USER` and `PASS`.
pub const LOGIN: &str = "+OK\r\n+OK logged in\r\n";
/// `STAT`, `UIDL` and `LIST` for two messages, `aaa` (120 octets) and `bbb` (200 octets).
pub const LISTING: &str = "+OK 2 320\r\n\
                           +OK\r\n1 aaa\r\n2 bbb\r\n.\r\n\
                           +OK\r\n1 120\r\n2 200\r\n.\r\n";

/// Writes made by a `MockStream`, readable after the stream moved into a session.
pub type Written = Arc<Mutex<Vec<u8>>>;

/// Read timeouts applied to a `MockStream`, in order.
pub type ReadTimeouts = Arc<Mutex<Vec<Option<Duration>>>>;

pub struct MockStream {
    read_buf: Vec<u8>,
    read_pos: usize,
    written: Written,
    timeouts: ReadTimeouts,
    err_on_read: bool,
    eof_on_read: bool,
    end_err: Option<ErrorKind>,
    read_delay: usize,
}

impl Default for MockStream {
    fn default() -> Self {
        MockStream {
            read_buf: Vec::new(),
            read_pos: 0,
            written: Written::default(),
            timeouts: ReadTimeouts::default(),
            err_on_read: false,
            eof_on_read: false,
            end_err: None,
            read_delay: 0,
        }
    }
}

impl MockStream {
    pub fn new(read_buf: Vec<u8>) -> MockStream {
        MockStream::default().with_buf(read_buf)
    }

    pub fn with_buf(mut self, read_buf: Vec<u8>) -> MockStream {
        self.read_buf = read_buf;
        self
    }

    pub fn with_eof(mut self) -> MockStream {
        self.eof_on_read = true;
        self
    }

    pub fn with_err(mut self) -> MockStream {
        self.err_on_read = true;
        self
    }

    /// Fail with `kind` instead of EOF once the scripted bytes are used up.
    pub fn with_err_at_end(mut self, kind: ErrorKind) -> MockStream {
        self.end_err = Some(kind);
        self
    }

    pub fn with_delay(mut self) -> MockStream {
        self.read_delay = 1;
        self
    }

    /// Everything written to this stream so far.
    pub fn written(&self) -> Written {
        Arc::clone(&self.written)
    }

    /// Every read timeout set on this stream so far.
    pub fn timeouts(&self) -> ReadTimeouts {
        Arc::clone(&self.timeouts)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.eof_on_read {
            return Ok(0);
        }
        if self.err_on_read {
            return Err(Error::new(ErrorKind::Other, "MockStream Error"));
        }
        if self.read_pos >= self.read_buf.len() {
            return match self.end_err {
                Some(kind) => Err(Error::new(kind, "MockStream exhausted")),
                None => Ok(0),
            };
        }
        let mut write_len = min(buf.len(), self.read_buf.len() - self.read_pos);
        if self.read_delay > 0 {
            self.read_delay -= 1;
            write_len = min(write_len, 1);
        }
        let max_pos = self.read_pos + write_len;
        buf[..write_len].copy_from_slice(&self.read_buf[self.read_pos..max_pos]);
        self.read_pos += write_len;
        Ok(write_len)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl SetReadTimeout for MockStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Pop3Result<()> {
        self.timeouts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(timeout);
        Ok(())
    }
}

/// Hands out one scripted stream per connect, in order. Runs dry with a refused connection.
#[derive(Default, Clone)]
pub struct MockTransport {
    streams: Arc<Mutex<VecDeque<MockStream>>>,
    pub connects: Arc<Mutex<Vec<(String, u16)>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// Queue a stream for the next connect and return a handle on its writes.
    pub fn push(&self, stream: MockStream) -> Written {
        let written = stream.written();
        self.streams.lock().unwrap().push_back(stream);
        written
    }

    /// Queue a stream that replays `script`.
    pub fn script(&self, script: &str) -> Written {
        self.push(MockStream::new(script.as_bytes().to_vec()))
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn connect(&self, host: &str, port: u16) -> Pop3Result<Connection> {
        self.connects.lock().unwrap().push((host.to_string(), port));
        match self.streams.lock().unwrap().pop_front() {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(Pop3Error::Io(Error::new(
                ErrorKind::ConnectionRefused,
                "no scripted server",
            ))),
        }
    }
}

/// Render what was written as a string.
pub fn sent(written: &Written) -> String {
    String::from_utf8(written.lock().unwrap().clone()).unwrap()
}

/// A session for `bob` that connects through `transport`.
pub fn session(transport: &MockTransport) -> Session {
    session_with(transport, &builder())
}

/// The builder behind [`session`]: bob on pop.example.com:110.
pub fn builder() -> MailboxBuilder {
    let mut builder = MailboxBuilder::new("pop.example.com", 110);
    builder.credentials("bob", "hunter2");
    builder
}

pub fn session_with(transport: &MockTransport, builder: &MailboxBuilder) -> Session {
    Session::new(
        builder.config().clone(),
        Arc::new(transport.clone()),
        Arc::new(PendingDeletions::new()),
        Timestamp::default(),
        Timestamp::default(),
    )
}

/// A session connected to a server that lists `aaa` and `bbb`, then replays `script`.
pub fn connected(script: &str) -> (Session, MockTransport, Written) {
    let transport = MockTransport::new();
    let written = transport.script(&format!("{}{}{}{}", CAPA, LOGIN, LISTING, script));
    let mut s = session(&transport);
    assert!(s.connect_to_server(), "{}", s.last_error());
    (s, transport, written)
}
