//! The POP3 session: one connection at a time, rebuilt on demand.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::activity::Timestamp;
use crate::cache::MessageCache;
use crate::command::{Command, Mode};
use crate::config::Config;
use crate::conn::{Connection, Transport};
use crate::error::{Error, Result};
use crate::parse::parse_stat;
use crate::pipeline::Pipeline;
use crate::queue::DeletionQueue;
use crate::types::{Capabilities, FetchRequest, Seq, Uidl};

/// Where a session is in its connection sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No stream.
    Disconnected,
    /// Asking the transport for a stream.
    Connecting,
    /// Reading the greeting and, the first time, the capabilities.
    Handshaking,
    /// `USER`/`PASS`.
    Authenticating,
    /// `STAT`/`UIDL`/`LIST`.
    Listing,
    /// Logged in with a fresh listing.
    Ready,
}

/// The protocol state of one mailbox.
///
/// A `Session` is only reachable through the mailbox lock, see
/// [`Mailbox::lock`](crate::Mailbox::lock). Every method here runs a complete
/// protocol exchange, so background actors that need several operations in a
/// row should hold the guard across them.
///
/// Data-returning methods never fail loudly: they return `None`, an empty
/// list, or 0, and leave a diagnostic in [`last_error`](Self::last_error).
pub struct Session {
    pub(crate) config: Config,
    transport: Arc<dyn Transport>,
    pub(crate) queue: Arc<dyn DeletionQueue>,
    pub(crate) pipeline: Option<Pipeline<Connection>>,
    state: State,
    connected: bool,
    capabilities: Option<Capabilities>,
    pub(crate) cache: MessageCache,
    mails: Seq,
    /// Whether the current connection got a `UIDL` listing.
    pub(crate) listed: bool,
    last_error: String,
    activity: Timestamp,
    checked: Timestamp,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("capabilities", &self.capabilities)
            .field("mails", &self.mails)
            .field("cached", &self.cache.len())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Session {
    pub(crate) fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        queue: Arc<dyn DeletionQueue>,
        activity: Timestamp,
        checked: Timestamp,
    ) -> Self {
        log::debug!("mailbox {}@{}:{}", config.user, config.host, config.port);
        Session {
            config,
            transport,
            queue,
            pipeline: None,
            state: State::Disconnected,
            connected: false,
            capabilities: None,
            cache: MessageCache::default(),
            mails: 0,
            listed: false,
            last_error: Error::ConnectionLost.to_string(),
            activity,
            checked,
        }
    }

    /// Whether the session holds a logged-in stream.
    pub fn is_connected(&self) -> bool {
        self.connected && self.pipeline.is_some()
    }

    /// The current connection phase.
    pub fn state(&self) -> State {
        self.state
    }

    /// The server capabilities, once learned. They are asked for on the first
    /// connection only.
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.capabilities
    }

    /// Connect if not connected.
    ///
    /// Every operation that needs the UIDL mapping calls this first, since
    /// the mapping only exists after a successful listing.
    pub fn check_connection(&mut self) -> Result<()> {
        log::debug!("check_connection()");
        if !self.is_connected() {
            self.connect();
            if !self.is_connected() {
                return Err(Error::NotConnected);
            }
        }
        Ok(())
    }

    /// Connect if not connected. Returns whether the session is connected afterwards.
    pub fn connect_to_server(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }
        self.connect();
        self.is_connected()
    }

    /// Close (waiting for queued deletions to be confirmed) and reconnect,
    /// picking up server-side changes.
    pub fn refresh(&mut self) {
        self.close(true);
        self.connect();
    }

    /// The number of messages, forcing a connection. 0 when disconnected.
    pub fn num_mails(&mut self) -> Seq {
        log::debug!("num_mails()");
        let _ = self.check_connection();
        if self.is_connected() {
            self.mails
        } else {
            0
        }
    }

    /// The most recent error, without the `-ERR ` prefix.
    pub fn last_error(&self) -> String {
        let e = self.last_error.as_str();
        let e = match e.strip_prefix("-ERR ") {
            Some(rest) if !rest.is_empty() => rest,
            _ => e,
        };
        e.trim().to_string()
    }

    /// Known UIDLs, in no particular order. `None` when disconnected; never connects.
    pub fn uidls(&self) -> Option<Vec<Uidl>> {
        if !self.is_connected() {
            return None;
        }
        Some(self.cache.uidls())
    }

    /// Cached size of a message from the last `LIST`. Never connects; 0 if unknown.
    pub fn size(&self, uidl: &str) -> u64 {
        let size = self.cache.size_of(uidl);
        log::debug!("size({}) = {}", uidl, size);
        size
    }

    /// Fetch the header of a message. Does not cache.
    pub fn header(&mut self, uidl: &str) -> Option<Vec<u8>> {
        if let Err(e) = self.check_connection() {
            log::debug!("Error fetching header: {}", e);
            return None;
        }
        let id = self.cache.id(uidl)?;
        self.header_by_id(uidl, id)
    }

    /// Fetch a whole message. Does not cache.
    pub fn body(&mut self, uidl: &str) -> Option<Vec<u8>> {
        if let Err(e) = self.check_connection() {
            log::debug!("Error fetching body: {}", e);
            return None;
        }
        let id = self.cache.id(uidl)?;
        self.body_by_id(uidl, id)
    }

    /// Fetch headers and/or bodies in one batch, filling in each request's buffer.
    ///
    /// Requests whose UIDL is unknown, or whose fetch failed, are left
    /// without a buffer. There is no total time limit.
    pub fn bodies(&mut self, requests: &mut [FetchRequest]) {
        if let Err(e) = self.check_connection() {
            log::debug!("Error fetching: {}", e);
            return;
        }
        let top = self.capabilities.map_or(false, |c| c.top);
        let mut slots = Vec::with_capacity(requests.len());
        let mut cmds = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            let id = match self.cache.id(request.uidl()) {
                Some(id) => id,
                None => continue,
            };
            let text = if request.header_only() && top {
                format!("TOP {} 0", id)
            } else {
                format!("RETR {}", id)
            };
            cmds.push(Command::new(text, Mode::Body));
            slots.push(i);
        }
        if cmds.is_empty() {
            return;
        }
        if let Err(e) = self.run(&mut cmds) {
            log::debug!("Error fetching bodies: {}", e);
            return;
        }
        for (cmd, i) in cmds.iter_mut().zip(slots) {
            if let Some(body) = cmd.take_body() {
                requests[i].set_buffer(body);
            }
        }
    }

    /// Header by message number: `TOP id 0` when supported, `RETR id` otherwise
    /// or when `TOP` is refused.
    fn header_by_id(&mut self, uidl: &str, id: Seq) -> Option<Vec<u8>> {
        log::debug!("header({})", id);
        if !self.in_range(id) {
            return None;
        }
        if self.capabilities.map_or(false, |c| c.top) {
            match self.fetch_with_retry(uidl, id, format!("TOP {} 0", id)) {
                Ok(header) => return Some(header),
                Err(Error::No(_)) => log::debug!("TOP failed, trying RETR"),
                Err(_) => return None,
            }
        }
        match self.fetch_with_retry(uidl, id, format!("RETR {}", id)) {
            Ok(header) => Some(header),
            Err(e) => {
                log::debug!("RETR returned nothing: {}", e);
                None
            }
        }
    }

    fn body_by_id(&mut self, uidl: &str, id: Seq) -> Option<Vec<u8>> {
        log::debug!("body({})", id);
        if !self.in_range(id) {
            return None;
        }
        match self.fetch_with_retry(uidl, id, format!("RETR {}", id)) {
            Ok(body) => Some(body),
            Err(e) => {
                log::debug!("RETR returned nothing: {}", e);
                None
            }
        }
    }

    fn in_range(&mut self, id: Seq) -> bool {
        if id >= 1 && id <= self.mails {
            true
        } else {
            self.last_error = "Message id out of range.".to_string();
            false
        }
    }

    /// One `TOP` or `RETR`. A `-ERR` reply is [`Error::No`] with the status line.
    pub(crate) fn fetch_with_retry(&mut self, uidl: &str, id: Seq, text: String) -> Result<Vec<u8>> {
        self.with_retry(uidl, id, |session| {
            let mut cmds = [Command::new(text.as_str(), Mode::Body)];
            session.run(&mut cmds)?;
            let [mut cmd] = cmds;
            if !cmd.ok {
                return Err(Error::No(cmd.status));
            }
            cmd.take_body().ok_or(Error::ConnectionLost)
        })
    }

    /// Run `op`; if it fails at the transport level, reconnect once and run it again.
    ///
    /// `op` must issue the same command both times. Between attempts the
    /// message is looked up again and the retry is abandoned if `uidl` no
    /// longer maps to `id`, so a stale number never fetches another message.
    ///
    /// Other errors, [`Error::No`] included, are returned as they are.
    pub(crate) fn with_retry<T, F>(&mut self, uidl: &str, id: Seq, mut op: F) -> Result<T>
    where
        F: FnMut(&mut Session) -> Result<T>,
    {
        let first = match op(self) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        if !first.is_transport() {
            log::debug!("not retrying: {}", first);
            return Err(first);
        }
        log::debug!("first attempt failed: {}", first);

        self.connect();
        if !self.is_connected() {
            log::debug!("not connected after reconnect");
            return Err(first);
        }
        if self.cache.id(uidl) != Some(id) {
            log::debug!("{} moved from {} after reconnect", uidl, id);
            self.last_error = format!("{} (message {} changed after reconnect)", first, id);
            return Err(first);
        }

        op(self).map_err(|e| {
            log::debug!("second attempt failed: {}", e);
            e
        })
    }

    /// Close the connection, deleting queued messages.
    ///
    /// With `wait`, queued deletions go through the verified batch delete and
    /// confirmed UIDLs leave the queue; otherwise they are sent without
    /// waiting and stay queued. The connection is dropped either way.
    pub fn close(&mut self, wait: bool) {
        log::debug!("close()");
        if self.pipeline.is_some() {
            let queued = self.queue.queued();
            let res = if wait {
                if queued.iter().any(|uidl| self.cache.id(uidl).is_some()) {
                    for uidl in self.delete(queued) {
                        self.queue.remove(&uidl);
                    }
                    Ok(())
                } else {
                    if self.listed {
                        // none of them is on the server any more
                        for uidl in &queued {
                            self.queue.remove(uidl);
                        }
                    }
                    let mut cmds = [Command::new("QUIT", Mode::Ack)];
                    self.run(&mut cmds).map(|_| ())
                }
            } else {
                let ids: Vec<Seq> = queued.iter().filter_map(|uidl| self.cache.id(uidl)).collect();
                self.delete_no_wait(&ids)
            };
            match res {
                Ok(()) => log::debug!("close() complete"),
                Err(e) => log::debug!("error closing: {}", e),
            }
        }
        self.disconnect();
    }

    /// Drop the stream without saying goodbye and forget the listing.
    pub(crate) fn disconnect(&mut self) {
        self.pipeline = None;
        self.connected = false;
        self.state = State::Disconnected;
        self.clear();
    }

    fn clear(&mut self) {
        self.cache.clear();
        self.mails = 0;
        self.listed = false;
    }

    /// Connect, log in with `USER`/`PASS`, and list with `STAT`, `UIDL`, `LIST`.
    pub(crate) fn connect(&mut self) {
        log::debug!("connect()");
        self.clear();
        if self.pipeline.is_some() {
            self.close(false);
        }

        self.state = State::Connecting;
        let stream = match self.transport.connect(&self.config.host, self.config.port) {
            Ok(stream) => stream,
            Err(e) => {
                log::debug!("Error connecting: {}", e);
                self.last_error = format!(
                    "Cannot connect ({}:{}) - {}",
                    self.config.host, self.config.port, e
                );
                self.state = State::Disconnected;
                return;
            }
        };
        self.pipeline = Some(
            Pipeline::new(
                stream,
                self.activity.clone(),
                self.config.timeouts.lines,
                self.config.debug,
            )
            .with_body_limit(self.config.max_message_size.unwrap_or(usize::MAX)),
        );
        self.last_error.clear();

        match self.open() {
            Ok(true) => {
                self.state = State::Ready;
                log::debug!("connected, {} messages", self.mails);
            }
            Ok(false) => {
                if self.last_error.is_empty() {
                    self.last_error = "Error connecting to server".to_string();
                }
                self.close(false);
            }
            Err(e) => {
                self.last_error = format!("Error opening mailbox: {}", e);
                self.disconnect();
            }
        }
    }

    fn open(&mut self) -> Result<bool> {
        let timeouts = self.config.timeouts;

        self.state = State::Handshaking;
        self.set_read_timeout(timeouts.listing)?;
        if !self.handshake()? {
            return Ok(false);
        }

        self.state = State::Authenticating;
        self.set_read_timeout(timeouts.auth)?;
        let mut cmds = [
            Command::new(format!("USER {}", self.config.user), Mode::Ack),
            Command::new(format!("PASS {}", self.config.password), Mode::Ack),
        ];
        if !self.run(&mut cmds)? {
            return Ok(false);
        }
        self.connected = true;

        self.state = State::Listing;
        self.set_read_timeout(timeouts.listing)?;
        let mut cmds = [
            Command::new("STAT", Mode::Ack),
            Command::new("UIDL", Mode::Lines),
            Command::new("LIST", Mode::Lines),
        ];
        // each response stands on its own
        self.run(&mut cmds)?;
        let [stat, mut uidl, mut list] = cmds;

        if stat.ok {
            self.mails = parse_stat(&stat.status);
        } else {
            log::debug!("STAT failed");
        }
        let uidls = uidl.take_lines();
        if uidls.is_none() {
            log::debug!("UIDL failed");
        }
        self.cache.rebuild_uidls(uidls.as_deref());
        self.listed = uidls.is_some();
        if self.listed {
            self.checked.touch();
        }
        let sizes = list.take_lines();
        if sizes.is_none() {
            log::debug!("LIST failed");
        }
        self.cache.rebuild_sizes(sizes.as_deref());

        self.set_read_timeout(timeouts.idle)?;
        Ok(true)
    }

    /// Read the greeting and, the first time around, the capabilities.
    fn handshake(&mut self) -> Result<bool> {
        let ask_capa = self.capabilities.is_none();
        let mut cmds = vec![Command::greeting()];
        if ask_capa {
            cmds.push(Command::new("CAPA", Mode::Lines));
        } else {
            log::debug!("Skipping CAPA");
        }
        self.run(&mut cmds)?;
        if !cmds[0].ok {
            return Ok(false);
        }
        if ask_capa {
            let caps = match cmds[1].take_lines() {
                Some(lines) => Capabilities::parse(lines),
                None => {
                    // no CAPA support means no extensions
                    self.last_error.clear();
                    Capabilities::default()
                }
            };
            log::debug!(
                "POP3 server caps: pipelining? {} UIDL? {} TOP? {}",
                caps.pipelining,
                caps.uidl,
                caps.top
            );
            self.capabilities = Some(caps);
        }
        Ok(true)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        match self.pipeline {
            Some(ref mut pipeline) => pipeline.set_read_timeout(timeout),
            None => Err(Error::NotConnected),
        }
    }

    /// Run a batch on the current stream, pipelined when the server allows it.
    ///
    /// The first `-ERR` of the batch becomes the last error. A failure of the
    /// stream itself drops the connection.
    pub(crate) fn run(&mut self, cmds: &mut [Command]) -> Result<bool> {
        let pipelining = self.capabilities.map_or(false, |c| c.pipelining);
        let pipeline = self.pipeline.as_mut().ok_or(Error::NotConnected)?;
        let mut first_error = String::new();
        let res = pipeline.execute(cmds, pipelining, &mut first_error);
        if !first_error.is_empty() {
            self.last_error = first_error;
        }
        match res {
            Err(e @ Error::Validate(_)) => {
                // nothing was written, the stream is still good
                self.last_error = e.to_string();
                Err(e)
            }
            Err(e) => {
                self.last_error = e.to_string();
                self.disconnect();
                Err(e)
            }
            ok => ok,
        }
    }

    /// Message number for a UIDL in the current listing.
    pub(crate) fn id(&self, uidl: &str) -> Option<Seq> {
        self.cache.id(uidl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::error::ValidateError;
    use crate::mock_stream::{
        builder, connected, sent, session, session_with, MockStream, MockTransport, CAPA, LISTING,
        LOGIN,
    };
    use std::io::ErrorKind;

    #[test]
    fn connect_sequence() {
        let (s, _, written) = connected("");
        assert_eq!(s.state(), State::Ready);
        assert_eq!(
            s.capabilities(),
            Some(Capabilities {
                pipelining: true,
                uidl: true,
                top: true
            })
        );
        assert_eq!(s.mails, 2);
        assert_eq!(s.id("aaa"), Some(1));
        assert_eq!(s.size("bbb"), 200);
        assert!(s.checked.get().is_some());
        assert_eq!(
            sent(&written),
            "CAPA\r\nUSER bob\r\nPASS hunter2\r\nSTAT\r\nUIDL\r\nLIST\r\n"
        );
    }

    #[test]
    fn capabilities_asked_once() {
        let transport = MockTransport::new();
        transport.script(&format!("{}{}{}", CAPA, LOGIN, LISTING));
        let second = transport.script(&format!("+OK again\r\n{}{}", LOGIN, LISTING));
        let mut s = session(&transport);
        assert!(s.connect_to_server());
        s.disconnect();
        assert!(s.connect_to_server());
        assert_eq!(
            sent(&second),
            "USER bob\r\nPASS hunter2\r\nSTAT\r\nUIDL\r\nLIST\r\n"
        );
    }

    #[test]
    fn capa_refused_still_connects() {
        let transport = MockTransport::new();
        let written = transport.script(&format!(
            "+OK hi\r\n-ERR unknown command\r\n{}{}",
            LOGIN, LISTING
        ));
        let mut s = session(&transport);
        assert!(s.connect_to_server());
        assert_eq!(s.capabilities(), Some(Capabilities::default()));
        assert_eq!(s.last_error(), "");
        assert!(sent(&written).starts_with("CAPA\r\nUSER bob\r\n"));
    }

    #[test]
    fn bad_password() {
        let transport = MockTransport::new();
        let written = transport.script(&format!("{}+OK\r\n-ERR Login failed.\r\n", CAPA));
        let mut s = session(&transport);
        assert!(!s.connect_to_server());
        assert_eq!(s.state(), State::Disconnected);
        assert_eq!(s.last_error(), "Login failed.");
        // the mailbox says goodbye after a refused login
        assert!(sent(&written).ends_with("PASS hunter2\r\nQUIT\r\n"));
        assert!(!s.last_error().contains("hunter2"));
    }

    #[test]
    fn unreachable_server() {
        let transport = MockTransport::new();
        let mut s = session(&transport);
        assert!(!s.connect_to_server());
        assert!(s.last_error().starts_with("Cannot connect (pop.example.com:110)"));
        assert!(s.check_connection().is_err());
        assert_eq!(s.num_mails(), 0);
    }

    #[test]
    fn silent_server() {
        let transport = MockTransport::new();
        transport.push(MockStream::default().with_eof());
        transport.push(MockStream::default().with_err());
        let mut s = session(&transport);
        assert!(!s.connect_to_server());
        assert_eq!(s.last_error(), "Error opening mailbox: No response from server");
        assert!(!s.connect_to_server());
        assert_eq!(s.last_error(), "Error opening mailbox: MockStream Error");
        assert_eq!(s.state(), State::Disconnected);
    }

    #[test]
    fn partial_listing_failure() {
        let transport = MockTransport::new();
        transport.script(&format!(
            "{}{}-ERR STAT broken\r\n+OK\r\n1 aaa\r\n.\r\n-ERR LIST broken\r\n",
            CAPA, LOGIN
        ));
        let mut s = session(&transport);
        assert!(s.connect_to_server());
        assert_eq!(s.mails, 0);
        assert_eq!(s.id("aaa"), Some(1));
        assert_eq!(s.size("aaa"), 0);
        assert_eq!(s.last_error(), "STAT broken");
    }

    #[test]
    fn stale_ids_never_resolve() {
        let transport = MockTransport::new();
        transport.script(&format!("{}{}{}", CAPA, LOGIN, LISTING));
        transport.script(&format!(
            "+OK\r\n{}+OK 1 99\r\n+OK\r\n1 ccc\r\n.\r\n+OK\r\n1 99\r\n.\r\n",
            LOGIN
        ));
        let mut s = session(&transport);
        assert!(s.connect_to_server());
        assert_eq!(s.id("aaa"), Some(1));
        s.disconnect();
        assert_eq!(s.id("aaa"), None);
        assert!(s.uidls().is_none());
        assert!(s.connect_to_server());
        assert_eq!(s.id("aaa"), None);
        assert_eq!(s.id("ccc"), Some(1));
        assert_eq!(s.size("aaa"), 0);
    }

    #[test]
    fn header_uses_top() {
        let (mut s, _, written) = connected("+OK\r\nSubject: hi\r\n.\r\n");
        assert_eq!(s.header("bbb").unwrap(), b"Subject: hi\r\n".to_vec());
        assert!(sent(&written).ends_with("LIST\r\nTOP 2 0\r\n"));
    }

    #[test]
    fn header_falls_back_to_retr() {
        let (mut s, _, written) =
            connected("-ERR TOP disabled\r\n+OK\r\nSubject: hi\r\n\r\nbody\r\n.\r\n");
        assert_eq!(
            s.header("aaa").unwrap(),
            b"Subject: hi\r\n\r\nbody\r\n".to_vec()
        );
        assert!(sent(&written).ends_with("TOP 1 0\r\nRETR 1\r\n"));
    }

    #[test]
    fn unknown_uidl_sends_nothing() {
        let (mut s, _, written) = connected("");
        let before = sent(&written);
        assert!(s.header("zzz").is_none());
        assert!(s.body("zzz").is_none());
        assert_eq!(sent(&written), before);
    }

    #[test]
    fn size_never_connects() {
        let transport = MockTransport::new();
        let s = session(&transport);
        assert_eq!(s.size("aaa"), 0);
        assert_eq!(transport.connect_count(), 0);
    }

    #[test]
    fn retry_after_transport_failure() {
        let transport = MockTransport::new();
        transport.script(&format!("{}{}{}", CAPA, LOGIN, LISTING));
        let second = transport.script(&format!(
            "+OK\r\n{}{}+OK\r\nhello\r\n.\r\n",
            LOGIN, LISTING
        ));
        let mut s = session(&transport);
        let body = s.body("bbb").unwrap();
        assert_eq!(body, b"hello\r\n".to_vec());
        assert_eq!(transport.connect_count(), 2);
        assert!(sent(&second).ends_with("LIST\r\nRETR 2\r\n"));
    }

    #[test]
    fn second_failure_gives_up() {
        let transport = MockTransport::new();
        transport.script(&format!("{}{}{}", CAPA, LOGIN, LISTING));
        transport.script(&format!("+OK\r\n{}{}+OK\r\npartial\r\n", LOGIN, LISTING));
        let mut s = session(&transport);
        assert!(s.body("aaa").is_none());
        assert_eq!(s.last_error(), "No response from server");
        // exactly one reconnect
        assert_eq!(transport.connect_count(), 2);
        assert!(!s.is_connected());
    }

    #[test]
    fn retry_skipped_when_message_moved() {
        let transport = MockTransport::new();
        transport.script(&format!("{}{}{}", CAPA, LOGIN, LISTING));
        let second = transport.script(&format!(
            "+OK\r\n{}+OK 1 200\r\n+OK\r\n1 bbb\r\n.\r\n+OK\r\n1 200\r\n.\r\n",
            LOGIN
        ));
        let mut s = session(&transport);
        assert!(s.body("bbb").is_none());
        assert!(s.last_error().contains("changed after reconnect"));
        assert!(!sent(&second).contains("RETR"));
    }

    #[test]
    fn protocol_failure_not_retried() {
        let (mut s, transport, _) = connected("-ERR no such message\r\n");
        assert!(s.body("aaa").is_none());
        assert_eq!(s.last_error(), "no such message");
        assert_eq!(transport.connect_count(), 1);
        assert!(s.is_connected());
    }

    #[test]
    fn out_of_range_id() {
        let transport = MockTransport::new();
        transport.script(&format!(
            "{}{}+OK 1 100\r\n+OK\r\n1 aaa\r\n5 eee\r\n.\r\n+OK\r\n.\r\n",
            CAPA, LOGIN
        ));
        let mut s = session(&transport);
        assert!(s.body("eee").is_none());
        assert_eq!(s.last_error(), "Message id out of range.");
    }

    #[test]
    fn bodies_batch() {
        let (mut s, _, written) = connected("+OK\r\nSubject: a\r\n.\r\n+OK\r\nfull b\r\n.\r\n");
        let mut requests = vec![
            FetchRequest::header("aaa"),
            FetchRequest::full("zzz"),
            FetchRequest::full("bbb"),
        ];
        s.bodies(&mut requests);
        assert_eq!(requests[0].buffer(), Some(&b"Subject: a\r\n"[..]));
        assert_eq!(requests[1].buffer(), None);
        assert_eq!(requests[2].buffer(), Some(&b"full b\r\n"[..]));
        assert!(sent(&written).ends_with("LIST\r\nTOP 1 0\r\nRETR 2\r\n"));
    }

    #[test]
    fn read_timeout_drops_connection() {
        let transport = MockTransport::new();
        transport.push(
            MockStream::new(format!("{}{}{}", CAPA, LOGIN, LISTING).into_bytes())
                .with_err_at_end(ErrorKind::TimedOut),
        );
        let mut s = session(&transport);
        assert!(s.connect_to_server());
        assert!(s.body("aaa").is_none());
        assert!(!s.is_connected());
        assert!(s.last_error().starts_with("Cannot connect"));
    }

    #[test]
    fn phase_timeouts() {
        let transport = MockTransport::new();
        let stream = MockStream::new(format!("{}{}{}", CAPA, LOGIN, LISTING).into_bytes());
        let timeouts = stream.timeouts();
        transport.push(stream);
        let secs = Duration::from_secs;
        let mut b = builder();
        b.timeouts(Timeouts {
            connect: secs(5),
            listing: secs(11),
            auth: secs(22),
            idle: secs(33),
            lines: secs(44),
        });
        let mut s = session_with(&transport, &b);
        assert!(s.connect_to_server());
        assert_eq!(
            *timeouts.lock().unwrap(),
            vec![
                Some(secs(11)),
                Some(secs(22)),
                Some(secs(11)),
                Some(secs(33))
            ]
        );
    }

    #[test]
    fn oversized_body_drops_connection() {
        let transport = MockTransport::new();
        transport.script(&format!(
            "{}{}{}+OK\r\nthis body is too big\r\n.\r\n",
            CAPA, LOGIN, LISTING
        ));
        let mut b = builder();
        b.max_message_size(Some(4));
        let mut s = session_with(&transport, &b);
        assert!(s.body("aaa").is_none());
        assert!(!s.is_connected());
        // not a transport failure, so no reconnect
        assert_eq!(transport.connect_count(), 1);
        assert_eq!(s.last_error(), "Message larger than 4 bytes");
    }

    #[test]
    fn refused_fetch_is_server_error() {
        let (mut s, _, _) = connected("-ERR no such message\r\n");
        match s.fetch_with_retry("aaa", 1, "RETR 1".to_string()) {
            Err(Error::No(status)) => assert_eq!(status, "-ERR no such message"),
            other => panic!("expected a server error, got {:?}", other),
        }
        assert!(s.is_connected());
    }

    #[test]
    fn invalid_command_recorded() {
        let (mut s, _, written) = connected("");
        let before = sent(&written);
        let mut cmds = [Command::new("RETR 1\r\nDELE 1", Mode::Body)];
        assert!(s.run(&mut cmds).is_err());
        assert!(s.is_connected());
        assert_eq!(s.last_error(), Error::Validate(ValidateError('\r')).to_string());
        assert_eq!(sent(&written), before);
    }

    #[test]
    fn last_error_strips_err() {
        let transport = MockTransport::new();
        let mut s = session(&transport);
        s.last_error = "-ERR  mailbox locked \r".to_string();
        assert_eq!(s.last_error(), "mailbox locked");
        s.last_error = "-ERR ".to_string();
        assert_eq!(s.last_error(), "-ERR");
    }
}
