use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::conn::{TcpTransport, Transport};
#[cfg(feature = "native-tls")]
use crate::conn::TlsTransport;
#[cfg(feature = "native-tls")]
use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::queue::{DeletionQueue, PendingDeletions};

/// Per-phase socket budgets.
///
/// The read timeouts are applied to the stream when a connection enters the
/// matching phase; `lines` bounds the total wall-clock time of one
/// `CAPA`/`UIDL`/`LIST` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Establishing the TCP connection.
    pub connect: Duration,
    /// Reading the greeting, `CAPA`, and the `STAT`/`UIDL`/`LIST` batch.
    pub listing: Duration,
    /// Reading `USER`/`PASS` responses.
    pub auth: Duration,
    /// Any read once the mailbox is ready.
    pub idle: Duration,
    /// Total time for one multi-line listing.
    pub lines: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            connect: Duration::from_secs(30),
            listing: Duration::from_secs(120),
            auth: Duration::from_secs(60),
            idle: Duration::from_secs(300),
            lines: Duration::from_secs(120),
        }
    }
}

/// Everything a [`Mailbox`] needs to know about its server.
#[derive(Clone)]
pub struct Config {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// `USER` argument.
    pub user: String,
    /// `PASS` argument.
    pub password: String,
    /// Socket budgets.
    pub timeouts: Timeouts,
    /// Close the connection after this much inactivity.
    pub idle_close: Option<Duration>,
    /// Refresh the listing this often and report new mail.
    pub background_check: Option<Duration>,
    /// Run queued deletions once the mailbox has been quiet this long.
    pub delete_delay: Option<Duration>,
    /// Largest message body to buffer; larger ones fail and drop the connection.
    pub max_message_size: Option<usize>,
    /// Log every line sent and received under the `pop3::wire` target.
    pub debug: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<hidden>")
            .field("timeouts", &self.timeouts)
            .field("idle_close", &self.idle_close)
            .field("background_check", &self.background_check)
            .field("delete_delay", &self.delete_delay)
            .field("max_message_size", &self.max_message_size)
            .field("debug", &self.debug)
            .finish()
    }
}

/// A convenience builder for [`Mailbox`] structs.
///
/// Creating a [`Mailbox`] over plain TCP is straightforward:
/// ```no_run
/// # use pop3::MailboxBuilder;
/// let mailbox = MailboxBuilder::new("pop.example.com", 110)
///     .credentials("user", "password")
///     .build();
/// if mailbox.connect_to_server() {
///     println!("{} messages", mailbox.num_mails());
/// } else {
///     println!("{}", mailbox.last_error());
/// }
/// ```
///
/// POP3S goes through [`tls`](Self::tls), and any other stream through
/// [`transport`](Self::transport):
/// ```no_run
/// # use pop3::MailboxBuilder;
/// # fn main() -> Result<(), pop3::Error> {
/// let mailbox = MailboxBuilder::new("pop.example.com", 995)
///     .credentials("user", "password")
///     .tls()?
///     .build();
/// # Ok(())
/// # }
/// ```
pub struct MailboxBuilder {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
    queue: Option<Arc<dyn DeletionQueue>>,
}

impl MailboxBuilder {
    /// Make a new `MailboxBuilder` using the given host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        MailboxBuilder {
            config: Config {
                host: host.into(),
                port,
                user: String::new(),
                password: String::new(),
                timeouts: Timeouts::default(),
                idle_close: Some(Duration::from_secs(5 * 60)),
                background_check: None,
                delete_delay: Some(Duration::from_secs(60)),
                max_message_size: None,
                debug: false,
            },
            transport: None,
            queue: None,
        }
    }

    /// Log in with `USER`/`PASS`.
    pub fn credentials(&mut self, user: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.config.user = user.into();
        self.config.password = password.into();
        self
    }

    /// Override the socket budgets.
    pub fn timeouts(&mut self, timeouts: Timeouts) -> &mut Self {
        self.config.timeouts = timeouts;
        self
    }

    /// Close after this much inactivity; `None` keeps connections open.
    pub fn idle_close(&mut self, after: Option<Duration>) -> &mut Self {
        self.config.idle_close = after;
        self
    }

    /// Check for new mail periodically; `None` (the default) disables it.
    pub fn background_check(&mut self, every: Option<Duration>) -> &mut Self {
        self.config.background_check = every;
        self
    }

    /// Drain queued deletions after this much quiet; `None` waits for an explicit close.
    pub fn delete_delay(&mut self, after: Option<Duration>) -> &mut Self {
        self.config.delete_delay = after;
        self
    }

    /// Refuse to buffer message bodies larger than `bytes`; `None` (the default) only
    /// stops at allocation failure.
    pub fn max_message_size(&mut self, bytes: Option<usize>) -> &mut Self {
        self.config.max_message_size = bytes;
        self
    }

    /// Log wire traffic (passwords excluded).
    pub fn debug(&mut self, debug: bool) -> &mut Self {
        self.config.debug = debug;
        self
    }

    /// Open streams through a custom transport.
    pub fn transport(&mut self, transport: impl Transport + 'static) -> &mut Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use implicit TLS with the platform defaults.
    #[cfg(feature = "native-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
    pub fn tls(&mut self) -> Result<&mut Self> {
        let tcp = TcpTransport::new(self.config.timeouts.connect);
        self.transport = Some(Arc::new(TlsTransport::with_defaults(tcp)?));
        Ok(self)
    }

    /// Share an externally owned queue of pending deletions.
    pub fn deletion_queue(&mut self, queue: Arc<dyn DeletionQueue>) -> &mut Self {
        self.queue = Some(queue);
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the mailbox and start its background actors. Does not connect.
    pub fn build(&mut self) -> Mailbox {
        let transport = self
            .transport
            .clone()
            .unwrap_or_else(|| Arc::new(TcpTransport::new(self.config.timeouts.connect)));
        let queue = self
            .queue
            .clone()
            .unwrap_or_else(|| Arc::new(PendingDeletions::new()));
        let mailbox = Mailbox::new(self.config.clone(), transport, queue);
        mailbox.start_actors();
        mailbox
    }
}
