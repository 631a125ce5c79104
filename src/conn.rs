//! Streams the engine talks POP3 over, and the transports that open them.

use crate::error::{Error, Result};

use std::fmt::{Debug, Formatter};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(feature = "native-tls")]
use native_tls::{TlsConnector, TlsStream};

/// Must be implemented for a stream so that the engine can apply its
/// phase-scoped read timeouts.
pub trait SetReadTimeout {
    /// Set the timeout for subsequent reads to the given one.
    ///
    /// If `timeout` is `None`, the read timeout should be removed.
    ///
    /// See also `std::net::TcpStream::set_read_timeout`.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
}

impl SetReadTimeout for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        TcpStream::set_read_timeout(self, timeout).map_err(Error::Io)
    }
}

#[cfg(feature = "native-tls")]
impl<T: SetReadTimeout + Read + Write> SetReadTimeout for TlsStream<T> {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.get_mut().set_read_timeout(timeout)
    }
}

/// POP3 connection trait of a read/write stream
pub trait Pop3Connection: Read + Write + Send + SetReadTimeout + private::Sealed {}

impl<T> Pop3Connection for T where T: Read + Write + Send + SetReadTimeout {}

impl Debug for dyn Pop3Connection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "POP3 connection")
    }
}

/// A boxed connection type
pub type Connection = Box<dyn Pop3Connection>;

impl SetReadTimeout for Connection {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }
}

mod private {
    use super::{Read, SetReadTimeout, Write};

    pub trait Sealed {}

    impl<T> Sealed for T where T: Read + Write + SetReadTimeout {}
}

/// Opens a fresh duplex stream to a POP3 server.
///
/// The mailbox asks its transport for a new stream on every (re)connect, so
/// implementations must be reusable.
pub trait Transport: Send + Sync {
    /// Connect to `host:port`, returning a stream positioned before the greeting.
    fn connect(&self, host: &str, port: u16) -> Result<Connection>;
}

impl<F> Transport for F
where
    F: Fn(&str, u16) -> Result<Connection> + Send + Sync,
{
    fn connect(&self, host: &str, port: u16) -> Result<Connection> {
        self(host, port)
    }
}

/// Plain TCP. Every resolved address is tried in order.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Make a transport that gives up on each address after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        TcpTransport { connect_timeout }
    }

    fn tcp(&self, host: &str, port: u16) -> Result<TcpStream> {
        let mut last = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    log::debug!("couldn't connect to {}: {}", addr, e);
                    last = Some(e);
                }
            }
        }
        Err(Error::Io(last.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no addresses to connect to")
        })))
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        TcpTransport::new(Duration::from_secs(30))
    }
}

impl Transport for TcpTransport {
    fn connect(&self, host: &str, port: u16) -> Result<Connection> {
        Ok(Box::new(self.tcp(host, port)?))
    }
}

/// Implicit TLS (POP3S) on top of [`TcpTransport`].
#[cfg(feature = "native-tls")]
#[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
pub struct TlsTransport {
    tcp: TcpTransport,
    connector: TlsConnector,
}

#[cfg(feature = "native-tls")]
impl TlsTransport {
    /// Wrap connections from `tcp` with the given TLS configuration.
    pub fn new(tcp: TcpTransport, connector: TlsConnector) -> Self {
        TlsTransport { tcp, connector }
    }

    /// A transport using the platform's default TLS settings.
    pub fn with_defaults(tcp: TcpTransport) -> Result<Self> {
        Ok(TlsTransport::new(tcp, TlsConnector::builder().build()?))
    }
}

#[cfg(feature = "native-tls")]
impl Transport for TlsTransport {
    fn connect(&self, host: &str, port: u16) -> Result<Connection> {
        let tcp = self.tcp.tcp(host, port)?;
        let tls = self.connector.connect(host, tcp)?;
        Ok(Box::new(tls))
    }
}
