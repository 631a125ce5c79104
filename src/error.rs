//! POP3 error types.

use std::collections::TryReserveError;
use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::io::ErrorKind;
use std::result;

#[cfg(feature = "native-tls")]
use native_tls::Error as TlsError;
#[cfg(feature = "native-tls")]
use native_tls::HandshakeError as TlsHandshakeError;
#[cfg(feature = "native-tls")]
use std::net::TcpStream;

/// A convenience wrapper around `Result` for `pop3::Error`.
pub type Result<T> = result::Result<T, Error>;

/// A set of errors that can occur in the POP3 engine.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An `io::Error` that occurred while trying to read or write to a network stream.
    Io(IoError),
    /// An error from the `native_tls` library during the TLS handshake.
    #[cfg(feature = "native-tls")]
    TlsHandshake(TlsHandshakeError<TcpStream>),
    /// An error from the `native_tls` library while managing the socket.
    #[cfg(feature = "native-tls")]
    Tls(TlsError),
    /// A `-ERR` response from the POP3 server. Holds the status line.
    No(String),
    /// The connection was terminated unexpectedly, or no response arrived.
    ConnectionLost,
    /// No connection could be established.
    NotConnected,
    /// A multi-line response did not complete within its time budget.
    Timeout,
    /// A message body could not be buffered.
    ResourceExhausted(TryReserveError),
    /// A message body grew past the configured size limit, in bytes.
    TooLarge(usize),
    /// Error validating input data.
    Validate(ValidateError),
}

impl Error {
    /// Whether this error means the stream can no longer be trusted.
    ///
    /// Such errors close the session and are the only ones the single-fetch
    /// retry reconnects for.
    pub fn is_transport(&self) -> bool {
        match *self {
            Error::Io(_) | Error::ConnectionLost | Error::NotConnected | Error::Timeout => true,
            #[cfg(feature = "native-tls")]
            Error::Tls(_) | Error::TlsHandshake(_) => true,
            _ => false,
        }
    }

    /// Whether this error came from a phase time budget or a socket read timeout.
    pub fn is_timeout(&self) -> bool {
        match *self {
            Error::Timeout => true,
            Error::Io(ref e) => {
                e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock
            }
            _ => false,
        }
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error::Io(err)
    }
}

#[cfg(feature = "native-tls")]
impl From<TlsHandshakeError<TcpStream>> for Error {
    fn from(err: TlsHandshakeError<TcpStream>) -> Error {
        Error::TlsHandshake(err)
    }
}

#[cfg(feature = "native-tls")]
impl From<TlsError> for Error {
    fn from(err: TlsError) -> Error {
        Error::Tls(err)
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Error {
        Error::ResourceExhausted(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Io(ref e) => fmt::Display::fmt(e, f),
            #[cfg(feature = "native-tls")]
            Error::Tls(ref e) => fmt::Display::fmt(e, f),
            #[cfg(feature = "native-tls")]
            Error::TlsHandshake(ref e) => fmt::Display::fmt(e, f),
            Error::Validate(ref e) => fmt::Display::fmt(e, f),
            Error::No(ref line) => write!(f, "Server error: {}", line),
            Error::ConnectionLost => f.write_str("No response from server"),
            Error::NotConnected => f.write_str("Cannot connect"),
            Error::Timeout => f.write_str("Timeout while waiting on server response"),
            Error::ResourceExhausted(ref e) => write!(f, "Out of memory fetching mail: {}", e),
            Error::TooLarge(limit) => write!(f, "Message larger than {} bytes", limit),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            #[cfg(feature = "native-tls")]
            Error::Tls(ref e) => Some(e),
            #[cfg(feature = "native-tls")]
            Error::TlsHandshake(ref e) => Some(e),
            Error::ResourceExhausted(ref e) => Some(e),
            Error::Validate(ref e) => Some(e),
            _ => None,
        }
    }
}

/// An invalid character was found in a command argument.
#[derive(Debug)]
pub struct ValidateError(pub char);

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // print character in debug form because invalid ones are often whitespaces
        write!(f, "Invalid character in input: {:?}", self.0)
    }
}

impl StdError for ValidateError {}
