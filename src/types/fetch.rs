use super::Uidl;

/// A request to fetch one message, filled in by [`Mailbox::bodies`](crate::Mailbox::bodies).
///
/// # Examples
/// ```no_run
/// # use pop3::{FetchRequest, MailboxBuilder};
/// let mailbox = MailboxBuilder::new("pop.example.com", 110)
///     .credentials("user", "password")
///     .build();
/// let mut requests = vec![
///     FetchRequest::header("1234.5678"),
///     FetchRequest::full("1234.5679"),
/// ];
/// mailbox.bodies(&mut requests);
/// for request in &requests {
///     if let Some(buffer) = request.buffer() {
///         println!("{}: {} bytes", request.uidl(), buffer.len());
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    uidl: Uidl,
    header_only: bool,
    buffer: Option<Vec<u8>>,
}

impl FetchRequest {
    /// Request only the header section of the message.
    pub fn header(uidl: impl Into<Uidl>) -> Self {
        FetchRequest {
            uidl: uidl.into(),
            header_only: true,
            buffer: None,
        }
    }

    /// Request the full message.
    pub fn full(uidl: impl Into<Uidl>) -> Self {
        FetchRequest {
            uidl: uidl.into(),
            header_only: false,
            buffer: None,
        }
    }

    /// The UIDL of the requested message.
    pub fn uidl(&self) -> &str {
        &self.uidl
    }

    /// Whether only the header was requested.
    pub fn header_only(&self) -> bool {
        self.header_only
    }

    /// The fetched data, or `None` if the fetch failed or has not run.
    pub fn buffer(&self) -> Option<&[u8]> {
        self.buffer.as_deref()
    }

    /// Take the fetched data out of the request.
    pub fn take_buffer(&mut self) -> Option<Vec<u8>> {
        self.buffer.take()
    }

    pub(crate) fn set_buffer(&mut self, buffer: Vec<u8>) {
        self.buffer = Some(buffer);
    }
}
