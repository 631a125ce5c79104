//! A POP3 ([RFC 1939](https://tools.ietf.org/html/rfc1939)) mailbox engine for webmail front ends.
//!
//! The crate keeps one connection per [`Mailbox`], addresses messages by
//! their server-stable UIDL, and reconnects on demand. It pipelines commands
//! when the server advertises `PIPELINING`, retries single fetches once over
//! a fresh connection, and only reports a deletion once the server committed
//! it with a successful `QUIT`.
//!
//! # Usage
//!
//! ```no_run
//! # use pop3::{FetchRequest, MailboxBuilder};
//! # fn main() -> pop3::Result<()> {
//! let mailbox = MailboxBuilder::new("pop.example.com", 995)
//!     .credentials("user", "password")
//!     .tls()?
//!     .build();
//!
//! if !mailbox.connect_to_server() {
//!     eprintln!("{}", mailbox.last_error());
//!     return Ok(());
//! }
//!
//! let uidls = mailbox.uidls().unwrap_or_default();
//! let mut requests: Vec<_> = uidls.iter().map(|u| FetchRequest::header(u.as_str())).collect();
//! mailbox.bodies(&mut requests);
//! for request in &requests {
//!     if let Some(header) = request.buffer() {
//!         println!("{}: {}", request.uidl(), String::from_utf8_lossy(header));
//!     }
//! }
//!
//! if let Some(first) = uidls.first() {
//!     mailbox.queue_for_deletion(first.as_str());
//! }
//! // queued deletions are confirmed by QUIT
//! mailbox.close(true);
//! # Ok(())
//! # }
//! ```
//!
//! Several operations can run without interleaving by holding the lock:
//!
//! ```no_run
//! # use pop3::MailboxBuilder;
//! # let mailbox = MailboxBuilder::new("pop.example.com", 110).build();
//! let mut session = mailbox.lock();
//! let n = session.num_mails();
//! let uidls = session.uidls();
//! drop(session);
//! # let _ = (n, uidls);
//! ```
//!
//! ## Opting out of `native_tls`
//!
//! The `native-tls` feature is on by default. Without it, streams come from
//! [`TcpTransport`] or from any [`Transport`] you provide, for example one
//! that wraps a TLS library of your choice.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod actors;
mod cache;
mod command;
mod delete;
mod parse;
mod pipeline;
mod response;
mod types;

pub mod activity;
pub mod config;
pub mod conn;
pub mod error;
pub mod mailbox;
pub mod queue;
pub mod session;

pub use crate::activity::Timestamp;
pub use crate::cache::MessageCache;
pub use crate::command::{Command, Mode, Payload};
pub use crate::config::{Config, MailboxBuilder, Timeouts};
#[cfg(feature = "native-tls")]
pub use crate::conn::TlsTransport;
pub use crate::conn::{Connection, Pop3Connection, SetReadTimeout, TcpTransport, Transport};
pub use crate::error::{Error, Result};
pub use crate::mailbox::{Mailbox, NewMailListener};
pub use crate::queue::{DeletionQueue, PendingDeletions};
pub use crate::session::{Session, State};
pub use crate::types::*;

#[cfg(test)]
mod mock_stream;
