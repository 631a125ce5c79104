//! This module contains types used throughout the POP3 protocol.

/// From [section 7 of RFC 1939](https://tools.ietf.org/html/rfc1939#section-7).
///
/// A message number, assigned by the server when the maildrop is opened. Message numbers run
/// from 1 to the number of messages in the maildrop and are only meaningful for the connection
/// that produced them: after a reconnect, the same number may refer to a different message.
pub type Seq = u32;

/// From [section 7 of RFC 1939](https://tools.ietf.org/html/rfc1939#section-7).
///
/// The unique-id listing of a message. The unique-id of a message is an arbitrary server-determined
/// string, consisting of one to 70 characters in the range 0x21 to 0x7E, which uniquely identifies
/// a message within a maildrop and which persists across sessions.
///
/// > This persistence is required even if a session ends without entering the UPDATE state. The
/// > server should never reuse an unique-id in a given maildrop, for as long as the entity using
/// > the unique-id exists.
///
/// The engine therefore identifies messages by UIDL in every public operation and translates to
/// a [`Seq`] only inside a live connection.
pub type Uidl = String;

mod capabilities;
pub use self::capabilities::Capabilities;

mod fetch;
pub use self::fetch::FetchRequest;
