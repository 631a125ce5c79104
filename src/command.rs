//! A single request/response unit of a command batch.

use std::fmt;

/// How the body of a positive response is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Only the status line is read.
    Ack,
    /// A dot-terminated body is collected into one byte buffer.
    Body,
    /// A dot-terminated body is collected as one string per line.
    Lines,
}

/// The decoded payload of a command's response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    /// Nothing beyond the status line (an `Ack` command, or a failure).
    #[default]
    None,
    /// The unstuffed body of a `Body` command.
    Body(Vec<u8>),
    /// The unstuffed lines of a `Lines` command, trailing `\r` kept.
    Lines(Vec<String>),
}

/// A command to send, the way to read its answer, and, once executed, the answer.
///
/// A command with no text reads a response without sending anything; the
/// server greeting is read this way.
#[derive(Clone)]
pub struct Command {
    text: Option<String>,
    mode: Mode,
    /// Whether the server answered `+OK` and the payload was read.
    pub ok: bool,
    /// The trimmed status line.
    pub status: String,
    /// The decoded payload.
    pub payload: Payload,
}

impl Command {
    /// A command that sends `text` and reads its response according to `mode`.
    pub fn new(text: impl Into<String>, mode: Mode) -> Self {
        Command::make(Some(text.into()), mode)
    }

    /// The placeholder that reads the server greeting.
    pub fn greeting() -> Self {
        Command::make(None, Mode::Ack)
    }

    fn make(text: Option<String>, mode: Mode) -> Self {
        Command {
            text,
            mode,
            ok: false,
            status: String::new(),
            payload: Payload::None,
        }
    }

    /// The wire text, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The response mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Take the body out of a successful `Body` command.
    pub fn take_body(&mut self) -> Option<Vec<u8>> {
        match std::mem::take(&mut self.payload) {
            Payload::Body(body) if self.ok => Some(body),
            _ => None,
        }
    }

    /// Take the lines out of a successful `Lines` command.
    pub fn take_lines(&mut self) -> Option<Vec<String>> {
        match std::mem::take(&mut self.payload) {
            Payload::Lines(lines) if self.ok => Some(lines),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    /// Shows the command as it would be logged; passwords are never shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text {
            Some(ref text) => f.write_str(redact(text)),
            None => f.write_str("(greeting)"),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("text", &self.text.as_deref().map(redact))
            .field("mode", &self.mode)
            .field("ok", &self.ok)
            .field("status", &self.status)
            .field("payload", &self.payload)
            .finish()
    }
}

/// Hide the argument of `PASS`.
pub(crate) fn redact(text: &str) -> &str {
    if text.starts_with("PASS") {
        "PASS provided"
    } else {
        text
    }
}
