//! Sends command batches and pairs every response with its command by position.

use bufstream::BufStream;
use std::io::{Read, Write};
use std::time::Duration;

use crate::activity::Timestamp;
use crate::command::{redact, Command, Mode, Payload};
use crate::conn::SetReadTimeout;
use crate::error::{Error, Result, ValidateError};
use crate::response::ResponseReader;

const CR: u8 = 0x0d;
const LF: u8 = 0x0a;
const OK: &str = "+OK";

/// The command stream to one POP3 server.
#[derive(Debug)]
pub(crate) struct Pipeline<T: Read + Write> {
    stream: BufStream<T>,
    activity: Timestamp,
    lines_budget: Duration,
    body_limit: usize,
    debug: bool,
}

impl<T: Read + Write> Pipeline<T> {
    pub(crate) fn new(stream: T, activity: Timestamp, lines_budget: Duration, debug: bool) -> Self {
        Pipeline {
            stream: BufStream::new(stream),
            activity,
            lines_budget,
            body_limit: usize::MAX,
            debug,
        }
    }

    /// Cap the size of `Body` payloads.
    pub(crate) fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Run a batch of commands.
    ///
    /// With `pipelining` every command is written before the first response is
    /// read; otherwise each command waits for its response. Either way the
    /// n-th response belongs to the n-th command. The status line of the
    /// first failing command, if any, is stored in `first_error`.
    ///
    /// Returns `Ok(true)` if every command succeeded. A missing response
    /// aborts the whole batch with an error.
    pub(crate) fn execute(
        &mut self,
        cmds: &mut [Command],
        pipelining: bool,
        first_error: &mut String,
    ) -> Result<bool> {
        for cmd in cmds.iter() {
            if let Some(text) = cmd.text() {
                validate(text)?;
            }
        }

        if pipelining {
            log::debug!("POP3 pipelining {} commands", cmds.len());
            for cmd in cmds.iter() {
                if let Some(text) = cmd.text() {
                    self.write_line(text)?;
                }
            }
        }
        self.stream.flush()?;

        let total = cmds.len();
        let mut all_ok = true;
        for (i, cmd) in cmds.iter_mut().enumerate() {
            if !pipelining {
                if let Some(text) = cmd.text() {
                    self.write_line(text)?;
                    self.stream.flush()?;
                }
            }

            let status = self.reader().read_status()?;
            cmd.payload = Payload::None;
            if status.starts_with(OK) {
                log::debug!("OK after {} of {} responses: {:?}", i + 1, total, status);
                cmd.payload = match cmd.mode() {
                    Mode::Ack => Payload::None,
                    Mode::Body => {
                        let limit = self.body_limit;
                        Payload::Body(self.reader().read_body(limit)?)
                    }
                    Mode::Lines => {
                        let budget = self.lines_budget;
                        Payload::Lines(self.reader().read_lines(budget)?)
                    }
                };
                cmd.ok = true;
            } else {
                // A negative response is a single line, so no body follows it.
                log::debug!(
                    "Fail after {} of {} responses ({}): {:?}",
                    i + 1,
                    total,
                    cmd,
                    status
                );
                if all_ok {
                    *first_error = status.clone();
                }
                all_ok = false;
                cmd.ok = false;
            }
            cmd.status = status;
        }
        Ok(all_ok)
    }

    /// Write a command without flushing or waiting for its response.
    pub(crate) fn send_no_wait(&mut self, text: &str) -> Result<()> {
        validate(text)?;
        self.write_line(text)
    }

    /// Flush anything written by [`send_no_wait`](Self::send_no_wait).
    pub(crate) fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }

    fn reader(&mut self) -> ResponseReader<'_, BufStream<T>> {
        ResponseReader::new(&mut self.stream, &self.activity, self.debug)
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        log::trace!("send({})", redact(text));
        self.stream.write_all(text.as_bytes())?;
        self.stream.write_all(&[CR, LF])?;
        self.activity.touch();
        if self.debug {
            log::trace!(target: "pop3::wire", "C: {}", redact(text));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn get_ref(&self) -> &T {
        self.stream.get_ref()
    }
}

impl<T: Read + Write + SetReadTimeout> Pipeline<T> {
    /// Set the read timeout of the underlying stream.
    pub(crate) fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.stream.get_mut().set_read_timeout(Some(timeout))
    }
}

/// Command text may not carry its own line breaks.
fn validate(text: &str) -> Result<()> {
    match text.chars().find(|&c| c == '\r' || c == '\n') {
        Some(c) => Err(Error::Validate(ValidateError(c))),
        None => Ok(()),
    }
}
