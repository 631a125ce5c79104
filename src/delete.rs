//! Batch deletion, verified by the outcome of `QUIT`.
//!
//! RFC 1939 only commits `DELE` marks when the server enters the UPDATE
//! state, i.e. when `QUIT` succeeds. Until then a deletion is a wish, so a
//! UIDL is reported deleted only once the `QUIT` that follows its `DELE`
//! came back positive.

use crate::command::{Command, Mode};
use crate::error::Result;
use crate::session::Session;
use crate::types::{Seq, Uidl};

impl Session {
    /// Delete messages by UIDL and end the session.
    ///
    /// Returns the UIDLs known to be gone. A UIDL missing from the current
    /// listing is presumed deleted already and is returned without a
    /// command being sent for it. The others are returned only if the
    /// closing `QUIT` succeeded.
    ///
    /// Without a successful `UIDL` listing nothing is known to be missing,
    /// so unknown UIDLs are not returned. A server that refuses `UIDL` thus
    /// never drains a deletion queue that is fed from this result.
    ///
    /// The connection is always dropped afterwards, since the message
    /// numbers it handed out no longer hold.
    pub fn delete<I, S>(&mut self, uidls: I) -> Vec<Uidl>
    where
        I: IntoIterator<Item = S>,
        S: Into<Uidl>,
    {
        if let Err(e) = self.check_connection() {
            log::debug!("delete: {}", e);
            return Vec::new();
        }

        let mut presumed = Vec::new();
        let mut pending = Vec::new();
        let mut cmds = Vec::new();
        for uidl in uidls {
            let uidl = uidl.into();
            match self.id(&uidl) {
                Some(id) => {
                    cmds.push(Command::new(format!("DELE {}", id), Mode::Ack));
                    pending.push(uidl);
                }
                None if self.listed => {
                    log::debug!("{} not on server, presumed deleted", uidl);
                    presumed.push(uidl);
                }
                None => log::debug!("no UIDL listing, cannot delete {}", uidl),
            }
        }
        if cmds.is_empty() {
            return presumed;
        }
        cmds.push(Command::new("QUIT", Mode::Ack));

        match self.run(&mut cmds) {
            Ok(_) => {
                let quit = cmds.last().map_or(false, |c| c.ok);
                log::debug!("sent {} DELE, QUIT ok? {}", pending.len(), quit);
                if quit {
                    presumed.extend(pending);
                }
            }
            Err(e) => log::debug!("error deleting: {}", e),
        }
        // QUIT has been sent already
        self.disconnect();
        presumed
    }

    /// Send `DELE` for each message number, then `QUIT`, without reading any response.
    pub(crate) fn delete_no_wait(&mut self, ids: &[Seq]) -> Result<()> {
        let pipeline = match self.pipeline.as_mut() {
            Some(pipeline) => pipeline,
            None => return Ok(()),
        };
        for id in ids {
            pipeline.send_no_wait(&format!("DELE {}", id))?;
        }
        pipeline.send_no_wait("QUIT")?;
        pipeline.flush()
    }
}
