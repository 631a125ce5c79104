//! Background threads that keep a mailbox tidy between requests.
//!
//! Each actor wakes up on its own schedule, takes the mailbox lock like any
//! other caller, and exits once its [`Actor`] handle is dropped or the
//! mailbox is gone.

use std::collections::HashSet;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use crate::mailbox::Shared;
use crate::types::Uidl;

const MAX_POLL: Duration = Duration::from_secs(60);
const MIN_POLL: Duration = Duration::from_millis(10);

/// Handle on a running actor. Dropping it stops the actor at its next wake-up.
pub(crate) struct Actor {
    name: &'static str,
    _cancel: Sender<()>,
}

impl Actor {
    fn spawn<F>(name: &'static str, every: Duration, shared: &Arc<Shared>, mut tick: F) -> io::Result<Actor>
    where
        F: FnMut(&Shared) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        let shared: Weak<Shared> = Arc::downgrade(shared);
        thread::Builder::new()
            .name(format!("pop3-{}", name))
            .spawn(move || loop {
                match rx.recv_timeout(every) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
                match shared.upgrade() {
                    Some(shared) => tick(&shared),
                    None => break,
                }
            })?;
        log::debug!("started {} every {:?}", name, every);
        Ok(Actor {
            name,
            _cancel: tx,
        })
    }

    /// Close the connection once it has been idle for `idle`.
    pub(crate) fn idle_closer(shared: &Arc<Shared>, idle: Duration) -> io::Result<Actor> {
        Actor::spawn("idle-closer", poll(idle), shared, move |shared| {
            close_if_idle(shared, idle);
        })
    }

    /// Refresh the listing every `every` and report new messages.
    pub(crate) fn background_checker(shared: &Arc<Shared>, every: Duration) -> io::Result<Actor> {
        let mut known = None;
        Actor::spawn("mail-checker", every.max(MIN_POLL), shared, move |shared| {
            check_for_new_mail(shared, &mut known);
        })
    }

    /// Run queued deletions once the mailbox has been quiet for `delay`.
    pub(crate) fn delayed_deleter(shared: &Arc<Shared>, delay: Duration) -> io::Result<Actor> {
        Actor::spawn("delayed-delete", poll(delay), shared, move |shared| {
            drain_if_quiet(shared, delay);
        })
    }

    pub(crate) fn cancel(self) {
        log::debug!("stopping {}", self.name);
    }
}

fn poll(interval: Duration) -> Duration {
    (interval / 2).clamp(MIN_POLL, MAX_POLL)
}

/// Returns whether the connection was closed.
pub(crate) fn close_if_idle(shared: &Shared, idle: Duration) -> bool {
    if shared.activity.elapsed() < idle {
        return false;
    }
    let mut session = shared.lock();
    // another caller may have used the connection while we waited
    if !session.is_connected() || shared.activity.elapsed() < idle {
        return false;
    }
    log::debug!("closing connection idle for {:?}", shared.activity.elapsed());
    session.close(false);
    true
}

/// Refresh and compare the UIDL set with the previous one.
///
/// `known` is the set seen last time, `None` before the first listing. The
/// first listing only sets the baseline. Returns whether new mail was found.
pub(crate) fn check_for_new_mail(shared: &Shared, known: &mut Option<HashSet<Uidl>>) -> bool {
    let fresh = {
        let mut session = shared.lock();
        if let Some(current) = session.uidls() {
            *known = Some(current.into_iter().collect());
        }
        session.refresh();
        session.uidls()
    };
    let fresh: HashSet<Uidl> = match fresh {
        Some(fresh) => fresh.into_iter().collect(),
        None => {
            log::debug!("background check failed to connect");
            return false;
        }
    };
    let found = match known {
        Some(known) => fresh.iter().any(|uidl| !known.contains(uidl)),
        None => false,
    };
    *known = Some(fresh);
    if found {
        log::debug!("found new mail");
        shared.found_new_mail();
    }
    found
}

/// Returns whether a verified close was attempted.
pub(crate) fn drain_if_quiet(shared: &Shared, delay: Duration) -> bool {
    if shared.queue.is_empty() || shared.activity.elapsed() < delay {
        return false;
    }
    let mut session = shared.lock();
    if shared.queue.is_empty() {
        return false;
    }
    if let Err(e) = session.check_connection() {
        log::debug!("cannot drain deletions: {}", e);
        return false;
    }
    session.close(true);
    true
}
