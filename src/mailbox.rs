//! The shared handle a webmail front end keeps for one POP3 mailbox.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::activity::Timestamp;
use crate::actors::Actor;
use crate::config::Config;
use crate::conn::Transport;
use crate::queue::DeletionQueue;
use crate::session::Session;
use crate::types::{FetchRequest, Seq, Uidl};

/// Notified when a background check finds messages that were not there before.
///
/// Called without the mailbox lock held, so it may call back into the mailbox.
pub trait NewMailListener: Send + Sync {
    /// New mail has arrived.
    fn found_new_mail(&self);
}

impl<F> NewMailListener for F
where
    F: Fn() + Send + Sync,
{
    fn found_new_mail(&self) {
        self()
    }
}

/// State shared between a [`Mailbox`] and its background actors.
pub(crate) struct Shared {
    session: Mutex<Session>,
    pub(crate) config: Config,
    pub(crate) activity: Timestamp,
    pub(crate) checked: Timestamp,
    pub(crate) queue: Arc<dyn DeletionQueue>,
    listener: RwLock<Option<Arc<dyn NewMailListener>>>,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Session> {
        // a panicking holder leaves the session between exchanges
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_listener(&self, listener: Option<Arc<dyn NewMailListener>>) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = listener;
    }

    pub(crate) fn found_new_mail(&self) {
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match listener {
            Some(listener) => listener.found_new_mail(),
            None => log::debug!("new mail, nobody listening"),
        }
    }
}

/// One POP3 mailbox.
///
/// Every operation takes the mailbox lock for its whole protocol exchange,
/// so a `Mailbox` can be shared between request handlers and its own
/// background actors. Use [`lock`](Self::lock) to run several operations
/// without another thread interleaving.
///
/// Build one with [`MailboxBuilder`](crate::MailboxBuilder).
pub struct Mailbox {
    shared: Arc<Shared>,
    actors: Mutex<Vec<Actor>>,
}

impl Mailbox {
    pub(crate) fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        queue: Arc<dyn DeletionQueue>,
    ) -> Self {
        let activity = Timestamp::default();
        let checked = Timestamp::default();
        let session = Session::new(
            config.clone(),
            transport,
            Arc::clone(&queue),
            activity.clone(),
            checked.clone(),
        );
        Mailbox {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                config,
                activity,
                checked,
                queue,
                listener: RwLock::new(None),
            }),
            actors: Mutex::new(Vec::new()),
        }
    }

    /// Start the background actors enabled in the configuration.
    pub(crate) fn start_actors(&self) {
        let config = &self.shared.config;
        let mut started = Vec::new();
        if let Some(idle) = config.idle_close {
            started.push(Actor::idle_closer(&self.shared, idle));
        }
        if let Some(every) = config.background_check {
            started.push(Actor::background_checker(&self.shared, every));
        }
        if let Some(delay) = config.delete_delay {
            started.push(Actor::delayed_deleter(&self.shared, delay));
        }

        let mut actors = self.actors.lock().unwrap_or_else(PoisonError::into_inner);
        for actor in started {
            match actor {
                Ok(actor) => actors.push(actor),
                Err(e) => log::warn!("cannot start background actor: {}", e),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }

    /// Exclusive access to the session.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.shared.lock()
    }

    /// See [`Session::check_connection`].
    pub fn check_connection(&self) -> crate::error::Result<()> {
        self.lock().check_connection()
    }

    /// See [`Session::connect_to_server`].
    pub fn connect_to_server(&self) -> bool {
        self.lock().connect_to_server()
    }

    /// See [`Session::refresh`].
    pub fn refresh(&self) {
        self.lock().refresh()
    }

    /// See [`Session::close`].
    pub fn close(&self, wait: bool) {
        self.lock().close(wait)
    }

    /// See [`Session::num_mails`].
    pub fn num_mails(&self) -> Seq {
        self.lock().num_mails()
    }

    /// See [`Session::header`].
    pub fn header(&self, uidl: &str) -> Option<Vec<u8>> {
        self.lock().header(uidl)
    }

    /// See [`Session::body`].
    pub fn body(&self, uidl: &str) -> Option<Vec<u8>> {
        self.lock().body(uidl)
    }

    /// See [`Session::bodies`].
    pub fn bodies(&self, requests: &mut [FetchRequest]) {
        self.lock().bodies(requests)
    }

    /// See [`Session::delete`].
    pub fn delete<I, S>(&self, uidls: I) -> Vec<Uidl>
    where
        I: IntoIterator<Item = S>,
        S: Into<Uidl>,
    {
        self.lock().delete(uidls)
    }

    /// See [`Session::size`].
    pub fn size(&self, uidl: &str) -> u64 {
        self.lock().size(uidl)
    }

    /// See [`Session::uidls`].
    pub fn uidls(&self) -> Option<Vec<Uidl>> {
        self.lock().uidls()
    }

    /// See [`Session::last_error`].
    pub fn last_error(&self) -> String {
        self.lock().last_error()
    }

    /// See [`Session::is_connected`].
    pub fn is_connected(&self) -> bool {
        self.lock().is_connected()
    }

    /// When a line was last sent or received. Does not take the lock.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.shared.activity.get()
    }

    /// When the last successful `UIDL` listing arrived. Does not take the lock.
    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.shared.checked.get()
    }

    /// Whether deletions are waiting for the next verified close.
    pub fn has_queued_deletions(&self) -> bool {
        !self.shared.queue.is_empty()
    }

    /// Queue a message for deletion at the next close.
    pub fn queue_for_deletion(&self, uidl: impl Into<Uidl>) {
        self.shared.queue.queue(uidl.into());
    }

    /// Replace the new-mail listener; `None` removes it.
    pub fn set_new_mail_listener(&self, listener: Option<Arc<dyn NewMailListener>>) {
        self.shared.set_listener(listener)
    }

    /// Tell the listener, if any, that new mail has arrived.
    ///
    /// Must not be called while holding [`lock`](Self::lock).
    pub fn found_new_mail(&self) {
        self.shared.found_new_mail()
    }

    /// Stop the background actors and close without waiting for deletions.
    ///
    /// This must be the last call on the mailbox.
    pub fn destroy(&self) {
        log::debug!("destroy()");
        self.actors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .for_each(Actor::cancel);
        self.close(false);
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("host", &self.shared.config.host)
            .field("port", &self.shared.config.port)
            .field("user", &self.shared.config.user)
            .finish()
    }
}
