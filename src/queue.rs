//! The set of UIDLs waiting to be deleted from the server.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use crate::types::Uidl;

/// A collection of UIDLs pending deletion, owned outside the session.
///
/// The session only reads it when closing and removes the entries the server
/// confirmed as deleted. Entries that could not be confirmed stay queued for
/// a later attempt.
pub trait DeletionQueue: Send + Sync {
    /// Snapshot of the queued UIDLs.
    fn queued(&self) -> Vec<Uidl>;

    /// Add a UIDL. Queuing the same UIDL twice has no extra effect.
    fn queue(&self, uidl: Uidl);

    /// Drop a UIDL that is known to be deleted.
    fn remove(&self, uidl: &str);

    /// Whether nothing is queued.
    fn is_empty(&self) -> bool {
        self.queued().is_empty()
    }
}

/// In-memory [`DeletionQueue`].
#[derive(Debug, Default)]
pub struct PendingDeletions {
    uidls: Mutex<BTreeSet<Uidl>>,
}

impl PendingDeletions {
    /// An empty queue.
    pub fn new() -> Self {
        PendingDeletions::default()
    }
}

impl DeletionQueue for PendingDeletions {
    fn queued(&self) -> Vec<Uidl> {
        let uidls = self.uidls.lock().unwrap_or_else(PoisonError::into_inner);
        uidls.iter().cloned().collect()
    }

    fn queue(&self, uidl: Uidl) {
        log::debug!("Queueing for deletion: {}", uidl);
        self.uidls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uidl);
    }

    fn remove(&self, uidl: &str) {
        self.uidls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uidl);
    }

    fn is_empty(&self) -> bool {
        self.uidls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
