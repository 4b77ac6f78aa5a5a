//! Per-key fetch coalescing.
//!
//! The first caller to join a key leads: it runs the fetch and publishes the
//! outcome. Callers that join while the lead is running follow and receive
//! that same outcome instead of fetching again. Callers for other keys never
//! share a slot.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::domain::revocation::SubjectKey;

type Slots<T> = Arc<DashMap<SubjectKey, watch::Receiver<Option<T>>>>;

/// Tracks keys that currently have a remote fetch running.
pub struct InFlightFetches<T> {
    keys: Slots<T>,
}

impl<T> Clone for InFlightFetches<T> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
        }
    }
}

impl<T> Default for InFlightFetches<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Role assigned to a caller by [`InFlightFetches::join`].
pub enum Flight<T> {
    Lead(FetchLead<T>),
    Follow(FetchWait<T>),
}

impl<T> InFlightFetches<T> {
    pub fn new() -> Self {
        Self {
            keys: Arc::new(DashMap::new()),
        }
    }

    /// Lead the fetch for `key`, or follow the one already running.
    pub fn join(&self, key: &SubjectKey) -> Flight<T> {
        match self.keys.entry(key.clone()) {
            Entry::Occupied(slot) => Flight::Follow(FetchWait {
                outcome: slot.get().clone(),
            }),
            Entry::Vacant(slot) => {
                let (sender, receiver) = watch::channel(None);
                slot.insert(receiver);
                Flight::Lead(FetchLead {
                    key: key.clone(),
                    keys: Arc::clone(&self.keys),
                    sender,
                })
            }
        }
    }

    /// Number of keys with a running lead.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Exclusive fetch rights on a key. Frees the slot on drop, whichever way the
/// lead exits; followers of an abandoned lead see no outcome.
pub struct FetchLead<T> {
    key: SubjectKey,
    keys: Slots<T>,
    sender: watch::Sender<Option<T>>,
}

impl<T> FetchLead<T> {
    pub fn key(&self) -> &SubjectKey {
        &self.key
    }

    /// Hand `outcome` to every follower and release the key.
    pub fn complete(self, outcome: T) {
        // Fails only when nobody follows.
        let _ = self.sender.send(Some(outcome));
    }
}

impl<T> Drop for FetchLead<T> {
    fn drop(&mut self) {
        // The slot is only replaced after this removal, so it is still ours.
        self.keys.remove(&self.key);
    }
}

/// Pending view of another caller's fetch.
pub struct FetchWait<T> {
    outcome: watch::Receiver<Option<T>>,
}

impl<T: Clone> FetchWait<T> {
    /// Outcome published by the lead, or `None` if the lead was dropped
    /// before completing.
    pub async fn outcome(mut self) -> Option<T> {
        match self.outcome.wait_for(Option::is_some).await {
            Ok(published) => published.clone(),
            Err(_) => None,
        }
    }
}
