//! Optimistic mutation engine.
//!
//! [`Reconciler::apply`] writes the target value locally, runs the network
//! call, then either keeps the value (success) or restores the value it
//! replaced (failure). At most one call per key is in flight; a second
//! `apply` for a pending key is rejected with [`ClientError::Busy`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::error::ClientError;

/// Local value for one key, as read by views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slot<V> {
    /// Optimistic target while pending, confirmed value otherwise.
    pub value: V,
    pub pending: bool,
}

struct Entry<V> {
    value: V,
    /// Ticket of the call in flight for this key.
    in_flight: Option<u64>,
}

struct Table<K, V> {
    entries: HashMap<K, Entry<V>>,
    next_ticket: u64,
}

pub struct Reconciler<K, V> {
    table: Mutex<Table<K, V>>,
}

impl<K, V> Default for Reconciler<K, V> {
    fn default() -> Self {
        Self {
            table: Mutex::new(Table {
                entries: HashMap::new(),
                next_ticket: 0,
            }),
        }
    }
}

impl<K, V> Reconciler<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<Slot<V>> {
        self.table.lock().entries.get(key).map(|entry| Slot {
            value: entry.value.clone(),
            pending: entry.in_flight.is_some(),
        })
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.get(key).is_some_and(|slot| slot.pending)
    }

    /// Set the confirmed value from fresh server data.
    /// Ignored while a call for the key is pending.
    pub fn seed(&self, key: K, value: V) -> bool {
        let mut table = self.table.lock();
        let entry = table.entries.entry(key).or_insert_with(|| Entry {
            value: V::default(),
            in_flight: None,
        });
        if entry.in_flight.is_some() {
            return false;
        }
        entry.value = value;
        true
    }

    /// Forget every key. Calls still in flight complete without touching
    /// the table.
    pub fn clear(&self) {
        self.table.lock().entries.clear();
    }

    /// Optimistically set `key` to `target` and run `call`.
    ///
    /// If the returned future is dropped before `call` resolves, the key is
    /// released and rolled back as if the call had failed.
    pub async fn apply<F, Fut, T>(&self, key: K, target: V, call: F) -> Result<T, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        self.apply_tracked(key, target, call).await.0
    }

    /// [`Reconciler::apply`], also reporting whether the outcome was written
    /// back. False when the key was cleared while the call was in flight.
    pub async fn apply_tracked<F, Fut, T>(
        &self,
        key: K,
        target: V,
        call: F,
    ) -> (Result<T, ClientError>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let pending = {
            let mut table = self.table.lock();
            table.next_ticket += 1;
            let ticket = table.next_ticket;

            let entry = table.entries.entry(key.clone()).or_insert_with(|| Entry {
                value: V::default(),
                in_flight: None,
            });
            if entry.in_flight.is_some() {
                tracing::debug!(key = ?key, "Mutation already pending");
                return (Err(ClientError::Busy), false);
            }

            let previous = std::mem::replace(&mut entry.value, target);
            entry.in_flight = Some(ticket);
            Pending {
                table: &self.table,
                key,
                ticket,
                previous: Some(previous),
            }
        };

        let result = call().await;
        let landed = pending.settle(result.as_ref().err());
        (result, landed)
    }
}

/// Ownership of one in-flight ticket. Settles the key exactly once, either
/// explicitly or on drop.
struct Pending<'a, K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default + Debug,
{
    table: &'a Mutex<Table<K, V>>,
    key: K,
    ticket: u64,
    /// Taken once settled.
    previous: Option<V>,
}

impl<K, V> Pending<'_, K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default + Debug,
{
    fn settle(mut self, error: Option<&ClientError>) -> bool {
        let Some(previous) = self.previous.take() else {
            return false;
        };
        let mut table = self.table.lock();
        let Some(entry) = table
            .entries
            .get_mut(&self.key)
            .filter(|entry| entry.in_flight == Some(self.ticket))
        else {
            tracing::debug!(key = ?self.key, "Mutation finished after its key was cleared");
            return false;
        };

        entry.in_flight = None;
        if let Some(e) = error {
            tracing::warn!(key = ?self.key, error = %e, rollback = ?previous, "Mutation failed, rolled back");
            entry.value = previous;
        }
        true
    }
}

impl<K, V> Drop for Pending<'_, K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default + Debug,
{
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        let mut table = self.table.lock();
        if let Some(entry) = table
            .entries
            .get_mut(&self.key)
            .filter(|entry| entry.in_flight == Some(self.ticket))
        {
            tracing::debug!(key = ?self.key, rollback = ?previous, "Mutation abandoned, rolled back");
            entry.value = previous;
            entry.in_flight = None;
        }
    }
}
