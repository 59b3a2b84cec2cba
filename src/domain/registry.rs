/// DriverRegistry - Live presence store
///
/// Concurrency-safe map from connection id to the latest `DriverPresence`.
/// It is the only owner of presence records; everything else reads through
/// `snapshot()`.
///
/// ## Concurrency
/// - Writers take the write lock for a single `HashMap` insert/remove (O(1))
/// - `snapshot()` takes the read lock only long enough to clone the `Arc`s
///   (O(n) pointer copies), so a dispatch scan never holds a lock while it
///   filters and emits
/// - Concurrent upserts to the same key are last-write-wins
///
/// `parking_lot::RwLock` is fair under contention, so a steady stream of
/// snapshots cannot starve presence writers and vice versa.

use crate::domain::entities::DriverPresence;
use crate::shared::error::DispatchError;
use crate::shared::protocol::ConnectionId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of an accepted upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<ConnectionId, Arc<DriverPresence>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or fully replaces the record for `connection_id`.
    ///
    /// The stored record is re-keyed to `connection_id` so the key and the
    /// record can never disagree.
    pub fn upsert(
        &self,
        connection_id: &ConnectionId,
        mut presence: DriverPresence,
    ) -> Result<Upsert, DispatchError> {
        if connection_id.is_empty() {
            return Err(DispatchError::InvalidConnectionId);
        }
        presence.connection_id = connection_id.clone();

        let previous = self
            .drivers
            .write()
            .insert(connection_id.clone(), Arc::new(presence));

        Ok(match previous {
            Some(_) => Upsert::Replaced,
            None => Upsert::Inserted,
        })
    }

    /// Deletes the record if present; removing an unknown id is a no-op
    pub fn remove(&self, connection_id: &ConnectionId) -> Option<Arc<DriverPresence>> {
        self.drivers.write().remove(connection_id)
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<Arc<DriverPresence>> {
        self.drivers.read().get(connection_id).cloned()
    }

    /// Point-in-time copy of every record.
    ///
    /// Later upserts and removes do not affect a snapshot already taken.
    pub fn snapshot(&self) -> Vec<Arc<DriverPresence>> {
        self.drivers.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.drivers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.read().is_empty()
    }
}
