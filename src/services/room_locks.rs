//! Per-room write locks
//!
//! Booking creation and slot-reserving status changes for one room are
//! serialized through an async mutex keyed by room id. Different rooms
//! never contend.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Lock could not be taken within the configured bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out waiting for the room lock")]
pub struct LockTimeout;

#[derive(Debug)]
pub struct RoomLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl RoomLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Wait for exclusive access to `room_id`; released when the guard drops
    pub async fn acquire(&self, room_id: Uuid) -> Result<OwnedMutexGuard<()>, LockTimeout> {
        // Clone the Arc out so the shard lock is not held across the await.
        let lock = self
            .locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        tokio::time::timeout(self.timeout, lock.lock_owned())
            .await
            .map_err(|_| LockTimeout)
    }
}
