//! Per-service serialization of outbound remote syncs.
//!
//! The slot holds the handle of the most recently queued sync. A new sync is
//! chained behind that handle, so at most one upsert runs at a time and they
//! complete in the order they were requested. The slot is cleared by
//! [`SlotRelease`] on drop, whether the sync succeeded, failed or panicked.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

pub type SyncHandle = Shared<BoxFuture<'static, bool>>;

struct InFlight {
    ticket: u64,
    handle: SyncHandle,
}

#[derive(Default)]
pub struct SyncSlot {
    current: Arc<Mutex<Option<InFlight>>>,
    next_ticket: AtomicU64,
}

impl SyncSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `operation` behind any sync already in flight.
    ///
    /// `operation` is not polled until the previous sync settles. A panic
    /// inside it settles the handle as `false`. The returned release must be
    /// kept alive until the handle resolves.
    pub fn enqueue<F>(&self, operation: F) -> (SyncHandle, SlotRelease)
    where
        F: Future<Output = bool> + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let mut current = lock(&self.current);

        let previous = current.as_ref().map(|in_flight| in_flight.handle.clone());
        if previous.is_some() {
            debug!(ticket, "sync already in progress, chaining");
        }

        let handle = async move {
            if let Some(previous) = previous {
                previous.await;
            }
            AssertUnwindSafe(operation)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(ticket, "sync panicked");
                    false
                })
        }
        .boxed()
        .shared();

        *current = Some(InFlight {
            ticket,
            handle: handle.clone(),
        });

        let release = SlotRelease {
            slot: Arc::clone(&self.current),
            ticket,
        };
        (handle, release)
    }

    /// Handle of the last queued sync, if one has not settled yet.
    pub fn current(&self) -> Option<SyncHandle> {
        lock(&self.current)
            .as_ref()
            .map(|in_flight| in_flight.handle.clone())
    }

    pub fn is_idle(&self) -> bool {
        lock(&self.current).is_none()
    }
}

/// Clears the slot when the sync it was issued for is still the tail.
pub struct SlotRelease {
    slot: Arc<Mutex<Option<InFlight>>>,
    ticket: u64,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        let mut current = lock(&self.slot);
        if current
            .as_ref()
            .is_some_and(|in_flight| in_flight.ticket == self.ticket)
        {
            *current = None;
        }
    }
}

fn lock(slot: &Mutex<Option<InFlight>>) -> MutexGuard<'_, Option<InFlight>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
