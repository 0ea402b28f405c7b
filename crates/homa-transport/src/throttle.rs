//! Component G — Throttled List.
//!
//! An SRPT-ordered (ascending remaining bytes) set of RPCs awaiting pacing.
//! Writers serialize through `write_lock`; the pacer reads the current
//! ordering lock-free through an `arc-swap` snapshot — a short critical
//! section for writers, a single atomic load for the one reader.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::rpc::OutboundRpc;

type Snapshot = ArcSwap<Vec<Arc<OutboundRpc>>>;

/// Ordered set of RPCs with unsent granted bytes.
pub struct ThrottledList {
    snapshot: Snapshot,
    write_lock: Mutex<()>,
    has_work: Mutex<bool>,
    wake: Condvar,
}

impl ThrottledList {
    pub fn new() -> Self {
        ThrottledList {
            snapshot: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
            has_work: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    /// Insert `rpc` in ascending-remaining-bytes order. Idempotent: a
    /// already-linked RPC is left untouched. Ties insert after existing
    /// equal-remaining entries (FIFO among ties).
    pub fn add(&self, rpc: Arc<OutboundRpc>) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.snapshot.load();
        if current.iter().any(|existing| Arc::ptr_eq(existing, &rpc)) {
            return;
        }

        let remaining = rpc.remaining_bytes();
        let mut next = Vec::with_capacity(current.len() + 1);
        let mut inserted = false;
        for entry in current.iter() {
            if !inserted && entry.remaining_bytes() > remaining {
                next.push(rpc.clone());
                inserted = true;
            }
            next.push(entry.clone());
        }
        if !inserted {
            next.push(rpc);
        }
        self.snapshot.store(Arc::new(next));
        drop(_guard);
        self.wake_pacer();
    }

    /// Remove `rpc` from the list. Only the pacer calls this, once it has
    /// determined the RPC is fully drained.
    pub fn remove(&self, rpc: &Arc<OutboundRpc>) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.snapshot.load();
        let next: Vec<_> = current
            .iter()
            .filter(|entry| !Arc::ptr_eq(entry, rpc))
            .cloned()
            .collect();
        self.snapshot.store(Arc::new(next));
    }

    /// The current head, if any — a lock-free read of the latest snapshot.
    pub fn head(&self) -> Option<Arc<OutboundRpc>> {
        self.snapshot.load().first().cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    fn wake_pacer(&self) {
        let mut has_work = self.has_work.lock().unwrap_or_else(|e| e.into_inner());
        *has_work = true;
        self.wake.notify_one();
    }

    /// Block until the list has work or `exit` is set, polling `exit`
    /// periodically so shutdown is never missed.
    pub fn wait_for_work(&self, exit: &AtomicBool) {
        let mut has_work = self.has_work.lock().unwrap_or_else(|e| e.into_inner());
        while !*has_work && !exit.load(Ordering::Relaxed) {
            let (guard, _timeout) = self
                .wake
                .wait_timeout(has_work, Duration::from_millis(50))
                .unwrap_or_else(|e| e.into_inner());
            has_work = guard;
        }
        *has_work = false;
    }

    /// Wake anything parked in `wait_for_work`, without marking work ready
    /// — used by shutdown to unblock the pacer promptly.
    pub fn wake_all(&self) {
        self.wake.notify_all();
    }
}

impl Default for ThrottledList {
    fn default() -> Self {
        Self::new()
    }
}
