//! Metrics emitted by the outbound path.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-wide counters. All fields are independently atomic; there is no
/// cross-field consistency guarantee.
#[derive(Debug, Default)]
pub struct Metrics {
    pub packets_sent_data: AtomicU64,
    pub packets_sent_control: AtomicU64,
    pub control_xmit_errors: AtomicU64,
    pub data_xmit_errors: AtomicU64,
    pub resent_packets: AtomicU64,
    pub pacer_cycles: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_sent_data: self.packets_sent_data.load(Ordering::Relaxed),
            packets_sent_control: self.packets_sent_control.load(Ordering::Relaxed),
            control_xmit_errors: self.control_xmit_errors.load(Ordering::Relaxed),
            data_xmit_errors: self.data_xmit_errors.load(Ordering::Relaxed),
            resent_packets: self.resent_packets.load(Ordering::Relaxed),
            pacer_cycles: self.pacer_cycles.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn add_pacer_cycles(&self, cycles: u64) {
        self.pacer_cycles.fetch_add(cycles, Ordering::Relaxed);
    }
}

/// A point-in-time, serializable snapshot of [`Metrics`].
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_sent_data: u64,
    pub packets_sent_control: u64,
    pub control_xmit_errors: u64,
    pub data_xmit_errors: u64,
    pub resent_packets: u64,
    pub pacer_cycles: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_updates() {
        let metrics = Metrics::new();
        metrics.packets_sent_data.fetch_add(3, Ordering::Relaxed);
        metrics.data_xmit_errors.fetch_add(1, Ordering::Relaxed);
        let snap = metrics.snapshot();
        assert_eq!(snap.packets_sent_data, 3);
        assert_eq!(snap.data_xmit_errors, 1);
    }

    #[test]
    fn snapshot_serializes_as_json() {
        let metrics = Metrics::new();
        let json = serde_json::to_string(&metrics.snapshot()).unwrap();
        assert!(json.contains("\"packets_sent_data\":0"));
    }
}
