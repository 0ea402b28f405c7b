//! Component A — Link-Idle Clock.
//!
//! Tracks the future tick-clock instant at which the NIC queue is modelled
//! to next drain. `advance` is a lock-free CAS retry loop; ordering is
//! relaxed throughout since callers never rely on happens-before from this
//! value.

use std::sync::atomic::{AtomicU64, Ordering};

/// Wire overhead added on top of the payload before converting to cycles:
/// IP header + VLAN tag + Ethernet preamble/IFG/FCS.
const IP_HDR_BYTES: u64 = 20;
const VLAN_HDR_BYTES: u64 = 4;
const ETH_OVERHEAD_BYTES: u64 = 24;

/// Monotonic tick-clock source, standing in for `get_cycles()`/`cpu_khz`.
///
/// A fixed epoch plus `Instant::elapsed()`, scaled to synthetic cycles via
/// the configured `cpu_khz` rather than truncating to microseconds.
pub struct HomaClock {
    epoch: quanta::Instant,
}

impl HomaClock {
    pub fn new() -> Self {
        HomaClock {
            epoch: quanta::Instant::now(),
        }
    }

    /// Current tick count, as if read from `get_cycles()`.
    pub fn now_cycles(&self, cpu_khz: u64) -> u64 {
        let elapsed_ns = self.epoch.elapsed().as_nanos();
        ((elapsed_ns * cpu_khz as u128) / 1_000_000) as u64
    }
}

impl Default for HomaClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide link-idle clock, owned by [`crate::Homa`] and shared by
/// every sender and the pacer.
pub struct LinkIdleClock {
    link_idle: AtomicU64,
}

impl LinkIdleClock {
    pub fn new() -> Self {
        LinkIdleClock {
            link_idle: AtomicU64::new(0),
        }
    }

    /// Peek the current `link_idle` value.
    pub fn peek(&self) -> u64 {
        self.link_idle.load(Ordering::Relaxed)
    }

    /// `now + max_nic_queue_cycles < link_idle` — the NIC queue is backed up
    /// beyond tolerance.
    pub fn is_backed_up(&self, now: u64, max_nic_queue_cycles: u64) -> bool {
        now.wrapping_add(max_nic_queue_cycles) < self.peek()
    }

    /// Account `bytes` worth of wire time, advancing `link_idle` by the
    /// equivalent cycles. Lock-free: read, compute, CAS, retry on conflict.
    pub fn advance(&self, now: u64, bytes: usize, cycles_per_kbyte: u64) -> u64 {
        let wire_bytes = bytes as u64 + IP_HDR_BYTES + VLAN_HDR_BYTES + ETH_OVERHEAD_BYTES;
        let cycles = wire_bytes * cycles_per_kbyte / 1000;

        loop {
            let current = self.link_idle.load(Ordering::Relaxed);
            let new_idle = current.max(now) + cycles;
            match self.link_idle.compare_exchange_weak(
                current,
                new_idle,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return new_idle,
                Err(_) => continue,
            }
        }
    }
}

impl Default for LinkIdleClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn homa_clock_monotonic() {
        let clock = HomaClock::new();
        let t1 = clock.now_cycles(2_000_000);
        thread::sleep(std::time::Duration::from_millis(1));
        let t2 = clock.now_cycles(2_000_000);
        assert!(t2 >= t1);
    }

    #[test]
    fn link_idle_never_decreases() {
        let clock = LinkIdleClock::new();
        let a = clock.advance(0, 1400, 16_000);
        let b = clock.advance(0, 1400, 16_000);
        assert!(b >= a);
    }

    #[test]
    fn advance_accounts_for_overhead() {
        let clock = LinkIdleClock::new();
        let idle = clock.advance(0, 0, 1000);
        let expected = (IP_HDR_BYTES + VLAN_HDR_BYTES + ETH_OVERHEAD_BYTES) * 1000 / 1000;
        assert_eq!(idle, expected);
    }

    #[test]
    fn is_backed_up_detects_future_idle() {
        let clock = LinkIdleClock::new();
        clock.advance(0, 100_000, 16_000);
        assert!(clock.is_backed_up(0, 10));
        assert!(!clock.is_backed_up(clock.peek() + 1_000_000, 10));
    }

    #[test]
    fn advance_under_concurrent_callers_stays_consistent() {
        let clock = Arc::new(LinkIdleClock::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let clock = clock.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    clock.advance(0, 1400, 16_000);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(clock.peek() > 0);
    }
}
