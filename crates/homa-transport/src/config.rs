//! Process-wide configuration knobs and the size constants the wire format
//! and fragmentation logic are built around.

/// Maximum payload bytes carried by one data packet.
pub const MAX_DATA_PER_PACKET: usize = 1400;

/// Largest message the sender will fragment. Mirrors the stock Homa module's
/// default ceiling; callers needing a different limit construct their own
/// [`HomaConfig`] rather than recompiling against a different constant.
pub const MAX_MESSAGE_LENGTH: usize = 1_000_000;

/// Derived pacing parameters, recomputed whenever `link_mbps` or
/// `max_nic_queue_ns` change (see [`HomaConfig::derive`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedParams {
    /// Tick-clock cycles needed to drain one kilobyte at the configured
    /// link rate.
    pub cycles_per_kbyte: u64,
    /// Tick-clock cycles corresponding to `max_nic_queue_ns`.
    pub max_nic_queue_cycles: u64,
}

/// Process-wide configuration knobs.
///
/// `sysctl` plumbing that would normally populate this struct is an external
/// collaborator; callers build one directly, the same way `SenderConfig` is
/// built elsewhere in this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomaConfig {
    /// Link rate in megabits/sec, used to derive `cycles_per_kbyte`.
    pub link_mbps: u32,
    /// Maximum tolerated NIC queue depth, in nanoseconds.
    pub max_nic_queue_ns: u32,
    /// Bytes a message may send unscheduled (before the first grant).
    pub rtt_bytes: u32,
    /// Messages with fewer than this many bytes remaining bypass throttling.
    pub throttle_min_bytes: u32,
    /// Highest usable priority level (0..=7).
    pub max_prio: u8,
    /// Disables throttling entirely (`HOMA_FLAG_DONT_THROTTLE`).
    pub dont_throttle: bool,
    /// TSC frequency in kHz, used to convert wall time to tick-clock cycles.
    pub cpu_khz: u64,
}

impl Default for HomaConfig {
    fn default() -> Self {
        HomaConfig {
            link_mbps: 1_000,
            max_nic_queue_ns: 2_000,
            rtt_bytes: 10_000,
            throttle_min_bytes: 1_000,
            max_prio: 7,
            dont_throttle: false,
            cpu_khz: 2_000_000,
        }
    }
}

impl HomaConfig {
    /// Recompute `cycles_per_kbyte` and `max_nic_queue_cycles` from the
    /// current `link_mbps`/`max_nic_queue_ns`/`cpu_khz`. Multiplies before
    /// dividing in the same order throughout to avoid 64-bit overflow at
    /// realistic configured values.
    pub fn derive(&self) -> DerivedParams {
        DerivedParams {
            cycles_per_kbyte: 8 * self.cpu_khz / self.link_mbps as u64,
            max_nic_queue_cycles: self.max_nic_queue_ns as u64 * self.cpu_khz / 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_matches_spec_formula() {
        let config = HomaConfig {
            link_mbps: 1_000,
            max_nic_queue_ns: 2_000,
            cpu_khz: 2_000_000,
            ..HomaConfig::default()
        };
        let derived = config.derive();
        assert_eq!(derived.cycles_per_kbyte, 8 * 2_000_000 / 1_000);
        assert_eq!(derived.max_nic_queue_cycles, 2_000 * 2_000_000 / 1_000_000);
    }

    #[test]
    fn default_is_internally_consistent() {
        let config = HomaConfig::default();
        let derived = config.derive();
        assert!(derived.cycles_per_kbyte > 0);
        assert!(derived.max_nic_queue_cycles > 0);
    }
}
