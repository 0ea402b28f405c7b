//! # homa-transport
//!
//! Outbound side of a Homa-style low-latency datagram RPC transport:
//! fragmentation, paced transmission governed by a NIC-queue model,
//! priority assignment, byte-range retransmission, and a central pacer
//! that serializes transmission across competing RPCs in SRPT order.
//!
//! The receive path, grant generation, RPC lifecycle bookkeeping beyond
//! what the sender mutates, socket binding, sysctl plumbing, the IP-layer
//! transmit primitive, and peer/route caches are external collaborators;
//! only the contracts this crate needs from them are modelled (see
//! [`peer`] and [`ip`]).
//!
//! ## Crate structure
//!
//! - [`clock`] — Link-Idle Clock (lock-free NIC-queue model)
//! - [`priority`] — priority-to-link-tag mapping
//! - [`wire`] — data/control packet header encode/decode
//! - [`buffer`] — packet buffers and the shared-buffer guard
//! - [`peer`] / [`ip`] — external collaborator contracts
//! - [`message`] — Outbound Message state machine
//! - [`rpc`] — RPC-scoped message + peer + socket-lock glue
//! - [`control`] — Control Sender
//! - [`data_sender`] — Data Sender
//! - [`retransmit`] — Retransmitter
//! - [`throttle`] — Throttled List (SRPT order)
//! - [`pacer`] — dedicated pacer thread
//! - [`metrics`] — counters emitted by the send/retransmit/control paths
//! - [`config`] / [`error`] — configuration knobs and error kinds

pub mod buffer;
pub mod clock;
pub mod config;
pub mod control;
pub mod data_sender;
pub mod error;
pub mod ip;
pub mod message;
pub mod metrics;
pub mod pacer;
pub mod peer;
pub mod priority;
pub mod retransmit;
pub mod rpc;
pub mod throttle;
pub mod wire;

use std::sync::Arc;

use clock::{HomaClock, LinkIdleClock};
use config::HomaConfig;
use ip::IpTransmit;
use metrics::Metrics;
use throttle::ThrottledList;

/// Process-wide state shared by every component.
///
/// Construct one `Homa` per process, wrap it in an `Arc`, and hand that
/// `Arc` to [`pacer::Pacer::spawn`] plus every send/retransmit/control call.
pub struct Homa {
    pub config: HomaConfig,
    pub clock: LinkIdleClock,
    pub homa_clock: HomaClock,
    pub throttled: ThrottledList,
    pub metrics: Metrics,
    pub ip: Arc<dyn IpTransmit>,
}

impl Homa {
    pub fn new(config: HomaConfig, ip: Arc<dyn IpTransmit>) -> Arc<Self> {
        Arc::new(Homa {
            config,
            clock: LinkIdleClock::new(),
            homa_clock: HomaClock::new(),
            throttled: ThrottledList::new(),
            metrics: Metrics::new(),
            ip,
        })
    }

    pub fn now_cycles(&self) -> u64 {
        self.homa_clock.now_cycles(self.config.cpu_khz)
    }
}
