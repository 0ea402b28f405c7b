//! Component H — Pacer.
//!
//! A dedicated background thread that drains the Throttled List in SRPT
//! order, one packet at a time, backing off whenever an RPC's message lock
//! is contended rather than blocking on it. Owns its worker thread the way
//! a background-runtime worker typically does (`spawn` on construction,
//! `shutdown` joins it, `Drop` triggers shutdown), but the wake signal here
//! is a condition variable rather than a channel: the pacer doesn't
//! receive messages, it reacts to "the throttled list changed" and "time
//! to exit".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::trace;

use crate::data_sender::{self, SendOutcome};
use crate::Homa;

/// Handle to the pacer's background thread. Dropping it shuts the thread
/// down; callers that want to wait for exit sooner can call
/// [`Pacer::shutdown`] explicitly.
pub struct Pacer {
    exit: Arc<AtomicBool>,
    homa: Arc<Homa>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Pacer {
    /// Spawns the pacer thread against `homa`. Only one pacer should run per
    /// `Homa` instance; nothing here enforces that.
    pub fn spawn(homa: Arc<Homa>) -> Self {
        let exit = Arc::new(AtomicBool::new(false));
        let worker_exit = exit.clone();
        let worker_homa = homa.clone();

        let handle = thread::Builder::new()
            .name("homa-pacer".into())
            .spawn(move || pacer_loop(worker_homa, worker_exit))
            .expect("failed to spawn pacer thread");

        Pacer {
            exit,
            homa,
            handle: Some(handle),
        }
    }

    /// Signals the pacer to stop and blocks until its thread has actually
    /// exited. Idempotent.
    pub fn shutdown(&mut self) {
        self.exit.store(true, Ordering::Relaxed);
        self.homa.throttled.wake_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn pacer_loop(homa: Arc<Homa>, exit: Arc<AtomicBool>) {
    while !exit.load(Ordering::Relaxed) {
        if homa.throttled.is_empty() {
            let idle_start = Instant::now();
            homa.throttled.wait_for_work(&exit);
            let idle_cycles = idle_start.elapsed().as_nanos() as u64 * homa.config.cpu_khz / 1_000_000;
            homa.metrics.add_pacer_cycles(idle_cycles);
            continue;
        }

        let now = homa.now_cycles();
        let derived = homa.config.derive();
        if homa.clock.is_backed_up(now, derived.max_nic_queue_cycles) {
            // Spin until the NIC drains, but keep checking for shutdown so a
            // caller waiting on `shutdown()` is never stuck behind a
            // perpetually backed-up link.
            continue;
        }

        let Some(rpc) = homa.throttled.head() else {
            continue;
        };

        match data_sender::send_try_locked(&rpc, &homa) {
            None => {
                trace!(rpc = rpc.id, "message lock contended, backing off");
            }
            Some(SendOutcome::Throttled) => {}
            Some(SendOutcome::Drained) => {
                homa.throttled.remove(&rpc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HomaConfig;
    use crate::ip::{DiscardTransmit, IpTransmit, SystemAllocator};
    use crate::message::OutboundMessage;
    use crate::peer::{Peer, Route, StaticPeer};
    use std::sync::Mutex;
    use std::time::Duration;

    fn route() -> Route {
        Route {
            dst_ip: "127.0.0.1".parse().unwrap(),
            dst_port: 9000,
        }
    }

    fn rpc_for(data_len: usize) -> Arc<crate::rpc::OutboundRpc> {
        let peer = Arc::new(StaticPeer::new(route()));
        let config = HomaConfig {
            rtt_bytes: data_len as u32,
            ..HomaConfig::default()
        };
        let data = vec![0u8; data_len];
        let msg = OutboundMessage::init(&data, 1, 1000, 2000, peer.as_ref(), &config, &SystemAllocator)
            .unwrap();
        Arc::new(crate::rpc::OutboundRpc::new(msg, peer as Arc<dyn Peer>))
    }

    #[test]
    fn pacer_drains_a_throttled_rpc() {
        let homa = Homa::new(
            HomaConfig { dont_throttle: true, ..HomaConfig::default() },
            Arc::new(DiscardTransmit),
        );
        let rpc = rpc_for(3000);
        homa.throttled.add(rpc.clone());

        let mut pacer = Pacer::spawn(homa.clone());

        let drained = (0..200).any(|_| {
            thread::sleep(Duration::from_millis(5));
            homa.throttled.is_empty()
        });
        pacer.shutdown();

        assert!(drained, "pacer never drained the throttled RPC");
        assert_eq!(homa.metrics.snapshot().packets_sent_data, 3);
    }

    #[test]
    fn shutdown_is_idempotent_and_blocks_until_exit() {
        let homa = Homa::new(HomaConfig::default(), Arc::new(DiscardTransmit));
        let mut pacer = Pacer::spawn(homa);
        pacer.shutdown();
        pacer.shutdown();
    }

    #[test]
    fn idle_pacer_accounts_cycles_while_parked() {
        let homa = Homa::new(HomaConfig::default(), Arc::new(DiscardTransmit));
        let mut pacer = Pacer::spawn(homa.clone());
        thread::sleep(Duration::from_millis(80));
        pacer.shutdown();
        assert!(homa.metrics.snapshot().pacer_cycles > 0);
    }

    struct HeldTransmit {
        retained: Mutex<Vec<crate::buffer::PacketBuffer>>,
    }

    impl IpTransmit for HeldTransmit {
        fn queue_xmit(&self, buffer: crate::buffer::PacketBuffer, _route: &Route) -> Result<(), i32> {
            self.retained.lock().unwrap().push(buffer);
            Ok(())
        }
    }

    #[test]
    fn pacer_backs_off_on_contended_lock_without_removing_rpc() {
        let homa = Homa::new(
            HomaConfig { dont_throttle: true, ..HomaConfig::default() },
            Arc::new(HeldTransmit { retained: Mutex::new(Vec::new()) }),
        );
        let rpc = rpc_for(1400);
        homa.throttled.add(rpc.clone());
        let guard = rpc.lock();

        let mut pacer = Pacer::spawn(homa.clone());
        thread::sleep(Duration::from_millis(50));
        pacer.shutdown();

        assert!(!homa.throttled.is_empty());
        drop(guard);
    }
}
