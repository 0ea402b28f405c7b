//! Component E — Data Sender.
//!
//! For one RPC, transmits eligible packets until the granted window is
//! exhausted or backpressure triggers throttling.

use std::sync::atomic::Ordering;
use std::sync::{Arc, MutexGuard};

use tracing::{debug, trace, warn};

use crate::buffer::PacketBuffer;
use crate::config::MAX_DATA_PER_PACKET;
use crate::message::OutboundMessage;
use crate::peer::Peer;
use crate::priority::priority_tag;
use crate::rpc::OutboundRpc;
use crate::Homa;

/// Result of one [`send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Sent everything available under the current grant.
    Drained,
    /// Stopped early and enqueued the RPC onto the Throttled List.
    Throttled,
}

/// Attempt to transmit all packets in `[next_offset, granted)` for `rpc`.
/// Blocks acquiring the RPC's message lock — callers on the ordinary send
/// path (new message, grant arrival) want this; the pacer uses
/// [`send_try_locked`] instead so a contended RPC doesn't stall it.
pub fn send(rpc: &Arc<OutboundRpc>, homa: &Homa) -> SendOutcome {
    let mut msg = rpc.lock();
    send_locked(&mut msg, rpc, homa)
}

/// Like [`send`], but returns `None` without making progress if the RPC's
/// message lock is currently held elsewhere — the pacer backs off rather
/// than blocking on a contended RPC.
pub fn send_try_locked(rpc: &Arc<OutboundRpc>, homa: &Homa) -> Option<SendOutcome> {
    let mut msg = rpc.try_lock()?;
    Some(send_locked(&mut msg, rpc, homa))
}

fn send_locked(
    msg: &mut MutexGuard<'_, OutboundMessage>,
    rpc: &Arc<OutboundRpc>,
    homa: &Homa,
) -> SendOutcome {
    loop {
        if msg.is_drained() {
            return SendOutcome::Drained;
        }

        // 1. Throttle check.
        let remaining = msg.remaining_bytes();
        let now = homa.now_cycles();
        let derived = homa.config.derive();
        if !homa.config.dont_throttle
            && remaining > homa.config.throttle_min_bytes as usize
            && homa.clock.is_backed_up(now, derived.max_nic_queue_cycles)
        {
            debug!(rpc = rpc.id, remaining, "enqueueing RPC onto throttled list");
            homa.throttled.add(rpc.clone());
            return SendOutcome::Throttled;
        }

        // 2. Advance the pointers. This overshoots `next_offset` past
        // `length` on the final short packet by design — see the
        // reset-state rationale in `message.rs`.
        let index = msg.advance();

        // 4. Shared-buffer guard: borrow the packet straight out of the
        // list instead of cloning it, so the check reflects only a
        // genuinely external holder rather than a handle this function
        // holds itself. Skip without retagging or resending — the pointer
        // has already advanced, so the next cycle naturally skips past it.
        let packet = &msg.packets()[index];
        if packet.held_elsewhere() {
            trace!(rpc = rpc.id, "skipping packet held elsewhere");
            continue;
        }

        // 3. Priority selection.
        let priority = if (packet.data_offset() as usize) < msg.unscheduled {
            rpc.peer.unsched_priority(msg.length)
        } else {
            msg.sched_priority
        };

        // 5. Apply tag, clear retransmit flag.
        packet.set_priority_tag(priority_tag(priority));
        packet.set_retransmit(false);

        // 6. Common transmit.
        xmit_data_pkt(packet, homa, rpc.peer.as_ref());
        trace!(rpc = rpc.id, offset = packet.data_offset(), priority, "data packet sent");
    }
}

/// The common-transmit helper shared by the Data Sender and Retransmitter.
/// Refreshes the peer-derived header fields, submits to the IP transmit
/// primitive, and always advances the Link-Idle Clock by the wire size
/// regardless of outcome.
pub(crate) fn xmit_data_pkt(buffer: &PacketBuffer, homa: &Homa, peer: &dyn Peer) {
    buffer.refresh_cutoff_version(peer.cutoff_version());
    let route = peer.route();
    if !buffer.route_pinned() {
        buffer.mark_route_pinned();
    }

    let wire_len = buffer.wire_len();
    let handle = buffer.clone();
    let result = homa.ip.queue_xmit(handle, &route);

    match result {
        Ok(()) => {
            homa.metrics.packets_sent_data.fetch_add(1, Ordering::Relaxed);
        }
        Err(errno) => {
            homa.metrics.data_xmit_errors.fetch_add(1, Ordering::Relaxed);
            if buffer.held_elsewhere() {
                warn!(errno, "ip_queue_xmit returned error without freeing buffer");
            }
        }
    }

    let now = homa.now_cycles();
    let derived = homa.config.derive();
    homa.clock.advance(now, wire_len, derived.cycles_per_kbyte);
}
