//! Component F — Retransmitter.
//!
//! Resends the packets of one message whose `[offset, offset + MAX_DATA_PER_PACKET)`
//! range intersects a requested `[start, end)` byte range, tagged with the
//! priority the peer asked for. Runs independently of the ordinary send
//! pointer: `next_offset`/`next_index` are never touched here, so a
//! retransmit can't accidentally rewind or fast-forward the primary send
//! path.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::config::MAX_DATA_PER_PACKET;
use crate::data_sender::xmit_data_pkt;
use crate::priority::priority_tag;
use crate::rpc::OutboundRpc;
use crate::Homa;

/// Resend every not-yet-acknowledged packet overlapping `[start, end)` at
/// `priority`. Packets currently held elsewhere (in flight downstream) are
/// left alone rather than resent a second time.
pub fn retransmit(rpc: &Arc<OutboundRpc>, start: u32, end: u32, priority: u8, homa: &Homa) {
    let msg = rpc.lock();
    let tag = priority_tag(priority);

    for packet in msg.packets() {
        let offset = packet.data_offset();
        if offset >= end {
            break;
        }
        let packet_end = offset + MAX_DATA_PER_PACKET as u32;
        if packet_end <= start {
            continue;
        }
        if packet.held_elsewhere() {
            debug!(rpc = rpc.id, offset, "skipping retransmit of packet held elsewhere");
            continue;
        }

        packet.set_retransmit(true);
        packet.set_priority_tag(tag);
        xmit_data_pkt(packet, homa, rpc.peer.as_ref());
        homa.metrics.resent_packets.fetch_add(1, Ordering::Relaxed);
    }
}
