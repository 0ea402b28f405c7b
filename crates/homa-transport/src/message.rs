//! Component C — Outbound Message.
//!
//! Owns the packet list for one message; tracks `next_offset`, `granted`,
//! `unscheduled`, `sched_priority`.

use crate::buffer::PacketBuffer;
use crate::config::{HomaConfig, MAX_DATA_PER_PACKET, MAX_MESSAGE_LENGTH};
use crate::error::HomaError;
use crate::ip::BufferAllocator;
use crate::peer::Peer;
use crate::wire::DataHeader;

/// Owns the packet list for one outbound message.
pub struct OutboundMessage {
    pub id: u64,
    pub sport: u16,
    pub dport: u16,
    /// Total user bytes.
    pub length: usize,
    packets: Vec<PacketBuffer>,
    /// Byte offset of the next unsent packet.
    pub next_offset: usize,
    /// Index into `packets` of the next packet to send; equals
    /// `packets.len()` when drained.
    next_index: usize,
    /// Bytes transmittable without a grant.
    pub unscheduled: usize,
    /// Highest byte offset currently permitted (exclusive).
    pub granted: usize,
    /// Priority for packets beyond `unscheduled`.
    pub sched_priority: u8,
}

impl OutboundMessage {
    /// Allocate packet buffers for `data` and build a ready-to-send message.
    ///
    /// Fails with [`HomaError::Invalid`] if `data.len() > MAX_MESSAGE_LENGTH`.
    /// Allocation failures propagate as [`HomaError::NoMemory`]; any packets
    /// already built are dropped (their `Arc` allocations freed) before the
    /// error returns.
    pub fn init(
        data: &[u8],
        id: u64,
        dport: u16,
        sport: u16,
        peer: &dyn Peer,
        config: &HomaConfig,
        alloc: &dyn BufferAllocator,
    ) -> Result<Self, HomaError> {
        if data.len() > MAX_MESSAGE_LENGTH {
            return Err(HomaError::Invalid);
        }

        let packet_count = if data.is_empty() {
            1
        } else {
            data.len().div_ceil(MAX_DATA_PER_PACKET)
        };
        let unscheduled = data.len().min(config.rtt_bytes as usize);
        let cutoff_version = peer.cutoff_version();

        let mut packets = Vec::with_capacity(packet_count);
        for i in 0..packet_count {
            let offset = i * MAX_DATA_PER_PACKET;
            let chunk_len = if data.is_empty() {
                0
            } else {
                (data.len() - offset).min(MAX_DATA_PER_PACKET)
            };
            let chunk = &data[offset..offset + chunk_len];

            let mut buf = match alloc.alloc(chunk_len) {
                Ok(buf) => buf,
                Err(_) => {
                    // Partially built packets (`packets`) drop here,
                    // releasing their allocations.
                    return Err(HomaError::NoMemory);
                }
            };
            buf.copy_from_slice(chunk);

            let header = DataHeader {
                sport,
                dport,
                id,
                message_length: data.len() as u32,
                offset: offset as u32,
                unscheduled: unscheduled as u32,
                cutoff_version,
                retransmit: 0,
            };
            packets.push(PacketBuffer::new_data(header, buf.freeze()));
        }

        let granted = data.len().min(unscheduled);
        Ok(OutboundMessage {
            id,
            sport,
            dport,
            length: data.len(),
            packets,
            next_offset: 0,
            next_index: 0,
            unscheduled,
            granted,
            sched_priority: 0,
        })
    }

    /// Rewind `next_offset`/`next_index`/`granted` to their init values.
    /// Preserves all packet buffers and payloads. Used after a peer
    /// indicates lost state.
    pub fn reset(&mut self) {
        self.next_offset = 0;
        self.next_index = 0;
        self.granted = self.length.min(self.unscheduled);
    }

    /// Release all packet buffers. Idempotent.
    pub fn destroy(&mut self) {
        self.packets.clear();
        self.next_offset = 0;
        self.next_index = 0;
    }

    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }

    pub fn packets(&self) -> &[PacketBuffer] {
        &self.packets
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Whether the message has nothing left to (re)send under its current
    /// grant: either drained entirely or waiting on the next grant.
    pub fn is_drained(&self) -> bool {
        self.next_offset >= self.granted || self.next_index >= self.packets.len()
    }

    pub fn remaining_bytes(&self) -> usize {
        self.length.saturating_sub(self.next_offset)
    }

    /// Advance past the packet at `next_index`, returning its index so the
    /// caller can borrow it from `packets()` rather than holding a clone of
    /// its own — an extra clone here would make `held_elsewhere()` see the
    /// caller's local handle as a phantom external holder. The offset
    /// counter overshoots `length` on the final short packet by design —
    /// it tracks "bytes of wire time accounted for", not "bytes of
    /// payload remaining", and callers must not "fix" this.
    pub(crate) fn advance(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.next_offset += MAX_DATA_PER_PACKET;
        index
    }
}
