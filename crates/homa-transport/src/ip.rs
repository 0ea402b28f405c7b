//! External collaborators for buffer allocation and IP-layer transmit.

use bytes::BytesMut;

use crate::buffer::PacketBuffer;
use crate::error::HomaError;
use crate::peer::Route;

/// `alloc_skb(size) -> Result<buffer, err>` / `free_skb(buffer)`.
///
/// `free_skb` has no explicit method here: a [`PacketBuffer`] releases its
/// allocation when its last `Arc` clone drops.
pub trait BufferAllocator: Send + Sync {
    fn alloc(&self, payload_len: usize) -> Result<BytesMut, HomaError>;
}

/// Zeroing allocator backed by the system allocator. The allocation itself
/// cannot fail in safe Rust short of an abort, so this never returns
/// `NoMemory` — it exists so tests can substitute a failing allocator to
/// exercise the `NO_MEMORY` path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl BufferAllocator for SystemAllocator {
    fn alloc(&self, payload_len: usize) -> Result<BytesMut, HomaError> {
        Ok(BytesMut::zeroed(payload_len))
    }
}

/// `ip_queue_xmit(socket, buffer, flow) -> Result<(), errno>`.
///
/// Takes the buffer by value: a successful implementation drops it
/// (releasing the extra reference) once the hardware has the frame; an
/// implementation simulating a held buffer (e.g. queued downstream) may
/// retain a clone, which is exactly what `held_elsewhere` later observes.
pub trait IpTransmit: Send + Sync {
    fn queue_xmit(&self, buffer: PacketBuffer, route: &Route) -> Result<(), i32>;
}

/// Transmit primitive that always succeeds and immediately releases the
/// buffer — the common case in tests that don't care about the anomaly
/// path.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardTransmit;

impl IpTransmit for DiscardTransmit {
    fn queue_xmit(&self, _buffer: PacketBuffer, _route: &Route) -> Result<(), i32> {
        Ok(())
    }
}
