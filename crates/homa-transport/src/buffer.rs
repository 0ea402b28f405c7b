//! Packet Buffer.
//!
//! A preallocated buffer holding a header and payload, shared by reference
//! count with whatever external component (the IP transmit primitive, in
//! our model) is currently holding it. `held_elsewhere` realizes the
//! "shared-buffer check via reference count" design note directly as
//! `Arc::strong_count`.

use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};

use crate::wire::{ControlHeader, DataHeader};

#[derive(Debug, Clone)]
enum Header {
    Data(DataHeader),
    Control(ControlHeader),
}

#[derive(Debug)]
struct PacketBufferData {
    header: Header,
    payload: Bytes,
    retransmit: bool,
    priority_tag: u8,
    cutoff_version: u16,
    route_pinned: bool,
}

/// A packet buffer. Cheap to clone — clones share the same underlying
/// allocation and reference count, the same way a kernel `skb` gains a
/// holder each time it is handed to a lower layer.
#[derive(Debug, Clone)]
pub struct PacketBuffer {
    inner: Arc<Mutex<PacketBufferData>>,
}

impl PacketBuffer {
    pub fn new_data(header: DataHeader, payload: Bytes) -> Self {
        PacketBuffer {
            inner: Arc::new(Mutex::new(PacketBufferData {
                cutoff_version: header.cutoff_version,
                header: Header::Data(header),
                payload,
                retransmit: false,
                priority_tag: 0,
                route_pinned: false,
            })),
        }
    }

    pub fn new_control(header: ControlHeader, payload: Bytes) -> Self {
        PacketBuffer {
            inner: Arc::new(Mutex::new(PacketBufferData {
                header: Header::Control(header),
                payload,
                retransmit: false,
                priority_tag: 0,
                route_pinned: false,
                cutoff_version: 0,
            })),
        }
    }

    /// Whether any holder besides this handle still exists — the userspace
    /// analogue of a kernel skb reference count greater than one.
    pub fn held_elsewhere(&self) -> bool {
        Arc::strong_count(&self.inner) > 1
    }

    /// The data header's `offset` field, fixed at init time. Panics if
    /// called on a control buffer — callers only ever hold data buffers in
    /// [`crate::message::OutboundMessage`].
    pub fn data_offset(&self) -> u32 {
        match self.lock().header {
            Header::Data(h) => h.offset,
            Header::Control(_) => panic!("data_offset called on a control buffer"),
        }
    }

    pub fn set_priority_tag(&self, tag: u8) {
        self.lock().priority_tag = tag;
    }

    pub fn priority_tag(&self) -> u8 {
        self.lock().priority_tag
    }

    pub fn set_retransmit(&self, flag: bool) {
        let mut guard = self.lock();
        guard.retransmit = flag;
        if let Header::Data(ref mut h) = guard.header {
            h.retransmit = flag as u8;
        }
    }

    /// Refresh the stamped `cutoff_version` from the peer; it may have
    /// changed since init.
    pub fn refresh_cutoff_version(&self, version: u16) {
        let mut guard = self.lock();
        guard.cutoff_version = version;
        if let Header::Data(ref mut h) = guard.header {
            h.cutoff_version = version;
        }
    }

    pub fn mark_route_pinned(&self) {
        self.lock().route_pinned = true;
    }

    pub fn route_pinned(&self) -> bool {
        self.lock().route_pinned
    }

    /// Total on-wire size: header length plus payload.
    pub fn wire_len(&self) -> usize {
        let guard = self.lock();
        let header_len = match guard.header {
            Header::Data(_) => DataHeader::ENCODED_LEN,
            Header::Control(_) => crate::wire::MAX_HEADER,
        };
        header_len + guard.payload.len()
    }

    pub fn encode(&self) -> Bytes {
        let guard = self.lock();
        let mut buf = BytesMut::with_capacity(self.wire_len());
        match guard.header {
            Header::Data(h) => h.encode(&mut buf),
            Header::Control(h) => h.encode(&mut buf),
        }
        buf.extend_from_slice(&guard.payload);
        buf.freeze()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PacketBufferData> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
