//! Minimal glue between an [`OutboundMessage`] and the peer/socket-lock
//! context the send and retransmit paths need.
//!
//! RPC lifecycle bookkeeping beyond these fields — request/response
//! matching, completion notification, timeouts — is an external
//! collaborator.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::message::OutboundMessage;
use crate::peer::Peer;

/// One outbound RPC: its message state machine plus the peer it targets.
///
/// `message` is guarded the way the real sender's per-RPC state is guarded
/// by the RPC's socket lock: callers on the ordinary send path take it with
/// [`OutboundRpc::lock`]; the pacer uses [`OutboundRpc::try_lock`] and
/// backs off without making progress if it's contended.
pub struct OutboundRpc {
    pub id: u64,
    pub peer: Arc<dyn Peer>,
    message: Mutex<OutboundMessage>,
}

impl OutboundRpc {
    pub fn new(message: OutboundMessage, peer: Arc<dyn Peer>) -> Self {
        OutboundRpc {
            id: message.id,
            peer,
            message: Mutex::new(message),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, OutboundMessage> {
        self.message.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, OutboundMessage>> {
        self.message.try_lock().ok()
    }

    /// Remaining bytes, used by the Throttled List's SRPT ordering. Locks
    /// briefly to read `length`/`next_offset`.
    pub fn remaining_bytes(&self) -> usize {
        self.lock().remaining_bytes()
    }
}
