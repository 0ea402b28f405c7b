//! Error kinds surfaced by the outbound path.

use thiserror::Error;

/// Failure modes the core can report to a caller.
///
/// Per-packet send failures on the hot path are *not* represented here —
/// they are reported via [`crate::metrics::Metrics`] only and never abort
/// the send loop (see [`crate::data_sender`]).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HomaError {
    /// Message length exceeds `MAX_MESSAGE_LENGTH`.
    #[error("message too large")]
    Invalid,
    /// Packet buffer allocation failed.
    #[error("out of memory")]
    NoMemory,
    /// Control packet buffer allocation failed.
    #[error("out of buffers")]
    NoBuffers,
    /// Copying user data into a packet buffer failed.
    #[error("fault copying message data")]
    Fault,
    /// The IP transmit primitive returned an errno.
    #[error("transport error (errno {0})")]
    Transport(i32),
}

pub type Result<T> = std::result::Result<T, HomaError>;
