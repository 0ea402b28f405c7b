//! Wire formats.
//!
//! Every field is fixed-width network byte order — no QUIC-style VarInt.
//! Homa packets are short and latency-sensitive; the header layout is
//! dominated by a handful of `u16`/`u32`/`u64` fields with a fixed encoded
//! length, rather than a variable-length encoding.

use bytes::{Buf, BufMut, BytesMut};

/// Control packets are zero-padded up to this many bytes regardless of
/// their actual body size.
pub const MAX_HEADER: usize = 32;

/// Packet type discriminant carried in the data header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Data = 0,
    Control = 1,
}

/// Data packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub sport: u16,
    pub dport: u16,
    pub id: u64,
    pub message_length: u32,
    pub offset: u32,
    pub unscheduled: u32,
    pub cutoff_version: u16,
    pub retransmit: u8,
}

impl DataHeader {
    pub const ENCODED_LEN: usize = 2 + 2 + 8 + 1 + 4 + 4 + 4 + 2 + 1;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.sport);
        buf.put_u16(self.dport);
        buf.put_u64(self.id);
        buf.put_u8(PacketType::Data as u8);
        buf.put_u32(self.message_length);
        buf.put_u32(self.offset);
        buf.put_u32(self.unscheduled);
        buf.put_u16(self.cutoff_version);
        buf.put_u8(self.retransmit);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN {
            return None;
        }
        let sport = buf.get_u16();
        let dport = buf.get_u16();
        let id = buf.get_u64();
        let ptype = buf.get_u8();
        if ptype != PacketType::Data as u8 {
            return None;
        }
        Some(DataHeader {
            sport,
            dport,
            id,
            message_length: buf.get_u32(),
            offset: buf.get_u32(),
            unscheduled: buf.get_u32(),
            cutoff_version: buf.get_u16(),
            retransmit: buf.get_u8(),
        })
    }
}

/// Control packet subtype, tagged in the common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlType {
    Grant = 0,
    Resend = 1,
    Ack = 2,
    Cutoffs = 3,
    Busy = 4,
}

impl ControlType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ControlType::Grant),
            1 => Some(ControlType::Resend),
            2 => Some(ControlType::Ack),
            3 => Some(ControlType::Cutoffs),
            4 => Some(ControlType::Busy),
            _ => None,
        }
    }
}

/// Common control header, identical shape to the data header's leading
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlHeader {
    pub sport: u16,
    pub dport: u16,
    pub id: u64,
    pub ctype: ControlType,
}

impl ControlHeader {
    pub const ENCODED_LEN: usize = 2 + 2 + 8 + 1;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.sport);
        buf.put_u16(self.dport);
        buf.put_u64(self.id);
        buf.put_u8(PacketType::Control as u8);
        buf.put_u8(self.ctype as u8);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN + 1 {
            return None;
        }
        let sport = buf.get_u16();
        let dport = buf.get_u16();
        let id = buf.get_u64();
        let ptype = buf.get_u8();
        if ptype != PacketType::Control as u8 {
            return None;
        }
        let ctype = ControlType::from_byte(buf.get_u8())?;
        Some(ControlHeader {
            sport,
            dport,
            id,
            ctype,
        })
    }
}

/// `grant = offset:u32, priority:u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantBody {
    pub offset: u32,
    pub priority: u8,
}

impl GrantBody {
    pub const ENCODED_LEN: usize = 5;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.offset);
        buf.put_u8(self.priority);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN {
            return None;
        }
        Some(GrantBody {
            offset: buf.get_u32(),
            priority: buf.get_u8(),
        })
    }
}

/// A byte-range retransmit request, executed by the Retransmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendBody {
    pub start: u32,
    pub end: u32,
    pub priority: u8,
}

impl ResendBody {
    pub const ENCODED_LEN: usize = 9;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.start);
        buf.put_u32(self.end);
        buf.put_u8(self.priority);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN {
            return None;
        }
        Some(ResendBody {
            start: buf.get_u32(),
            end: buf.get_u32(),
            priority: buf.get_u8(),
        })
    }
}

/// Control packet body, dispatched on `ControlHeader::ctype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlBody {
    Grant(GrantBody),
    Resend(ResendBody),
    Ack,
    Cutoffs,
    Busy,
}

impl ControlBody {
    pub fn control_type(&self) -> ControlType {
        match self {
            ControlBody::Grant(_) => ControlType::Grant,
            ControlBody::Resend(_) => ControlType::Resend,
            ControlBody::Ack => ControlType::Ack,
            ControlBody::Cutoffs => ControlType::Cutoffs,
            ControlBody::Busy => ControlType::Busy,
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        match self {
            ControlBody::Grant(g) => g.encode(buf),
            ControlBody::Resend(r) => r.encode(buf),
            ControlBody::Ack | ControlBody::Cutoffs | ControlBody::Busy => {}
        }
    }

    fn decode(ctype: ControlType, buf: &mut impl Buf) -> Option<Self> {
        match ctype {
            ControlType::Grant => Some(ControlBody::Grant(GrantBody::decode(buf)?)),
            ControlType::Resend => Some(ControlBody::Resend(ResendBody::decode(buf)?)),
            ControlType::Ack => Some(ControlBody::Ack),
            ControlType::Cutoffs => Some(ControlBody::Cutoffs),
            ControlType::Busy => Some(ControlBody::Busy),
        }
    }
}

/// A fully assembled control packet: header + body, zero-padded to
/// `MAX_HEADER` bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    pub header: ControlHeader,
    pub body: ControlBody,
}

impl ControlPacket {
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(MAX_HEADER);
        self.header.encode(&mut buf);
        self.body.encode(&mut buf);
        if buf.len() < MAX_HEADER {
            buf.resize(MAX_HEADER, 0);
        }
        buf
    }

    pub fn decode(data: &mut impl Buf) -> Option<Self> {
        let header = ControlHeader::decode(data)?;
        let body = ControlBody::decode(header.ctype, data)?;
        Some(ControlPacket { header, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data_header() -> DataHeader {
        DataHeader {
            sport: 1000,
            dport: 2000,
            id: 0xdead_beef_0000_0001,
            message_length: 6000,
            offset: 1400,
            unscheduled: 2000,
            cutoff_version: 7,
            retransmit: 1,
        }
    }

    #[test]
    fn data_header_round_trip() {
        let header = sample_data_header();
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), DataHeader::ENCODED_LEN);
        let decoded = DataHeader::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn data_header_rejects_short_buffer() {
        let mut buf = BytesMut::new();
        buf.put_u8(0);
        assert!(DataHeader::decode(&mut buf.freeze()).is_none());
    }

    #[test]
    fn control_packet_round_trip_grant() {
        let pkt = ControlPacket {
            header: ControlHeader {
                sport: 10,
                dport: 20,
                id: 42,
                ctype: ControlType::Grant,
            },
            body: ControlBody::Grant(GrantBody {
                offset: 4200,
                priority: 3,
            }),
        };
        let encoded = pkt.encode();
        assert_eq!(encoded.len(), MAX_HEADER);
        let decoded = ControlPacket::decode(&mut encoded.freeze()).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn control_packet_round_trip_resend() {
        let pkt = ControlPacket {
            header: ControlHeader {
                sport: 10,
                dport: 20,
                id: 42,
                ctype: ControlType::Resend,
            },
            body: ControlBody::Resend(ResendBody {
                start: 1000,
                end: 5000,
                priority: 5,
            }),
        };
        let encoded = pkt.encode();
        let decoded = ControlPacket::decode(&mut encoded.freeze()).unwrap();
        assert_eq!(decoded, pkt);
    }

    proptest::proptest! {
        #[test]
        fn data_header_round_trip_prop(
            sport: u16, dport: u16, id: u64,
            message_length: u32, offset: u32, unscheduled: u32,
            cutoff_version: u16, retransmit: u8,
        ) {
            let header = DataHeader { sport, dport, id, message_length, offset, unscheduled, cutoff_version, retransmit };
            let mut buf = BytesMut::new();
            header.encode(&mut buf);
            let decoded = DataHeader::decode(&mut buf.freeze()).unwrap();
            proptest::prop_assert_eq!(decoded, header);
        }
    }
}
