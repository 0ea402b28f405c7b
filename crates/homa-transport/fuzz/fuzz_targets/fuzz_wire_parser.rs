#![no_main]

use libfuzzer_sys::fuzz_target;
use homa_transport::wire::{ControlPacket, DataHeader};

/// Fuzz the full wire decode surface and check round-trip stability
/// whenever a buffer happens to decode successfully.
fuzz_target!(|data: &[u8]| {
    let _ = ControlPacket::decode(&mut &data[..]);

    if let Some(header) = DataHeader::decode(&mut &data[..]) {
        let mut buf = bytes::BytesMut::new();
        header.encode(&mut buf);
        let re_decoded = DataHeader::decode(&mut &buf[..]);
        assert_eq!(re_decoded, Some(header), "re-encode/decode must round-trip");
    }
});
