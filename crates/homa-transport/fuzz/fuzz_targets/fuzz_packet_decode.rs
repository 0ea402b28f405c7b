#![no_main]

use libfuzzer_sys::fuzz_target;
use homa_transport::wire::DataHeader;

/// Fuzz the data packet header decoder. Must never panic on arbitrary
/// input — malformed or truncated buffers return `None`.
fuzz_target!(|data: &[u8]| {
    let _ = DataHeader::decode(&mut &data[..]);
});
