//! Fuzz target: `decode_response`
//!
//! Any line must either fail cleanly or decode to finite readings.
//!
//! cargo fuzz run fuzz_response_decode

#![no_main]

use fanlink::protocol::decode_response;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    if let Ok(readings) = decode_response(&line) {
        assert!(readings.cpu.is_finite());
        assert!(readings.nvme.is_finite());
    }
});
