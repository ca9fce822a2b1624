//! Fuzz target: `FrameReader::feed`
//!
//! Splits arbitrary input into reads of varying size and checks that the
//! reader never panics, never exceeds its window and never yields an
//! empty or oversized frame.
//!
//! cargo fuzz run fuzz_frame_reader

#![no_main]

use fanlink::link::frame::{FRAME_CAPACITY, FrameReader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&first, rest)) = data.split_first() else {
        return;
    };
    let limit = usize::from(first).max(1) * 2;
    let mut reader = FrameReader::with_limit(limit);

    let check = |frame: &[u8]| {
        assert!(!frame.is_empty(), "empty frame");
        assert!(frame.len() <= limit.min(FRAME_CAPACITY), "frame over limit");
        assert!(!frame.contains(&b'\n'), "terminator inside frame");
    };

    let step = usize::from(first % 61) + 1;
    for chunk in rest.chunks(step) {
        if let Some(f) = reader.feed(chunk) {
            check(&f);
        }
        while let Some(f) = reader.next_frame() {
            check(&f);
        }
        assert!(reader.len() <= FRAME_CAPACITY);
    }

    reader.reset();
    assert!(reader.is_empty());
    let _ = reader.feed(rest);
});
