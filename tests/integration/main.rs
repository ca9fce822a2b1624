//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one side of the link
//! against mock transports. All tests run on the host with no serial
//! hardware and no real sleeping.

mod mock_link;
mod poller_tests;
mod responder_tests;
