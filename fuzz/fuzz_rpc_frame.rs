//! Fuzz target for the admin-socket response framer.
//!
//! Run with: cargo +nightly fuzz run fuzz_rpc_frame
//!
//! The framer sees whatever bytes have arrived so far. It must never panic,
//! and once a buffer holds a complete response, more bytes cannot undo that.

#![no_main]

use libfuzzer_sys::fuzz_target;
use yggcommander_core::admin::{Frame, decode_response};

fuzz_target!(|data: &[u8]| {
    let Ok(Frame::Complete(first)) = decode_response(data) else {
        return;
    };

    let mut extended = data.to_vec();
    extended.extend_from_slice(b"{\"trailing\":");
    match decode_response(&extended) {
        Ok(Frame::Complete(again)) => assert_eq!(again, first),
        other => panic!("complete frame regressed to {other:?}"),
    }
});
