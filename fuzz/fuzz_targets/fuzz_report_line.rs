//! Fuzz target: host-side report parsing and CPM estimation
//!
//! Treats the input as a serial capture, splits it into lines and feeds
//! each one to the estimator.  Verifies:
//! - No panics on malformed or non-UTF-8 lines
//! - The estimate is never NaN or negative
//!
//! cargo fuzz run fuzz_report_line

#![no_main]

use geiger::host::cpm::{CpmEstimator, HISTORY};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut est = CpmEstimator::new();
    for raw in data.split(|&b| b == b'\n') {
        let Ok(line) = core::str::from_utf8(raw) else {
            continue;
        };
        if let Some(cpm) = est.push_line(line) {
            assert!(!cpm.is_nan() && cpm >= 0.0, "bad estimate {cpm}");
        }
        assert!(est.events() <= HISTORY);
    }
});
