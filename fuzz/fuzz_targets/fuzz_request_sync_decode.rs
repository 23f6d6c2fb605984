// Copyright (c) 2026 Driftmesh
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Best-effort: sync payload decoding must not panic, and anything
    // it accepts must decode to buckets without panicking either.
    if let Ok(filter) = driftmesh::core::gcs::GcsFilter::decode(data) {
        let _ = filter.decode_buckets();
    }
});
