// Copyright (c) 2026 Driftmesh
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u32, u32, Vec<u8>)| {
    let (p, m, data) = input;
    let filter = driftmesh::core::gcs::GcsFilter {
        p: p % 40, // exercise out-of-range bit widths too
        m: m as u64,
        data,
    };
    let set = filter.to_bucket_set();
    let id = driftmesh::core::types::PacketId::from_bytes([0x42; 16]);
    let _ = set.contains_id(&id);
});
