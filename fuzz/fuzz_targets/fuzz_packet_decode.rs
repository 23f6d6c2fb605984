// Copyright (c) 2026 Driftmesh
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Canonical envelope decoding is size-capped and must not panic.
    if let Ok(packet) = driftmesh::core::types::decode_packet(data) {
        let _ = packet.id();
        let _ = packet.validate(10);
    }
});
