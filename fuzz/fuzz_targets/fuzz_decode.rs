// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use shade::config::CodecConfig;
use shade::{codec, new_empty, Type};

fuzz_target!(|data: &[u8]| {
    let config = CodecConfig::default().with_max_depth(32).with_max_len(1 << 16);

    // Untyped target: every well-formed stream is accepted
    let any = new_empty(&Type::interface());
    if codec::try_decode_with(data, &any, &config).is_ok() {
        // Anything decoded must encode again
        let _ = codec::encode_with(&any, &config);
    }

    // Typed target: kind checks on every level
    let typed = new_empty(&Type::slice_of(&Type::string()));
    let _ = codec::try_decode_with(data, &typed, &config);
});
