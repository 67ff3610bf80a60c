//! Fuzzing target for mapping table compilation
//!
//! Arbitrary documents must either compile or be rejected with an error.
//! Self-referencing and deeply nested transform definitions are the
//! interesting cases: compilation has to terminate on all of them.

#![no_main]

use libfuzzer_sys::fuzz_target;
use protomap_core::translation::{reverse_table, FieldMappingApplier, MappingTable};
use protomap_core::ApplyOptions;
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(table) = MappingTable::from_json_str("fuzz", text) else {
        return;
    };

    // A compiled table must be usable in both directions without panicking
    let probe = json!({
        "model": "gpt-4",
        "messages": [{"role": "user", "content": "hi"}],
        "nested": {"value": [1, 2, 3]}
    });
    let _ = FieldMappingApplier::new(&table).apply(&probe, &ApplyOptions::default());
    if let Ok(reverse) = reverse_table(&table, false) {
        let _ = FieldMappingApplier::new(&reverse.table).apply(&probe, &ApplyOptions::default());
    }
});
