//! Fuzzing target for request conversion
//!
//! Feeds arbitrary JSON documents through the bundled tables in every
//! direction, with agents enabled.

#![no_main]

use libfuzzer_sys::fuzz_target;
use protomap_core::{
    CompatibilityModule, ConversionContext, Direction, MappingTableStore, ModuleConfig,
};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let store = MappingTableStore::new();
    let ctx = ConversionContext::new();

    for table in ["openai-dashscope", "openai-agent-task"] {
        for direction in [Direction::AToB, Direction::BToA, Direction::Bidirectional] {
            let mut config = ModuleConfig::new(table);
            config.direction = direction;
            config.enable_agents = true;
            let Ok(module) = CompatibilityModule::new(config, &store) else {
                continue;
            };
            let _ = module.convert_request(&input, &ctx);
            let _ = module.convert_response(&input, &ctx);
            let _ = module.validate(&input);
        }
    }
});
