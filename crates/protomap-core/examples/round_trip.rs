// Convert an OpenAI chat request to DashScope and a DashScope response back
// Usage: cargo run --example round_trip [model]
// Example: cargo run --example round_trip gpt-4o

use protomap_core::{
    CompatibilityModule, ConversionContext, Direction, MappingTableStore, ModuleConfig,
};
use serde_json::json;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let model = env::args().nth(1).unwrap_or_else(|| "gpt-4".to_string());

    let mut config = ModuleConfig::new("openai-dashscope");
    config.direction = Direction::Bidirectional;
    let module = CompatibilityModule::initialize(config, &MappingTableStore::new()).await?;

    let info = module.compatibility_info();
    println!("Conversions: {}", info.supported_conversions.join(", "));

    let ctx = ConversionContext::new().with_request_id("example-1");
    let request = json!({
        "model": model,
        "messages": [
            {"role": "developer", "content": "Answer in one word."},
            {"role": "user", "content": "Capital of France?"}
        ],
        "temperature": 0.3,
        "stream": false
    });
    let vendor_request = module.convert_request(&request, &ctx)?;
    println!("DashScope request:\n{}", serde_json::to_string_pretty(&vendor_request)?);

    let vendor_response = json!({
        "request_id": "example-1",
        "output": {
            "choices": [{
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": "Paris"}
            }]
        },
        "usage": {"input_tokens": 18, "output_tokens": 1, "total_tokens": 19}
    });
    let response = module.convert_response(&vendor_response, &ctx)?;
    println!("OpenAI response:\n{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
