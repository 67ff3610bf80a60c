//! Benchmarks for the conversion hot path
//!
//! Table loading happens once per module, so these benchmarks focus on what
//! runs per request: field mapping with nested transforms, table-level
//! validation over growing inputs, and agent selection.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use protomap_core::{
    AgentConfig, AgentDispatcher, CompatibilityModule, ConversionContext, Direction,
    MappingTableStore, ModuleConfig,
};
use serde_json::{json, Value};

fn create_request(message_count: usize) -> Value {
    let messages: Vec<Value> = (0..message_count)
        .map(|i| {
            json!({
                "role": if i % 2 == 0 { "user" } else { "assistant" },
                "content": format!("Message number {} with a little bit of text in it", i)
            })
        })
        .collect();

    json!({
        "model": "gpt-4",
        "messages": messages,
        "temperature": 0.7,
        "top_p": 0.9,
        "max_tokens": 512,
        "stream": false,
        "stop": ["\n\n"]
    })
}

fn create_module(direction: Direction) -> CompatibilityModule {
    let mut config = ModuleConfig::new("openai-dashscope");
    config.direction = direction;
    CompatibilityModule::new(config, &MappingTableStore::new()).unwrap()
}

fn bench_convert_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_request");
    let module = create_module(Direction::AToB);
    let ctx = ConversionContext::new();

    for size in [1, 10, 100, 1000] {
        let request = create_request(size);
        group.bench_with_input(BenchmarkId::new("messages", size), &request, |b, request| {
            b.iter(|| {
                let result = module.convert_request(black_box(request), &ctx);
                black_box(result)
            })
        });
    }

    group.finish();
}

fn bench_convert_response(c: &mut Criterion) {
    let module = create_module(Direction::Bidirectional);
    let ctx = ConversionContext::new();
    let response = json!({
        "request_id": "bench",
        "output": {
            "choices": [{
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": "Benchmark reply"}
            }]
        },
        "usage": {"input_tokens": 120, "output_tokens": 30, "total_tokens": 150}
    });

    c.bench_function("convert_response", |b| {
        b.iter(|| {
            let result = module.convert_response(black_box(&response), &ctx);
            black_box(result)
        })
    });
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let module = create_module(Direction::AToB);

    for size in [10, 1000] {
        let mut request = create_request(size);
        request["temperature"] = json!(5);
        group.bench_with_input(BenchmarkId::new("invalid", size), &request, |b, request| {
            b.iter(|| black_box(module.validate(black_box(request))))
        });
    }

    group.finish();
}

fn bench_agent_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("agent_selection");
    let dispatcher = AgentDispatcher::from_config(&AgentConfig::default());

    let cases = vec![
        ("general", create_request(20)),
        (
            "code",
            json!({"messages": [{"role": "user", "content": "please review this function for me"}]}),
        ),
        (
            "image",
            json!({"messages": [{"role": "user", "content": [
                {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}}
            ]}]}),
        ),
    ];

    for (name, request) in cases {
        group.bench_with_input(BenchmarkId::new("select", name), &request, |b, request| {
            b.iter(|| black_box(dispatcher.select(black_box(request))))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_convert_request,
    bench_convert_response,
    bench_validate,
    bench_agent_selection
);
criterion_main!(benches);
