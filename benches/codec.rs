use criterion::{black_box, criterion_group, criterion_main, Criterion};

use spp::frame;
use spp::message::MessageParser;
use spp::registry::CommandRegistry;

fn igniter_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register(
            0x10,
            "igniter",
            0.1,
            Some(spp::parser::Parser::float32(None, ' ')),
            Some(spp::parser::Parser::float32(None, ' ')),
        )
        .unwrap();
    registry
}

fn criterion_benchmark(c: &mut Criterion) {
    let registry = igniter_registry();
    let parser = MessageParser::from_registry(&registry).unwrap();
    let message = parser.decode_text("igniter 1.5").unwrap();

    c.bench_function("encode_frame", |b| {
        b.iter(|| {
            let packet = frame::encode_reply(black_box(&message), black_box(5), black_box(0)).unwrap();
            black_box(packet);
        })
    });

    let packet = frame::encode_reply(&message, 5, 0).unwrap();

    c.bench_function("decode_frame", |b| {
        b.iter(|| {
            let decoded = frame::decode(black_box(&packet), black_box(5), black_box(&parser)).unwrap();
            black_box(decoded);
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
