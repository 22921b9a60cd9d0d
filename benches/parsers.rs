use criterion::{black_box, criterion_group, criterion_main, Criterion};

use spp::parser::Parser;

fn criterion_benchmark(c: &mut Criterion) {
    let parser = Parser::list(Parser::integer(spp::value::IntWidth::W32, true, ' '), None, " ");
    let text = "1 2 3 4 5 6 7 8 9 10";
    let (_, value) = parser.decode_text(text).unwrap();
    let mut binary = Vec::new();
    value.render_binary(&mut binary);

    c.bench_function("parse_text", |b| {
        b.iter(|| {
            let (rest, value) = parser.decode_text(black_box(text)).unwrap();
            black_box((rest, value));
        })
    });

    c.bench_function("parse_binary", |b| {
        b.iter(|| {
            let (rest, value) = parser.decode_binary(black_box(&binary)).unwrap();
            black_box((rest, value));
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
