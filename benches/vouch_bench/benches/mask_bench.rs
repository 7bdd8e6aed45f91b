//! Field mask benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use vouch::{derive_mask, prune, Asserts, ConstraintSpec, FieldMask};

fn wide_payload(fields: usize) -> Value {
    let mut object = serde_json::Map::new();
    for i in 0..fields {
        object.insert(format!("field_{i}"), json!({"value": i, "label": format!("item {i}")}));
    }
    Value::Object(object)
}

fn bench_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask");
    let is = Asserts::builtin();
    let spec = (0..10).fold(ConstraintSpec::new(), |spec, i| {
        spec.at(&format!("field_{i}.value"), is.integer())
    });
    let data = wide_payload(100);

    group.bench_function("derive", |b| b.iter(|| derive_mask(black_box(&spec))));

    group.bench_function("parse", |b| {
        let expression = derive_mask(&spec);
        b.iter(|| FieldMask::parse(black_box(&expression)).is_ok())
    });

    group.bench_function("prune_structural", |b| {
        let mask = FieldMask::from_spec(&spec);
        b.iter(|| mask.prune(black_box(&data)))
    });

    group.bench_function("prune_expression", |b| {
        b.iter(|| prune(black_box(&data), "field_1(value),field_2/label,field_3").is_ok())
    });

    group.finish();
}

criterion_group!(benches, bench_mask);
criterion_main!(benches);
