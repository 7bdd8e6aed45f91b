//! Validation overhead benchmarks
//!
//! Benchmarks evaluation and the full `validate` entry point on flat and
//! nested payloads.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use vouch::pipeline::{RedactValues, TracingLogger};
use vouch::{
    create_validator, evaluate, Asserts, ConstraintSpec, ErrorTree, EvaluateOptions,
    ValidationFailed, ValidatorOptions,
};

fn user_spec(is: &Asserts) -> ConstraintSpec {
    ConstraintSpec::new()
        .field("name", [is.required(), is.string(), is.length(Some(3), Some(50))])
        .field("email", [is.required(), is.email()])
        .field("age", [is.integer(), is.range(18.0, 120.0)])
        .field("tags", [is.unique(), is.collection(is.length(None, Some(16)))])
        .at("address.city", is.required())
        .at("address.zip", is.regexp(r"^\d{5}$").unwrap())
}

fn valid_user() -> Value {
    json!({
        "name": "johndoe",
        "email": "john@example.com",
        "age": 25,
        "tags": ["admin", "staff"],
        "address": {"city": "Lisbon", "zip": "12345"},
        "metadata": {"source": "signup", "campaign": "spring"}
    })
}

fn invalid_user() -> Value {
    json!({
        "name": "jd",
        "email": "not-an-email",
        "age": 12,
        "tags": ["admin", "admin"],
        "address": {"zip": "abc"}
    })
}

/// Benchmark raw constraint evaluation
fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let is = Asserts::builtin();
    let spec = user_spec(&is);
    let options = EvaluateOptions::new().with_deep_required(true);

    group.bench_function("valid_payload", |b| {
        let data = valid_user();
        b.iter(|| evaluate(black_box(&data), &spec, &options).is_ok())
    });

    group.bench_function("invalid_payload", |b| {
        let data = invalid_user();
        b.iter(|| evaluate(black_box(&data), &spec, &options).err().map(|e| e.len()))
    });

    group.finish();
}

/// Benchmark the full entry point with different validator options
fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");

    let plain = create_validator(ValidatorOptions::new().validation_error(ValidationFailed::from));
    let masked = create_validator(
        ValidatorOptions::new()
            .validation_error(ValidationFailed::from)
            .mask(true),
    );
    let hooked = create_validator(
        ValidatorOptions::new()
            .validation_error(|errors: ErrorTree| errors.to_report())
            .obfuscator(RedactValues)
            .logger(TracingLogger::new()),
    );
    let spec = user_spec(plain.is());

    group.bench_function("plain_valid", |b| {
        b.iter(|| plain.validate(black_box(valid_user()), &spec).is_ok())
    });

    group.bench_function("masked_valid", |b| {
        b.iter(|| masked.validate(black_box(valid_user()), &spec).is_ok())
    });

    group.bench_function("hooked_invalid", |b| {
        b.iter(|| hooked.validate(black_box(invalid_user()), &spec).is_err())
    });

    group.finish();
}

/// Benchmark loading a spec from JSON
fn bench_spec_loading(c: &mut Criterion) {
    let is = Asserts::builtin();
    let raw = json!({
        "name": ["required", "string", {"$assert": "length", "args": [{"min": 3, "max": 50}]}],
        "email": ["required", "email"],
        "age": ["integer", {"$assert": "range", "args": [18, 120]}],
        "address": {"city": "required", "zip": {"$assert": "regexp", "args": ["^\\d{5}$"]}}
    });

    c.bench_function("spec_from_value", |b| {
        b.iter(|| ConstraintSpec::from_value(black_box(&raw), &is).is_ok())
    });
}

criterion_group!(benches, bench_evaluate, bench_validate, bench_spec_loading);
criterion_main!(benches);
