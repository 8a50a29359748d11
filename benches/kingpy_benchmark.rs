// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::hint::black_box;

use kingpy::{translate, Capabilities, CapturedOutput, Executor, ScriptedInput, Value};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const GREETER: &str = r#"
name = ask "Name? ";
say "Hello, " + name;
exports.greeted = name;
"#;

fn counting_loop(n: usize) -> String {
    format!(
        r#"
fun sum(n):
    total = 0;
    i = 0;
    while(i < n):
        total = total + i;
        i = i + 1;
    return total;
exports.total = sum({n});
"#
    )
}

fn run(executor: &Executor, source: &str) -> Value {
    let capabilities = Capabilities::new(CapturedOutput::new(), ScriptedInput::new(["bench"]));
    executor.run_with(black_box(source), capabilities).unwrap()
}

fn translation(c: &mut Criterion) {
    c.bench_function("translate greeter", |b| {
        b.iter(|| translate(black_box(GREETER)))
    });

    let mut group = c.benchmark_group("translate repeated statements");
    for size in [32, 128, 512, 2048].iter() {
        let source = "x = x + 1;\nsay x;\n".repeat(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, source| {
            b.iter(|| translate(black_box(source)))
        });
    }
    group.finish();
}

fn execution(c: &mut Criterion) {
    let executor = Executor::new();

    c.bench_function("run greeter", |b| b.iter(|| run(&executor, GREETER)));

    let mut group = c.benchmark_group("run counting loop");
    for size in [10, 100, 1000, 10000].iter() {
        let source = counting_loop(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, source| {
            b.iter(|| run(&executor, source))
        });
    }
    group.finish();
}

criterion_group!(benches, translation, execution);
criterion_main!(benches);
