mod common;

use autoreturn::interpreter::Interpreter;
use autoreturn::{RewriteOptions, rewrite_source, transform};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

const DEFINITION: &str = "\
scale = 3
if True:
    def body(values, offset=1):
        total = 0
        for value in values:
            total = total + value * scale
        total + offset
";

fn bench_transform(c: &mut Criterion) {
    let interpreter = Interpreter::new();
    let module = interpreter
        .run_source("bench.py", DEFINITION)
        .expect("load definition");
    let function = module.function("body").expect("body defined");

    c.bench_function("transform_live_function", |b| {
        b.iter(|| {
            let out = transform(black_box(&function)).expect("transform");
            black_box(out);
        })
    });

    let options = RewriteOptions::default();
    for (label, source) in common::workloads() {
        c.bench_function(&format!("rewrite_source_{label}"), |b| {
            b.iter(|| {
                let out = rewrite_source(black_box(&source), &options).expect("rewrite");
                black_box(out);
            })
        });

        c.bench_function(&format!("run_decorated_{label}"), |b| {
            b.iter(|| {
                let out = interpreter
                    .run_source(&label, black_box(&source))
                    .expect("run");
                black_box(out.output);
            })
        });
    }
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
