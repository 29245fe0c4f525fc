#![allow(dead_code)]
use std::path::Path;

use autoreturn::ast::Program;
use autoreturn::parser;
use test_support::bench_cases;

/// `(label, program source)` for every fixture case marked for benchmarking.
pub fn workloads() -> Vec<(String, String)> {
    let cases = bench_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load bench cases: {err:#}"));
    cases
        .into_iter()
        .map(|case| {
            let source = case
                .read_program()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            (case.name, source)
        })
        .collect()
}

pub fn load_program(source: &str) -> Program {
    parser::parse(source).unwrap_or_else(|err| panic!("parse: {err}"))
}
