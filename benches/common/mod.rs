#![allow(dead_code)]
use std::path::Path;

use sepia::ast::Program;
use sepia::parser;
use test_support::bench_cases;

/// Bench-enabled fixtures as `(label, source)` pairs.
pub fn workloads() -> Vec<(String, String)> {
    bench_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load bench cases: {err:#}"))
        .into_iter()
        .map(|case| {
            let source = case
                .source()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            (case.name, source)
        })
        .collect()
}

pub fn load_program(label: &str, source: &str) -> Program {
    parser::parse(source).unwrap_or_else(|err| panic!("parse {label}: {err}"))
}
