//! Query engine benchmarks over a synthetic project.
//!
//! Targeted queries must stay sub-millisecond with a warm index; the full
//! build dominates cold-start and is measured separately.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use tempfile::TempDir;

use codemap::query::params::{DependencyParams, FindSymbolParams, SearchParams, SourceParams};
use codemap::{build, Codemap, Config};

fn synthetic_project(modules: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    for m in 0..modules {
        let mut source = String::new();
        if m > 0 {
            source.push_str(&format!("from mod{} import func{}_0\n\n", m - 1, m - 1));
        }
        for f in 0..10 {
            source.push_str(&format!(
                "def func{}_{}(x):\n    y = x + {}\n    return y\n\n",
                m, f, f
            ));
        }
        if m > 0 {
            source.push_str(&format!(
                "def call{}():\n    return func{}_0(1)\n",
                m,
                m - 1
            ));
        }
        fs::write(dir.path().join(format!("mod{}.py", m)), source).unwrap();
    }
    dir
}

fn bench_build(c: &mut Criterion) {
    let dir = synthetic_project(50);
    let config = Config::new(dir.path());
    c.bench_function("build_50_modules", |b| {
        b.iter(|| build(black_box(&config)).unwrap())
    });
}

fn bench_queries(c: &mut Criterion) {
    let dir = synthetic_project(50);
    let codemap = Codemap::open(Config::new(dir.path())).unwrap();

    c.bench_function("find_symbol", |b| {
        b.iter(|| {
            codemap
                .find_symbol(black_box(&FindSymbolParams {
                    name: "func25_3".into(),
                }))
                .unwrap()
        })
    });

    c.bench_function("get_dependents", |b| {
        b.iter(|| {
            codemap
                .get_dependents(black_box(&DependencyParams::named("func25_0")))
                .unwrap()
        })
    });

    c.bench_function("get_function_source", |b| {
        b.iter(|| {
            codemap
                .get_function_source(black_box(&SourceParams::named("func10_5")))
                .unwrap()
        })
    });

    c.bench_function("search_codebase", |b| {
        b.iter(|| {
            codemap
                .search_codebase(black_box(&SearchParams::pattern(r"return y")))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_build, bench_queries);
criterion_main!(benches);
