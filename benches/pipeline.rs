use std::path::PathBuf;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use repodigest::defaults::default_ignore_set;
use repodigest::patterns::CompiledPatterns;
use repodigest::render;
use repodigest::types::IngestionQuery;
use repodigest::walker;

/// Builds a fixture tree of `file_count` small Rust-ish source files spread
/// across a handful of subdirectories, used to benchmark walk+render
/// throughput the way a real ingest would traverse a checked-out repo.
fn build_fixture(file_count: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..file_count {
        let subdir = dir.path().join(format!("module_{}", i % 20));
        std::fs::create_dir_all(&subdir).unwrap();
        std::fs::write(
            subdir.join(format!("file_{i}.rs")),
            format!("fn f_{i}() {{\n    println!(\"{i}\");\n}}\n").repeat(4),
        )
        .unwrap();
    }
    std::fs::write(dir.path().join("README.md"), "# fixture\n").unwrap();
    dir
}

fn bench_walk_and_render(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let fixture = build_fixture(500);
    let query = IngestionQuery::for_local_path(fixture.path().to_path_buf());
    let compiled = CompiledPatterns::compile(&query.include, &query.exclude).unwrap();

    c.bench_function("walk_500_files", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (tree, _limit_hit) = walker::walk(black_box(&query), black_box(&compiled)).await.unwrap();
                black_box(tree);
            });
        });
    });

    c.bench_function("walk_and_render_500_files", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (tree, _limit_hit) = walker::walk(&query, &compiled).await.unwrap();
                let digest = render::render(black_box(&tree), black_box(&query));
                black_box(digest);
            });
        });
    });
}

fn bench_pattern_compilation(c: &mut Criterion) {
    let exclude = default_ignore_set();
    let include: std::collections::BTreeSet<String> =
        ["src/**/*.rs", "tests/**/*.rs", "*.md"].iter().map(|s| s.to_string()).collect();

    c.bench_function("compile_default_pattern_set", |b| {
        b.iter(|| {
            black_box(CompiledPatterns::compile(black_box(&include), black_box(&exclude)).unwrap());
        });
    });
}

fn bench_descendant_match(c: &mut Criterion) {
    let exclude = default_ignore_set();
    let include: std::collections::BTreeSet<String> = ["src/**/*.py".to_string()].into_iter().collect();
    let compiled = CompiledPatterns::compile(&include, &exclude).unwrap();
    let paths: Vec<PathBuf> = (0..200).map(|i| PathBuf::from(format!("src/nested_{i}"))).collect();

    c.bench_function("descendant_match_200_dirs", |b| {
        b.iter(|| {
            for path in &paths {
                black_box(compiled.dir_could_contain_match(black_box(path)));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_walk_and_render,
    bench_pattern_compilation,
    bench_descendant_match
);
criterion_main!(benches);
