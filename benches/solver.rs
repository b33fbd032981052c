//! Benchmarks for the solver, move generation, cluster analysis and enumeration.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rush::{Board, ClusterAnalyzer, Config, Enumerator};

/// A long puzzle on the classic 6x6 board, with one wall.
const HARDEST: &str = "IBBxooIooLDDJAALooJoKEEMFFKooMGGHHHM";

/// A 15-move puzzle on the classic 6x6 board.
const MEDIUM: &str = "BB.C...D.CEE.DAAFGH.IIFGH.JKK.LLJ...";

fn small_config() -> Config {
    Config {
        width: 4,
        primary_row: 1,
        primary_size: 2,
        min_size: 2,
        max_size: 3,
        min_walls: 0,
        max_walls: 1,
    }
}

/// Benchmark solving a mid-sized puzzle.
fn bench_solve(c: &mut Criterion) {
    let board: Board = MEDIUM.parse().unwrap();
    c.bench_function("solve_medium", |b| b.iter(|| black_box(&board).solve()));
}

/// Benchmark solving the hardest known classic puzzle.
fn bench_solve_hardest(c: &mut Criterion) {
    let board: Board = HARDEST.parse().unwrap();
    let mut group = c.benchmark_group("hardest");
    group.sample_size(10);
    group.bench_function("solve", |b| b.iter(|| black_box(&board).solve()));
    group.finish();
}

/// Benchmark generating moves into a reused buffer.
fn bench_moves(c: &mut Criterion) {
    let board: Board = HARDEST.parse().unwrap();
    let mut buf = Vec::new();
    c.bench_function("moves", |b| {
        b.iter(|| {
            black_box(&board).moves(&mut buf);
            buf.len()
        })
    });
}

/// Benchmark exploring and classifying a full cluster.
fn bench_cluster(c: &mut Criterion) {
    let board = rush::canonicalize(&MEDIUM.parse().unwrap());
    let mut analyzer = ClusterAnalyzer::new();
    c.bench_function("analyze_cluster", |b| {
        b.iter(|| analyzer.analyze(0, 0, black_box(&board)))
    });
}

/// Benchmark counting every 4x4 layout.
fn bench_enumerator_count(c: &mut Criterion) {
    let enumerator = Enumerator::new(&small_config()).unwrap();
    c.bench_function("count_4x4", |b| b.iter(|| black_box(&enumerator).count()));
}

criterion_group!(
    benches,
    bench_solve,
    bench_solve_hardest,
    bench_moves,
    bench_cluster,
    bench_enumerator_count
);
criterion_main!(benches);
