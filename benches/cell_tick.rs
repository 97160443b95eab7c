//! Scalability benchmarks for the Swell cell simulation core
//!
//! Measures the spatial rebuild and the full tick pipeline at various
//! entity counts.
//!
//! Run with: cargo bench --bench cell_tick

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use swell_cell_server::config::CellConfig;
use swell_cell_server::game::cell::CellController;
use swell_cell_server::game::constants::tick::DT;
use swell_cell_server::game::spatial::SpatialOverlapIndex;
use swell_cell_server::game::state::{EntityId, OpSet, Player};
use swell_cell_server::util::vec2::Vec2;

/// Fill a cell with a mixed population, one bot per four players
fn populate(cell: &mut CellController, players: usize, rng: &mut StdRng) {
    let config = cell.config.clone();
    for n in 0..players {
        let position = Vec2::new(
            rng.gen_range(50.0..config.world_width - 50.0),
            rng.gen_range(50.0..config.world_height - config.beach_size * 2.0),
        );
        let player = if n % 4 == 0 {
            Player::bot(EntityId::new(), position, OpSet::LEFT, &config)
        } else {
            Player::human(EntityId::new(), position, &config)
        };
        cell.state.add_player(player);
    }
}

fn bench_spatial_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_rebuild");
    group.sample_size(50);

    for count in [100, 250, 500, 1000] {
        let mut cell = CellController::new(CellConfig::default()).expect("valid default config");
        let mut rng = StdRng::seed_from_u64(count as u64);
        populate(&mut cell, count, &mut rng);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("build_and_query", count), &count, |b, _| {
            b.iter(|| {
                let index = SpatialOverlapIndex::build(&cell.state);
                black_box(index.collect_overlaps(&cell.state, &mut rng))
            });
        });
    }

    group.finish();
}

fn bench_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_tick");
    group.sample_size(50);

    for count in [100, 250, 500, 1000] {
        let mut cell = CellController::new(CellConfig::default()).expect("valid default config");
        let mut rng = StdRng::seed_from_u64(count as u64);
        populate(&mut cell, count, &mut rng);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("tick", count), &count, |b, _| {
            b.iter(|| black_box(cell.tick(DT, &mut rng).expect("tick succeeds")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_spatial_rebuild, bench_full_tick);
criterion_main!(benches);
