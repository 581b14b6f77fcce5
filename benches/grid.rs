//! Grid maintenance and full-tick benchmarks.
//!
//! Run with: cargo bench --bench grid
//! Add `--features parallel` to compare the rayon cellsign pass.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rts_sim::components::{Kind, Occupant, Position};
use rts_sim::geometry::MapBounds;
use rts_sim::{Grid, SimConfig, SimWorld};

fn scattered(count: u32, bounds: MapBounds) -> Vec<(Occupant, Position)> {
    // Deterministic scatter, no RNG needed.
    (0..count)
        .map(|i| {
            let x = (i.wrapping_mul(7919) % u32::from(bounds.width)) as u16;
            let y = (i.wrapping_mul(104_729) % u32::from(bounds.height)) as u16;
            let entity = bevy_ecs::entity::Entity::from_raw(i);
            (Occupant::new(entity, Kind::Unit), Position::new(x, y))
        })
        .collect()
}

fn bench_refresh_sections(c: &mut Criterion) {
    let bounds = MapBounds::new(4096, 4096);
    let mut group = c.benchmark_group("refresh_sections");

    for &count in &[1_000u32, 10_000, 50_000] {
        let occupants = scattered(count, bounds);
        group.bench_with_input(BenchmarkId::new("churn", count), &occupants, |b, occupants| {
            let mut grid = Grid::new(bounds, 64, 1 << 16);
            for (occupant, pos) in occupants {
                grid.insert(*occupant, *pos);
            }
            grid.refresh_sections();

            // Move a tenth of the occupants each iteration so some signs change.
            let mut flip = false;
            b.iter(|| {
                for (occupant, pos) in occupants.iter().step_by(10) {
                    let moved = Position::new(pos.x.saturating_add(70), pos.y);
                    let (from, to) = if flip { (moved, *pos) } else { (*pos, moved) };
                    grid.relocate(*occupant, from, to);
                }
                flip = !flip;
                black_box(grid.refresh_sections())
            });
        });
    }
    group.finish();
}

fn bench_query_section(c: &mut Criterion) {
    let bounds = MapBounds::new(4096, 4096);
    let mut grid = Grid::new(bounds, 64, 1 << 20);
    for (occupant, pos) in scattered(20_000, bounds) {
        grid.insert(occupant, pos);
    }

    c.bench_function("query_section_20k", |b| {
        let mut i = 0u32;
        b.iter(|| {
            grid.reset_scratch();
            i = i.wrapping_add(1);
            let x = (i.wrapping_mul(31) % 4096) as u16;
            let y = (i.wrapping_mul(17) % 4096) as u16;
            black_box(grid.query_section(x, y, 256).map(|found| found.len()))
        });
    });
}

fn bench_loaded_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(20);

    for &count in &[500u16, 2_000] {
        group.bench_with_input(BenchmarkId::new("units", count), &count, |b, &count| {
            let mut sim = match SimWorld::with_config(SimConfig::default()) {
                Ok(sim) => sim,
                Err(err) => panic!("default config rejected: {err}"),
            };
            let side = (f32::from(count).sqrt().ceil()) as u16;
            for i in 0..count {
                let x = 64 + (i % side) * 40;
                let y = 64 + (i / side) * 40;
                let _ = sim.create_unit(x, y, (i % 3) as u8);
            }
            b.iter(|| sim.tick());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_refresh_sections, bench_query_section, bench_loaded_tick);
criterion_main!(benches);
