use agent_core::geometry::{Area, Pos, PosF};
use agent_core::pathfinder::{fill_open_area, find_path, PathCache, PathRequest, WalkMap, WalkTile};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn open_map(size: i32) -> WalkMap {
    let mut map = WalkMap::new();
    fill_open_area(&mut map, Area::new(Pos::new(-size, -size), Pos::new(size, size)));
    map
}

fn maze_map(size: i32, wall_period: i32) -> WalkMap {
    let mut map = open_map(size);
    for y in -size..size {
        if y % wall_period != 0 {
            continue;
        }
        for x in -size..size {
            if x % 7 != 0 {
                map.set(Pos::new(x, y), WalkTile { known: true, can_walk: false, ..Default::default() });
            }
        }
    }
    map
}

fn bench_open_ground(c: &mut Criterion) {
    let mut group = c.benchmark_group("astar_open_ground");
    for &size in &[10, 25, 60] {
        let map = open_map(size);
        let req = PathRequest::new(Pos::new(-size + 1, -size + 1), PosF::new((size - 1) as f64, (size - 1) as f64));
        group.bench_with_input(BenchmarkId::new("size", size), &(map, req), |b, (map, req)| {
            b.iter(|| black_box(find_path(black_box(map), black_box(req))));
        });
    }
    group.finish();
}

fn bench_corridor_maze(c: &mut Criterion) {
    let mut group = c.benchmark_group("astar_corridor_maze");
    for &period in &[2, 4, 8] {
        let map = maze_map(30, period);
        let req = PathRequest::new(Pos::new(-29, -29), PosF::new(29.0, 29.0));
        group.bench_with_input(BenchmarkId::new("wall_period", period), &(map, req), |b, (map, req)| {
            b.iter(|| black_box(find_path(black_box(map), black_box(req))));
        });
    }
    group.finish();
}

fn bench_path_cache_hit_vs_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_cache");
    let map = open_map(40);
    let req = PathRequest::new(Pos::new(-39, -39), PosF::new(39.0, 39.0));

    group.bench_function("cold_misses", |b| {
        b.iter(|| {
            let mut cache = PathCache::new(4);
            black_box(cache.get_or_compute(black_box(&map), black_box(&req)))
        });
    });

    group.bench_function("warm_hits", |b| {
        let mut cache = PathCache::new(4);
        cache.get_or_compute(&map, &req);
        b.iter(|| black_box(cache.get_or_compute(black_box(&map), black_box(&req))));
    });

    group.finish();
}

criterion_group!(benches, bench_open_ground, bench_corridor_maze, bench_path_cache_hit_vs_miss);
criterion_main!(benches);
