use agent_core::geometry::Pos;
use agent_core::mine_planner::{plan_mine, MachineFootprint, MinePlanRequest};
use agent_core::resource_patch::{PatchId, ResourcePatchData};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn strip_patch(width: i32, height: i32) -> ResourcePatchData {
    let mut positions = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            positions.push(Pos::new(x, y));
        }
    }
    ResourcePatchData::new(PatchId(0), "iron-ore", positions)
}

fn request(side_max: u32) -> MinePlanRequest {
    MinePlanRequest {
        outer: MachineFootprint { outer: (3, 3) },
        side_max,
        destination: Pos::new(1, -5),
        miner_prototype: "electric-mining-drill",
        belt_prototype: "transport-belt",
    }
}

fn bench_patch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_mine_patch_size");
    for &(w, h) in &[(3, 10), (6, 20), (9, 40)] {
        let patch = strip_patch(w, h);
        let req = request(4);
        group.bench_with_input(BenchmarkId::new("strip", format!("{w}x{h}")), &(patch, req), |b, (patch, req)| {
            b.iter(|| black_box(plan_mine(black_box(patch), black_box(req))));
        });
    }
    group.finish();
}

fn bench_side_max(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_mine_side_max");
    let patch = strip_patch(9, 40);
    for &side_max in &[2u32, 4, 8] {
        let req = request(side_max);
        group.bench_with_input(BenchmarkId::new("side_max", side_max), &(patch.clone(), req), |b, (patch, req)| {
            b.iter(|| black_box(plan_mine(black_box(patch), black_box(req))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_patch_sizes, bench_side_max);
criterion_main!(benches);
