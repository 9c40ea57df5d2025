use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use space_scene::geometry;
use space_scene::scene::Scene;
use space_scene::stars::add_stars;

fn bench_star_field(c: &mut Criterion) {
    c.bench_function("add_200_stars", |b| {
        b.iter(|| {
            let mut scene = Scene::new();
            add_stars(&mut scene, &mut StdRng::seed_from_u64(7));
            black_box(scene.len())
        })
    });
}

fn bench_tessellation(c: &mut Criterion) {
    c.bench_function("torus_16x100", |b| {
        b.iter(|| black_box(geometry::torus(10.0, 3.0, 16, 100)))
    });
    c.bench_function("uv_sphere_32x32", |b| {
        b.iter(|| black_box(geometry::uv_sphere(3.0, 32, 32)))
    });
    c.bench_function("grid_200x50", |b| {
        b.iter(|| {
            black_box(geometry::grid(
                200.0,
                50,
                [0.27, 0.27, 0.27],
                [0.53, 0.53, 0.53],
            ))
        })
    });
}

criterion_group!(benches, bench_star_field, bench_tessellation);
criterion_main!(benches);
