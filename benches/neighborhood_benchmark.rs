use criterion::measurement::Measurement;
use criterion::{criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion};
use rand::distr::{Distribution, Uniform};
use rand::{rngs::StdRng, SeedableRng};
use single_explain::dense::Projection;
use single_explain::neighborhood::{NeighborhoodMatrix, NeighborhoodParams};
use std::time::Duration;

#[derive(Clone)]
pub struct NeighborhoodConfig {
    seed: u64,
    num_points: Vec<usize>,
    radius_fractions: Vec<f32>,
    measurement_time: u64,
    sample_size: usize,
}

impl Default for NeighborhoodConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_points: vec![1000, 5000, 20000],
            radius_fractions: vec![0.01, 0.05],
            measurement_time: 10,
            sample_size: 10,
        }
    }
}

fn create_projection(n: usize, seed: u64) -> Projection<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let coord_dist = Uniform::try_from(0.0f32..1.0).unwrap();
    let points: Vec<[f32; 2]> = (0..n)
        .map(|_| [coord_dist.sample(&mut rng), coord_dist.sample(&mut rng)])
        .collect();
    Projection::from_points(&points).unwrap()
}

fn configure_group<'a, M: Measurement>(
    c: &'a mut Criterion<M>,
    name: &str,
    config: &NeighborhoodConfig,
) -> BenchmarkGroup<'a, M> {
    let mut group = c.benchmark_group(name);
    group.measurement_time(Duration::from_secs(config.measurement_time));
    group.sample_size(config.sample_size);
    group
}

pub fn bench_neighborhood_build(c: &mut Criterion) {
    let config = NeighborhoodConfig::default();
    let mut group = configure_group(c, "Neighborhood_Build", &config);

    for &n in config.num_points.iter() {
        let projection = create_projection(n, config.seed + n as u64);
        for &fraction in config.radius_fractions.iter() {
            let params = NeighborhoodParams::new(fraction, 0, 1);

            group.bench_with_input(
                BenchmarkId::new("exhaustive", format!("n{}_r{}", n, fraction)),
                &(n, fraction),
                |b, _| {
                    b.iter(|| NeighborhoodMatrix::build_with(&projection, params).unwrap());
                },
            );

            #[cfg(feature = "kdtree")]
            group.bench_with_input(
                BenchmarkId::new("kdtree", format!("n{}_r{}", n, fraction)),
                &(n, fraction),
                |b, _| {
                    b.iter(|| NeighborhoodMatrix::build_indexed(&projection, params).unwrap());
                },
            );
        }
    }
    group.finish();
}

criterion_group!(neighborhood_benches, bench_neighborhood_build);
criterion_main!(neighborhood_benches);
