// Layout Bench Population Integration Tests
//
// Occupancy invariants, reproducibility and precondition checks for the
// rejection-sampling population engine on every layout.

use layout_bench::{
    populate, populate_sharded, AosStore, AosoaStore, BenchError, BenchResult, Field, LayoutKind,
    ParticleSchema, ParticleStore, PopulationConfig, PopulationReport, Scalar, SoaStore,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Wraps a store and counts every field write per particle
struct CountingStore<S> {
    inner: S,
    writes: Vec<usize>,
}

impl<T: Scalar, S: ParticleStore<T>> ParticleStore<T> for CountingStore<S> {
    fn allocate(len: usize, schema: ParticleSchema) -> BenchResult<Self> {
        Ok(Self {
            inner: S::allocate(len, schema)?,
            writes: vec![0; len],
        })
    }

    fn layout(&self) -> LayoutKind {
        self.inner.layout()
    }

    fn schema(&self) -> ParticleSchema {
        self.inner.schema()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn footprint_bytes(&self) -> usize {
        self.inner.footprint_bytes()
    }

    fn get(&self, index: usize, field: Field) -> BenchResult<T> {
        self.inner.get(index, field)
    }

    fn set(&mut self, index: usize, field: Field, value: T) -> BenchResult<()> {
        self.inner.set(index, field, value)?;
        self.writes[index] += 1;
        Ok(())
    }
}

fn counting<T: Scalar, S: ParticleStore<T>>(len: usize, schema: ParticleSchema) -> CountingStore<S> {
    CountingStore {
        inner: S::allocate(len, schema).unwrap(),
        writes: vec![0; len],
    }
}

fn scenario() -> PopulationConfig {
    PopulationConfig::new(16, 4, 4, 0.5)
}

fn populated<S: ParticleStore<f32>>(config: &PopulationConfig, seed: u64) -> (S, PopulationReport) {
    let mut store = S::allocate(config.num_particles, ParticleSchema::full()).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let report = populate(&mut store, config, &mut rng).unwrap();
    (store, report)
}

/// Occupied indices per the bucket mapping
fn occupied(report: &PopulationReport, capacity: usize) -> Vec<usize> {
    report
        .occupancy
        .iter()
        .enumerate()
        .flat_map(|(bucket, &count)| (0..count).map(move |slot| bucket * capacity + slot))
        .collect()
}

fn assert_occupancy(report: &PopulationReport, config: &PopulationConfig) {
    assert_eq!(report.occupancy.len(), config.num_buckets);
    assert_eq!(report.occupancy.iter().sum::<usize>(), config.target());
    assert_eq!(report.inserted, config.target());
    assert!(report.occupancy.iter().all(|&count| count <= config.bucket_capacity));
    assert_eq!(report.draws - report.rejections, config.target() as u64);
}

#[test]
fn test_scenario_occupancy() {
    let config = scenario();
    let (_, report) = populated::<AosStore<f32>>(&config, 2024);
    assert_occupancy(&report, &config);
}

#[test]
fn test_each_filled_index_written_exactly_once() {
    for config in [scenario(), PopulationConfig::new(100, 7, 9, 0.6), PopulationConfig::even(64, 8, 1.0)] {
        let mut store = counting::<f64, SoaStore<f64>>(config.num_particles, ParticleSchema::full());
        let mut rng = StdRng::seed_from_u64(5);
        let report = populate::<f64, _, _>(&mut store, &config, &mut rng).unwrap();

        assert_occupancy(&report, &config);
        let filled = occupied(&report, config.bucket_capacity);
        for (index, &writes) in store.writes.iter().enumerate() {
            let expected = if filled.contains(&index) { Field::ALL.len() } else { 0 };
            assert_eq!(writes, expected, "particle {} written {} times", index, writes);
        }
    }
}

#[test]
fn test_position_only_schema_writes_three_fields() {
    let config = scenario();
    let mut store = counting::<f32, AosoaStore<f32>>(16, ParticleSchema::position_only());
    let mut rng = StdRng::seed_from_u64(8);
    let report = populate::<f32, _, _>(&mut store, &config, &mut rng).unwrap();

    for index in occupied(&report, config.bucket_capacity) {
        assert_eq!(store.writes[index], 3);
    }
}

#[test]
fn test_same_seed_reproduces_population() {
    let config = scenario();
    let (first, first_report) = populated::<AosoaStore<f32>>(&config, 77);
    let (second, second_report) = populated::<AosoaStore<f32>>(&config, 77);

    assert_eq!(first_report, second_report);
    assert_eq!(first.particles().collect::<Vec<_>>(), second.particles().collect::<Vec<_>>());
}

#[test]
fn test_layouts_populate_identically() {
    let config = PopulationConfig::new(48, 6, 8, 0.75);
    let (aos, aos_report) = populated::<AosStore<f32>>(&config, 31);
    let (soa, soa_report) = populated::<SoaStore<f32>>(&config, 31);
    let (aosoa, aosoa_report) = populated::<AosoaStore<f32>>(&config, 31);

    assert_eq!(aos_report, soa_report);
    assert_eq!(aos_report, aosoa_report);
    let expected: Vec<_> = aos.particles().collect();
    assert_eq!(soa.particles().collect::<Vec<_>>(), expected);
    assert_eq!(aosoa.particles().collect::<Vec<_>>(), expected);
}

#[test]
fn test_values_in_rand_range_and_unfilled_zero() {
    let config = scenario();
    let (store, report) = populated::<SoaStore<f32>>(&config, 12);
    let filled = occupied(&report, config.bucket_capacity);

    for (index, particle) in store.particles().enumerate() {
        for field in Field::ALL {
            let value = particle.field(field);
            if filled.contains(&index) {
                assert!((0.0..=2_147_483_648.0).contains(&value));
            } else {
                assert_eq!(value, 0.0);
            }
        }
    }
}

#[test]
fn test_zero_density_leaves_store_zeroed() {
    let config = PopulationConfig::even(16, 4, 0.0);
    let (store, report) = populated::<AosStore<f32>>(&config, 1);

    assert_eq!(report.draws, 0);
    assert_eq!(report.inserted, 0);
    assert!(store.as_slice().iter().all(|&value| value == 0.0));
}

#[test]
fn test_preconditions_rejected_before_any_write() {
    let bad = [
        PopulationConfig::new(16, 4, 4, 1.5),
        PopulationConfig::new(16, 4, 4, -0.5),
        PopulationConfig::new(16, 2, 2, 0.5),
        PopulationConfig::new(16, 0, 4, 0.5),
        PopulationConfig::new(16, 8, 4, 0.5),
        PopulationConfig::new(32, 4, 4, 0.25),
    ];

    for config in bad {
        let mut store = counting::<f32, AosStore<f32>>(16, ParticleSchema::full());
        let mut rng = StdRng::seed_from_u64(0);
        let result = populate::<f32, _, _>(&mut store, &config, &mut rng);

        assert!(matches!(result, Err(BenchError::Config(_))), "{:?} accepted", config);
        assert!(store.writes.iter().all(|&w| w == 0));
    }
}

#[test]
fn test_sharded_population_invariants() {
    for shards in [1, 2, 3, 8] {
        let config = PopulationConfig::new(96, 12, 8, 0.7);
        let mut store = counting::<f32, SoaStore<f32>>(96, ParticleSchema::full());

        let report = populate_sharded::<f32, _>(&mut store, &config, 99, shards).unwrap();

        assert_occupancy(&report, &config);
        let filled = occupied(&report, config.bucket_capacity);
        for (index, &writes) in store.writes.iter().enumerate() {
            let expected = if filled.contains(&index) { Field::ALL.len() } else { 0 };
            assert_eq!(writes, expected);
        }
    }
}

#[test]
fn test_sharded_population_reproducible() {
    let config = PopulationConfig::new(64, 8, 8, 0.5);
    let mut first = AosStore::<f64>::allocate(64, ParticleSchema::full()).unwrap();
    let mut second = AosStore::<f64>::allocate(64, ParticleSchema::full()).unwrap();

    let a = populate_sharded(&mut first, &config, 3, 4).unwrap();
    let b = populate_sharded(&mut second, &config, 3, 4).unwrap();

    assert_eq!(a, b);
    assert_eq!(first.as_slice(), second.as_slice());
}
